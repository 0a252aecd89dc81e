//! Parser for AMFI's semicolon-delimited bulk NAV text file.
//!
//! The file interleaves free-text AMC headings ("Axis Mutual Fund") and
//! scheme-type banners between data rows; only lines with exactly six
//! `;`-separated fields after the header line are real records.

use anyhow::{Result, bail};
use serde::Deserialize;

const HEADER_MARKER: &str = "Scheme Code;";
const DELIMITER: char = ';';
const FIELD_COUNT: usize = 6;

const ETF_KEYWORDS: [&str; 3] = ["ETF", "BEES", "EXCHANGE TRADED FUND"];
const EXCLUDED_KEYWORDS: [&str; 2] = ["REGULAR", "IDCW"];

/// One raw row of the bulk NAV file. Values are kept as published.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct NavRecord {
    #[serde(rename = "Scheme Code")]
    pub scheme_code: String,
    #[serde(rename = "Scheme Name")]
    pub scheme_name: String,
    #[serde(rename = "Net Asset Value")]
    pub net_asset_value: String,
    #[serde(rename = "Date")]
    pub nav_date: String,
}

/// Parses the raw bulk text into records, in source order.
///
/// Fails when no header line is present. Non-record lines (AMC headings,
/// blanks) are dropped before CSV parsing.
pub fn parse_bulk_nav(raw: &str) -> Result<Vec<NavRecord>> {
    let lines: Vec<&str> = raw.trim().lines().collect();
    let Some(header_index) = lines.iter().position(|l| l.starts_with(HEADER_MARKER)) else {
        bail!("No valid header line found in AMFI response");
    };

    let valid_data: Vec<&str> = lines[header_index..]
        .iter()
        .filter(|line| line.contains(DELIMITER) && line.split(DELIMITER).count() == FIELD_COUNT)
        .copied()
        .collect();

    let joined = valid_data.join("\n").into_bytes();
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(b';')
        .trim(csv::Trim::All)
        .flexible(false)
        .from_reader(joined.as_slice());

    let mut records = Vec::new();
    for row in reader.deserialize::<NavRecord>() {
        records.push(row?);
    }
    Ok(records)
}

/// True when the scheme name marks an exchange-traded fund.
fn is_etf(name: &str) -> bool {
    let upper = name.to_uppercase();
    ETF_KEYWORDS.iter().any(|kw| upper.contains(kw))
}

/// Keeps ETF records, dropping regular-plan and IDCW variants.
pub fn filter_etfs(records: Vec<NavRecord>) -> Vec<NavRecord> {
    records
        .into_iter()
        .filter(|r| is_etf(&r.scheme_name))
        .filter(|r| {
            let upper = r.scheme_name.to_uppercase();
            !EXCLUDED_KEYWORDS.iter().any(|kw| upper.contains(kw))
        })
        .collect()
}

/// Parse + ETF filter in one step, as used by the refresh pipeline.
pub fn parse_etf_records(raw: &str) -> Result<Vec<NavRecord>> {
    Ok(filter_etfs(parse_bulk_nav(raw)?))
}
