//! Canonical category table and the keyword categorizer.
//!
//! The table order is a priority: a scheme matching two categories lands in
//! the one declared first. Keep that order stable for reproducible output.

use crate::nav::parser::NavRecord;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Static configuration for one category: match keywords for NAV
/// categorization plus the curated exchange symbols used by the quote
/// endpoints.
#[derive(Debug, Clone)]
pub struct CategorySpec {
    pub key: &'static str,
    pub label: &'static str,
    pub description: &'static str,
    pub keywords: &'static [&'static str],
    pub symbols: &'static [&'static str],
}

/// A fund entry inside a categorized snapshot.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Fund {
    /// Exchange symbol, inferred only when available.
    pub symbol: String,
    pub scheme_name: String,
    pub amfi_code: String,
    pub latest_nav: String,
    pub nav_date: String,
}

/// One category of the persisted snapshot. The fund list is rebuilt from
/// scratch on every categorization pass.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Category {
    pub label: String,
    pub description: String,
    pub keywords: Vec<String>,
    pub funds: Vec<Fund>,
}

/// The persisted daily snapshot: `{ "categories": { key: Category } }`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NavSnapshot {
    pub categories: HashMap<String, Category>,
}

/// Key + label pair for the category listing endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CategoryInfo {
    pub key: String,
    pub label: String,
}

pub const MISC_KEY: &str = "misc";

/// The single source of truth for category configuration.
pub fn default_categories() -> &'static [CategorySpec] {
    CATEGORIES
}

static CATEGORIES: &[CategorySpec] = &[
    CategorySpec {
        key: "nifty50",
        label: "Nifty 50",
        description: "ETFs tracking the Nifty 50 index",
        keywords: &["nifty 50", "niftybees", "niftyetf", "nifty bees"],
        symbols: &["NIFTYBEES", "HDFCNIFTY", "ICICINIFTY", "SBINIFTY", "UTINIFTY"],
    },
    CategorySpec {
        key: "banking",
        label: "Banking",
        description: "ETFs focused on banking sector stocks",
        keywords: &["bank", "banking", "bankbees", "nifty bank"],
        symbols: &["BANKBEES"],
    },
    CategorySpec {
        key: "psuBanking",
        label: "PSU Banking",
        description: "ETFs focused on public sector banks",
        keywords: &["psu bank", "psubnkbees"],
        symbols: &["PSUBNKBEES"],
    },
    CategorySpec {
        key: "privateBanking",
        label: "Private Banking",
        description: "ETFs focused on private sector banks",
        keywords: &["private bank", "pvt bank"],
        symbols: &[],
    },
    CategorySpec {
        key: "largeCap",
        label: "Large Cap",
        description: "ETFs focused on large cap companies",
        keywords: &["largecap", "top 100", "nifty 100"],
        symbols: &[],
    },
    CategorySpec {
        key: "midCap",
        label: "Mid Cap",
        description: "ETFs focused on mid cap companies",
        keywords: &["midcap", "midcap 150", "juniorbees"],
        symbols: &["ICICIMID150", "MOTILALM100", "KOTAKMID50", "NIPPMID150"],
    },
    CategorySpec {
        key: "smallCap",
        label: "Small Cap",
        description: "ETFs focused on small cap companies",
        keywords: &["smallcap", "small cap 250"],
        symbols: &["NIPPSMLCAP", "ICICISMLCAP", "SBIETFSC", "MOTISMLCAP", "HDFCSMLCAP"],
    },
    CategorySpec {
        key: "it",
        label: "Information Technology",
        description: "ETFs focused on information technology sector",
        keywords: &["it", "tech", "nifty it", "itbees"],
        symbols: &["ITBEES"],
    },
    CategorySpec {
        key: "sensex",
        label: "Sensex",
        description: "ETFs tracking the Sensex index",
        keywords: &["sensex"],
        symbols: &[],
    },
    CategorySpec {
        key: "gold",
        label: "Precious Metals - Gold",
        description: "ETFs investing in gold",
        keywords: &["gold", "goldbees"],
        symbols: &["GOLDBEES"],
    },
    CategorySpec {
        key: "silver",
        label: "Precious Metals - Silver",
        description: "ETFs investing in silver",
        keywords: &["silver", "silverbees"],
        symbols: &["SILVERBEES"],
    },
    CategorySpec {
        key: "next50",
        label: "Next 50",
        description: "ETFs tracking Next 50 index",
        keywords: &["nifty next 50", "juniorbees"],
        symbols: &["JUNIORBEES"],
    },
    CategorySpec {
        key: "liquid",
        label: "Liquid",
        description: "Liquid ETFs for short term investments",
        keywords: &["liquid", "liquidbees"],
        symbols: &["LIQUIDBEES", "ICICILIQUID", "SBILIQUID", "HDFCLIQUID", "UTILIQUIB"],
    },
    CategorySpec {
        key: "international",
        label: "International",
        description: "ETFs with international exposure",
        keywords: &["nasdaq", "sp 500", "international", "global"],
        symbols: &["MOTILALNAS100", "MOTILALSP500", "ICICINASDAQ", "SBIINTERNAT", "HDFCNASDAQ"],
    },
    CategorySpec {
        key: "consumption",
        label: "Consumption",
        description: "ETFs focused on consumer goods and services",
        keywords: &["consumption", "consumer"],
        symbols: &[],
    },
    CategorySpec {
        key: "healthcare",
        label: "Healthcare",
        description: "ETFs focused on healthcare sector",
        keywords: &["healthcare", "pharma"],
        symbols: &[],
    },
    CategorySpec {
        key: "gilt",
        label: "Gilt",
        description: "Government securities ETFs",
        keywords: &["gsec", "gilt", "government bond"],
        symbols: &[],
    },
    CategorySpec {
        key: "momentum",
        label: "Momentum",
        description: "Momentum factor based ETFs",
        keywords: &["momentum"],
        symbols: &[],
    },
    CategorySpec {
        key: "value",
        label: "Value",
        description: "Value factor based ETFs",
        keywords: &["value"],
        symbols: &[],
    },
    CategorySpec {
        key: "quality",
        label: "Quality",
        description: "Quality factor based ETFs",
        keywords: &["quality"],
        symbols: &[],
    },
    CategorySpec {
        key: "infrastructure",
        label: "Infrastructure",
        description: "Infrastructure sector ETFs",
        keywords: &["infra", "infrastructure"],
        symbols: &[],
    },
    CategorySpec {
        key: "lowVolatility",
        label: "Low Volatility",
        description: "Low volatility ETFs",
        keywords: &["low vol", "lowvol"],
        symbols: &[],
    },
    CategorySpec {
        key: "equalWeight",
        label: "Equal Weight",
        description: "Equal weighted index ETFs",
        keywords: &["equal weight", "equalo"],
        symbols: &[],
    },
    CategorySpec {
        key: "metals",
        label: "Metals",
        description: "Metal sector ETFs",
        keywords: &["metal"],
        symbols: &[],
    },
    CategorySpec {
        key: MISC_KEY,
        label: "Miscellaneous / Uncategorized",
        description: "ETFs that didn't fit other categories or are newly discovered and require manual review.",
        keywords: &[],
        symbols: &[],
    },
];

/// Looks up a category spec by key.
pub fn find_spec(key: &str) -> Option<&'static CategorySpec> {
    CATEGORIES.iter().find(|spec| spec.key == key)
}

/// Union of all curated symbols across categories, in table order.
pub fn all_symbols() -> Vec<String> {
    let mut symbols = Vec::new();
    for spec in CATEGORIES {
        for symbol in spec.symbols {
            if !symbols.iter().any(|s| s == symbol) {
                symbols.push(symbol.to_string());
            }
        }
    }
    symbols
}

fn fund_from_record(record: &NavRecord) -> Fund {
    Fund {
        symbol: String::new(),
        scheme_name: record.scheme_name.clone(),
        amfi_code: record.scheme_code.clone(),
        latest_nav: record.net_asset_value.clone(),
        nav_date: record.nav_date.clone(),
    }
}

/// Buckets ETF records into categories.
///
/// Single pass, first-match-wins: categories are scanned in declaration
/// order and a record goes to the first whose keyword matches the
/// uppercased scheme name. Non-matches land in `misc`. Categories that end
/// up empty are dropped from the result.
pub fn categorize(records: &[NavRecord], specs: &[CategorySpec]) -> HashMap<String, Category> {
    let mut result: HashMap<String, Category> = specs
        .iter()
        .map(|spec| {
            (
                spec.key.to_string(),
                Category {
                    label: spec.label.to_string(),
                    description: spec.description.to_string(),
                    keywords: spec.keywords.iter().map(|k| k.to_string()).collect(),
                    funds: Vec::new(),
                },
            )
        })
        .collect();

    for record in records {
        let name = record.scheme_name.to_uppercase();
        let matched = specs.iter().find(|spec| {
            spec.keywords
                .iter()
                .any(|kw| name.contains(&kw.to_uppercase()))
        });
        let key = match matched {
            Some(spec) => spec.key,
            None if result.contains_key(MISC_KEY) => MISC_KEY,
            None => continue,
        };
        if let Some(category) = result.get_mut(key) {
            category.funds.push(fund_from_record(record));
        }
    }

    result.retain(|_, category| !category.funds.is_empty());
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(code: &str, name: &str) -> NavRecord {
        NavRecord {
            scheme_code: code.to_string(),
            scheme_name: name.to_string(),
            net_asset_value: "10.0".to_string(),
            nav_date: "01-Jan-2025".to_string(),
        }
    }

    #[test]
    fn test_niftybees_lands_in_nifty50() {
        let records = vec![record("101", "ABC NIFTY BEES Fund")];
        let result = categorize(&records, default_categories());
        let funds = &result["nifty50"].funds;
        assert_eq!(funds.len(), 1);
        assert_eq!(funds[0].amfi_code, "101");
        assert_eq!(funds[0].symbol, "");
    }

    #[test]
    fn test_first_match_wins_over_later_categories() {
        // "GOLD" also substring-matches nothing earlier; "NIFTY BANK GOLD"
        // style names hit the earliest declared category.
        let records = vec![record("1", "Kotak Nifty Bank Gold Hybrid ETF")];
        let result = categorize(&records, default_categories());
        assert!(result.contains_key("banking"));
        assert!(!result.contains_key("gold"));
    }

    #[test]
    fn test_unmatched_goes_to_misc() {
        let records = vec![record("9", "BHARAT BOND ETF - APRIL 2030")];
        let result = categorize(&records, default_categories());
        assert_eq!(result.len(), 1);
        assert_eq!(result[MISC_KEY].funds.len(), 1);
    }

    #[test]
    fn test_empty_categories_removed() {
        let records = vec![record("1", "SBI SENSEX ETF")];
        let result = categorize(&records, default_categories());
        assert_eq!(result.len(), 1);
        assert!(result.contains_key("sensex"));
    }

    #[test]
    fn test_idempotent() {
        let records = vec![
            record("1", "Nippon India Niftybees"),
            record("2", "HDFC Gold ETF"),
            record("3", "Unknown Thematic ETF"),
        ];
        let first = categorize(&records, default_categories());
        let second = categorize(&records, default_categories());
        assert_eq!(first, second);
    }

    #[test]
    fn test_fund_lists_fully_rebuilt() {
        let specs = default_categories();
        let first = categorize(&[record("1", "HDFC Gold ETF")], specs);
        assert_eq!(first["gold"].funds.len(), 1);
        // A later pass over a different set must not accumulate
        let second = categorize(&[record("2", "SBI Gold ETF")], specs);
        assert_eq!(second["gold"].funds.len(), 1);
        assert_eq!(second["gold"].funds[0].amfi_code, "2");
    }

    #[test]
    fn test_misc_is_last_and_keywordless() {
        let specs = default_categories();
        let last = specs.last().unwrap();
        assert_eq!(last.key, MISC_KEY);
        assert!(last.keywords.is_empty());
    }
}
