//! Normalized per-symbol quote shape served to the dashboard.

use serde::{Deserialize, Serialize};

/// Sentinel used for text fields with no data.
pub const NO_DATA: &str = "N/A";
/// Sentinel used for the formatted change string.
pub const NO_CHANGE: &str = "-";

/// A wire field that is either a number or a textual sentinel.
///
/// The dashboard contract predates this server: fields are never omitted,
/// missing numbers are the literal string "N/A".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Field {
    Number(f64),
    Text(String),
}

impl Field {
    pub fn na() -> Self {
        Field::Text(NO_DATA.to_string())
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Field::Number(n) => Some(*n),
            Field::Text(_) => None,
        }
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, Field::Text(t) if t == NO_DATA)
    }
}

impl From<f64> for Field {
    fn from(n: f64) -> Self {
        Field::Number(n)
    }
}

/// Upstream tier that produced a quote. Absent for the primary exchange
/// lookup and for the all-miss placeholder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FallbackSource {
    Yahoo,
    GoogleSheets,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Recommendation {
    Buy,
    Hold,
}

/// Moving averages over long windows (trading days).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LongTermAverages {
    pub ma50: Option<f64>,
    pub ma100: Option<f64>,
    pub ma200: Option<f64>,
    pub ma500: Option<f64>,
}

/// Moving averages over short windows (trading days).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ShortTermAverages {
    pub ma5: Option<f64>,
    pub ma10: Option<f64>,
    pub ma20: Option<f64>,
    pub ma21: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Quote {
    pub symbol: String,
    pub name: String,
    pub current_price: Field,
    pub change: Field,
    pub percent_change: Field,
    pub change_str: String,
    pub expense_ratio: Field,
    pub aum: Field,
    /// 0-100 score derived from traded volume.
    pub liquidity: Field,
    pub avg_volume: Field,
    pub recommendation: Recommendation,
    pub description: String,
    #[serde(default)]
    pub long_term_averages: LongTermAverages,
    #[serde(default)]
    pub short_term_averages: ShortTermAverages,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fallback_source: Option<FallbackSource>,
}

impl Quote {
    /// All-sentinel record returned when every source misses.
    pub fn placeholder(symbol: &str) -> Self {
        Quote {
            symbol: symbol.to_string(),
            name: symbol.to_string(),
            current_price: Field::na(),
            change: Field::na(),
            percent_change: Field::na(),
            change_str: NO_CHANGE.to_string(),
            expense_ratio: Field::na(),
            aum: Field::na(),
            liquidity: Field::na(),
            avg_volume: Field::na(),
            recommendation: Recommendation::Hold,
            description: NO_DATA.to_string(),
            long_term_averages: LongTermAverages::default(),
            short_term_averages: ShortTermAverages::default(),
            fallback_source: None,
        }
    }

    /// Fills this quote's sentinel fields from `other`, keeping existing
    /// values. Used by the merge variant where primary data wins.
    pub fn fill_missing_from(&mut self, other: &Quote) {
        fn fill(dst: &mut Field, src: &Field) {
            if dst.is_missing() && !src.is_missing() {
                *dst = src.clone();
            }
        }
        if self.name == self.symbol && other.name != other.symbol {
            self.name = other.name.clone();
        }
        fill(&mut self.current_price, &other.current_price);
        fill(&mut self.change, &other.change);
        fill(&mut self.percent_change, &other.percent_change);
        if self.change_str == NO_CHANGE && other.change_str != NO_CHANGE {
            self.change_str = other.change_str.clone();
        }
        fill(&mut self.expense_ratio, &other.expense_ratio);
        fill(&mut self.aum, &other.aum);
        fill(&mut self.liquidity, &other.liquidity);
        fill(&mut self.avg_volume, &other.avg_volume);
        if self.description == NO_DATA && other.description != NO_DATA {
            self.description = other.description.clone();
        }
    }
}

/// Formats the "+1.23 (0.45%)" style change string.
pub fn format_change(change: f64, percent: f64) -> String {
    let sign = if change >= 0.0 { "+" } else { "" };
    format!("{sign}{change:.2} ({percent:.2}%)")
}

/// Log-scaled liquidity score from average traded volume, clamped to 0-100.
pub fn liquidity_score(avg_volume: f64) -> f64 {
    if avg_volume <= 1.0 {
        return 0.0;
    }
    // 10^7 daily volume maps to the top of the scale
    (avg_volume.log10() / 7.0 * 100.0).clamp(0.0, 100.0).round()
}
