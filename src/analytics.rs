//! Simple moving averages and the golden/death cross signal.

use crate::quote::{LongTermAverages, ShortTermAverages};
use serde::Serialize;
use std::fmt::Display;

/// Windows computed by the moving-average endpoint, in trading days.
pub const MA_WINDOWS: [usize; 8] = [5, 10, 20, 21, 50, 100, 200, 500];

/// Arithmetic mean of the last `window` closes, rounded to 2 decimal
/// places. `None` when fewer than `window` observations exist — never a
/// partial average.
pub fn moving_average(closes: &[f64], window: usize) -> Option<f64> {
    if window == 0 || closes.len() < window {
        return None;
    }
    let sum: f64 = closes[closes.len() - window..].iter().sum();
    Some(round2(sum / window as f64))
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CrossSignal {
    #[serde(rename = "Golden Cross")]
    Golden,
    #[serde(rename = "Death Cross")]
    Death,
}

impl Display for CrossSignal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CrossSignal::Golden => write!(f, "Golden Cross"),
            CrossSignal::Death => write!(f, "Death Cross"),
        }
    }
}

/// Two-point threshold comparison of the 50- and 200-day averages,
/// recomputed fresh on each request. Undefined when either side is.
pub fn cross_signal(ma50: Option<f64>, ma200: Option<f64>) -> Option<CrossSignal> {
    match (ma50, ma200) {
        (Some(short), Some(long)) => Some(if short > long {
            CrossSignal::Golden
        } else {
            CrossSignal::Death
        }),
        _ => None,
    }
}

/// Long-window averages for the quote shape.
pub fn long_term_averages(closes: &[f64]) -> LongTermAverages {
    LongTermAverages {
        ma50: moving_average(closes, 50),
        ma100: moving_average(closes, 100),
        ma200: moving_average(closes, 200),
        ma500: moving_average(closes, 500),
    }
}

/// Short-window averages for the quote shape.
pub fn short_term_averages(closes: &[f64]) -> ShortTermAverages {
    ShortTermAverages {
        ma5: moving_average(closes, 5),
        ma10: moving_average(closes, 10),
        ma20: moving_average(closes, 20),
        ma21: moving_average(closes, 21),
    }
}
