/// An inclusive amount interval in SOL.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AmountRange {
    pub min: f64,
    pub max: f64,
}

impl AmountRange {
    /// Membership is inclusive on both bounds. NaN bounds never match.
    pub fn contains(&self, amount: f64) -> bool {
        self.min <= amount && amount <= self.max
    }
}

/// Parse a range specification like `"17-21,50-100"` into intervals.
///
/// Tokens are split on `,` and trimmed; each token splits on its first `-`.
/// A malformed token (missing separator, non-numeric endpoint) degrades to a
/// NaN interval that can never match, so one wallet's misconfiguration cannot
/// halt the monitor. Empty tokens are dropped, so `""` parses to no intervals.
pub fn parse_ranges(spec: &str) -> Vec<AmountRange> {
    spec.split(',')
        .map(|token| token.trim())
        .filter(|token| !token.is_empty())
        .map(|token| match token.split_once('-') {
            Some((lo, hi)) => {
                let min = lo.trim().parse::<f64>().unwrap_or(f64::NAN);
                let max = hi.trim().parse::<f64>().unwrap_or(f64::NAN);
                AmountRange { min, max }
            }
            None => AmountRange {
                min: f64::NAN,
                max: f64::NAN,
            },
        })
        .collect()
}

/// True iff any interval contains `amount`.
pub fn matches_any(amount: f64, ranges: &[AmountRange]) -> bool {
    ranges.iter().any(|range| range.contains(amount))
}

/// One monitored wallet: a human label, its account address, and the amount
/// ranges that should trigger a notification. Immutable after load.
#[derive(Debug, Clone)]
pub struct WatchedWallet {
    pub label: String,
    pub address: String,
    pub ranges: Vec<AmountRange>,
}

impl WatchedWallet {
    pub fn new(label: impl Into<String>, address: impl Into<String>, range_spec: &str) -> Self {
        Self {
            label: label.into(),
            address: address.into(),
            ranges: parse_ranges(range_spec),
        }
    }

    /// Whether an outflow of `amount` SOL falls inside any configured range.
    pub fn matches(&self, amount: f64) -> bool {
        matches_any(amount, &self.ranges)
    }
}
