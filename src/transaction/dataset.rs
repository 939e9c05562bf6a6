use chrono::{Duration, NaiveDate};
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::generator::generate_one;
use super::types::Transaction;

/// Risk score bands used to bias generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RiskBand {
    Low,
    Medium,
    High,
    Critical,
}

impl RiskBand {
    pub const ALL: [RiskBand; 4] = [Self::Low, Self::Medium, Self::High, Self::Critical];

    /// Inclusive score range for the band.
    pub fn range(&self) -> (u8, u8) {
        match self {
            Self::Low => (0, 25),
            Self::Medium => (26, 50),
            Self::High => (51, 75),
            Self::Critical => (76, 100),
        }
    }
}

/// Percentage of the dataset per risk band.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskDistribution {
    pub low: u32,
    pub medium: u32,
    pub high: u32,
    pub critical: u32,
}

impl Default for RiskDistribution {
    fn default() -> Self {
        Self {
            low: 50,
            medium: 20,
            high: 20,
            critical: 10,
        }
    }
}

impl RiskDistribution {
    pub fn validate(&self) -> Result<(), String> {
        let parts = [self.low, self.medium, self.high, self.critical];
        if parts.iter().any(|p| *p > 100) {
            return Err("Risk percentages must each be between 0 and 100".to_string());
        }
        let total: u32 = parts.iter().sum();
        if total != 100 {
            return Err(format!("Risk percentages must sum to 100, got {}", total));
        }
        Ok(())
    }

    /// Split `count` across the four bands in `RiskBand::ALL` order.
    ///
    /// The first three bands are rounded and clamped so the running total
    /// never exceeds `count`; critical takes whatever is left.
    pub fn allocate(&self, count: usize) -> [usize; 4] {
        let share = |pct: u32| (count as f64 * pct as f64 / 100.0).round() as usize;

        let mut remaining = count;
        let mut take = |want: usize| {
            let n = want.min(remaining);
            remaining -= n;
            n
        };

        let low = take(share(self.low));
        let medium = take(share(self.medium));
        let high = take(share(self.high));
        [low, medium, high, remaining]
    }
}

/// Inclusive calendar window for generated dates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl TimeRange {
    /// The `days` calendar days ending with `today`.
    pub fn trailing_days(today: NaiveDate, days: u32) -> Self {
        let back = i64::from(days.max(1)) - 1;
        Self {
            start: today - Duration::days(back),
            end: today,
        }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date <= self.end
    }
}

/// Named generation presets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatasetPreset {
    Demo,
    Large,
    Custom,
}

/// Count and trailing window for a preset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct PresetSize {
    pub count: usize,
    pub window_days: u32,
}

impl DatasetPreset {
    pub fn default_size(&self) -> PresetSize {
        match self {
            Self::Demo => PresetSize {
                count: 100,
                window_days: 30,
            },
            Self::Large => PresetSize {
                count: 250,
                window_days: 365,
            },
            Self::Custom => PresetSize {
                count: 200,
                window_days: 365,
            },
        }
    }
}

/// Everything `generate` needs.
#[derive(Debug, Clone, PartialEq)]
pub struct DatasetOptions {
    pub count: usize,
    pub distribution: RiskDistribution,
    pub range: TimeRange,
    pub id_prefix: String,
}

impl DatasetOptions {
    pub fn from_size(size: PresetSize, today: NaiveDate) -> Self {
        Self {
            count: size.count,
            distribution: RiskDistribution::default(),
            range: TimeRange::trailing_days(today, size.window_days),
            id_prefix: "TX".to_string(),
        }
    }

    pub fn demo(today: NaiveDate) -> Self {
        Self::from_size(DatasetPreset::Demo.default_size(), today)
    }

    pub fn large(today: NaiveDate) -> Self {
        Self::from_size(DatasetPreset::Large.default_size(), today)
    }

    pub fn custom(today: NaiveDate) -> Self {
        Self::from_size(DatasetPreset::Custom.default_size(), today)
    }
}

/// Generate `options.count` transactions across the risk bands, newest first.
pub fn generate<R: Rng + ?Sized>(rng: &mut R, options: &DatasetOptions) -> Vec<Transaction> {
    let counts = options.distribution.allocate(options.count);
    let mut transactions = Vec::with_capacity(options.count);
    let mut index = 0usize;

    for (band, n) in RiskBand::ALL.iter().zip(counts) {
        let (min, max) = band.range();
        for _ in 0..n {
            transactions.push(generate_one(
                rng,
                index,
                &options.id_prefix,
                min,
                max,
                options.range.start,
                options.range.end,
            ));
            index += 1;
        }
    }

    sort_newest_first(&mut transactions);

    tracing::debug!(
        count = transactions.len(),
        low = counts[0],
        medium = counts[1],
        high = counts[2],
        critical = counts[3],
        "Generated dataset"
    );

    transactions
}

/// Stable sort by date descending.
pub fn sort_newest_first(transactions: &mut [Transaction]) {
    transactions.sort_by(|a, b| b.date.cmp(&a.date));
}
