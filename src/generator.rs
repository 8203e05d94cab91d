//! Synthetic transaction generation.
//!
//! Amounts come from four weighted buckets, each with its own probability of
//! the transaction being labelled fraud. The anonymised `V` features are
//! copied wholesale from a random row of a reference dataset.

use crate::types::transaction::{v_feature_name, Transaction, V_FEATURE_COUNT};
use anyhow::{Context, Result};
use chrono::{NaiveDateTime, Timelike};
use rand::seq::SliceRandom;
use rand::Rng;
use serde::Serialize;
use std::collections::BTreeMap;
use std::io;
use std::path::Path;
use tracing::info;

/// Chance of snapping an amount to a `.99` price point
const PRICE_POINT_PROBABILITY: f64 = 0.3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AmountBucket {
    Small,
    Medium,
    Large,
    VeryLarge,
}

impl AmountBucket {
    pub const ALL: [AmountBucket; 4] = [
        AmountBucket::Small,
        AmountBucket::Medium,
        AmountBucket::Large,
        AmountBucket::VeryLarge,
    ];

    /// Inclusive amount range
    pub fn range(self) -> (f64, f64) {
        match self {
            AmountBucket::Small => (0.01, 50.00),
            AmountBucket::Medium => (50.01, 200.00),
            AmountBucket::Large => (200.01, 1000.00),
            AmountBucket::VeryLarge => (1000.01, 5000.00),
        }
    }

    /// Relative selection weight
    pub fn weight(self) -> f64 {
        match self {
            AmountBucket::Small => 0.5,
            AmountBucket::Medium => 0.3,
            AmountBucket::Large => 0.15,
            AmountBucket::VeryLarge => 0.05,
        }
    }

    /// Probability the ground-truth label is fraud
    pub fn fraud_probability(self) -> f64 {
        match self {
            AmountBucket::Small => 0.3,
            AmountBucket::Medium => 0.4,
            AmountBucket::Large => 0.6,
            AmountBucket::VeryLarge => 0.7,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            AmountBucket::Small => "small",
            AmountBucket::Medium => "medium",
            AmountBucket::Large => "large",
            AmountBucket::VeryLarge => "very_large",
        }
    }

    pub fn contains(self, amount: f64) -> bool {
        let (min, max) = self.range();
        (min..=max).contains(&amount)
    }
}

fn round_cents(amount: f64) -> f64 {
    (amount * 100.0).round() / 100.0
}

/// Draw an amount inside `bucket`, sometimes snapped to a `.99` price point
/// when that stays inside the bucket.
pub fn amount_in_bucket<R: Rng + ?Sized>(rng: &mut R, bucket: AmountBucket) -> f64 {
    let (min, max) = bucket.range();
    let amount = round_cents(rng.gen_range(min..=max)).clamp(min, max);

    if rng.gen_bool(PRICE_POINT_PROBABILITY) {
        let priced = round_cents(amount.round() - 0.01);
        if bucket.contains(priced) {
            return priced;
        }
    }
    amount
}

/// Pick a bucket by weight and draw an amount from it
pub fn generate_realistic_amount<R: Rng + ?Sized>(rng: &mut R) -> (f64, AmountBucket) {
    let bucket = AmountBucket::ALL
        .choose_weighted(rng, |b| b.weight())
        .copied()
        .unwrap_or(AmountBucket::Small);
    (amount_in_bucket(rng, bucket), bucket)
}

/// Ground-truth fraud label, independent of any model
pub fn sample_ground_truth<R: Rng + ?Sized>(rng: &mut R, bucket: AmountBucket) -> bool {
    rng.gen_bool(bucket.fraud_probability())
}

/// `V1`..`V28` values of one reference row
pub type FeatureRow = [f64; V_FEATURE_COUNT];

/// Rows of the credit-card reference dataset
#[derive(Debug, Clone)]
pub struct ReferenceDataset {
    rows: Vec<FeatureRow>,
}

impl ReferenceDataset {
    /// Load the dataset from a CSV file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = std::fs::File::open(path)
            .with_context(|| format!("Failed to open dataset {}", path.display()))?;
        let dataset = Self::from_reader(file)
            .with_context(|| format!("Failed to load dataset {}", path.display()))?;

        info!(path = %path.display(), rows = dataset.len(), "Reference dataset loaded");
        Ok(dataset)
    }

    /// Parse CSV with a header containing `Time`, `Amount`, `Class` and
    /// `V1`..`V28`. Rows with a non-positive amount are dropped.
    pub fn from_reader<R: io::Read>(reader: R) -> Result<Self> {
        let mut csv = csv::Reader::from_reader(reader);
        let headers = csv.headers()?.clone();
        let column = |name: &str| headers.iter().position(|h| h.trim() == name);

        let v_names: Vec<String> = (1..=V_FEATURE_COUNT).map(v_feature_name).collect();
        let mut required: Vec<&str> = vec!["Time", "Amount", "Class"];
        required.extend(v_names.iter().map(String::as_str));

        let missing: Vec<&str> = required
            .iter()
            .copied()
            .filter(|name| column(*name).is_none())
            .collect();
        if !missing.is_empty() {
            anyhow::bail!("Missing required columns: {}", missing.join(", "));
        }

        let amount_idx = column("Amount").context("Amount column")?;
        let v_idx: Vec<usize> = v_names.iter().filter_map(|n| column(n.as_str())).collect();

        let mut rows = Vec::new();
        for (line, record) in csv.records().enumerate() {
            let record = record?;
            let parse = |idx: usize| -> Result<f64> {
                let raw = record.get(idx).unwrap_or("").trim();
                raw.parse::<f64>()
                    .with_context(|| format!("row {}: invalid number '{}'", line + 1, raw))
            };

            if parse(amount_idx)? <= 0.0 {
                continue;
            }

            let mut row = [0.0; V_FEATURE_COUNT];
            for (slot, &idx) in row.iter_mut().zip(&v_idx) {
                *slot = parse(idx)?;
            }
            rows.push(row);
        }

        if rows.is_empty() {
            anyhow::bail!("dataset has no rows with a positive amount");
        }
        Ok(Self { rows })
    }

    pub fn from_rows(rows: Vec<FeatureRow>) -> Self {
        Self { rows }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// A uniformly chosen row
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<&FeatureRow> {
        self.rows.choose(rng)
    }
}

/// Builds synthetic transactions from a reference dataset
pub struct TransactionGenerator {
    dataset: ReferenceDataset,
    v_names: Vec<String>,
}

impl TransactionGenerator {
    pub fn new(dataset: ReferenceDataset) -> Self {
        Self {
            dataset,
            v_names: (1..=V_FEATURE_COUNT).map(v_feature_name).collect(),
        }
    }

    pub fn dataset(&self) -> &ReferenceDataset {
        &self.dataset
    }

    /// Generate a transaction stamped with `now`
    pub fn generate<R: Rng + ?Sized>(&self, rng: &mut R, now: NaiveDateTime) -> Transaction {
        let (amount, bucket) = generate_realistic_amount(rng);
        let is_fraud = sample_ground_truth(rng, bucket);

        let mut features: BTreeMap<String, f64> = match self.dataset.sample(rng) {
            Some(row) => self.v_names.iter().cloned().zip(row.iter().copied()).collect(),
            None => BTreeMap::new(),
        };
        features.insert("Time".to_string(), now.hour() as f64);
        features.insert("Amount".to_string(), amount);

        Transaction {
            id: uuid::Uuid::new_v4().to_string(),
            timestamp: now,
            amount,
            is_fraud: u8::from(is_fraud),
            features,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::collections::HashMap;

    fn csv_header() -> String {
        let mut cols = vec!["Time".to_string()];
        cols.extend((1..=28).map(|i| format!("V{i}")));
        cols.push("Amount".to_string());
        cols.push("Class".to_string());
        cols.join(",")
    }

    fn csv_row(time: f64, v_base: f64, amount: f64) -> String {
        let mut vals = vec![time.to_string()];
        vals.extend((1..=28).map(|i| (v_base + i as f64).to_string()));
        vals.push(amount.to_string());
        vals.push("0".to_string());
        vals.join(",")
    }

    #[test]
    fn test_amounts_stay_in_bucket() {
        let mut rng = StdRng::seed_from_u64(7);
        for bucket in AmountBucket::ALL {
            let (min, max) = bucket.range();
            for _ in 0..5_000 {
                let amount = amount_in_bucket(&mut rng, bucket);
                assert!(
                    amount >= min && amount <= max,
                    "{} outside {} [{}, {}]",
                    amount,
                    bucket.name(),
                    min,
                    max
                );
                assert_eq!(amount, round_cents(amount));
            }
        }
    }

    #[test]
    fn test_generate_realistic_amount_matches_bucket() {
        let mut rng = StdRng::seed_from_u64(11);
        let mut counts: HashMap<AmountBucket, usize> = HashMap::new();
        let trials = 20_000;
        for _ in 0..trials {
            let (amount, bucket) = generate_realistic_amount(&mut rng);
            assert!(bucket.contains(amount));
            assert!(amount > 0.0);
            *counts.entry(bucket).or_default() += 1;
        }

        for bucket in AmountBucket::ALL {
            let freq = counts.get(&bucket).copied().unwrap_or(0) as f64 / trials as f64;
            assert!(
                (freq - bucket.weight()).abs() < 0.02,
                "{} chosen {:.3}, expected {}",
                bucket.name(),
                freq,
                bucket.weight()
            );
        }
    }

    #[test]
    fn test_ground_truth_frequency() {
        let mut rng = StdRng::seed_from_u64(42);
        let trials = 20_000;
        for bucket in AmountBucket::ALL {
            let frauds = (0..trials)
                .filter(|_| sample_ground_truth(&mut rng, bucket))
                .count();
            let freq = frauds as f64 / trials as f64;
            assert!(
                (freq - bucket.fraud_probability()).abs() < 0.02,
                "{} fraud rate {:.3}",
                bucket.name(),
                freq
            );
        }
    }

    #[test]
    fn test_dataset_filters_non_positive_amounts() {
        let data = format!(
            "{}\n{}\n{}\n{}\n",
            csv_header(),
            csv_row(0.0, 0.0, 149.62),
            csv_row(1.0, 100.0, 0.0),
            csv_row(2.0, 200.0, 2.69)
        );
        let dataset = ReferenceDataset::from_reader(data.as_bytes()).unwrap();
        assert_eq!(dataset.len(), 2);

        let mut rng = StdRng::seed_from_u64(1);
        let row = dataset.sample(&mut rng).unwrap();
        assert!(row[0] == 1.0 || row[0] == 201.0);
        assert!(row[27] == 28.0 || row[27] == 228.0);
    }

    #[test]
    fn test_dataset_reports_missing_columns() {
        let data = "Time,V1,Amount\n0,1.0,10.0\n";
        let err = ReferenceDataset::from_reader(data.as_bytes()).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("Class"));
        assert!(msg.contains("V28"));
        assert!(!msg.contains("V1,"));
    }

    #[test]
    fn test_dataset_without_usable_rows() {
        let data = format!("{}\n{}\n", csv_header(), csv_row(0.0, 0.0, -5.0));
        assert!(ReferenceDataset::from_reader(data.as_bytes()).is_err());
    }

    #[test]
    fn test_generated_transaction_shape() {
        let dataset = ReferenceDataset::from_rows(vec![[0.5; V_FEATURE_COUNT]]);
        let generator = TransactionGenerator::new(dataset);
        let now = NaiveDate::from_ymd_opt(2024, 3, 14)
            .unwrap()
            .and_hms_opt(17, 45, 3)
            .unwrap();

        let mut rng = StdRng::seed_from_u64(3);
        let tx = generator.generate(&mut rng, now);

        assert_eq!(tx.timestamp, now);
        assert_eq!(tx.features.len(), 30);
        assert_eq!(tx.feature("V1"), Some(0.5));
        assert_eq!(tx.feature("V28"), Some(0.5));
        assert_eq!(tx.feature("Time"), Some(17.0));
        assert_eq!(tx.feature("Amount"), Some(tx.amount));
        assert!(tx.is_fraud <= 1);
        assert!(uuid::Uuid::parse_str(&tx.id).is_ok());

        let other = generator.generate(&mut rng, now);
        assert_ne!(tx.id, other.id);
    }
}
