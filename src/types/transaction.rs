//! Transaction data structures exchanged through the file store

use chrono::{NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Number of anonymised `V` features carried by every transaction
pub const V_FEATURE_COUNT: usize = 28;

/// A synthetic card transaction as written by the producer, one per file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    /// Unique identifier, also the filename and dedup key
    pub id: String,

    /// Local wall-clock creation time
    #[serde(with = "iso_timestamp")]
    pub timestamp: NaiveDateTime,

    /// Positive amount with two decimal places
    pub amount: f64,

    /// Ground-truth label assigned at generation time (0 or 1)
    #[serde(deserialize_with = "flag::deserialize")]
    pub is_fraud: u8,

    /// Named feature slots: `V1`..`V28`, `Time` and `Amount`
    #[serde(default)]
    pub features: BTreeMap<String, f64>,
}

impl Transaction {
    /// Hour of day the transaction was created
    pub fn hour(&self) -> u32 {
        self.timestamp.hour()
    }

    /// Ground-truth label as a boolean
    pub fn ground_truth(&self) -> bool {
        self.is_fraud == 1
    }

    /// Look up a named feature slot
    pub fn feature(&self, name: &str) -> Option<f64> {
        self.features.get(name).copied()
    }
}

/// Feature slot name for the 1-based index `i` (`V1`..`V28`)
pub fn v_feature_name(i: usize) -> String {
    format!("V{}", i)
}

/// A transaction after it went through the classifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredTransaction {
    pub id: String,

    #[serde(with = "iso_timestamp")]
    pub timestamp: NaiveDateTime,

    pub amount: f64,

    /// Classifier output in [0, 1]
    pub prediction: f64,

    /// Final decision: ground truth OR prediction above threshold
    pub is_fraud: bool,

    /// Label the producer assigned
    pub ground_truth: bool,
}

impl ScoredTransaction {
    pub fn new(tx: &Transaction, prediction: f64, is_fraud: bool) -> Self {
        Self {
            id: tx.id.clone(),
            timestamp: tx.timestamp,
            amount: tx.amount,
            prediction,
            is_fraud,
            ground_truth: tx.ground_truth(),
        }
    }

    /// First 8 characters of the id, for tables and log lines
    pub fn short_id(&self) -> String {
        short_id(&self.id)
    }
}

pub fn short_id(id: &str) -> String {
    id.chars().take(8).collect()
}

/// ISO-8601 timestamps without offset, as written by the producer.
/// RFC 3339 strings with an offset are accepted and kept as their wall time.
pub mod iso_timestamp {
    use chrono::{DateTime, NaiveDateTime};
    use serde::{de, Deserialize, Deserializer, Serializer};

    const FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.6f";

    pub fn serialize<S: Serializer>(ts: &NaiveDateTime, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&ts.format(FORMAT).to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<NaiveDateTime, D::Error> {
        let raw = String::deserialize(d)?;
        parse(&raw).ok_or_else(|| de::Error::custom(format!("invalid timestamp '{}'", raw)))
    }

    pub fn parse(raw: &str) -> Option<NaiveDateTime> {
        raw.parse::<NaiveDateTime>()
            .ok()
            .or_else(|| DateTime::parse_from_rfc3339(raw).ok().map(|dt| dt.naive_local()))
    }
}

/// 0/1 flags; `true`/`false` are accepted too.
mod flag {
    use serde::{de, Deserialize, Deserializer};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Int(i64),
        Bool(bool),
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<u8, D::Error> {
        match Raw::deserialize(d)? {
            Raw::Int(0) | Raw::Bool(false) => Ok(0),
            Raw::Int(1) | Raw::Bool(true) => Ok(1),
            Raw::Int(other) => Err(de::Error::custom(format!(
                "is_fraud must be 0 or 1, got {}",
                other
            ))),
        }
    }
}
