// Entity Models - Typed views over the 11 dataset tables
//
// Every entity is an immutable fact supplied by the dataset access layer.
// Each one:
// - Knows which table it is decoded from
// - Decodes itself from a Record, failing with DataUnavailable on malformed rows
// - Exposes the composite keys the analytics joins on

pub mod deal;
pub mod show;
pub mod venture;

pub use deal::{Ask, Contribute, Investment};
pub use show::{Episode, Judge, Season, Shark};
pub use venture::{Company, Entrepreneur, Industry, Own};

use crate::dataset::Table;
use crate::error::{EngineError, EngineResult};
use crate::table::{Record, Scalar};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

// ============================================================================
// COMPOSITE KEYS
// ============================================================================

/// Episodes are numbered within a season
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EpisodeKey {
    pub season_id: i64,
    pub episode_id: i64,
}

/// One company's pitch in one episode (shared by Ask and Investment)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PitchKey {
    pub season_id: i64,
    pub episode_id: i64,
    pub company_id: i64,
}

impl PitchKey {
    pub fn episode(&self) -> EpisodeKey {
        EpisodeKey {
            season_id: self.season_id,
            episode_id: self.episode_id,
        }
    }
}

// ============================================================================
// RECORD DECODING
// ============================================================================

/// Decode a typed entity from one dataset record
pub trait FromRecord: Sized {
    const TABLE: Table;

    fn from_record(record: &Record) -> EngineResult<Self>;
}

/// Column accessors used by the FromRecord impls
pub(crate) struct Columns<'a> {
    table: Table,
    record: &'a Record,
}

impl<'a> Columns<'a> {
    pub(crate) fn new(table: Table, record: &'a Record) -> Self {
        Columns { table, record }
    }

    fn malformed(&self, column: &str, expected: &str) -> EngineError {
        EngineError::data_unavailable(
            self.table.as_str(),
            format!("column '{}' is missing or not {}", column, expected),
        )
    }

    pub(crate) fn id(&self, column: &str) -> EngineResult<i64> {
        self.record
            .get(column)
            .and_then(|v| v.as_i64())
            .ok_or_else(|| self.malformed(column, "an integer id"))
    }

    pub(crate) fn text(&self, column: &str) -> EngineResult<String> {
        self.opt_text(column)
            .ok_or_else(|| self.malformed(column, "text"))
    }

    pub(crate) fn opt_text(&self, column: &str) -> Option<String> {
        self.record
            .get(column)
            .and_then(|v| v.as_text())
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
    }

    pub(crate) fn opt_f64(&self, column: &str) -> Option<f64> {
        self.record.get(column).and_then(|v| v.as_f64())
    }

    pub(crate) fn opt_i64(&self, column: &str) -> Option<i64> {
        self.record.get(column).and_then(|v| v.as_i64())
    }

    pub(crate) fn opt_bool(&self, column: &str) -> Option<bool> {
        self.record.get(column).and_then(|v| v.as_bool())
    }

    /// Empty or null is None; any other value must read as a boolean
    pub(crate) fn flag(&self, column: &str) -> EngineResult<Option<bool>> {
        match self.record.get(column) {
            None | Some(Scalar::Null) => Ok(None),
            Some(Scalar::Text(s)) if s.trim().is_empty() => Ok(None),
            Some(v) => v
                .as_bool()
                .map(Some)
                .ok_or_else(|| self.malformed(column, "a boolean")),
        }
    }

    /// Dates are YYYY-MM-DD; anything else decodes to None
    pub(crate) fn opt_date(&self, column: &str) -> Option<NaiveDate> {
        self.opt_text(column)
            .and_then(|s| NaiveDate::parse_from_str(&s, "%Y-%m-%d").ok())
    }
}

/// Decode every record of a table, failing on the first malformed row
pub fn decode_all<T: FromRecord>(records: &[Record]) -> EngineResult<Vec<T>> {
    records.iter().map(T::from_record).collect()
}
