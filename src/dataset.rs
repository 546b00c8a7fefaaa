// 🗂️ Dataset Access - Read-only boundary over the 11 tables
//
// The engine never owns the data. Each invocation fetches the tables it
// needs exactly once through a DatasetSource and works on that Snapshot.

use crate::entities::{
    decode_all, Ask, Company, Contribute, Entrepreneur, Episode, FromRecord, Industry,
    Investment, Judge, Own, Season, Shark,
};
use crate::error::{EngineError, EngineResult};
use crate::table::{Record, Scalar, TabularResult};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use tracing::debug;

// ============================================================================
// TABLES
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Table {
    Industry,
    Season,
    Shark,
    Entrepreneur,
    Episode,
    Company,
    Ask,
    Investment,
    Contribute,
    Own,
    Judge,
}

impl Table {
    pub const ALL: [Table; 11] = [
        Table::Industry,
        Table::Season,
        Table::Shark,
        Table::Entrepreneur,
        Table::Episode,
        Table::Company,
        Table::Ask,
        Table::Investment,
        Table::Contribute,
        Table::Own,
        Table::Judge,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Table::Industry => "Industry",
            Table::Season => "Season",
            Table::Shark => "Shark",
            Table::Entrepreneur => "Entrepreneur",
            Table::Episode => "Episode",
            Table::Company => "Company",
            Table::Ask => "Ask",
            Table::Investment => "Investment",
            Table::Contribute => "Contribute",
            Table::Own => "Own",
            Table::Judge => "Judge",
        }
    }

    /// Column layout, in storage order
    pub fn columns(&self) -> &'static [&'static str] {
        match self {
            Table::Industry => &["industry_name", "market_size", "growth_rate"],
            Table::Season => &["season_id", "start_date", "end_date"],
            Table::Shark => &["shark_id", "shark_name", "gender", "age", "occupation", "is_guest"],
            Table::Entrepreneur => &[
                "entrepreneur_id",
                "entrepreneur_name",
                "gender",
                "location_city",
                "location_state",
            ],
            Table::Episode => &["episode_id", "season_id", "guest_present", "air_date", "viewership"],
            Table::Company => &[
                "company_id",
                "company_name",
                "business_description",
                "company_website",
                "industry_name",
            ],
            Table::Ask => &["episode_id", "season_id", "company_id", "equity_amount", "equity_share"],
            Table::Investment => &[
                "investment_id",
                "episode_id",
                "season_id",
                "company_id",
                "equity_amount",
                "equity_share",
                "loan",
                "advisory_shares_equity",
                "has_conditions",
                "involve_royalty",
                "accepted",
            ],
            Table::Contribute => &["investment_id", "shark_id", "equity_amount", "equity_share"],
            Table::Own => &["company_id", "entrepreneur_id", "ownership_share"],
            Table::Judge => &["episode_id", "season_id", "shark_id", "is_guest"],
        }
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Table {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Table::ALL
            .iter()
            .copied()
            .find(|t| t.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| EngineError::data_unavailable(s, "unknown table"))
    }
}

// ============================================================================
// RECORD FILTER (optional equality conditions on fetch)
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordFilter {
    conditions: Vec<(String, Scalar)>,
}

impl RecordFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn where_eq(mut self, column: impl Into<String>, value: impl Into<Scalar>) -> Self {
        self.conditions.push((column.into(), value.into()));
        self
    }

    pub fn conditions(&self) -> &[(String, Scalar)] {
        &self.conditions
    }

    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    /// Every condition must name a column of `table`
    pub fn validate(&self, table: Table) -> EngineResult<()> {
        for (column, _) in &self.conditions {
            if !table.columns().contains(&column.as_str()) {
                return Err(EngineError::invalid_filter(
                    column.clone(),
                    format!("table {} has no such column", table),
                ));
            }
        }
        Ok(())
    }

    /// Loose equality: numbers compare numerically, text case-insensitively
    pub fn matches(&self, record: &Record) -> bool {
        self.conditions.iter().all(|(column, expected)| {
            let actual = record.get(column).unwrap_or(&Scalar::Null);
            match (actual.as_f64(), expected.as_f64()) {
                (Some(a), Some(b)) => (a - b).abs() < f64::EPSILON,
                _ => match (actual.as_text(), expected.as_text()) {
                    (Some(a), Some(b)) => a.eq_ignore_ascii_case(&b),
                    (None, None) => true,
                    _ => false,
                },
            }
        })
    }
}

// ============================================================================
// DATASET SOURCE
// ============================================================================

/// Read-only access to the dataset. Implementations must be safe to share
/// between concurrent invocations.
pub trait DatasetSource: Send + Sync {
    fn fetch_table(&self, table: Table, filter: Option<&RecordFilter>) -> EngineResult<Vec<Record>>;
}

/// In-memory dataset (CSV-loaded or built by hand)
#[derive(Debug, Clone)]
pub struct MemoryDataset {
    tables: HashMap<Table, Vec<Record>>,
}

impl MemoryDataset {
    /// Dataset with all 11 tables present and empty
    pub fn new() -> Self {
        MemoryDataset {
            tables: Table::ALL.iter().map(|t| (*t, Vec::new())).collect(),
        }
    }

    /// Dataset with no tables at all; every fetch is DataUnavailable
    pub fn empty() -> Self {
        MemoryDataset {
            tables: HashMap::new(),
        }
    }

    pub fn insert_table(&mut self, table: Table, records: Vec<Record>) {
        self.tables.insert(table, records);
    }

    pub fn remove_table(&mut self, table: Table) {
        self.tables.remove(&table);
    }

    /// Append one record given as (column, value) pairs
    pub fn push(&mut self, table: Table, pairs: &[(&str, Scalar)]) {
        let record: Record = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect();
        self.tables.entry(table).or_default().push(record);
    }

    pub fn row_count(&self, table: Table) -> usize {
        self.tables.get(&table).map(|r| r.len()).unwrap_or(0)
    }

    /// Load `<Table>.csv` files from a directory; missing files leave the table absent
    pub fn from_csv_dir(dir: &Path) -> Result<Self> {
        let mut dataset = MemoryDataset::empty();

        for table in Table::ALL {
            let path = dir.join(format!("{}.csv", table.as_str()));
            if !path.exists() {
                debug!(table = %table, "no CSV file, table left unavailable");
                continue;
            }
            let records = load_csv_records(&path)
                .with_context(|| format!("Failed to load {} from {:?}", table, path))?;
            dataset.insert_table(table, records);
        }

        Ok(dataset)
    }
}

impl Default for MemoryDataset {
    fn default() -> Self {
        Self::new()
    }
}

impl DatasetSource for MemoryDataset {
    fn fetch_table(&self, table: Table, filter: Option<&RecordFilter>) -> EngineResult<Vec<Record>> {
        let records = self
            .tables
            .get(&table)
            .ok_or_else(|| EngineError::data_unavailable(table.as_str(), "table not loaded"))?;

        match filter {
            Some(f) if !f.is_empty() => {
                f.validate(table)?;
                Ok(records.iter().filter(|r| f.matches(r)).cloned().collect())
            }
            _ => Ok(records.clone()),
        }
    }
}

/// Read a headered CSV file into records, inferring scalar types per cell
pub fn load_csv_records(path: &Path) -> Result<Vec<Record>> {
    let mut rdr = csv::Reader::from_path(path).context("Failed to open CSV file")?;
    let headers: Vec<String> = rdr
        .headers()
        .context("Failed to read CSV header")?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();

    let mut records = Vec::new();
    for result in rdr.records() {
        let row = result.context("Failed to read CSV row")?;
        let record: Record = headers
            .iter()
            .cloned()
            .zip(row.iter().map(Scalar::infer))
            .collect();
        records.push(record);
    }

    Ok(records)
}

/// Raw table as a tabular result, columns in storage order
pub fn table_result(table: Table, records: &[Record]) -> TabularResult {
    let mut result = TabularResult::new(table.columns());
    for record in records {
        result.push_row(
            table
                .columns()
                .iter()
                .map(|c| record.get(*c).cloned().unwrap_or_default())
                .collect(),
        );
    }
    result
}

// ============================================================================
// SNAPSHOT
// ============================================================================

/// Typed, immutable working copy of the tables one invocation needs.
/// Tables that were not requested stay empty.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    pub industries: Vec<Industry>,
    pub seasons: Vec<Season>,
    pub sharks: Vec<Shark>,
    pub entrepreneurs: Vec<Entrepreneur>,
    pub episodes: Vec<Episode>,
    pub companies: Vec<Company>,
    pub asks: Vec<Ask>,
    pub investments: Vec<Investment>,
    pub contributions: Vec<Contribute>,
    pub ownership: Vec<Own>,
    pub judges: Vec<Judge>,
}

impl Snapshot {
    /// Fetch each listed table once and decode it
    pub fn fetch<S: DatasetSource + ?Sized>(source: &S, tables: &[Table]) -> EngineResult<Self> {
        let mut snapshot = Snapshot::default();

        for &table in tables {
            let records = source.fetch_table(table, None)?;
            debug!(table = %table, rows = records.len(), "fetched table");

            match table {
                Table::Industry => snapshot.industries = decode(&records)?,
                Table::Season => snapshot.seasons = decode(&records)?,
                Table::Shark => snapshot.sharks = decode(&records)?,
                Table::Entrepreneur => snapshot.entrepreneurs = decode(&records)?,
                Table::Episode => snapshot.episodes = decode(&records)?,
                Table::Company => snapshot.companies = decode(&records)?,
                Table::Ask => snapshot.asks = decode(&records)?,
                Table::Investment => snapshot.investments = decode(&records)?,
                Table::Contribute => snapshot.contributions = decode(&records)?,
                Table::Own => snapshot.ownership = decode(&records)?,
                Table::Judge => snapshot.judges = decode(&records)?,
            }
        }

        Ok(snapshot)
    }

    pub fn shark_names(&self) -> HashMap<i64, &str> {
        self.sharks
            .iter()
            .map(|s| (s.shark_id, s.name.as_str()))
            .collect()
    }

    pub fn companies_by_id(&self) -> HashMap<i64, &Company> {
        self.companies.iter().map(|c| (c.company_id, c)).collect()
    }

    pub fn investments_by_id(&self) -> HashMap<i64, &Investment> {
        self.investments
            .iter()
            .map(|i| (i.investment_id, i))
            .collect()
    }
}

fn decode<T: FromRecord>(records: &[Record]) -> EngineResult<Vec<T>> {
    decode_all(records)
}
