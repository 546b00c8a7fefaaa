// 📋 Tabular Results - Shared row/column contract
// Every catalog query returns a TabularResult; every dataset record is a Record.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::io::Write;

// ============================================================================
// SCALAR VALUES
// ============================================================================

/// A single cell value. Serializes to the plain JSON scalar (null, bool, number, string).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(untagged)]
pub enum Scalar {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl Scalar {
    /// Infer a scalar from raw text (CSV cells, query strings).
    /// Empty text is a missing value.
    pub fn infer(raw: &str) -> Scalar {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Scalar::Null;
        }
        if let Ok(i) = trimmed.parse::<i64>() {
            return Scalar::Int(i);
        }
        if let Ok(f) = trimmed.parse::<f64>() {
            if f.is_finite() {
                return Scalar::Float(f);
            }
        }
        Scalar::Text(trimmed.to_string())
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Scalar::Null)
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Scalar::Int(i) => Some(*i),
            Scalar::Float(f) if f.fract() == 0.0 => Some(*f as i64),
            Scalar::Bool(b) => Some(*b as i64),
            Scalar::Text(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Scalar::Int(i) => Some(*i as f64),
            Scalar::Float(f) => Some(*f).filter(|v| v.is_finite()),
            Scalar::Text(s) => s.trim().parse::<f64>().ok().filter(|v| v.is_finite()),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Scalar::Bool(b) => Some(*b),
            Scalar::Int(0) => Some(false),
            Scalar::Int(1) => Some(true),
            // SQLite and spreadsheet exports write flags as 0.0 / 1.0
            Scalar::Float(f) if *f == 0.0 => Some(false),
            Scalar::Float(f) if *f == 1.0 => Some(true),
            Scalar::Text(s) => match s.trim().to_lowercase().as_str() {
                "true" | "yes" | "y" | "1" | "1.0" => Some(true),
                "false" | "no" | "n" | "0" | "0.0" => Some(false),
                _ => None,
            },
            _ => None,
        }
    }

    /// Text view of any non-null scalar (numbers rendered as written)
    pub fn as_text(&self) -> Option<String> {
        match self {
            Scalar::Null => None,
            Scalar::Text(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Null => Ok(()),
            Scalar::Bool(b) => write!(f, "{}", b),
            Scalar::Int(i) => write!(f, "{}", i),
            Scalar::Float(x) => write!(f, "{}", x),
            Scalar::Text(s) => write!(f, "{}", s),
        }
    }
}

impl From<i64> for Scalar {
    fn from(value: i64) -> Self {
        Scalar::Int(value)
    }
}

impl From<usize> for Scalar {
    fn from(value: usize) -> Self {
        Scalar::Int(value as i64)
    }
}

impl From<f64> for Scalar {
    fn from(value: f64) -> Self {
        if value.is_finite() {
            Scalar::Float(value)
        } else {
            Scalar::Null
        }
    }
}

impl From<bool> for Scalar {
    fn from(value: bool) -> Self {
        Scalar::Bool(value)
    }
}

impl From<&str> for Scalar {
    fn from(value: &str) -> Self {
        Scalar::Text(value.to_string())
    }
}

impl From<String> for Scalar {
    fn from(value: String) -> Self {
        Scalar::Text(value)
    }
}

impl<T: Into<Scalar>> From<Option<T>> for Scalar {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(Scalar::Null)
    }
}

/// One dataset record: column name -> scalar
pub type Record = BTreeMap<String, Scalar>;

// ============================================================================
// TABULAR RESULT
// ============================================================================

/// Ordered column list + ordered row sequence
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TabularResult {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Scalar>>,
}

impl TabularResult {
    pub fn new(columns: &[&str]) -> Self {
        TabularResult {
            columns: columns.iter().map(|c| c.to_string()).collect(),
            rows: Vec::new(),
        }
    }

    /// Append a row; cells follow the column order
    pub fn push_row(&mut self, row: Vec<Scalar>) {
        debug_assert_eq!(row.len(), self.columns.len(), "row width must match columns");
        self.rows.push(row);
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Cell at (row, column name)
    pub fn value(&self, row: usize, column: &str) -> Option<&Scalar> {
        let idx = self.column_index(column)?;
        self.rows.get(row).and_then(|r| r.get(idx))
    }

    /// All values of one column, in row order
    pub fn column(&self, name: &str) -> Option<Vec<&Scalar>> {
        let idx = self.column_index(name)?;
        Some(self.rows.iter().filter_map(|r| r.get(idx)).collect())
    }

    /// First row whose `column` equals `value`
    pub fn find_row(&self, column: &str, value: &Scalar) -> Option<&[Scalar]> {
        let idx = self.column_index(column)?;
        self.rows
            .iter()
            .find(|r| r.get(idx) == Some(value))
            .map(|r| r.as_slice())
    }

    /// Row-oriented view for consumers that want records
    pub fn to_records(&self) -> Vec<Record> {
        self.rows
            .iter()
            .map(|row| {
                self.columns
                    .iter()
                    .cloned()
                    .zip(row.iter().cloned())
                    .collect()
            })
            .collect()
    }

    /// Export as CSV (header + rows)
    pub fn write_csv<W: Write>(&self, writer: W) -> csv::Result<()> {
        let mut wtr = csv::Writer::from_writer(writer);
        wtr.write_record(&self.columns)?;
        for row in &self.rows {
            wtr.write_record(row.iter().map(|cell| cell.to_string()))?;
        }
        wtr.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scalar_inference() {
        assert_eq!(Scalar::infer(""), Scalar::Null);
        assert_eq!(Scalar::infer("  "), Scalar::Null);
        assert_eq!(Scalar::infer("42"), Scalar::Int(42));
        assert_eq!(Scalar::infer("0.25"), Scalar::Float(0.25));
        assert_eq!(Scalar::infer("Food and Beverage"), Scalar::Text("Food and Beverage".to_string()));
    }

    #[test]
    fn test_scalar_conversions() {
        assert_eq!(Scalar::Text("yes".to_string()).as_bool(), Some(true));
        assert_eq!(Scalar::Int(0).as_bool(), Some(false));
        assert_eq!(Scalar::Float(3.0).as_i64(), Some(3));
        assert_eq!(Scalar::Float(3.5).as_i64(), None);
        assert_eq!(Scalar::Int(7).as_f64(), Some(7.0));
        assert_eq!(Scalar::Int(7).as_text(), Some("7".to_string()));
        assert_eq!(Scalar::from(f64::NAN), Scalar::Null);
        assert_eq!(Scalar::from(None::<f64>), Scalar::Null);
    }

    #[test]
    fn test_float_flags_decode_as_booleans() {
        assert_eq!(Scalar::Float(0.0).as_bool(), Some(false));
        assert_eq!(Scalar::Float(1.0).as_bool(), Some(true));
        assert_eq!(Scalar::infer("0.0").as_bool(), Some(false));
        assert_eq!(Scalar::Text("1.0".to_string()).as_bool(), Some(true));
        assert_eq!(Scalar::Float(0.5).as_bool(), None);
        assert_eq!(Scalar::Text("maybe".to_string()).as_bool(), None);
    }

    #[test]
    fn test_non_finite_numbers_are_not_numeric() {
        assert_eq!(Scalar::infer("NaN").as_f64(), None);
        assert_eq!(Scalar::infer("inf").as_f64(), None);
        assert_eq!(Scalar::Text("-Infinity".to_string()).as_f64(), None);
        assert_eq!(Scalar::Float(f64::NAN).as_f64(), None);
        assert_eq!(Scalar::Float(f64::INFINITY).as_f64(), None);
        assert_eq!(Scalar::Text(" 2.5 ".to_string()).as_f64(), Some(2.5));
    }

    #[test]
    fn test_scalar_serializes_as_plain_json() {
        let row = vec![Scalar::Null, Scalar::Int(3), Scalar::Float(0.4), Scalar::from("Mark")];
        let json = serde_json::to_string(&row).unwrap();
        assert_eq!(json, r#"[null,3,0.4,"Mark"]"#);
    }

    #[test]
    fn test_tabular_result_access() {
        let mut result = TabularResult::new(&["shark", "deals"]);
        result.push_row(vec!["Mark".into(), Scalar::Int(4)]);
        result.push_row(vec!["Lori".into(), Scalar::Int(2)]);

        assert_eq!(result.len(), 2);
        assert_eq!(result.value(1, "deals"), Some(&Scalar::Int(2)));
        assert_eq!(result.value(0, "missing"), None);
        assert_eq!(result.column("shark").unwrap().len(), 2);

        let row = result.find_row("shark", &"Lori".into()).unwrap();
        assert_eq!(row[1], Scalar::Int(2));

        let records = result.to_records();
        assert_eq!(records[0].get("deals"), Some(&Scalar::Int(4)));
    }

    #[test]
    fn test_write_csv() {
        let mut result = TabularResult::new(&["industry", "deal_rate"]);
        result.push_row(vec!["Tech".into(), Scalar::Float(0.5)]);
        result.push_row(vec!["Pets".into(), Scalar::Null]);

        let mut out = Vec::new();
        result.write_csv(&mut out).unwrap();
        let text = String::from_utf8(out).unwrap();

        assert_eq!(text, "industry,deal_rate\nTech,0.5\nPets,\n");
    }
}
