// 🏢 Venture Entities - Industries, companies, and the people who own them

use super::{Columns, FromRecord};
use crate::dataset::Table;
use crate::error::EngineResult;
use crate::table::Record;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Industry {
    pub name: String,
    pub market_size: Option<f64>,
    pub growth_rate: Option<f64>,
}

impl FromRecord for Industry {
    const TABLE: Table = Table::Industry;

    fn from_record(record: &Record) -> EngineResult<Self> {
        let cols = Columns::new(Self::TABLE, record);
        Ok(Industry {
            name: cols.text("industry_name")?,
            market_size: cols.opt_f64("market_size"),
            growth_rate: cols.opt_f64("growth_rate"),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Company {
    pub company_id: i64,
    pub name: String,
    pub description: Option<String>,
    pub website: Option<String>,
    /// References Industry by name
    pub industry: Option<String>,
}

impl FromRecord for Company {
    const TABLE: Table = Table::Company;

    fn from_record(record: &Record) -> EngineResult<Self> {
        let cols = Columns::new(Self::TABLE, record);
        Ok(Company {
            company_id: cols.id("company_id")?,
            name: cols.text("company_name")?,
            description: cols.opt_text("business_description"),
            website: cols.opt_text("company_website"),
            industry: cols.opt_text("industry_name"),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entrepreneur {
    pub entrepreneur_id: i64,
    pub name: String,
    pub gender: Option<String>,
    pub location_city: Option<String>,
    pub location_state: Option<String>,
}

impl FromRecord for Entrepreneur {
    const TABLE: Table = Table::Entrepreneur;

    fn from_record(record: &Record) -> EngineResult<Self> {
        let cols = Columns::new(Self::TABLE, record);
        Ok(Entrepreneur {
            entrepreneur_id: cols.id("entrepreneur_id")?,
            name: cols.text("entrepreneur_name")?,
            gender: cols.opt_text("gender"),
            location_city: cols.opt_text("location_city"),
            location_state: cols.opt_text("location_state"),
        })
    }
}

/// Ownership link between an entrepreneur and a company
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Own {
    pub company_id: i64,
    pub entrepreneur_id: i64,
    pub share: Option<f64>,
}

impl FromRecord for Own {
    const TABLE: Table = Table::Own;

    fn from_record(record: &Record) -> EngineResult<Self> {
        let cols = Columns::new(Self::TABLE, record);
        Ok(Own {
            company_id: cols.id("company_id")?,
            entrepreneur_id: cols.id("entrepreneur_id")?,
            share: cols.opt_f64("ownership_share"),
        })
    }
}
