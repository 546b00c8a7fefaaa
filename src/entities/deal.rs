// 🤝 Deal Entities - Asks, finalized investments, and per-shark contributions
//
// An Ask yields at most one Investment; an Investment aggregates Contribute
// rows. Contribute amounts are the basis for per-shark attribution.

use super::{Columns, FromRecord, PitchKey};
use crate::dataset::Table;
use crate::error::EngineResult;
use crate::table::Record;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ask {
    pub season_id: i64,
    pub episode_id: i64,
    pub company_id: i64,
    /// Requested amount
    pub amount: Option<f64>,
    /// Requested equity, in percent
    pub equity_share: Option<f64>,
}

impl Ask {
    pub fn key(&self) -> PitchKey {
        PitchKey {
            season_id: self.season_id,
            episode_id: self.episode_id,
            company_id: self.company_id,
        }
    }
}

impl FromRecord for Ask {
    const TABLE: Table = Table::Ask;

    fn from_record(record: &Record) -> EngineResult<Self> {
        let cols = Columns::new(Self::TABLE, record);
        Ok(Ask {
            season_id: cols.id("season_id")?,
            episode_id: cols.id("episode_id")?,
            company_id: cols.id("company_id")?,
            amount: cols.opt_f64("equity_amount"),
            equity_share: cols.opt_f64("equity_share"),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Investment {
    pub investment_id: i64,
    pub season_id: i64,
    pub episode_id: i64,
    pub company_id: i64,
    /// Final amount
    pub amount: Option<f64>,
    /// Final equity, in percent
    pub equity_share: Option<f64>,
    pub loan: Option<f64>,
    pub advisory_shares_equity: Option<f64>,
    pub has_conditions: Option<bool>,
    pub involve_royalty: Option<bool>,
    pub accepted: bool,
}

impl Investment {
    pub fn key(&self) -> PitchKey {
        PitchKey {
            season_id: self.season_id,
            episode_id: self.episode_id,
            company_id: self.company_id,
        }
    }

    /// Implied valuation: amount / share * 100. None without a positive share.
    pub fn valuation(&self) -> Option<f64> {
        match (self.amount, self.equity_share) {
            (Some(amount), Some(share)) if share > 0.0 => Some(amount / share * 100.0),
            _ => None,
        }
    }
}

impl FromRecord for Investment {
    const TABLE: Table = Table::Investment;

    fn from_record(record: &Record) -> EngineResult<Self> {
        let cols = Columns::new(Self::TABLE, record);
        Ok(Investment {
            investment_id: cols.id("investment_id")?,
            season_id: cols.id("season_id")?,
            episode_id: cols.id("episode_id")?,
            company_id: cols.id("company_id")?,
            amount: cols.opt_f64("equity_amount"),
            equity_share: cols.opt_f64("equity_share"),
            loan: cols.opt_f64("loan"),
            advisory_shares_equity: cols.opt_f64("advisory_shares_equity"),
            has_conditions: cols.opt_bool("has_conditions"),
            involve_royalty: cols.opt_bool("involve_royalty"),
            // A recorded investment is a deal unless flagged otherwise
            accepted: cols.flag("accepted")?.unwrap_or(true),
        })
    }
}

/// One shark's portion of an investment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contribute {
    pub investment_id: i64,
    pub shark_id: i64,
    pub amount: Option<f64>,
    pub equity_share: Option<f64>,
}

impl FromRecord for Contribute {
    const TABLE: Table = Table::Contribute;

    fn from_record(record: &Record) -> EngineResult<Self> {
        let cols = Columns::new(Self::TABLE, record);
        Ok(Contribute {
            investment_id: cols.id("investment_id")?,
            shark_id: cols.id("shark_id")?,
            amount: cols.opt_f64("equity_amount"),
            equity_share: cols.opt_f64("equity_share"),
        })
    }
}
