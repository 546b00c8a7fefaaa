// 📺 Show Entities - Seasons, episodes, and the sharks judging them
//
// Guest status is per episode: the same shark may be a guest in one
// episode and a regular panelist in another.

use super::{Columns, EpisodeKey, FromRecord};
use crate::dataset::Table;
use crate::error::EngineResult;
use crate::table::Record;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Season {
    pub season_id: i64,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

impl FromRecord for Season {
    const TABLE: Table = Table::Season;

    fn from_record(record: &Record) -> EngineResult<Self> {
        let cols = Columns::new(Self::TABLE, record);
        Ok(Season {
            season_id: cols.id("season_id")?,
            start_date: cols.opt_date("start_date"),
            end_date: cols.opt_date("end_date"),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Episode {
    pub season_id: i64,
    pub episode_id: i64,
    pub guest_present: Option<bool>,
    pub air_date: Option<NaiveDate>,
    pub viewership: Option<f64>,
}

impl Episode {
    pub fn key(&self) -> EpisodeKey {
        EpisodeKey {
            season_id: self.season_id,
            episode_id: self.episode_id,
        }
    }
}

impl FromRecord for Episode {
    const TABLE: Table = Table::Episode;

    fn from_record(record: &Record) -> EngineResult<Self> {
        let cols = Columns::new(Self::TABLE, record);
        Ok(Episode {
            season_id: cols.id("season_id")?,
            episode_id: cols.id("episode_id")?,
            guest_present: cols.opt_bool("guest_present"),
            air_date: cols.opt_date("air_date"),
            viewership: cols.opt_f64("viewership"),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Shark {
    pub shark_id: i64,
    pub name: String,
    pub gender: Option<String>,
    pub age: Option<i64>,
    pub occupation: Option<String>,
    /// Default guest status, used when a Judge row does not say
    pub is_guest: bool,
}

impl FromRecord for Shark {
    const TABLE: Table = Table::Shark;

    fn from_record(record: &Record) -> EngineResult<Self> {
        let cols = Columns::new(Self::TABLE, record);
        Ok(Shark {
            shark_id: cols.id("shark_id")?,
            name: cols.text("shark_name")?,
            gender: cols.opt_text("gender"),
            age: cols.opt_i64("age"),
            occupation: cols.opt_text("occupation"),
            is_guest: cols.opt_bool("is_guest").unwrap_or(false),
        })
    }
}

/// A shark sitting on the panel of one episode
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Judge {
    pub season_id: i64,
    pub episode_id: i64,
    pub shark_id: i64,
    pub is_guest: Option<bool>,
}

impl Judge {
    pub fn episode(&self) -> EpisodeKey {
        EpisodeKey {
            season_id: self.season_id,
            episode_id: self.episode_id,
        }
    }

    /// Guest status for this episode, falling back to the shark's default
    pub fn guest_for_episode(&self, shark: Option<&Shark>) -> bool {
        self.is_guest
            .unwrap_or_else(|| shark.map(|s| s.is_guest).unwrap_or(false))
    }
}

impl FromRecord for Judge {
    const TABLE: Table = Table::Judge;

    fn from_record(record: &Record) -> EngineResult<Self> {
        let cols = Columns::new(Self::TABLE, record);
        Ok(Judge {
            season_id: cols.id("season_id")?,
            episode_id: cols.id("episode_id")?,
            shark_id: cols.id("shark_id")?,
            is_guest: cols.opt_bool("is_guest"),
        })
    }
}
