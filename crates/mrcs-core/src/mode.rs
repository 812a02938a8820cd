//! Operation modes
//!
//! A process runs against either the test or the live broker exchange and
//! database. The mode is a plain value handed to whatever needs it.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Which set of services a process talks to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum OperationMode {
    #[default]
    Test,
    Live,
}

impl OperationMode {
    /// Name of the message exchange for this mode
    pub fn exchange_name(&self) -> &'static str {
        match self {
            OperationMode::Test => "mrcs.test",
            OperationMode::Live => "mrcs.live",
        }
    }

    /// Name of the database for this mode
    pub fn db_name(&self) -> &'static str {
        match self {
            OperationMode::Test => "mrcs_test",
            OperationMode::Live => "mrcs_live",
        }
    }
}

impl FromStr for OperationMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_uppercase().as_str() {
            "TEST" => Ok(OperationMode::Test),
            "LIVE" => Ok(OperationMode::Live),
            _ => Err(Error::InvalidArgument(format!("unknown operation mode {:?}", s))),
        }
    }
}

impl fmt::Display for OperationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OperationMode::Test => f.write_str("TEST"),
            OperationMode::Live => f.write_str("LIVE"),
        }
    }
}
