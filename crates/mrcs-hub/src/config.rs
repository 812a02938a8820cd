//! Hub Configuration - operation mode and local identity
//!
//! A hub process is configured with the mode it runs in, the identity of
//! the equipment it speaks for, and whether that equipment should hear its
//! own messages. Configuration is written in RON:
//!
//! ```ron
//! (
//!     mode: LIVE,
//!     identity: "SCH.*.001",
//!     deliver_to_self: false,
//! )
//! ```

use crate::error::Result;
use crate::exchange::Exchange;
use mrcs_core::{EquipmentIdentifier, OperationMode};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Configuration for a hub process
///
/// # Example
///
/// ```
/// use mrcs_hub::HubConfig;
/// use mrcs_core::OperationMode;
///
/// let config = HubConfig::from_ron_str(r#"(mode: LIVE, identity: "SIG.001.002")"#).unwrap();
/// assert_eq!(config.mode, OperationMode::Live);
/// assert_eq!(config.identity.to_string(), "SIG.001.002");
/// assert!(!config.deliver_to_self);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HubConfig {
    /// Which exchange and database to use
    #[serde(default)]
    pub mode: OperationMode,

    /// The equipment this process speaks for
    pub identity: EquipmentIdentifier,

    /// Deliver messages whose source is `identity` back to it
    #[serde(default)]
    pub deliver_to_self: bool,
}

impl HubConfig {
    /// Create a test-mode configuration for `identity`
    pub fn new(identity: EquipmentIdentifier) -> Self {
        Self {
            mode: OperationMode::default(),
            identity,
            deliver_to_self: false,
        }
    }

    /// Parse a configuration from RON text
    pub fn from_ron_str(content: &str) -> Result<Self> {
        Ok(ron::from_str(content)?)
    }

    /// Load a configuration from a RON file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_ron_str(&content)
    }

    /// Create the exchange this configuration describes
    pub fn exchange(&self) -> Exchange {
        Exchange::new(self.mode.exchange_name()).deliver_to_self(self.deliver_to_self)
    }
}
