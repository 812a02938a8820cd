//! Routing keys
//!
//! A routing key pairs a message source with a message target. Its dotted
//! six-token form, e.g. `SIG.001.002.MPU.*.*`, is both the human-readable
//! form and the topic string handed to the transport.
//!
//! - `PublicationRoutingKey` - definite source, filtered target
//! - `SubscriptionRoutingKey` - filtered source, filtered target
//!
//! Subscribers use [`RoutingKey::matches`] to decide delivery on top of
//! whatever topic matching the transport itself performs.

use crate::equipment::{EquipmentFilter, EquipmentIdentifier, EquipmentSpec};
use crate::{Error, Result};
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

static ROUTING_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(?:[A-Z]+|\*)\.(?:[0-9]+|\*)\.(?:[0-9]+|\*)\.(?:[A-Z]+|\*)\.(?:[0-9]+|\*)\.(?:[0-9]+|\*)$",
    )
    .unwrap()
});

/// A (source, target) pair of equipment coordinates
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RoutingKey<S> {
    source: S,
    target: EquipmentFilter,
}

/// Routing key for a publisher, whose source is always definite
pub type PublicationRoutingKey = RoutingKey<EquipmentIdentifier>;

/// Routing key for a subscriber, whose source may be a filter
pub type SubscriptionRoutingKey = RoutingKey<EquipmentFilter>;

impl<S> RoutingKey<S> {
    /// Create a new routing key
    pub fn new(source: S, target: EquipmentFilter) -> Self {
        Self { source, target }
    }

    /// Structural check of a routing string
    ///
    /// Six dot-separated tokens: an upper-case type token or `*`, then two
    /// numeric-or-`*` tokens, twice. Whether a type token names a known
    /// equipment type is left to parsing.
    pub fn is_valid(routing: &str) -> bool {
        ROUTING_PATTERN.is_match(routing)
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn target(&self) -> &EquipmentFilter {
        &self.target
    }
}

impl<S: EquipmentSpec> RoutingKey<S> {
    /// Check this key against a subscription, source and target independently
    pub fn matches(&self, subscription: &SubscriptionRoutingKey) -> bool {
        self.source.matches(&subscription.source) && self.target.matches(&subscription.target)
    }
}

impl SubscriptionRoutingKey {
    /// The subscription that receives everything (`*.*.*.*.*.*`)
    pub fn all() -> Self {
        Self::new(EquipmentFilter::all(), EquipmentFilter::all())
    }
}

impl From<PublicationRoutingKey> for SubscriptionRoutingKey {
    fn from(key: PublicationRoutingKey) -> Self {
        Self::new(key.source.into(), key.target)
    }
}

impl<S> FromStr for RoutingKey<S>
where
    S: FromStr<Err = Error>,
{
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        if !Self::is_valid(s) {
            return Err(Error::Format(format!("invalid routing key {:?}", s)));
        }

        // The pattern guarantees exactly five dots.
        let split = s
            .match_indices('.')
            .nth(2)
            .map(|(i, _)| i)
            .ok_or_else(|| Error::Format(format!("invalid routing key {:?}", s)))?;

        Ok(Self {
            source: s[..split].parse()?,
            target: s[split + 1..].parse()?,
        })
    }
}

impl<S: fmt::Display> fmt::Display for RoutingKey<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.source, self.target)
    }
}

impl<S: fmt::Display> Serialize for RoutingKey<S> {
    fn serialize<Z: Serializer>(&self, serializer: Z) -> std::result::Result<Z::Ok, Z::Error> {
        serializer.collect_str(self)
    }
}

impl<'de, S> Deserialize<'de> for RoutingKey<S>
where
    S: FromStr<Err = Error>,
{
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
