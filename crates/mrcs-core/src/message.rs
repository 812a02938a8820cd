//! Messages on the control bus
//!
//! A message is a publication routing key, a JSON body and an origin tag.
//! On the wire the routing key travels as the topic and the payload carries
//! only the origin and body:
//!
//! ```json
//! {"origin": "1f0c2a9e-47b1", "body": "hello"}
//! ```

use crate::routing::PublicationRoutingKey;
use crate::Result;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::cmp::Ordering;
use std::fmt;

/// Create a short random origin tag, e.g. `1f0c2a9e-47b1`
pub fn new_origin() -> String {
    let n: u64 = rand::random();
    format!("{:08x}-{:04x}", n >> 32, (n >> 16) & 0xffff)
}

/// The transport payload of a message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Payload {
    pub origin: String,
    pub body: Value,
}

/// A message on the bus
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Tag identifying the sending process
    origin: String,
    /// Source and target of the message
    #[serde(rename = "routing")]
    routing_key: PublicationRoutingKey,
    /// Message content
    body: Value,
}

impl Message {
    /// Create a new message with a fresh origin tag
    pub fn new(routing_key: PublicationRoutingKey, body: impl Into<Value>) -> Self {
        Self {
            origin: new_origin(),
            routing_key,
            body: body.into(),
        }
    }

    /// Set the origin tag
    pub fn with_origin(mut self, origin: impl Into<String>) -> Self {
        self.origin = origin.into();
        self
    }

    /// Rebuild a message from a transport delivery
    pub fn from_delivery(topic: &str, payload: &[u8]) -> Result<Self> {
        let routing_key: PublicationRoutingKey = topic.parse()?;
        let payload: Payload = serde_json::from_slice(payload)?;
        Ok(Self {
            origin: payload.origin,
            routing_key,
            body: payload.body,
        })
    }

    /// The topic string for the transport
    pub fn topic(&self) -> String {
        self.routing_key.to_string()
    }

    /// The encoded transport payload
    pub fn payload_bytes(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(&self.payload())?)
    }

    pub fn payload(&self) -> Payload {
        Payload {
            origin: self.origin.clone(),
            body: self.body.clone(),
        }
    }

    pub fn origin(&self) -> &str {
        &self.origin
    }

    pub fn routing_key(&self) -> &PublicationRoutingKey {
        &self.routing_key
    }

    pub fn body(&self) -> &Value {
        &self.body
    }
}

impl Ord for Message {
    fn cmp(&self, other: &Self) -> Ordering {
        self.routing_key
            .cmp(&other.routing_key)
            .then_with(|| self.body.to_string().cmp(&other.body.to_string()))
            .then_with(|| self.origin.cmp(&other.origin))
    }
}

impl PartialOrd for Message {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {} {}", self.origin, self.routing_key, self.body)
    }
}
