//! Publisher - sends messages on behalf of one piece of equipment

use crate::error::Result;
use crate::exchange::Transport;
use mrcs_core::{new_origin, EquipmentFilter, EquipmentIdentifier, Message, PublicationRoutingKey};
use serde_json::Value;
use tracing::debug;

/// Builds and publishes messages whose source is a fixed identity
///
/// All messages from one publisher share its origin tag.
#[derive(Debug, Clone)]
pub struct Publisher {
    identity: EquipmentIdentifier,
    origin: String,
}

impl Publisher {
    /// Create a publisher with a fresh origin tag
    pub fn new(identity: EquipmentIdentifier) -> Self {
        Self {
            identity,
            origin: new_origin(),
        }
    }

    /// Use a specific origin tag
    pub fn with_origin(mut self, origin: impl Into<String>) -> Self {
        self.origin = origin.into();
        self
    }

    pub fn identity(&self) -> &EquipmentIdentifier {
        &self.identity
    }

    pub fn origin(&self) -> &str {
        &self.origin
    }

    /// Build a message addressed to `target`
    pub fn message(&self, target: impl Into<EquipmentFilter>, body: impl Into<Value>) -> Message {
        let key = PublicationRoutingKey::new(self.identity, target.into());
        Message::new(key, body).with_origin(self.origin.clone())
    }

    /// Build and publish a message; returns the message sent
    pub fn publish<T: Transport + ?Sized>(
        &self,
        transport: &mut T,
        target: impl Into<EquipmentFilter>,
        body: impl Into<Value>,
    ) -> Result<Message> {
        let message = self.message(target, body);
        let delivered = transport.publish(&message)?;
        debug!(routing = %message.routing_key(), delivered, "message sent");
        Ok(message)
    }
}
