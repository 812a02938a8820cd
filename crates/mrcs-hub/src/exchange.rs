//! Exchange - in-process topic routing
//!
//! Every subscriber owns one queue on the exchange, named after the
//! exchange and the subscriber's identity (`mrcs.test.SIG.001.002`). A queue
//! carries one or more subscription routing keys; a published message is
//! handed to every queue with at least one matching key, and never twice to
//! the same queue.
//!
//! ```
//! use mrcs_core::{Message, SubscriptionRoutingKey};
//! use mrcs_hub::Exchange;
//! use std::sync::{Arc, Mutex};
//!
//! let mut exchange = Exchange::new("mrcs.test");
//! let seen = Arc::new(Mutex::new(Vec::new()));
//! let sink = seen.clone();
//!
//! let identity = "MPU.001.001".parse().unwrap();
//! let key: SubscriptionRoutingKey = "*.*.*.MPU.*.*".parse().unwrap();
//! exchange
//!     .subscribe(identity, vec![key], move |m: &Message| sink.lock().unwrap().push(m.clone()))
//!     .unwrap();
//!
//! let msg = Message::new("SIG.001.002.MPU.001.001".parse().unwrap(), "hello");
//! assert_eq!(exchange.route(&msg), 1);
//! assert_eq!(seen.lock().unwrap().len(), 1);
//! ```

use crate::error::{Error, Result};
use indexmap::IndexMap;
use mrcs_core::{EquipmentIdentifier, Message, SubscriptionRoutingKey};
use std::fmt;
use tracing::{debug, trace, warn};

/// Callback invoked for each delivered message
pub type Callback = Box<dyn FnMut(&Message) + Send>;

/// Anything messages can be published to
pub trait Transport {
    /// Publish a message; returns the number of queues it reached
    fn publish(&mut self, message: &Message) -> Result<usize>;
}

struct Queue {
    identity: EquipmentIdentifier,
    bindings: Vec<SubscriptionRoutingKey>,
    callback: Callback,
}

impl Queue {
    fn accepts(&self, message: &Message, deliver_to_self: bool) -> bool {
        if !deliver_to_self && *message.routing_key().source() == self.identity {
            return false;
        }
        self.bindings
            .iter()
            .any(|binding| message.routing_key().matches(binding))
    }
}

/// A topic exchange with one queue per subscriber
pub struct Exchange {
    name: String,
    queues: IndexMap<String, Queue>,
    deliver_to_self: bool,
}

impl Exchange {
    /// Create an empty exchange
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            queues: IndexMap::new(),
            deliver_to_self: false,
        }
    }

    /// Deliver messages back to the queue of their source
    pub fn deliver_to_self(mut self, enabled: bool) -> Self {
        self.deliver_to_self = enabled;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The queue name used for `identity`
    pub fn queue_name(&self, identity: &EquipmentIdentifier) -> String {
        format!("{}.{}", self.name, identity)
    }

    /// Declare a queue for `identity`, bound to `keys`
    ///
    /// Returns the queue name.
    pub fn subscribe<F>(
        &mut self,
        identity: EquipmentIdentifier,
        keys: Vec<SubscriptionRoutingKey>,
        callback: F,
    ) -> Result<String>
    where
        F: FnMut(&Message) + Send + 'static,
    {
        if keys.is_empty() {
            return Err(Error::NoRoutingKeys);
        }
        let name = self.queue_name(&identity);
        if self.queues.contains_key(&name) {
            return Err(Error::DuplicateQueue(name));
        }

        let mut bindings: Vec<SubscriptionRoutingKey> = Vec::with_capacity(keys.len());
        for key in keys {
            if !bindings.contains(&key) {
                bindings.push(key);
            }
        }
        debug!(queue = %name, bindings = bindings.len(), "queue declared");

        self.queues.insert(
            name.clone(),
            Queue {
                identity,
                bindings,
                callback: Box::new(callback),
            },
        );
        Ok(name)
    }

    /// Add a binding to an existing queue; returns false if already bound
    pub fn bind(&mut self, queue: &str, key: SubscriptionRoutingKey) -> Result<bool> {
        let q = self
            .queues
            .get_mut(queue)
            .ok_or_else(|| Error::QueueNotFound(queue.to_string()))?;
        if q.bindings.contains(&key) {
            return Ok(false);
        }
        debug!(queue, key = %key, "binding added");
        q.bindings.push(key);
        Ok(true)
    }

    /// Remove a binding from a queue; returns false if it was not bound
    pub fn unbind(&mut self, queue: &str, key: &SubscriptionRoutingKey) -> Result<bool> {
        let q = self
            .queues
            .get_mut(queue)
            .ok_or_else(|| Error::QueueNotFound(queue.to_string()))?;
        let before = q.bindings.len();
        q.bindings.retain(|b| b != key);
        Ok(q.bindings.len() != before)
    }

    /// Delete a queue and all its bindings
    pub fn unsubscribe(&mut self, queue: &str) -> Result<()> {
        self.queues
            .shift_remove(queue)
            .map(|_| debug!(queue, "queue deleted"))
            .ok_or_else(|| Error::QueueNotFound(queue.to_string()))
    }

    /// The bindings of a queue
    pub fn bindings(&self, queue: &str) -> Option<&[SubscriptionRoutingKey]> {
        self.queues.get(queue).map(|q| q.bindings.as_slice())
    }

    /// Declared queue names, in declaration order
    pub fn queues(&self) -> impl Iterator<Item = &str> {
        self.queues.keys().map(String::as_str)
    }

    /// Hand a message to every matching queue; returns how many received it
    pub fn route(&mut self, message: &Message) -> usize {
        let deliver_to_self = self.deliver_to_self;
        let mut delivered = 0;
        for (name, queue) in self.queues.iter_mut() {
            if queue.accepts(message, deliver_to_self) {
                trace!(queue = %name, routing = %message.routing_key(), "deliver");
                (queue.callback)(message);
                delivered += 1;
            }
        }
        debug!(routing = %message.routing_key(), delivered, "published");
        delivered
    }

    /// Route a raw transport delivery
    ///
    /// Deliveries that do not decode are dropped with a warning.
    pub fn deliver(&mut self, topic: &str, payload: &[u8]) -> usize {
        match Message::from_delivery(topic, payload) {
            Ok(message) => self.route(&message),
            Err(err) => {
                warn!(topic, error = %err, "dropping undecodable delivery");
                0
            }
        }
    }
}

impl Transport for Exchange {
    fn publish(&mut self, message: &Message) -> Result<usize> {
        Ok(self.route(message))
    }
}

impl fmt::Debug for Exchange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Exchange")
            .field("name", &self.name)
            .field("queues", &self.queues.keys().collect::<Vec<_>>())
            .field("deliver_to_self", &self.deliver_to_self)
            .finish()
    }
}
