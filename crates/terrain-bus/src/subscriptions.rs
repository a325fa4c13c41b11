//! Subscription table and local dispatch.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::rc::Rc;

use terrain_protocol::{matches, Packet};

/// Subscriber callback. An `Err` (or a panic) is logged and isolated from
/// the other subscribers.
pub type Handler = dyn Fn(&Packet) -> anyhow::Result<()>;

pub type SubscriptionId = u64;

struct Subscription {
    id: SubscriptionId,
    pattern: String,
    handler: Rc<Handler>,
    once: bool,
}

/// Outcome of dispatching one packet to local subscribers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchReport {
    /// Handlers whose pattern matched.
    pub matched: usize,
    /// Of those, how many failed.
    pub failed: usize,
}

/// Registered (pattern, handler) pairs in registration order.
#[derive(Default)]
pub struct SubscriptionTable {
    next_id: SubscriptionId,
    entries: Vec<Subscription>,
}

impl SubscriptionTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, pattern: &str, handler: Rc<Handler>, once: bool) -> SubscriptionId {
        self.next_id += 1;
        self.entries.push(Subscription {
            id: self.next_id,
            pattern: pattern.to_string(),
            handler,
            once,
        });
        self.next_id
    }

    pub fn remove(&mut self, id: SubscriptionId) -> bool {
        let before = self.entries.len();
        self.entries.retain(|s| s.id != id);
        self.entries.len() != before
    }

    /// Handlers matching `topic`, in registration order. One-shot
    /// subscriptions are removed as they are handed out.
    pub fn take_matching(&mut self, topic: &str) -> Vec<(SubscriptionId, Rc<Handler>)> {
        let matched: Vec<(SubscriptionId, Rc<Handler>, bool)> = self
            .entries
            .iter()
            .filter(|s| matches(topic, &s.pattern))
            .map(|s| (s.id, Rc::clone(&s.handler), s.once))
            .collect();

        if matched.iter().any(|(_, _, once)| *once) {
            self.entries
                .retain(|s| !(s.once && matches(topic, &s.pattern)));
        }

        matched
            .into_iter()
            .map(|(id, handler, _)| (id, handler))
            .collect()
    }

    pub fn patterns(&self) -> Vec<&str> {
        self.entries.iter().map(|s| s.pattern.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

/// Run every handler against `packet`, each inside its own failure boundary.
pub fn invoke_all(handlers: &[(SubscriptionId, Rc<Handler>)], packet: &Packet) -> DispatchReport {
    let mut report = DispatchReport {
        matched: handlers.len(),
        failed: 0,
    };

    for (id, handler) in handlers {
        match catch_unwind(AssertUnwindSafe(|| handler(packet))) {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                report.failed += 1;
                tracing::warn!(
                    subscription = id,
                    topic = %packet.topic,
                    error = %e,
                    "Subscriber failed"
                );
            }
            Err(panic) => {
                report.failed += 1;
                let message = panic
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| panic.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "non-string panic".into());
                tracing::warn!(
                    subscription = id,
                    topic = %packet.topic,
                    panic = %message,
                    "Subscriber panicked"
                );
            }
        }
    }

    report
}
