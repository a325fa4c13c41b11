//! The per-frame bus.
//!
//! A `Bus` is single-threaded and lives inside one frame. State sits behind
//! `Rc<RefCell<..>>`; borrows are only held long enough to snapshot the
//! handlers or delivery targets, never while a handler runs or a frame is
//! posted to, so handlers may publish or unsubscribe re-entrantly.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use serde_json::Value;
use terrain_protocol::{normalize, NormalizeContext, Packet, PacketType};
use uuid::Uuid;

use crate::error::BusError;
use crate::frame::FrameRef;
use crate::hub::{FanoutPlan, FanoutReport, HubRouter};
use crate::ready::ReadyGate;
use crate::registry::RegistrationOutcome;
use crate::subscriptions::{invoke_all, DispatchReport, Handler, SubscriptionId, SubscriptionTable};

/// Where a bus sits in the frame tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BusMode {
    /// Top-level frame: fans packets out to registered children.
    Hub,
    /// Embedded frame: relays publishes to its parent.
    Leaf,
}

struct BusInner {
    subscriptions: SubscriptionTable,
    gate: ReadyGate<Packet>,
    hub: Option<HubRouter>,
    parent: Option<FrameRef>,
    destroyed: bool,
}

enum Route {
    Parent(FrameRef),
    Children(FanoutPlan),
    Nowhere,
}

/// Pub/sub endpoint for one frame.
#[derive(Clone)]
pub struct Bus {
    identity: String,
    inner: Rc<RefCell<BusInner>>,
}

/// Returned by [`Bus::on`] and [`Bus::once`].
pub struct SubscriptionHandle {
    id: SubscriptionId,
    inner: Weak<RefCell<BusInner>>,
}

impl SubscriptionHandle {
    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    /// Remove the subscription. False if it was already gone.
    pub fn unsubscribe(self) -> bool {
        match self.inner.upgrade() {
            Some(inner) => inner.borrow_mut().subscriptions.remove(self.id),
            None => false,
        }
    }
}

/// Default frame identity: `<prefix>-<uuid>`.
pub fn generate_identity(prefix: &str) -> String {
    format!("{prefix}-{}", Uuid::new_v4().simple())
}

impl Bus {
    /// Bus for the top-level frame.
    pub fn hub(identity: &str) -> Self {
        Self::build(identity, Some(HubRouter::new(identity)), None)
    }

    /// Bus for an embedded frame whose publishes go to `parent`.
    pub fn leaf(identity: &str, parent: FrameRef) -> Self {
        Self::build(identity, None, Some(parent))
    }

    fn build(identity: &str, hub: Option<HubRouter>, parent: Option<FrameRef>) -> Self {
        tracing::debug!(identity = %identity, hub = hub.is_some(), "Bus created");
        Self {
            identity: identity.to_string(),
            inner: Rc::new(RefCell::new(BusInner {
                subscriptions: SubscriptionTable::new(),
                gate: ReadyGate::new(),
                hub,
                parent,
                destroyed: false,
            })),
        }
    }

    pub fn identity(&self) -> &str {
        &self.identity
    }

    pub fn mode(&self) -> BusMode {
        if self.inner.borrow().hub.is_some() {
            BusMode::Hub
        } else {
            BusMode::Leaf
        }
    }

    /// Subscribe `handler` to every topic matching `pattern`.
    pub fn on<F>(&self, pattern: &str, handler: F) -> SubscriptionHandle
    where
        F: Fn(&Packet) -> anyhow::Result<()> + 'static,
    {
        self.subscribe(pattern, Rc::new(handler), false)
    }

    /// Like [`Bus::on`], but the subscription is removed after its first
    /// matching packet.
    pub fn once<F>(&self, pattern: &str, handler: F) -> SubscriptionHandle
    where
        F: Fn(&Packet) -> anyhow::Result<()> + 'static,
    {
        self.subscribe(pattern, Rc::new(handler), true)
    }

    fn subscribe(&self, pattern: &str, handler: Rc<Handler>, once: bool) -> SubscriptionHandle {
        let mut inner = self.inner.borrow_mut();
        let id = if inner.destroyed {
            0
        } else {
            inner.subscriptions.insert(pattern, handler, once)
        };
        SubscriptionHandle {
            id,
            inner: Rc::downgrade(&self.inner),
        }
    }

    pub fn off(&self, id: SubscriptionId) -> bool {
        self.inner.borrow_mut().subscriptions.remove(id)
    }

    pub fn subscription_count(&self) -> usize {
        self.inner.borrow().subscriptions.len()
    }

    /// Dispatch locally, then send outward (held until ready).
    pub fn publish(&self, packet: Packet) -> DispatchReport {
        if self.inner.borrow().destroyed {
            return DispatchReport::default();
        }

        let report = self.dispatch_local(&packet);

        let outbound = self.inner.borrow_mut().gate.submit(packet);
        match outbound {
            Some(packet) => self.transmit(packet),
            None => tracing::trace!(identity = %self.identity, "Queued until ready"),
        }

        report
    }

    /// Build a packet sourced from this frame and publish it.
    pub fn emit(
        &self,
        topic: &str,
        kind: PacketType,
        payload: Value,
    ) -> Result<DispatchReport, BusError> {
        let packet = Packet::new(topic, kind, payload, self.identity.as_str())?;
        Ok(self.publish(packet))
    }

    /// Open the ready gate and transmit everything queued, in publish
    /// order. Returns how many packets were flushed.
    pub fn mark_ready(&self) -> usize {
        let queued = {
            let mut inner = self.inner.borrow_mut();
            if inner.destroyed {
                return 0;
            }
            inner.gate.mark_ready()
        };
        let Some(queued) = queued else {
            return 0;
        };

        let flushed = queued.len();
        tracing::debug!(identity = %self.identity, flushed, "Bus ready");
        for packet in queued {
            self.transmit(packet);
        }
        flushed
    }

    pub fn is_ready(&self) -> bool {
        self.inner.borrow().gate.is_ready()
    }

    /// Packets waiting for [`Bus::mark_ready`].
    pub fn pending(&self) -> usize {
        self.inner.borrow().gate.pending()
    }

    fn transmit(&self, mut packet: Packet) {
        packet.stamp_hop(&self.identity);

        let route = {
            let mut guard = self.inner.borrow_mut();
            let inner = &mut *guard;
            match (inner.hub.as_mut(), inner.parent.as_ref()) {
                (Some(hub), _) => Route::Children(hub.plan(None)),
                (None, Some(parent)) => Route::Parent(Rc::clone(parent)),
                (None, None) => Route::Nowhere,
            }
        };

        match route {
            Route::Parent(parent) => {
                if let Err(e) = parent.post(&packet) {
                    tracing::warn!(
                        identity = %self.identity,
                        topic = %packet.topic,
                        error = %e,
                        "Relay to parent failed"
                    );
                }
            }
            Route::Children(plan) => {
                let report = HubRouter::deliver(&self.identity, plan, &packet);
                tracing::trace!(
                    topic = %packet.topic,
                    delivered = report.delivered.len(),
                    "Hub broadcast"
                );
            }
            Route::Nowhere => {}
        }
    }

    /// Inbound entry point for anything arriving over the frame boundary.
    ///
    /// The message is normalized first; unrecognized shapes are dropped and
    /// `None` is returned. In hub mode a message with a `sender` is routed
    /// to the other children as well as dispatched locally.
    pub fn receive(&self, raw: &Value, sender: Option<&FrameRef>) -> Option<Packet> {
        if self.inner.borrow().destroyed {
            return None;
        }

        let packet = normalize(raw, &NormalizeContext::new(self.identity.as_str()))?;

        match sender {
            Some(sender) if self.mode() == BusMode::Hub => {
                if let Err(e) = self.route_from_child(&packet, sender) {
                    tracing::warn!(identity = %self.identity, error = %e, "Routing failed");
                }
            }
            _ => {
                self.dispatch_local(&packet);
            }
        }

        Some(packet)
    }

    /// [`Bus::receive`] for a serialized message.
    pub fn receive_json(&self, json: &str, sender: Option<&FrameRef>) -> Option<Packet> {
        match serde_json::from_str::<Value>(json) {
            Ok(raw) => self.receive(&raw, sender),
            Err(e) => {
                tracing::trace!(error = %e, "Dropped non-JSON message");
                None
            }
        }
    }

    /// Fan a child's packet out to the other children, then dispatch it
    /// locally.
    pub fn route_from_child(
        &self,
        packet: &Packet,
        sender: &FrameRef,
    ) -> Result<FanoutReport, BusError> {
        let plan = {
            let mut inner = self.inner.borrow_mut();
            if inner.destroyed {
                return Ok(FanoutReport::default());
            }
            let hub = inner
                .hub
                .as_mut()
                .ok_or_else(|| BusError::NotHub(self.identity.clone()))?;
            hub.learn_sender(packet, sender);
            hub.plan(Some(sender))
        };

        let report = HubRouter::deliver(&self.identity, plan, packet);
        self.dispatch_local(packet);
        Ok(report)
    }

    pub fn register_frame(
        &self,
        identity: &str,
        frame: &FrameRef,
    ) -> Result<RegistrationOutcome, BusError> {
        let mut inner = self.inner.borrow_mut();
        let hub = inner
            .hub
            .as_mut()
            .ok_or_else(|| BusError::NotHub(self.identity.clone()))?;
        Ok(hub.register(identity, frame))
    }

    pub fn deregister_frame(&self, identity: &str) -> Result<bool, BusError> {
        let mut inner = self.inner.borrow_mut();
        let hub = inner
            .hub
            .as_mut()
            .ok_or_else(|| BusError::NotHub(self.identity.clone()))?;
        Ok(hub.deregister(identity))
    }

    /// Live child frames (empty for a leaf).
    pub fn registered_frames(&self) -> Vec<String> {
        self.inner
            .borrow()
            .hub
            .as_ref()
            .map(|hub| {
                hub.live_frames()
                    .into_iter()
                    .map(|frame| frame.identity)
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Drop every subscription and queued packet. Later calls are no-ops.
    pub fn destroy(&self) {
        let mut inner = self.inner.borrow_mut();
        if inner.destroyed {
            return;
        }
        inner.destroyed = true;
        inner.subscriptions.clear();
        inner.gate.clear();
        tracing::debug!(identity = %self.identity, "Bus destroyed");
    }

    pub fn is_destroyed(&self) -> bool {
        self.inner.borrow().destroyed
    }

    fn dispatch_local(&self, packet: &Packet) -> DispatchReport {
        let handlers = self
            .inner
            .borrow_mut()
            .subscriptions
            .take_matching(&packet.topic);
        if handlers.is_empty() {
            return DispatchReport::default();
        }
        invoke_all(&handlers, packet)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::MemoryFrame;
    use std::cell::Cell;

    #[test]
    fn test_generate_identity_prefix() {
        let a = generate_identity("panel");
        let b = generate_identity("panel");
        assert!(a.starts_with("panel-"));
        assert_ne!(a, b);
    }

    #[test]
    fn test_mode() {
        let parent: FrameRef = MemoryFrame::new("parent");
        assert_eq!(Bus::hub("terrain").mode(), BusMode::Hub);
        assert_eq!(Bus::leaf("tsm", parent).mode(), BusMode::Leaf);
    }

    #[test]
    fn test_handle_unsubscribe() {
        let bus = Bus::hub("terrain");
        let handle = bus.on("a/#", |_| Ok(()));
        assert_eq!(bus.subscription_count(), 1);
        assert!(handle.unsubscribe());
        assert_eq!(bus.subscription_count(), 0);
    }

    #[test]
    fn test_handler_can_publish_reentrantly() {
        let bus = Bus::hub("terrain");
        let hits = Rc::new(Cell::new(0));

        let inner_bus = bus.clone();
        bus.on("a/first", move |_| {
            inner_bus.emit("a/second", PacketType::Event, serde_json::json!({}))?;
            Ok(())
        });
        let counter = Rc::clone(&hits);
        bus.on("a/second", move |_| {
            counter.set(counter.get() + 1);
            Ok(())
        });

        bus.emit("a/first", PacketType::Event, serde_json::json!({})).unwrap();
        assert_eq!(hits.get(), 1);
    }

    #[test]
    fn test_leaf_cannot_route() {
        let parent: FrameRef = MemoryFrame::new("parent");
        let bus = Bus::leaf("tsm", Rc::clone(&parent));
        let packet = Packet::new("a/b", PacketType::Event, serde_json::json!({}), "x").unwrap();
        assert!(matches!(
            bus.route_from_child(&packet, &parent),
            Err(BusError::NotHub(_))
        ));
        assert!(bus.registered_frames().is_empty());
    }
}
