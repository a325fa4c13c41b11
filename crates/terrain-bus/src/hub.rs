//! Hub routing: rebroadcast child traffic to every other child frame.
//!
//! Fan-out happens in two steps so the caller never holds the registry
//! while posting:
//! 1. `plan` - walk the registry, collect live targets, remove dead entries
//! 2. `deliver` - post a hub-stamped copy to each target; one failure does
//!    not stop the rest, and nothing is retried

use chrono::{DateTime, Utc};
use terrain_protocol::Packet;

use crate::frame::FrameRef;
use crate::registry::{FrameRegistry, RegistrationOutcome};

/// Live targets selected for one packet.
pub struct FanoutPlan {
    pub targets: Vec<(String, FrameRef)>,
    /// Identities removed because their frame was dead.
    pub pruned: Vec<String>,
}

/// A reachable child frame and when its current handle was registered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LiveFrame {
    pub identity: String,
    pub registered_at: DateTime<Utc>,
}

/// What happened to one fanned-out packet.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FanoutReport {
    pub delivered: Vec<String>,
    pub failed: Vec<String>,
    pub pruned: Vec<String>,
}

#[derive(Debug)]
pub struct HubRouter {
    identity: String,
    registry: FrameRegistry,
}

impl HubRouter {
    pub fn new(identity: &str) -> Self {
        Self {
            identity: identity.to_string(),
            registry: FrameRegistry::new(),
        }
    }

    pub fn identity(&self) -> &str {
        &self.identity
    }

    pub fn registry(&self) -> &FrameRegistry {
        &self.registry
    }

    pub fn register(&mut self, identity: &str, frame: &FrameRef) -> RegistrationOutcome {
        let outcome = self.registry.register(identity, frame);
        if outcome != RegistrationOutcome::Unchanged {
            tracing::debug!(frame = %identity, ?outcome, "Frame registered");
        }
        outcome
    }

    pub fn deregister(&mut self, identity: &str) -> bool {
        let removed = self.registry.deregister(identity);
        if removed {
            tracing::debug!(frame = %identity, "Frame deregistered");
        }
        removed
    }

    /// Frames that are currently reachable, in identity order.
    pub fn live_frames(&self) -> Vec<LiveFrame> {
        self.registry
            .iter()
            .filter(|(_, entry)| entry.live().is_some())
            .map(|(identity, entry)| LiveFrame {
                identity: identity.clone(),
                registered_at: entry.registered_at,
            })
            .collect()
    }

    /// Record the sender of an inbound child packet under its source.
    pub fn learn_sender(&mut self, packet: &Packet, sender: &FrameRef) {
        if !packet.source.is_empty() {
            self.register(&packet.source, sender);
        }
    }

    /// Select live targets, skipping `except`, and drop dead entries.
    pub fn plan(&mut self, except: Option<&FrameRef>) -> FanoutPlan {
        let mut targets = Vec::new();
        let mut pruned = Vec::new();

        for (identity, entry) in self.registry.iter() {
            if except.is_some_and(|sender| entry.is_handle(sender)) {
                continue;
            }
            match entry.live() {
                Some(frame) => targets.push((identity.clone(), frame)),
                None => pruned.push(identity.clone()),
            }
        }

        if !pruned.is_empty() {
            self.registry.remove_all(&pruned);
            tracing::debug!(frames = ?pruned, "Pruned dead frames");
        }

        FanoutPlan { targets, pruned }
    }

    /// Post a copy of `packet` stamped with `hub_identity` to each target.
    pub fn deliver(hub_identity: &str, plan: FanoutPlan, packet: &Packet) -> FanoutReport {
        let mut outgoing = packet.clone();
        outgoing.stamp_hop(hub_identity);

        let mut report = FanoutReport {
            pruned: plan.pruned,
            ..Default::default()
        };
        for (identity, frame) in plan.targets {
            match frame.post(&outgoing) {
                Ok(()) => report.delivered.push(identity),
                Err(e) => {
                    tracing::warn!(
                        frame = %identity,
                        topic = %packet.topic,
                        error = %e,
                        "Frame delivery failed"
                    );
                    report.failed.push(identity);
                }
            }
        }
        report
    }

    /// Fan a packet from `sender` out to every other registered child.
    ///
    /// Local dispatch is the caller's job (see `Bus::route_from_child`).
    pub fn route_from_child(&mut self, packet: &Packet, sender: &FrameRef) -> FanoutReport {
        self.learn_sender(packet, sender);
        self.broadcast(packet, Some(sender))
    }

    /// Fan a packet out to every registered child except `except`.
    pub fn broadcast(&mut self, packet: &Packet, except: Option<&FrameRef>) -> FanoutReport {
        let plan = self.plan(except);
        Self::deliver(&self.identity, plan, packet)
    }
}
