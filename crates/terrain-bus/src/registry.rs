//! Frame registry kept by the hub: identity → weak frame handle.
//!
//! One entry per identity, last registration wins. Entries are pruned
//! lazily when a handle turns out to be dead at fan-out time.

use std::collections::BTreeMap;
use std::rc::{Rc, Weak};

use chrono::{DateTime, Utc};

use crate::frame::{FrameRef, FrameTransport};

/// A registered child frame.
#[derive(Debug, Clone)]
pub struct FrameEntry {
    handle: Weak<dyn FrameTransport>,
    pub registered_at: DateTime<Utc>,
}

impl FrameEntry {
    fn new(frame: &FrameRef) -> Self {
        Self {
            handle: Rc::downgrade(frame),
            registered_at: Utc::now(),
        }
    }

    /// The frame handle, if it is still alive and open.
    pub fn live(&self) -> Option<FrameRef> {
        self.handle.upgrade().filter(|frame| !frame.is_closed())
    }

    /// True if this entry points at `frame`.
    pub fn is_handle(&self, frame: &FrameRef) -> bool {
        Weak::ptr_eq(&self.handle, &Rc::downgrade(frame))
    }
}

/// Result of [`FrameRegistry::register`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistrationOutcome {
    Inserted,
    /// Identity was mapped to a different handle; replaced.
    Updated,
    Unchanged,
}

#[derive(Debug, Default)]
pub struct FrameRegistry {
    frames: BTreeMap<String, FrameEntry>,
}

impl FrameRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Map `identity` to `frame` unless it already points there.
    pub fn register(&mut self, identity: &str, frame: &FrameRef) -> RegistrationOutcome {
        match self.frames.get(identity) {
            Some(entry) if entry.is_handle(frame) => RegistrationOutcome::Unchanged,
            Some(_) => {
                self.frames.insert(identity.to_string(), FrameEntry::new(frame));
                RegistrationOutcome::Updated
            }
            None => {
                self.frames.insert(identity.to_string(), FrameEntry::new(frame));
                RegistrationOutcome::Inserted
            }
        }
    }

    pub fn deregister(&mut self, identity: &str) -> bool {
        self.frames.remove(identity).is_some()
    }

    pub fn get(&self, identity: &str) -> Option<&FrameEntry> {
        self.frames.get(identity)
    }

    pub fn is_live(&self, identity: &str) -> bool {
        self.frames
            .get(identity)
            .and_then(FrameEntry::live)
            .is_some()
    }

    /// Registered identities, live or not, in sorted order.
    pub fn identities(&self) -> Vec<String> {
        self.frames.keys().cloned().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &FrameEntry)> {
        self.frames.iter()
    }

    /// Remove the given identities.
    pub fn remove_all(&mut self, identities: &[String]) {
        for identity in identities {
            self.frames.remove(identity);
        }
    }

    /// Drop every entry whose frame is gone. Returns the removed identities.
    pub fn prune(&mut self) -> Vec<String> {
        let dead: Vec<String> = self
            .frames
            .iter()
            .filter(|(_, entry)| entry.live().is_none())
            .map(|(identity, _)| identity.clone())
            .collect();
        self.remove_all(&dead);
        dead
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::MemoryFrame;

    #[test]
    fn test_register_outcomes() {
        let mut registry = FrameRegistry::new();
        let a: FrameRef = MemoryFrame::new("a");
        let b: FrameRef = MemoryFrame::new("b");

        assert_eq!(registry.register("tsm", &a), RegistrationOutcome::Inserted);
        assert_eq!(registry.register("tsm", &a), RegistrationOutcome::Unchanged);
        assert_eq!(registry.register("tsm", &b), RegistrationOutcome::Updated);
        assert_eq!(registry.len(), 1);
        assert!(registry.get("tsm").unwrap().is_handle(&b));
    }

    #[test]
    fn test_dropped_frame_is_not_live() {
        let mut registry = FrameRegistry::new();
        let frame: FrameRef = MemoryFrame::new("a");
        registry.register("tsm", &frame);
        assert!(registry.is_live("tsm"));

        drop(frame);
        assert!(!registry.is_live("tsm"));
        assert_eq!(registry.prune(), vec!["tsm".to_string()]);
        assert!(registry.is_empty());
    }

    #[test]
    fn test_closed_frame_is_pruned() {
        let mut registry = FrameRegistry::new();
        let closed = MemoryFrame::new("a");
        let open = MemoryFrame::new("b");
        let closed_ref: FrameRef = closed.clone();
        let open_ref: FrameRef = open.clone();
        registry.register("a", &closed_ref);
        registry.register("b", &open_ref);

        closed.close();
        assert_eq!(registry.prune(), vec!["a".to_string()]);
        assert_eq!(registry.identities(), vec!["b".to_string()]);
    }

    #[test]
    fn test_deregister() {
        let mut registry = FrameRegistry::new();
        let frame: FrameRef = MemoryFrame::new("a");
        registry.register("a", &frame);
        assert!(registry.deregister("a"));
        assert!(!registry.deregister("a"));
    }
}
