//! Frame handles: the sending side of a window boundary.
//!
//! A hub never owns its children. The registry keeps `Weak` references and
//! asks [`FrameTransport::is_closed`] before every delivery.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use terrain_protocol::Packet;
use tokio::sync::mpsc;

use crate::BusError;

/// Something a packet can be posted to (a parent window, a child iframe).
pub trait FrameTransport {
    /// Deliver a packet across the boundary.
    fn post(&self, packet: &Packet) -> Result<(), BusError>;

    /// True once the other side has gone away.
    fn is_closed(&self) -> bool;
}

/// Shared handle to a frame transport.
pub type FrameRef = Rc<dyn FrameTransport>;

/// In-process frame that records everything posted to it.
///
/// Used to wire buses together inside one process and as a test double.
#[derive(Debug, Default)]
pub struct MemoryFrame {
    name: String,
    inbox: RefCell<Vec<Packet>>,
    closed: Cell<bool>,
    failing: Cell<bool>,
}

impl MemoryFrame {
    pub fn new(name: &str) -> Rc<Self> {
        Rc::new(Self {
            name: name.to_string(),
            ..Default::default()
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Mark the frame as closed, like a removed iframe.
    pub fn close(&self) {
        self.closed.set(true);
    }

    /// Make every subsequent `post` fail.
    pub fn set_failing(&self, failing: bool) {
        self.failing.set(failing);
    }

    /// Packets received so far.
    pub fn received(&self) -> Vec<Packet> {
        self.inbox.borrow().clone()
    }

    /// Drain the inbox.
    pub fn take(&self) -> Vec<Packet> {
        std::mem::take(&mut *self.inbox.borrow_mut())
    }
}

impl FrameTransport for MemoryFrame {
    fn post(&self, packet: &Packet) -> Result<(), BusError> {
        if self.closed.get() {
            return Err(BusError::FrameClosed(self.name.clone()));
        }
        if self.failing.get() {
            return Err(BusError::Delivery {
                frame: self.name.clone(),
                reason: "injected failure".into(),
            });
        }
        self.inbox.borrow_mut().push(packet.clone());
        Ok(())
    }

    fn is_closed(&self) -> bool {
        self.closed.get()
    }
}

/// Frame backed by a tokio channel carrying serialized JSON packets.
///
/// The receiving half plays the role of the other window's message
/// listener; dropping it closes the frame.
#[derive(Debug, Clone)]
pub struct ChannelFrame {
    name: String,
    tx: mpsc::UnboundedSender<String>,
}

impl ChannelFrame {
    pub fn new(name: &str) -> (Self, mpsc::UnboundedReceiver<String>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            Self {
                name: name.to_string(),
                tx,
            },
            rx,
        )
    }
}

impl FrameTransport for ChannelFrame {
    fn post(&self, packet: &Packet) -> Result<(), BusError> {
        let json = packet.to_json()?;
        self.tx
            .send(json)
            .map_err(|_| BusError::FrameClosed(self.name.clone()))
    }

    fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}
