//! Terrain Bus - pub/sub between dashboard frames
//!
//! Each frame owns one [`Bus`]. Leaf frames relay their publishes to the
//! parent window; the top-level frame runs in hub mode and fans inbound
//! packets out to every registered child frame except the sender.
//!
//! Outbound traffic passes through a [`ReadyGate`] so nothing leaves a
//! frame before it has finished loading.

pub mod bus;
pub mod error;
pub mod frame;
pub mod hub;
pub mod ready;
pub mod registry;
pub mod subscriptions;

pub use bus::{generate_identity, Bus, BusMode, SubscriptionHandle};
pub use error::BusError;
pub use frame::{ChannelFrame, FrameRef, FrameTransport, MemoryFrame};
pub use hub::{FanoutPlan, FanoutReport, HubRouter, LiveFrame};
pub use ready::ReadyGate;
pub use registry::{FrameEntry, FrameRegistry, RegistrationOutcome};
pub use subscriptions::{DispatchReport, Handler, SubscriptionId, SubscriptionTable};
