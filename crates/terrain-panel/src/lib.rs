//! Terrain Panel - shared runtime for dashboard panels
//!
//! Configuration, the query parameters every panel sends to its backend
//! namespace, and the polling loop that keeps a panel view fresh.

pub mod api;
pub mod config;
pub mod error;
pub mod poller;

pub use api::{ApiNamespace, PanelQuery};
pub use config::{ApiConfig, BusConfig, PanelConfig, PollConfig};
pub use error::PanelError;
pub use poller::{PanelState, PanelView, Poller};
