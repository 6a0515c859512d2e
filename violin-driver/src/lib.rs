//! Violin vShare iSCSI driver core
//!
//! Provisions LUNs on a Violin array and exports them over iSCSI through the
//! array's three management gateways. The crate provides:
//! - `ViolinDriver`, the volume lifecycle facade used by an orchestrator
//! - LUN provisioning guarded by the array's container lock
//! - iSCSI target, portal binding and LUN export management
//! - Capacity and identity reporting
//! - Setup discovery and validation
//!
//! The transport is injected as an [`xg_client::XgSession`] per gateway.

pub mod config;
pub mod driver;
pub mod error;
pub mod export;
pub mod lun;
pub mod metrics;
pub mod paths;
pub mod poll;
pub mod setup;
pub mod stats;
pub mod types;

#[cfg(test)]
mod test_support;

pub use config::DriverConfig;
pub use driver::ViolinDriver;
pub use error::{Error, Result};
pub use export::{iscsi_location, short_name};
pub use poll::{PollPolicy, wait_for};
pub use types::{CapacityGb, ExportInfo, Volume, VolumeStats};
