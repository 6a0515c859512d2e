//! Violin vShare gateway client primitives
//!
//! The array is managed through three gateways: the cluster virtual IP and
//! the two controllers (mg-a, mg-b). This crate provides:
//! - The `XgSession` capability (node queries, actions, login/close)
//! - Configuration-tree value types
//! - Typed array actions
//! - Gateway sessions with age-based re-authentication

pub mod action;
pub mod error;
pub mod gateway;
pub mod node;
pub mod session;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use action::{Action, ActionResponse};
pub use error::{Result, XgError};
pub use gateway::{Gateway, GatewayEndpoint, GatewayRole, GatewaySet};
pub use node::{NodeValue, NodeValues};
pub use session::XgSession;
