//! The gateway capability every driver component is built on.

use async_trait::async_trait;

use crate::action::{Action, ActionResponse};
use crate::error::Result;
use crate::node::NodeValues;

/// A management session against one gateway (cluster VIP or a controller).
///
/// Implementations own the transport (endpoint, credentials, scheme) and
/// translate calls into gateway requests. The driver never assumes any
/// particular wire format; test suites substitute an in-memory session.
#[async_trait]
pub trait XgSession: Send + Sync {
    /// Authenticate, replacing any previous session state.
    async fn login(&self) -> Result<()>;

    /// Tear down the session.
    async fn close(&self) -> Result<()>;

    /// Fetch the current value of each requested node in one round trip.
    ///
    /// Nodes that do not exist are omitted from the result; that is not an
    /// error. A path ending in `/*` requests the children of its parent.
    async fn get_node_values(&self, paths: &[String]) -> Result<NodeValues>;

    /// Run an action and return the gateway's status.
    async fn perform_action(&self, action: &Action) -> Result<ActionResponse>;
}
