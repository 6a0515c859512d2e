//! Capacity and identity reporting.

use tracing::{debug, warn};
use xg_client::{GatewayRole, NodeValues, XgSession};

use crate::driver::ViolinDriver;
use crate::paths;
use crate::types::{CapacityGb, VolumeStats};

/// Build a stats snapshot from one query response. Each field falls back
/// to its default independently when its node is missing.
pub(crate) fn stats_from_nodes(container: &str, values: &NodeValues) -> VolumeStats {
    let defaults = VolumeStats::default();
    let total_bytes = values.get_u64(&paths::total_bytes(container));
    let alloc_bytes = values.get_u64(&paths::alloc_bytes(container));

    let total_capacity_gb = total_bytes.map_or(CapacityGb::Unknown, CapacityGb::from_bytes);
    let free_capacity_gb = match (total_bytes, alloc_bytes) {
        (Some(total), Some(alloc)) => CapacityGb::from_bytes(total.saturating_sub(alloc)),
        _ => CapacityGb::Unknown,
    };

    VolumeStats {
        total_capacity_gb,
        free_capacity_gb,
        volume_backend_name: values
            .get(&paths::chassis_type(container))
            .map_or(defaults.volume_backend_name, ToString::to_string),
        vendor_name: values
            .get(paths::SYSTEM_MFR)
            .map_or(defaults.vendor_name, ToString::to_string),
    }
}

impl<S: XgSession> ViolinDriver<S> {
    /// Refresh the cached stats from the cluster gateway. Never fails: when
    /// the array cannot be reached every field takes its default.
    pub async fn update_stats(&self) {
        let request = vec![
            paths::total_bytes(&self.container),
            paths::alloc_bytes(&self.container),
            paths::chassis_type(&self.container),
            paths::SYSTEM_MFR.to_string(),
        ];

        let result = match self.login(false).await {
            Ok(_) => self.query(GatewayRole::Vip, &request).await,
            Err(e) => Err(e),
        };

        let stats = match result {
            Ok(values) => stats_from_nodes(&self.container, &values),
            Err(e) => {
                warn!(error = %e, "Stats query failed, reporting defaults");
                VolumeStats::default()
            }
        };

        debug!(stats = ?stats, "Stats updated");
        *self.stats.write().await = stats;
    }
}
