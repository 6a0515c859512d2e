//! Backend setup and validation.

use tracing::{info, warn};
use xg_client::{GatewayRole, XgSession};

use crate::driver::{Portals, ViolinDriver};
use crate::error::{Error, Result};
use crate::paths;

impl<S: XgSession> ViolinDriver<S> {
    /// Log in every gateway and discover what the configuration left open:
    /// the array release, the container and the device id. Also caches the
    /// active iSCSI portals of both controllers.
    pub async fn do_setup(&mut self) -> Result<()> {
        self.login(true).await?;

        let release = self
            .query(GatewayRole::Vip, &[paths::SYSTEM_RELEASE.to_string()])
            .await?;
        self.array_version = release.get(paths::SYSTEM_RELEASE).map(ToString::to_string);
        match &self.array_version {
            Some(version) => info!(version = %version, "Connected to array"),
            None => warn!("Array did not report its release"),
        }

        if self.container.is_empty() {
            let containers = self
                .query(GatewayRole::Vip, &[paths::LOCAL_CONTAINERS.to_string()])
                .await?;
            let discovered = containers
                .iter()
                .find_map(|(path, _)| path.strip_prefix(paths::LOCAL_CONTAINER_PREFIX))
                .map(str::to_string);
            match discovered {
                Some(container) => {
                    info!(container = %container, "Discovered container");
                    self.container = container;
                }
                None => warn!("No local container found"),
            }
        }

        if self.device_id.is_empty() && !self.container.is_empty() {
            let path = paths::device_id(&self.container);
            let values = self
                .query(GatewayRole::Vip, std::slice::from_ref(&path))
                .await?;
            match values.get(&path) {
                Some(device_id) => self.device_id = device_id.to_string(),
                None => warn!(container = %self.container, "Array did not report a device id"),
            }
        }

        self.refresh_portals().await;
        Ok(())
    }

    /// Validate the backend before it accepts work. Checks run in a fixed
    /// order and the first unmet precondition is returned.
    pub async fn check_for_setup_error(&self) -> Result<()> {
        if self.container.is_empty() {
            return Err(Error::InvalidBackendConfig("container is missing".to_string()));
        }
        if self.device_id.is_empty() {
            return Err(Error::InvalidBackendConfig("device id is missing".to_string()));
        }

        self.login(false).await?;

        let enable = self
            .query(GatewayRole::Vip, &[paths::ISCSI_ENABLE.to_string()])
            .await?;
        if enable.get_bool(paths::ISCSI_ENABLE) != Some(true) {
            return Err(Error::InvalidBackendConfig(
                "iSCSI is not enabled on the array".to_string(),
            ));
        }

        let igroup_path = paths::igroup(&self.config.igroup);
        let igroup = self
            .query(GatewayRole::Vip, std::slice::from_ref(&igroup_path))
            .await?;
        if !igroup.contains(&igroup_path) {
            return Err(Error::InvalidBackendConfig(format!(
                "igroup '{}' is not configured",
                self.config.igroup
            )));
        }

        let mga = self.get_active_iscsi_ips(GatewayRole::Mga).await;
        if mga.is_empty() {
            return Err(Error::InvalidBackendConfig(
                "no active iSCSI IPs on mg-a".to_string(),
            ));
        }
        let mgb = self.get_active_iscsi_ips(GatewayRole::Mgb).await;
        if mgb.is_empty() {
            return Err(Error::InvalidBackendConfig(
                "no active iSCSI IPs on mg-b".to_string(),
            ));
        }

        *self.portals.write().await = Portals { mga, mgb };
        info!(container = %self.container, device_id = %self.device_id, "Backend setup validated");
        Ok(())
    }

    async fn refresh_portals(&self) {
        let mga = self.get_active_iscsi_ips(GatewayRole::Mga).await;
        let mgb = self.get_active_iscsi_ips(GatewayRole::Mgb).await;
        info!(mga = ?mga, mgb = ?mgb, "Cached iSCSI portals");
        *self.portals.write().await = Portals { mga, mgb };
    }
}
