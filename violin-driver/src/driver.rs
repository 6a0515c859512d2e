//! The driver facade.
//!
//! `ViolinDriver` owns the three gateway sessions and the state discovered at
//! setup, and strings the LUN, export and stats operations together into the
//! volume lifecycle calls the orchestrator makes.

use tokio::sync::RwLock;
use tracing::{error, info, warn};
use xg_client::{Action, GatewayRole, GatewaySet, NodeValues, XgSession};

use crate::config::DriverConfig;
use crate::error::{Error, Result};
use crate::export::iscsi_location;
use crate::metrics::{self, OperationTimer};
use crate::types::{ExportInfo, Volume, VolumeStats};

/// Active iSCSI portal addresses per controller, refreshed at setup.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct Portals {
    pub(crate) mga: Vec<String>,
    pub(crate) mgb: Vec<String>,
}

impl Portals {
    pub(crate) fn for_role(&self, role: GatewayRole) -> &[String] {
        match role {
            GatewayRole::Mga => &self.mga,
            GatewayRole::Mgb => &self.mgb,
            GatewayRole::Vip => &[],
        }
    }

    pub(crate) fn set(&mut self, role: GatewayRole, ips: Vec<String>) {
        match role {
            GatewayRole::Mga => self.mga = ips,
            GatewayRole::Mgb => self.mgb = ips,
            GatewayRole::Vip => {}
        }
    }
}

pub struct ViolinDriver<S> {
    pub(crate) config: DriverConfig,
    pub(crate) gateways: GatewaySet<S>,
    pub(crate) container: String,
    pub(crate) device_id: String,
    pub(crate) array_version: Option<String>,
    pub(crate) portals: RwLock<Portals>,
    pub(crate) stats: RwLock<VolumeStats>,
}

impl<S: XgSession> ViolinDriver<S> {
    /// Create a driver over already-opened gateway sessions. Nothing is sent
    /// to the array until [`do_setup`](Self::do_setup) or the first operation.
    pub fn new(config: DriverConfig, gateways: GatewaySet<S>) -> Self {
        Self {
            container: config.container.clone(),
            device_id: config.device_id.clone(),
            config,
            gateways,
            array_version: None,
            portals: RwLock::new(Portals::default()),
            stats: RwLock::new(VolumeStats::default()),
        }
    }

    /// Build the gateway set from the configured endpoints, opening one
    /// transport session per gateway with `open`.
    pub fn open(
        config: DriverConfig,
        open: impl FnMut(GatewayRole, &xg_client::GatewayEndpoint) -> S,
    ) -> Self {
        let gateways = GatewaySet::open(
            config.vip_endpoint(),
            config.mga_endpoint(),
            config.mgb_endpoint(),
            config.session_timeout(),
            open,
        );
        Self::new(config, gateways)
    }

    pub fn config(&self) -> &DriverConfig {
        &self.config
    }

    pub fn gateways(&self) -> &GatewaySet<S> {
        &self.gateways
    }

    /// Container LUNs are provisioned in (configured or discovered).
    pub fn container(&self) -> &str {
        &self.container
    }

    pub fn device_id(&self) -> &str {
        &self.device_id
    }

    /// Array software release read at setup.
    pub fn array_version(&self) -> Option<&str> {
        self.array_version.as_deref()
    }

    /// Log in every gateway that needs it. Returns whether any session
    /// re-authenticated.
    pub async fn login(&self, force: bool) -> Result<bool> {
        let result = self.gateways.login(force).await;
        metrics::record_login(result.is_ok(), matches!(result, Ok(true)));
        Ok(result?)
    }

    // ========================================================================
    // Session helpers
    // ========================================================================

    pub(crate) async fn query(&self, role: GatewayRole, paths: &[String]) -> Result<NodeValues> {
        Ok(self.gateways.get(role).session().get_node_values(paths).await?)
    }

    /// Perform `action` on `role` and turn a nonzero status into an
    /// operation error for `step`.
    pub(crate) async fn perform(
        &self,
        role: GatewayRole,
        step: &'static str,
        resource: &str,
        action: Action,
    ) -> Result<()> {
        let response = self
            .gateways
            .get(role)
            .session()
            .perform_action(&action)
            .await?;

        if !response.is_success() {
            error!(
                gateway = %role,
                step,
                resource,
                code = response.code,
                message = %response.message,
                "Array action failed"
            );
            return Err(Error::operation(step, resource, response.message));
        }
        Ok(())
    }

    // ========================================================================
    // Volume lifecycle
    // ========================================================================

    pub async fn create_volume(&self, volume: &Volume) -> Result<()> {
        let timer = OperationTimer::new("create_volume");
        info!(volume = %volume.name, size_gb = volume.size_gb, "CreateVolume request");
        timer.finish(self.create_lun(volume).await)
    }

    pub async fn delete_volume(&self, volume: &Volume) -> Result<()> {
        let timer = OperationTimer::new("delete_volume");
        info!(volume = %volume.name, "DeleteVolume request");
        timer.finish(self.delete_lun(volume).await)
    }

    /// Create the volume's target, bind the portals and export the LUN.
    ///
    /// If a step after target creation fails, whatever was created is torn
    /// down again before the error is returned.
    pub async fn create_export(&self, volume: &Volume) -> Result<ExportInfo> {
        let timer = OperationTimer::new("create_export");
        info!(volume = %volume.name, "CreateExport request");
        timer.finish(self.create_export_inner(volume).await)
    }

    async fn create_export_inner(&self, volume: &Volume) -> Result<ExportInfo> {
        let (role, portal_ip) = self.export_portal().await?;

        let target = self.create_target(volume).await?;
        if let Err(e) = self.bind_target_ips(&target).await {
            warn!(volume = %volume.name, error = %e, "Bind failed, rolling back target");
            self.teardown_target(&target).await;
            return Err(e);
        }
        info!(target = %target, "iSCSI target created");

        let hostname = self.get_hostname(role).await;
        let iqn = self.target_iqn(&hostname, &target);

        let lun_id = match self.export_lun(volume, &iqn).await {
            Ok(lun_id) => lun_id,
            Err(e) => {
                warn!(volume = %volume.name, error = %e, "Export failed, rolling back target");
                if let Err(cleanup) = self.unexport_lun(volume).await {
                    warn!(volume = %volume.name, error = %cleanup, "Rollback unexport failed");
                }
                self.teardown_target(&target).await;
                return Err(e);
            }
        };

        let provider_location =
            iscsi_location(&portal_ip, self.config.iscsi_port, &iqn, &lun_id);
        info!(
            volume = %volume.name,
            iqn = %iqn,
            lun_id = %lun_id,
            portal = %portal_ip,
            "Volume exported"
        );

        Ok(ExportInfo {
            target,
            iqn,
            lun_id,
            provider_location,
        })
    }

    /// Unexport the LUN and delete its target.
    pub async fn remove_export(&self, volume: &Volume) -> Result<()> {
        let timer = OperationTimer::new("remove_export");
        info!(volume = %volume.name, "RemoveExport request");
        let result = async {
            self.unexport_lun(volume).await?;
            self.delete_iscsi_target(volume).await
        }
        .await;
        timer.finish(result)
    }

    /// Authorize `initiator` through the configured igroup.
    pub async fn initialize_connection(&self, initiator: &str) -> Result<()> {
        let timer = OperationTimer::new("initialize_connection");
        timer.finish(self.add_igroup_member(initiator).await)
    }

    pub async fn terminate_connection(&self, initiator: &str) -> Result<()> {
        let timer = OperationTimer::new("terminate_connection");
        timer.finish(self.remove_igroup_member(initiator).await)
    }

    /// Current stats snapshot, refreshed from the array first when `refresh`.
    pub async fn get_volume_stats(&self, refresh: bool) -> VolumeStats {
        if refresh {
            self.update_stats().await;
        }
        self.stats.read().await.clone()
    }

    /// Close all gateway sessions.
    pub async fn close(&self) -> Result<()> {
        info!("Closing gateway sessions");
        Ok(self.gateways.close().await?)
    }

    /// First active portal, preferring controller A.
    async fn export_portal(&self) -> Result<(GatewayRole, String)> {
        for role in [GatewayRole::Mga, GatewayRole::Mgb] {
            if let Some(ip) = self.portal_ips(role).await.into_iter().next() {
                return Ok((role, ip));
            }
        }
        Err(Error::InvalidBackendConfig(
            "no active iSCSI IPs on either controller".to_string(),
        ))
    }
}
