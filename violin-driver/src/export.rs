//! iSCSI export management.
//!
//! An exported volume is an iSCSI target named after the volume, with the
//! active iSCSI portal addresses of both controllers bound to it and the LUN
//! exported through the target to the configured igroup. Targets and LUN
//! exports are managed on the cluster gateway; IP bindings are per
//! controller and go through that controller's own gateway.

use std::sync::LazyLock;

use regex::Regex;
use tracing::{debug, info, warn};
use xg_client::{Action, GatewayRole, XgSession};

use crate::driver::ViolinDriver;
use crate::error::{Error, Result};
use crate::paths;
use crate::poll::wait_for;
use crate::types::Volume;

/// Interfaces eligible to carry iSCSI traffic.
static ISCSI_INTERFACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^eth\d+$").expect("static regex is valid"));

/// First `limit` characters of `name`. Array resource names are derived
/// from volume names this way, so the mapping must stay deterministic.
pub fn short_name(name: &str, limit: usize) -> &str {
    match name.char_indices().nth(limit) {
        Some((end, _)) => &name[..end],
        None => name,
    }
}

/// Location string handed back to the orchestrator: `"<ip>:<port>, <iqn> <lun>"`.
pub fn iscsi_location(ip: &str, port: impl std::fmt::Display, iqn: &str, lun: &str) -> String {
    format!("{}:{}, {} {}", ip, port, iqn, lun)
}

impl<S: XgSession> ViolinDriver<S> {
    /// Array resource name for a volume.
    pub fn short_name(&self, name: &str) -> String {
        short_name(name, self.config.max_name_length).to_string()
    }

    /// IQN the array gives `target` on the controller named `hostname`.
    pub fn target_iqn(&self, hostname: &str, target: &str) -> String {
        format!("{}:{}-{}", self.config.iscsi_target_prefix, hostname, target)
    }

    // ========================================================================
    // Targets
    // ========================================================================

    /// Create the volume's target and bind the portal IPs of both controllers
    /// to it. Returns the target name.
    pub async fn create_iscsi_target(&self, volume: &Volume) -> Result<String> {
        let target = self.create_target(volume).await?;
        self.bind_target_ips(&target).await?;

        info!(target = %target, "iSCSI target created");
        Ok(target)
    }

    /// Create the bare target on the cluster gateway.
    pub(crate) async fn create_target(&self, volume: &Volume) -> Result<String> {
        self.login(false).await?;
        let target = self.short_name(&volume.name);

        self.perform(
            GatewayRole::Vip,
            "create iSCSI target",
            &target,
            Action::CreateIscsiTarget {
                target: target.clone(),
            },
        )
        .await?;
        Ok(target)
    }

    /// Bind every portal IP to `target`, mg-a first, one action per IP.
    pub(crate) async fn bind_target_ips(&self, target: &str) -> Result<()> {
        for role in [GatewayRole::Mga, GatewayRole::Mgb] {
            for ip in self.portal_ips(role).await {
                debug!(gateway = %role, target = %target, ip = %ip, "Binding iSCSI IP");
                self.perform(
                    role,
                    "bind iSCSI IP",
                    target,
                    Action::BindIpToTarget {
                        target: target.to_string(),
                        ip,
                    },
                )
                .await?;
            }
        }
        Ok(())
    }

    /// Unbind every portal IP from the volume's target, mg-a first and one
    /// action per IP, then delete the target. The first failing step aborts
    /// the rest.
    pub async fn delete_iscsi_target(&self, volume: &Volume) -> Result<()> {
        self.login(false).await?;
        let target = self.short_name(&volume.name);

        for role in [GatewayRole::Mga, GatewayRole::Mgb] {
            for ip in self.portal_ips(role).await {
                debug!(gateway = %role, target = %target, ip = %ip, "Unbinding iSCSI IP");
                self.perform(
                    role,
                    "unbind iSCSI IP",
                    &target,
                    Action::UnbindIpFromTarget {
                        target: target.clone(),
                        ip,
                    },
                )
                .await?;
            }
        }

        self.perform(
            GatewayRole::Vip,
            "delete iSCSI target",
            &target,
            Action::DeleteIscsiTarget {
                target: target.clone(),
            },
        )
        .await?;

        info!(target = %target, "iSCSI target deleted");
        Ok(())
    }

    /// Remove `target` and its IP bindings, attempting every step even when
    /// an earlier one fails. Failures are logged, not returned.
    pub(crate) async fn teardown_target(&self, target: &str) {
        for role in [GatewayRole::Mga, GatewayRole::Mgb] {
            for ip in self.portal_ips(role).await {
                let action = Action::UnbindIpFromTarget {
                    target: target.to_string(),
                    ip,
                };
                if let Err(e) = self.perform(role, "unbind iSCSI IP", target, action).await {
                    warn!(gateway = %role, target = %target, error = %e, "Teardown unbind failed");
                }
            }
        }

        let action = Action::DeleteIscsiTarget {
            target: target.to_string(),
        };
        if let Err(e) = self
            .perform(GatewayRole::Vip, "delete iSCSI target", target, action)
            .await
        {
            warn!(target = %target, error = %e, "Teardown target delete failed");
        }
    }

    /// Portal IPs of a controller. An empty cache is refilled from the
    /// controller before giving up.
    pub(crate) async fn portal_ips(&self, role: GatewayRole) -> Vec<String> {
        let cached = self.portals.read().await.for_role(role).to_vec();
        if !cached.is_empty() {
            return cached;
        }

        let ips = self.get_active_iscsi_ips(role).await;
        if ips.is_empty() {
            warn!(gateway = %role, "No active iSCSI IPs on controller");
        } else {
            self.portals.write().await.set(role, ips.clone());
        }
        ips
    }

    // ========================================================================
    // LUN exports
    // ========================================================================

    /// Export the volume's LUN through its target to the configured igroup
    /// and return the LUN number the array assigned.
    pub async fn export_lun(&self, volume: &Volume, iqn: &str) -> Result<String> {
        self.login(false).await?;
        let lun = self.short_name(&volume.name);

        self.perform(
            GatewayRole::Vip,
            "export LUN",
            &lun,
            Action::ExportLun {
                container: self.container.clone(),
                lun: lun.clone(),
                target: lun.clone(),
                igroup: self.config.igroup.clone(),
                lun_id: None,
            },
        )
        .await?;

        if !self.wait_for_export_state(&lun, true).await {
            warn!(lun = %lun, "Export not visible yet, reading LUN id anyway");
        }

        self.get_lun_id(&self.container, &lun, iqn, &self.config.igroup)
            .await
    }

    /// Remove every export of the volume's LUN.
    pub async fn unexport_lun(&self, volume: &Volume) -> Result<()> {
        self.login(false).await?;
        let lun = self.short_name(&volume.name);

        self.perform(
            GatewayRole::Vip,
            "unexport LUN",
            &lun,
            Action::UnexportLun {
                container: self.container.clone(),
                lun: lun.clone(),
            },
        )
        .await?;

        if !self.wait_for_export_state(&lun, false).await {
            warn!(lun = %lun, "Export still present after unexport");
        }
        Ok(())
    }

    /// Poll until the export node of `lun` is present (`should_exist`) or
    /// absent. Returns whether that state was observed, so waiting for
    /// absence when the node is already gone returns `true` at once rather
    /// than `false`.
    pub async fn wait_for_export_state(&self, lun: &str, should_exist: bool) -> bool {
        let request = [paths::lun_export(&self.container, lun)];
        let (this, request) = (self, &request);

        wait_for("export state", self.config.export_poll(), move || async move {
            match this.query(GatewayRole::Vip, request).await {
                Ok(values) => values.contains(&request[0]) == should_exist,
                Err(e) => {
                    debug!(error = %e, "Export state query failed, retrying");
                    false
                }
            }
        })
        .await
    }

    /// LUN number of an export, as reported by the array.
    pub async fn get_lun_id(
        &self,
        container: &str,
        lun: &str,
        iqn: &str,
        igroup: &str,
    ) -> Result<String> {
        let path = paths::lun_id(container, lun, iqn, igroup);
        let values = self
            .query(GatewayRole::Vip, std::slice::from_ref(&path))
            .await?;

        match values.get(&path) {
            Some(value) => Ok(value.to_string()),
            None => Err(Error::NodeNotFound(path)),
        }
    }

    // ========================================================================
    // Controller discovery
    // ========================================================================

    /// IPv4 addresses of the link-up iSCSI interfaces on `role`.
    ///
    /// Interfaces that are excluded, oddly named, unaddressed or down are
    /// skipped, as are interfaces whose state cannot be read.
    pub async fn get_active_iscsi_ips(&self, role: GatewayRole) -> Vec<String> {
        let interfaces = match self.query(role, &[paths::INTERFACES.to_string()]).await {
            Ok(values) => values,
            Err(e) => {
                warn!(gateway = %role, error = %e, "Failed to list interfaces");
                return Vec::new();
            }
        };

        let mut ips = Vec::new();
        for (path, _) in interfaces.iter() {
            let Some(name) = path.strip_prefix(paths::INTERFACE_PREFIX) else {
                continue;
            };
            let excluded = self.config.excluded_interfaces.iter().any(|x| x == name);
            if excluded || !ISCSI_INTERFACE.is_match(name) {
                continue;
            }

            let ip_path = paths::interface_ip(name);
            let link_path = paths::interface_link_up(name);
            let state = match self.query(role, &[ip_path.clone(), link_path.clone()]).await {
                Ok(values) => values,
                Err(e) => {
                    debug!(gateway = %role, interface = name, error = %e, "Skipping interface");
                    continue;
                }
            };

            match (state.get(&ip_path), state.get_bool(&link_path)) {
                (Some(ip), Some(true)) => ips.push(ip.to_string()),
                _ => debug!(gateway = %role, interface = name, "Interface down or unaddressed"),
            }
        }

        debug!(gateway = %role, ips = ?ips, "Active iSCSI IPs");
        ips
    }

    /// Hostname reported by `role`, or its configured address if the query
    /// fails or returns nothing.
    pub async fn get_hostname(&self, role: GatewayRole) -> String {
        let gateway = self.gateways.get(role);
        match self.query(role, &[paths::SYSTEM_HOSTNAME.to_string()]).await {
            Ok(values) => {
                if let Some(hostname) = values.get_str(paths::SYSTEM_HOSTNAME) {
                    return hostname.to_string();
                }
                warn!(gateway = %role, "Hostname not reported, using gateway address");
            }
            Err(e) => {
                warn!(gateway = %role, error = %e, "Hostname query failed, using gateway address");
            }
        }
        gateway.address().to_string()
    }

    // ========================================================================
    // Igroup membership
    // ========================================================================

    pub async fn add_igroup_member(&self, initiator: &str) -> Result<()> {
        self.login(false).await?;
        self.perform(
            GatewayRole::Vip,
            "add igroup member",
            initiator,
            Action::AddInitiators {
                igroup: self.config.igroup.clone(),
                initiators: vec![initiator.to_string()],
            },
        )
        .await?;
        info!(igroup = %self.config.igroup, initiator, "Initiator added to igroup");
        Ok(())
    }

    pub async fn remove_igroup_member(&self, initiator: &str) -> Result<()> {
        self.login(false).await?;
        self.perform(
            GatewayRole::Vip,
            "remove igroup member",
            initiator,
            Action::RemoveInitiators {
                igroup: self.config.igroup.clone(),
                initiators: vec![initiator.to_string()],
            },
        )
        .await?;
        info!(igroup = %self.config.igroup, initiator, "Initiator removed from igroup");
        Ok(())
    }
}
