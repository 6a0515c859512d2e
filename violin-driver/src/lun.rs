//! LUN provisioning.
//!
//! Creation and deletion are single array actions on the cluster gateway.
//! The array serializes configuration edits per container through a lock
//! node, so each action waits for that lock to be released first.

use tracing::{debug, info};
use xg_client::{Action, GatewayRole, XgSession};

use crate::driver::ViolinDriver;
use crate::error::{Error, Result};
use crate::paths;
use crate::poll::wait_for;
use crate::types::Volume;

impl<S: XgSession> ViolinDriver<S> {
    pub async fn create_lun(&self, volume: &Volume) -> Result<()> {
        self.login(false).await?;

        let lun = self.short_name(&volume.name);
        self.wait_for_lock(&lun).await?;

        debug!(container = %self.container, lun = %lun, size_gb = volume.size_gb, "Creating LUN");
        self.perform(
            GatewayRole::Vip,
            "create LUN",
            &lun,
            Action::CreateLun {
                container: self.container.clone(),
                lun: lun.clone(),
                size_gb: volume.size_gb,
            },
        )
        .await?;

        info!(container = %self.container, lun = %lun, "LUN created");
        Ok(())
    }

    pub async fn delete_lun(&self, volume: &Volume) -> Result<()> {
        self.login(false).await?;

        let lun = self.short_name(&volume.name);
        self.wait_for_lock(&lun).await?;

        debug!(container = %self.container, lun = %lun, "Deleting LUN");
        self.perform(
            GatewayRole::Vip,
            "delete LUN",
            &lun,
            Action::DeleteLuns {
                container: self.container.clone(),
                luns: vec![lun.clone()],
            },
        )
        .await?;

        info!(container = %self.container, lun = %lun, "LUN deleted");
        Ok(())
    }

    /// Wait until the container lock node is released (absent or false).
    /// A value that does not read as a boolean counts as held.
    ///
    /// Running out of attempts is an operation error for `resource`, the
    /// LUN that was about to be modified.
    pub async fn wait_for_lock(&self, resource: &str) -> Result<()> {
        let request = [paths::container_lock(&self.container)];
        let (this, request) = (self, &request);

        let released = wait_for("container lock", self.config.lock_poll(), move || async move {
            match this.query(GatewayRole::Vip, request).await {
                Ok(values) => match values.get(&request[0]) {
                    None => true,
                    Some(value) => value.as_bool() == Some(false),
                },
                Err(e) => {
                    debug!(error = %e, "Lock query failed, retrying");
                    false
                }
            }
        })
        .await;

        if !released {
            return Err(Error::operation(
                "wait for container lock",
                resource,
                format!("container '{}' is still locked", self.container),
            ));
        }
        Ok(())
    }
}
