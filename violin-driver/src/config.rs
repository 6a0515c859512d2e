//! Driver configuration.
//!
//! `DriverConfig` can be flattened into a host binary's clap parser
//! (`#[command(flatten)]`), with every flag falling back to a `VMEM_*`
//! environment variable, or loaded from a JSON file. Fields missing from the
//! file take the same defaults as the flags.

use std::path::Path;
use std::time::Duration;

use clap::Args;
use serde::{Deserialize, Serialize};
use xg_client::GatewayEndpoint;

use crate::error::Result;
use crate::poll::PollPolicy;

#[derive(Args, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DriverConfig {
    /// Cluster virtual IP of the gateway
    #[arg(long, env = "VMEM_GATEWAY_VIP", default_value = "")]
    pub gateway_vip: String,

    /// Management address of controller A
    #[arg(long, env = "VMEM_GATEWAY_MGA", default_value = "")]
    pub gateway_mga: String,

    /// Management address of controller B
    #[arg(long, env = "VMEM_GATEWAY_MGB", default_value = "")]
    pub gateway_mgb: String,

    /// Gateway user name
    #[arg(long, env = "VMEM_GATEWAY_USER", default_value = "admin")]
    pub gateway_user: String,

    /// Gateway password
    #[arg(long, env = "VMEM_GATEWAY_PASSWORD", default_value = "", hide_env_values = true)]
    #[serde(skip_serializing)]
    pub gateway_password: String,

    /// Transport scheme for the gateways
    #[arg(long, env = "VMEM_GATEWAY_SCHEME", default_value = "https")]
    pub gateway_scheme: String,

    /// Storage container holding the LUNs (discovered at setup when empty)
    #[arg(long, env = "VMEM_CONTAINER", default_value = "")]
    pub container: String,

    /// Array device identifier (discovered at setup when empty)
    #[arg(long, env = "VMEM_DEVICE_ID", default_value = "")]
    pub device_id: String,

    /// Initiator group LUNs are exported to
    #[arg(long, env = "VMEM_IGROUP", default_value = "openstack")]
    pub igroup: String,

    /// Prefix of target IQNs on the array
    #[arg(long, env = "VMEM_ISCSI_TARGET_PREFIX", default_value = "iqn.2004-02.com.vmem")]
    pub iscsi_target_prefix: String,

    /// iSCSI portal port
    #[arg(long, env = "VMEM_ISCSI_PORT", default_value_t = 3260)]
    pub iscsi_port: u16,

    /// Longest resource name the array accepts
    #[arg(long, env = "VMEM_MAX_NAME_LENGTH", default_value_t = 32)]
    pub max_name_length: usize,

    /// Controller interfaces never used for iSCSI traffic
    #[arg(
        long,
        env = "VMEM_EXCLUDED_INTERFACES",
        value_delimiter = ',',
        default_values = ["eth0", "eth1", "eth2", "eth3"]
    )]
    pub excluded_interfaces: Vec<String>,

    /// Re-authenticate sessions older than this many seconds
    #[arg(long, env = "VMEM_SESSION_TIMEOUT_SECS", default_value_t = 900)]
    pub session_timeout_secs: u64,

    /// Delay between container lock polls, in milliseconds
    #[arg(long, env = "VMEM_LOCK_POLL_INTERVAL_MS", default_value_t = 1000)]
    pub lock_poll_interval_ms: u64,

    /// Lock polls before giving up
    #[arg(long, env = "VMEM_LOCK_POLL_ATTEMPTS", default_value_t = 60)]
    pub lock_poll_attempts: u32,

    /// Delay between export-state polls, in milliseconds
    #[arg(long, env = "VMEM_EXPORT_POLL_INTERVAL_MS", default_value_t = 1000)]
    pub export_poll_interval_ms: u64,

    /// Export-state polls before giving up
    #[arg(long, env = "VMEM_EXPORT_POLL_ATTEMPTS", default_value_t = 30)]
    pub export_poll_attempts: u32,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            gateway_vip: String::new(),
            gateway_mga: String::new(),
            gateway_mgb: String::new(),
            gateway_user: "admin".to_string(),
            gateway_password: String::new(),
            gateway_scheme: "https".to_string(),
            container: String::new(),
            device_id: String::new(),
            igroup: "openstack".to_string(),
            iscsi_target_prefix: "iqn.2004-02.com.vmem".to_string(),
            iscsi_port: 3260,
            max_name_length: 32,
            excluded_interfaces: ["eth0", "eth1", "eth2", "eth3"]
                .into_iter()
                .map(String::from)
                .collect(),
            session_timeout_secs: 900,
            lock_poll_interval_ms: 1000,
            lock_poll_attempts: 60,
            export_poll_interval_ms: 1000,
            export_poll_attempts: 30,
        }
    }
}

// Keep the password out of logs.
impl std::fmt::Debug for DriverConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DriverConfig")
            .field("gateway_vip", &self.gateway_vip)
            .field("gateway_mga", &self.gateway_mga)
            .field("gateway_mgb", &self.gateway_mgb)
            .field("gateway_user", &self.gateway_user)
            .field("gateway_scheme", &self.gateway_scheme)
            .field("container", &self.container)
            .field("device_id", &self.device_id)
            .field("igroup", &self.igroup)
            .field("iscsi_target_prefix", &self.iscsi_target_prefix)
            .field("iscsi_port", &self.iscsi_port)
            .field("max_name_length", &self.max_name_length)
            .field("excluded_interfaces", &self.excluded_interfaces)
            .field("session_timeout_secs", &self.session_timeout_secs)
            .finish_non_exhaustive()
    }
}

impl DriverConfig {
    /// Load a JSON config file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    fn endpoint(&self, address: &str) -> GatewayEndpoint {
        GatewayEndpoint::new(address)
            .with_credentials(&self.gateway_user, &self.gateway_password)
            .with_scheme(&self.gateway_scheme)
    }

    pub fn vip_endpoint(&self) -> GatewayEndpoint {
        self.endpoint(&self.gateway_vip)
    }

    pub fn mga_endpoint(&self) -> GatewayEndpoint {
        self.endpoint(&self.gateway_mga)
    }

    pub fn mgb_endpoint(&self) -> GatewayEndpoint {
        self.endpoint(&self.gateway_mgb)
    }

    pub fn session_timeout(&self) -> Duration {
        Duration::from_secs(self.session_timeout_secs)
    }

    pub fn lock_poll(&self) -> PollPolicy {
        PollPolicy::new(
            Duration::from_millis(self.lock_poll_interval_ms),
            self.lock_poll_attempts,
        )
    }

    pub fn export_poll(&self) -> PollPolicy {
        PollPolicy::new(
            Duration::from_millis(self.export_poll_interval_ms),
            self.export_poll_attempts,
        )
    }
}
