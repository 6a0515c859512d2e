//! Typed array actions.
//!
//! Mutations on the array are named actions with string arguments. Each
//! variant maps to a stable action name and an ordered argument list that
//! the transport serializes as-is.

use serde::{Deserialize, Serialize};

/// Action names as understood by the gateway.
pub mod names {
    pub const CREATE_LUN: &str = "/vshare/actions/lun/create";
    pub const DELETE_LUNS: &str = "/vshare/actions/lun/bulk_delete";
    pub const EXPORT_LUN: &str = "/vshare/actions/lun/export";
    pub const UNEXPORT_LUN: &str = "/vshare/actions/lun/unexport";
    pub const CREATE_TARGET: &str = "/vshare/actions/iscsi/target/create";
    pub const DELETE_TARGET: &str = "/vshare/actions/iscsi/target/delete";
    pub const BIND_IP: &str = "/vshare/actions/iscsi/target/bind";
    pub const UNBIND_IP: &str = "/vshare/actions/iscsi/target/unbind";
    pub const ADD_INITIATORS: &str = "/vshare/actions/igroup/add_initiators";
    pub const REMOVE_INITIATORS: &str = "/vshare/actions/igroup/remove_initiators";
}

/// Wildcard accepted by export/unexport for targets and initiators.
pub const ALL: &str = "all";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Action {
    CreateLun {
        container: String,
        lun: String,
        size_gb: u64,
    },
    DeleteLuns {
        container: String,
        luns: Vec<String>,
    },
    /// Export a LUN to a target/igroup pair. `lun_id: None` lets the array
    /// assign the next free LUN number.
    ExportLun {
        container: String,
        lun: String,
        target: String,
        igroup: String,
        lun_id: Option<u32>,
    },
    /// Remove every export of a LUN.
    UnexportLun {
        container: String,
        lun: String,
    },
    CreateIscsiTarget {
        target: String,
    },
    DeleteIscsiTarget {
        target: String,
    },
    /// Bind one portal address to a target on the controller that owns it.
    BindIpToTarget {
        target: String,
        ip: String,
    },
    UnbindIpFromTarget {
        target: String,
        ip: String,
    },
    AddInitiators {
        igroup: String,
        initiators: Vec<String>,
    },
    RemoveInitiators {
        igroup: String,
        initiators: Vec<String>,
    },
}

impl Action {
    /// Gateway action name.
    pub fn name(&self) -> &'static str {
        match self {
            Action::CreateLun { .. } => names::CREATE_LUN,
            Action::DeleteLuns { .. } => names::DELETE_LUNS,
            Action::ExportLun { .. } => names::EXPORT_LUN,
            Action::UnexportLun { .. } => names::UNEXPORT_LUN,
            Action::CreateIscsiTarget { .. } => names::CREATE_TARGET,
            Action::DeleteIscsiTarget { .. } => names::DELETE_TARGET,
            Action::BindIpToTarget { .. } => names::BIND_IP,
            Action::UnbindIpFromTarget { .. } => names::UNBIND_IP,
            Action::AddInitiators { .. } => names::ADD_INITIATORS,
            Action::RemoveInitiators { .. } => names::REMOVE_INITIATORS,
        }
    }

    /// Ordered arguments. List-valued arguments repeat their key.
    pub fn args(&self) -> Vec<(&'static str, String)> {
        match self {
            Action::CreateLun {
                container,
                lun,
                size_gb,
            } => vec![
                ("container", container.clone()),
                ("lun", lun.clone()),
                ("size", format!("{}G", size_gb)),
                ("quantity", "1".to_string()),
                ("thin", "false".to_string()),
                ("readonly", "false".to_string()),
            ],
            Action::DeleteLuns { container, luns } => {
                let mut args = vec![("container", container.clone())];
                args.extend(luns.iter().map(|lun| ("lun", lun.clone())));
                args
            }
            Action::ExportLun {
                container,
                lun,
                target,
                igroup,
                lun_id,
            } => vec![
                ("container", container.clone()),
                ("lun", lun.clone()),
                ("target", target.clone()),
                ("initiator", igroup.clone()),
                (
                    "lun_id",
                    lun_id.map_or_else(|| "auto".to_string(), |id| id.to_string()),
                ),
            ],
            Action::UnexportLun { container, lun } => vec![
                ("container", container.clone()),
                ("lun", lun.clone()),
                ("target", ALL.to_string()),
                ("initiator", ALL.to_string()),
            ],
            Action::CreateIscsiTarget { target } | Action::DeleteIscsiTarget { target } => {
                vec![("target", target.clone())]
            }
            Action::BindIpToTarget { target, ip } | Action::UnbindIpFromTarget { target, ip } => {
                vec![("target", target.clone()), ("ip", ip.clone())]
            }
            Action::AddInitiators { igroup, initiators }
            | Action::RemoveInitiators { igroup, initiators } => {
                let mut args = vec![("igroup", igroup.clone())];
                args.extend(initiators.iter().map(|i| ("initiator", i.clone())));
                args
            }
        }
    }
}

/// Status returned by the gateway for an action. Code 0 is success; any
/// other code is a failure described by `message`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionResponse {
    pub code: i64,
    pub message: String,
}

impl ActionResponse {
    pub fn success() -> Self {
        Self {
            code: 0,
            message: "success".to_string(),
        }
    }

    pub fn failure(code: i64, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.code == 0
    }
}
