//! Configuration-tree paths read by the driver.

pub const SYSTEM_RELEASE: &str = "/system/version/release";
pub const SYSTEM_HOSTNAME: &str = "/system/hostname";
pub const SYSTEM_MFR: &str = "/hwinfo/state/system_mfr";
pub const ISCSI_ENABLE: &str = "/vshare/config/iscsi/enable";
pub const LOCAL_CONTAINERS: &str = "/vshare/state/local/container/*";
pub const INTERFACES: &str = "/net/interface/config/*";

/// Prefix of the children returned for [`LOCAL_CONTAINERS`].
pub const LOCAL_CONTAINER_PREFIX: &str = "/vshare/state/local/container/";
/// Prefix of the children returned for [`INTERFACES`].
pub const INTERFACE_PREFIX: &str = "/net/interface/config/";

pub fn igroup(igroup: &str) -> String {
    format!("/vshare/config/igroup/{}", igroup)
}

pub fn device_id(container: &str) -> String {
    format!("/media/state/array/{}/chassis/system/dev_id", container)
}

pub fn chassis_type(container: &str) -> String {
    format!("/media/state/array/{}/chassis/system/type", container)
}

pub fn container_lock(container: &str) -> String {
    format!("/vshare/state/global/1/container/{}/lock", container)
}

pub fn total_bytes(container: &str) -> String {
    format!("/vshare/state/global/1/container/{}/total_bytes", container)
}

pub fn alloc_bytes(container: &str) -> String {
    format!("/vshare/state/global/1/container/{}/alloc_bytes", container)
}

pub fn interface_ip(interface: &str) -> String {
    format!("/net/interface/state/{}/addr/ipv4/1/ip", interface)
}

pub fn interface_link_up(interface: &str) -> String {
    format!("/net/interface/state/{}/flags/link_up", interface)
}

pub fn lun_export(container: &str, lun: &str) -> String {
    format!("/vshare/config/export/container/{}/lun/{}", container, lun)
}

pub fn lun_id(container: &str, lun: &str, iqn: &str, igroup: &str) -> String {
    format!(
        "{}/target/{}/initiator/{}/lun_id",
        lun_export(container, lun),
        iqn,
        igroup
    )
}
