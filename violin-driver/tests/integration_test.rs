//! Integration tests for violin-driver
//!
//! These drive the public `ViolinDriver` API against scripted gateway
//! sessions. Tests focus on:
//! - Setup discovery followed by validation
//! - The full volume lifecycle across all three gateways
//! - Rollback when an export cannot be completed
//! - Per-IP portal binding
//! - Session re-authentication

use std::time::Duration;

use violin_driver::{CapacityGb, DriverConfig, Error, ExportInfo, ViolinDriver, Volume};
use xg_client::action::names;
use xg_client::testing::ScriptedSession;
use xg_client::{Action, Gateway, GatewayRole, GatewaySet};

const GB: u64 = 1024 * 1024 * 1024;
const EXPORT_NODE: &str = "/vshare/config/export/container/mycontainer/lun/vol-01";
const LUN_ID_NODE: &str = concat!(
    "/vshare/config/export/container/mycontainer/lun/vol-01",
    "/target/iqn.2004-02.com.vmem:MGA-vol-01",
    "/initiator/openstack/lun_id",
);

fn config() -> DriverConfig {
    DriverConfig {
        gateway_vip: "1.1.1.1".to_string(),
        gateway_mga: "1.1.1.2".to_string(),
        gateway_mgb: "1.1.1.3".to_string(),
        lock_poll_interval_ms: 100,
        lock_poll_attempts: 5,
        export_poll_interval_ms: 100,
        export_poll_attempts: 3,
        session_timeout_secs: 60,
        ..DriverConfig::default()
    }
}

fn controller(hostname: &str, ip: &str) -> ScriptedSession {
    ScriptedSession::new()
        .with_node("/system/hostname", hostname)
        .with_node("/net/interface/config/eth0", "eth0")
        .with_node("/net/interface/config/eth4", "eth4")
        .with_node("/net/interface/state/eth0/addr/ipv4/1/ip", "10.0.0.1")
        .with_node("/net/interface/state/eth0/flags/link_up", true)
        .with_node("/net/interface/state/eth4/addr/ipv4/1/ip", ip)
        .with_node("/net/interface/state/eth4/flags/link_up", true)
}

fn cluster() -> ScriptedSession {
    ScriptedSession::new()
        .with_node("/system/version/release", "G5.5.3")
        .with_node("/system/hostname", "CLUSTER")
        .with_node("/vshare/state/local/container/mycontainer", "mycontainer")
        .with_node("/media/state/array/mycontainer/chassis/system/dev_id", "ABCD1234")
        .with_node("/vshare/config/iscsi/enable", true)
        .with_node("/vshare/config/igroup/openstack", "openstack")
        .with_node("/vshare/state/global/1/container/mycontainer/total_bytes", 100 * GB)
        .with_node("/vshare/state/global/1/container/mycontainer/alloc_bytes", 25 * GB)
        .with_node("/media/state/array/mycontainer/chassis/system/type", "V6000")
        .with_node("/hwinfo/state/system_mfr", "Violin Memory, Inc.")
}

fn driver(
    vip: ScriptedSession,
    mga: ScriptedSession,
    mgb: ScriptedSession,
) -> ViolinDriver<ScriptedSession> {
    let config = config();
    let gateway = |role, endpoint, session| {
        Gateway::new(role, endpoint, session).with_session_timeout(config.session_timeout())
    };
    let gateways = GatewaySet::new(
        gateway(GatewayRole::Vip, config.vip_endpoint(), vip),
        gateway(GatewayRole::Mga, config.mga_endpoint(), mga),
        gateway(GatewayRole::Mgb, config.mgb_endpoint(), mgb),
    );
    ViolinDriver::new(config, gateways)
}

async fn ready_driver() -> ViolinDriver<ScriptedSession> {
    let mut driver = driver(
        cluster(),
        controller("MGA", "1.1.1.4"),
        controller("MGB", "1.1.1.5"),
    );
    driver.do_setup().await.unwrap();
    driver.check_for_setup_error().await.unwrap();
    driver
}

// ============================================================================
// Setup
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_setup_discovers_and_validates() {
    let driver = ready_driver().await;

    assert_eq!(driver.array_version(), Some("G5.5.3"));
    assert_eq!(driver.container(), "mycontainer");
    assert_eq!(driver.device_id(), "ABCD1234");
}

#[tokio::test(start_paused = true)]
async fn test_setup_fails_without_controller_portals() {
    let mut driver = driver(
        cluster(),
        ScriptedSession::new().with_node("/net/interface/config/eth1", "eth1"),
        controller("MGB", "1.1.1.5"),
    );
    driver.do_setup().await.unwrap();

    let err = driver.check_for_setup_error().await.unwrap_err();
    assert!(matches!(err, Error::InvalidBackendConfig(ref msg) if msg.contains("mg-a")));
    assert_eq!(err.code(), "invalid_config");
}

// ============================================================================
// Volume lifecycle
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_volume_lifecycle() {
    let driver = ready_driver().await;
    let volume: Volume = serde_json::from_str(r#"{"name": "vol-01", "size": "10"}"#).unwrap();
    let vip = driver.gateways().vip.session();

    driver.create_volume(&volume).await.unwrap();

    // The array makes the export visible once the LUN is exported
    vip.set_node(EXPORT_NODE, "vol-01");
    vip.set_node(LUN_ID_NODE, 0u64);
    let export = driver.create_export(&volume).await.unwrap();
    assert_eq!(
        export,
        ExportInfo {
            target: "vol-01".to_string(),
            iqn: "iqn.2004-02.com.vmem:MGA-vol-01".to_string(),
            lun_id: "0".to_string(),
            provider_location: "1.1.1.4:3260, iqn.2004-02.com.vmem:MGA-vol-01 0".to_string(),
        }
    );

    let initiator = "iqn.1993-08.org.debian:01:abcdef";
    driver.initialize_connection(initiator).await.unwrap();
    driver.terminate_connection(initiator).await.unwrap();

    vip.remove_node(EXPORT_NODE);
    driver.remove_export(&volume).await.unwrap();
    driver.delete_volume(&volume).await.unwrap();

    assert_eq!(
        vip.action_names(),
        vec![
            names::CREATE_LUN,
            names::CREATE_TARGET,
            names::EXPORT_LUN,
            names::ADD_INITIATORS,
            names::REMOVE_INITIATORS,
            names::UNEXPORT_LUN,
            names::DELETE_TARGET,
            names::DELETE_LUNS,
        ]
    );
    for mg in [&driver.gateways().mga, &driver.gateways().mgb] {
        assert_eq!(mg.session().action_names(), vec![names::BIND_IP, names::UNBIND_IP]);
    }

    let stats = driver.get_volume_stats(true).await;
    assert_eq!(stats.total_capacity_gb, CapacityGb::Known(100));
    assert_eq!(stats.free_capacity_gb, CapacityGb::Known(75));
    assert_eq!(stats.volume_backend_name, "V6000");
    assert_eq!(stats.vendor_name, "Violin Memory, Inc.");

    driver.close().await.unwrap();
    assert_eq!(vip.close_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_long_volume_names_are_truncated() {
    let driver = ready_driver().await;
    let volume = Volume::new("volume-0123456789abcdef0123456789abcdef", 1);

    driver.create_volume(&volume).await.unwrap();
    driver.delete_volume(&volume).await.unwrap();

    let actions = driver.gateways().vip.session().actions();
    assert_eq!(
        actions[0],
        Action::CreateLun {
            container: "mycontainer".to_string(),
            lun: "volume-0123456789abcdef012345678".to_string(),
            size_gb: 1,
        }
    );
    assert_eq!(
        actions[1],
        Action::DeleteLuns {
            container: "mycontainer".to_string(),
            luns: vec!["volume-0123456789abcdef012345678".to_string()],
        }
    );
}

#[tokio::test(start_paused = true)]
async fn test_create_export_rolls_back_when_lun_id_missing() {
    let driver = ready_driver().await;
    let volume = Volume::new("vol-01", 1);

    let err = driver.create_export(&volume).await.unwrap_err();
    assert!(matches!(err, Error::NodeNotFound(ref path) if path == LUN_ID_NODE));

    assert_eq!(
        driver.gateways().vip.session().action_names(),
        vec![
            names::CREATE_TARGET,
            names::EXPORT_LUN,
            names::UNEXPORT_LUN,
            names::DELETE_TARGET,
        ]
    );
    assert_eq!(
        driver.gateways().mga.session().action_names(),
        vec![names::BIND_IP, names::UNBIND_IP]
    );
}

#[tokio::test(start_paused = true)]
async fn test_create_export_requires_portals() {
    let driver = driver(cluster(), ScriptedSession::new(), ScriptedSession::new());

    let err = driver.create_export(&Volume::new("vol-01", 1)).await.unwrap_err();
    assert_eq!(err.code(), "invalid_config");
    assert!(driver.gateways().vip.session().actions().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_export_binds_and_unbinds_every_portal_ip() {
    let mga = controller("MGA", "1.1.1.4")
        .with_node("/net/interface/config/eth5", "eth5")
        .with_node("/net/interface/state/eth5/addr/ipv4/1/ip", "1.1.1.6")
        .with_node("/net/interface/state/eth5/flags/link_up", true);
    let mut driver = driver(cluster(), mga, controller("MGB", "1.1.1.5"));
    driver.do_setup().await.unwrap();
    driver.check_for_setup_error().await.unwrap();

    let volume = Volume::new("vol-01", 1);
    let vip = driver.gateways().vip.session();
    vip.set_node(EXPORT_NODE, "vol-01");
    vip.set_node(LUN_ID_NODE, 0u64);
    driver.create_export(&volume).await.unwrap();
    vip.remove_node(EXPORT_NODE);
    driver.remove_export(&volume).await.unwrap();

    let ip_actions = |session: &ScriptedSession| -> Vec<(&'static str, String)> {
        session
            .actions()
            .into_iter()
            .filter_map(|action| match action {
                Action::BindIpToTarget { ip, .. } => Some((names::BIND_IP, ip)),
                Action::UnbindIpFromTarget { ip, .. } => Some((names::UNBIND_IP, ip)),
                _ => None,
            })
            .collect()
    };
    assert_eq!(
        ip_actions(driver.gateways().mga.session()),
        vec![
            (names::BIND_IP, "1.1.1.4".to_string()),
            (names::BIND_IP, "1.1.1.6".to_string()),
            (names::UNBIND_IP, "1.1.1.4".to_string()),
            (names::UNBIND_IP, "1.1.1.6".to_string()),
        ]
    );
    assert_eq!(
        ip_actions(driver.gateways().mgb.session()),
        vec![
            (names::BIND_IP, "1.1.1.5".to_string()),
            (names::UNBIND_IP, "1.1.1.5".to_string()),
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn test_create_export_rolls_back_failed_bind() {
    let mgb = controller("MGB", "1.1.1.5").fail_action(names::BIND_IP, 1, "bind fail");
    let mut driver = driver(cluster(), controller("MGA", "1.1.1.4"), mgb);
    driver.do_setup().await.unwrap();
    driver.check_for_setup_error().await.unwrap();

    let err = driver.create_export(&Volume::new("vol-01", 1)).await.unwrap_err();
    assert_eq!(err.to_string(), "bind iSCSI IP failed for 'vol-01': bind fail");

    assert_eq!(
        driver.gateways().vip.session().action_names(),
        vec![names::CREATE_TARGET, names::DELETE_TARGET]
    );
    assert_eq!(
        driver.gateways().mga.session().action_names(),
        vec![names::BIND_IP, names::UNBIND_IP]
    );
}

#[tokio::test(start_paused = true)]
async fn test_create_volume_waits_out_container_lock() {
    let driver = ready_driver().await;
    let vip = driver.gateways().vip.session();
    let lock = "/vshare/state/global/1/container/mycontainer/lock";
    vip.set_node(lock, true);

    let err = driver.create_volume(&Volume::new("vol-01", 1)).await.unwrap_err();
    assert_eq!(err.code(), "operation_failed");
    assert!(vip.actions().is_empty());

    vip.set_node(lock, false);
    driver.create_volume(&Volume::new("vol-01", 1)).await.unwrap();
    assert_eq!(vip.action_names(), vec![names::CREATE_LUN]);
}

// ============================================================================
// Sessions
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_login_refreshes_only_stale_sessions() {
    let driver = ready_driver().await;
    let vip = driver.gateways().vip.session();
    let logins = vip.login_count();

    assert!(!driver.login(false).await.unwrap());
    assert_eq!(vip.login_count(), logins);

    tokio::time::advance(Duration::from_secs(60)).await;
    assert!(driver.login(false).await.unwrap());
    assert_eq!(vip.login_count(), logins + 1);

    assert!(driver.login(true).await.unwrap());
    assert_eq!(vip.login_count(), logins + 2);
}

#[tokio::test(start_paused = true)]
async fn test_login_failure_aborts_operation() {
    let driver = ready_driver().await;
    let vip = driver.gateways().vip.session();
    vip.set_login_error(Some("bad password"));

    tokio::time::advance(Duration::from_secs(60)).await;
    let err = driver.create_volume(&Volume::new("vol-01", 1)).await.unwrap_err();
    assert_eq!(err.code(), "login_failed");
    assert!(vip.actions().is_empty());
    assert!(!driver.gateways().vip.is_authenticated().await);
}
