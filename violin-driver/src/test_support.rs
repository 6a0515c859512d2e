use xg_client::testing::ScriptedSession;
use xg_client::{Gateway, GatewayRole, GatewaySet};

use crate::config::DriverConfig;
use crate::driver::ViolinDriver;

/// Driver over three scripted sessions, one per gateway.
pub(crate) fn driver_with(
    config: DriverConfig,
    vip: ScriptedSession,
    mga: ScriptedSession,
    mgb: ScriptedSession,
) -> ViolinDriver<ScriptedSession> {
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

/// Test config with the usual gateway addresses and fast polling.
pub(crate) fn config() -> DriverConfig {
    DriverConfig {
        gateway_vip: "1.1.1.1".to_string(),
        gateway_mga: "1.1.1.2".to_string(),
        gateway_mgb: "1.1.1.3".to_string(),
        container: "mycontainer".to_string(),
        device_id: "ABCD1234".to_string(),
        lock_poll_interval_ms: 100,
        lock_poll_attempts: 3,
        export_poll_interval_ms: 100,
        export_poll_attempts: 3,
        ..DriverConfig::default()
    }
}
