//! Gateway sessions and the fixed vip/mga/mgb set.
//!
//! Each gateway keeps its own session start instant. Before every array
//! interaction the driver calls [`GatewaySet::login`] with `force = false`,
//! which only re-authenticates sessions that are missing or stale.

use std::fmt::{self, Display};
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::error::{Result, XgError};
use crate::session::XgSession;

/// Default age after which a session is re-authenticated.
pub const DEFAULT_SESSION_TIMEOUT: Duration = Duration::from_secs(900);

// ============================================================================
// GatewayRole
// ============================================================================

/// Which management endpoint a session talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GatewayRole {
    /// Cluster virtual IP
    Vip,
    /// Controller A
    Mga,
    /// Controller B
    Mgb,
}

impl Display for GatewayRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GatewayRole::Vip => write!(f, "vip"),
            GatewayRole::Mga => write!(f, "mga"),
            GatewayRole::Mgb => write!(f, "mgb"),
        }
    }
}

impl FromStr for GatewayRole {
    type Err = GatewayRoleParseError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "vip" | "" => Ok(GatewayRole::Vip),
            "mga" => Ok(GatewayRole::Mga),
            "mgb" => Ok(GatewayRole::Mgb),
            _ => Err(GatewayRoleParseError(s.to_string())),
        }
    }
}

/// Error returned when parsing an invalid gateway role.
#[derive(Debug, Clone)]
pub struct GatewayRoleParseError(String);

impl Display for GatewayRoleParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "unknown gateway '{}': expected 'vip', 'mga', or 'mgb'",
            self.0
        )
    }
}

impl std::error::Error for GatewayRoleParseError {}

// ============================================================================
// GatewayEndpoint
// ============================================================================

/// Where and how to reach a gateway.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewayEndpoint {
    pub address: String,
    pub username: String,
    #[serde(skip_serializing)]
    pub password: String,
    /// Transport scheme, `https` unless the gateway is configured otherwise
    pub scheme: String,
}

impl GatewayEndpoint {
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            username: "admin".to_string(),
            password: String::new(),
            scheme: "https".to_string(),
        }
    }

    pub fn with_credentials(
        mut self,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        self.username = username.into();
        self.password = password.into();
        self
    }

    pub fn with_scheme(mut self, scheme: impl Into<String>) -> Self {
        self.scheme = scheme.into();
        self
    }

    /// Base URL of the gateway.
    pub fn url(&self) -> String {
        format!("{}://{}", self.scheme, self.address)
    }
}

// Keep the password out of logs.
impl fmt::Debug for GatewayEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GatewayEndpoint")
            .field("address", &self.address)
            .field("username", &self.username)
            .field("scheme", &self.scheme)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Gateway
// ============================================================================

/// One authenticated management session plus its staleness timer.
pub struct Gateway<S> {
    role: GatewayRole,
    endpoint: GatewayEndpoint,
    session: S,
    session_timeout: Duration,
    /// Set on successful login, cleared on failure or close
    started_at: RwLock<Option<Instant>>,
}

impl<S: XgSession> Gateway<S> {
    pub fn new(role: GatewayRole, endpoint: GatewayEndpoint, session: S) -> Self {
        Self {
            role,
            endpoint,
            session,
            session_timeout: DEFAULT_SESSION_TIMEOUT,
            started_at: RwLock::new(None),
        }
    }

    pub fn with_session_timeout(mut self, timeout: Duration) -> Self {
        self.session_timeout = timeout;
        self
    }

    pub fn role(&self) -> GatewayRole {
        self.role
    }

    pub fn address(&self) -> &str {
        &self.endpoint.address
    }

    pub fn endpoint(&self) -> &GatewayEndpoint {
        &self.endpoint
    }

    /// The underlying transport session.
    pub fn session(&self) -> &S {
        &self.session
    }

    pub async fn is_authenticated(&self) -> bool {
        self.started_at.read().await.is_some()
    }

    /// Age of the current session, if one exists.
    pub async fn session_age(&self) -> Option<Duration> {
        self.started_at.read().await.map(|t| t.elapsed())
    }

    /// Re-authenticate when forced, when no session exists, or when the
    /// session is at least `session_timeout` old.
    ///
    /// Returns `true` if a login was performed. Concurrent callers racing on
    /// a stale session may each log in; the last login wins.
    pub async fn login(&self, force: bool) -> Result<bool> {
        // Fast path: read lock only
        if !force {
            let started = self.started_at.read().await;
            if let Some(t) = *started {
                if t.elapsed() < self.session_timeout {
                    return Ok(false);
                }
            }
        }

        debug!(
            gateway = %self.role,
            address = %self.endpoint.address,
            force,
            "Logging in"
        );

        if let Err(e) = self.session.login().await {
            *self.started_at.write().await = None;
            warn!(
                gateway = %self.role,
                address = %self.endpoint.address,
                error = %e,
                "Login failed"
            );
            return Err(match e {
                XgError::LoginFailed { .. } => e,
                other => XgError::LoginFailed {
                    gateway: self.endpoint.address.clone(),
                    reason: other.to_string(),
                },
            });
        }

        *self.started_at.write().await = Some(Instant::now());
        info!(gateway = %self.role, address = %self.endpoint.address, "Session established");
        Ok(true)
    }

    /// Close the session and forget its start instant.
    pub async fn close(&self) -> Result<()> {
        *self.started_at.write().await = None;
        self.session.close().await
    }
}

// ============================================================================
// GatewaySet
// ============================================================================

/// The three management sessions, addressed by role.
pub struct GatewaySet<S> {
    pub vip: Gateway<S>,
    pub mga: Gateway<S>,
    pub mgb: Gateway<S>,
}

impl<S: XgSession> GatewaySet<S> {
    pub fn new(vip: Gateway<S>, mga: Gateway<S>, mgb: Gateway<S>) -> Self {
        Self { vip, mga, mgb }
    }

    /// Build the set from three endpoints, opening a session for each.
    pub fn open(
        vip: GatewayEndpoint,
        mga: GatewayEndpoint,
        mgb: GatewayEndpoint,
        session_timeout: Duration,
        mut open: impl FnMut(GatewayRole, &GatewayEndpoint) -> S,
    ) -> Self {
        let mut gateway = |role, endpoint: GatewayEndpoint| {
            let session = open(role, &endpoint);
            Gateway::new(role, endpoint, session).with_session_timeout(session_timeout)
        };

        Self {
            vip: gateway(GatewayRole::Vip, vip),
            mga: gateway(GatewayRole::Mga, mga),
            mgb: gateway(GatewayRole::Mgb, mgb),
        }
    }

    pub fn get(&self, role: GatewayRole) -> &Gateway<S> {
        match role {
            GatewayRole::Vip => &self.vip,
            GatewayRole::Mga => &self.mga,
            GatewayRole::Mgb => &self.mgb,
        }
    }

    /// Log in all three gateways as needed. Returns `true` if any of them
    /// re-authenticated.
    pub async fn login(&self, force: bool) -> Result<bool> {
        let (vip, mga, mgb) = tokio::try_join!(
            self.vip.login(force),
            self.mga.login(force),
            self.mgb.login(force)
        )?;
        Ok(vip || mga || mgb)
    }

    /// Close all three sessions. Every gateway is closed even if an earlier
    /// one fails; the first failure is returned.
    pub async fn close(&self) -> Result<()> {
        let mut first_error = None;
        for gateway in [&self.vip, &self.mga, &self.mgb] {
            if let Err(e) = gateway.close().await {
                warn!(gateway = %gateway.role(), error = %e, "Failed to close session");
                if first_error.is_none() {
                    first_error = Some(e);
                }
            }
        }
        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}
