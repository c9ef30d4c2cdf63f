// src/client/mod.rs

//! The public façade: ties the codec, the correlation registry and the login
//! session together on top of a `Transport`.
//!
//! The transport drives the client through four callbacks, in this order:
//! `on_session_established` once, `on_message_received` for every text frame,
//! optionally `on_error`, and finally `on_closed`. Callers on other threads use
//! `wait_for_login` and `submit_query` concurrently with that inbound flow.

pub mod purger;
pub mod transport;
pub mod websocket;

pub use transport::Transport;
pub use websocket::{ConnectionHandle, WsTransport, connect};

use crate::config::{Config, RegistryConfig};
use crate::core::protocol::decode_flat;
use crate::core::registry::CorrelationRegistry;
use crate::core::request::Request;
use crate::core::session::{LoginState, SessionController};
use crate::core::stats::{ClientStats, StatsSnapshot};
use crate::core::ClientError;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, trace, warn};

/// Response field carrying the echoed correlation id.
const FIELD_ID: &str = "id";
/// Response field carrying the outcome discriminator.
const FIELD_TYPE: &str = "type";

/// The login identity sent in the first request of every session.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub login: String,
    pub password: String,
}

impl Credentials {
    pub fn new(login: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            login: login.into(),
            password: password.into(),
        }
    }
}

// The password is never written to logs.
impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("login", &self.login)
            .field("password", &"<redacted>")
            .finish()
    }
}

impl From<&Config> for Credentials {
    fn from(config: &Config) -> Self {
        Self::new(config.login.clone(), config.password.clone())
    }
}

/// Where the connection is in its lifecycle, as reported by the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionPhase {
    Connecting,
    Established,
    Closed {
        code: u16,
        reason: String,
        remote: bool,
    },
}

pub struct Client {
    credentials: Credentials,
    transport: Arc<dyn Transport>,
    registry: CorrelationRegistry,
    registry_config: RegistryConfig,
    session: SessionController,
    phase: Mutex<ConnectionPhase>,
    stats: ClientStats,
}

impl Client {
    pub fn new(
        credentials: Credentials,
        transport: Arc<dyn Transport>,
        registry_config: RegistryConfig,
    ) -> Self {
        Self {
            credentials,
            transport,
            registry: CorrelationRegistry::new(),
            registry_config,
            session: SessionController::new(),
            phase: Mutex::new(ConnectionPhase::Connecting),
            stats: ClientStats::new(),
        }
    }

    /// Called by the transport once the connection is up. Sends the login request.
    ///
    /// Only the first call per client has an effect. A failure to send is logged;
    /// it surfaces to callers as a `wait_for_login` timeout.
    pub fn on_session_established(&self) {
        {
            let mut phase = self.phase.lock();
            if *phase != ConnectionPhase::Connecting {
                warn!(phase = ?*phase, "Session established twice; ignoring");
                return;
            }
            *phase = ConnectionPhase::Established;
        }
        info!("Opened connection");

        let login = Request::login(
            self.registry.next_id(),
            &self.credentials.login,
            &self.credentials.password,
        );
        let id = login.id();
        // The controller must know the login id before the request can be answered.
        self.session.begin_login(id);
        if let Err(e) = self.send(login) {
            error!(id, "Failed to send login request: {e}");
        }
    }

    /// Called by the transport for every inbound text frame.
    ///
    /// Malformed frames and frames for unknown correlation ids are dropped.
    /// Nothing on this path returns an error.
    pub fn on_message_received(&self, raw: &str) {
        self.stats.increment_messages_received();
        trace!("Received: {raw}");

        let Some(response) = decode_flat(raw) else {
            self.stats.increment_messages_malformed();
            debug!("Dropping frame that is not a flat object");
            return;
        };
        let Some(id) = response
            .get(FIELD_ID)
            .and_then(|id| id.trim().parse::<u64>().ok())
        else {
            self.stats.increment_messages_malformed();
            debug!("Dropping frame without a numeric correlation id");
            return;
        };
        let Some(request) = self.registry.lookup(id) else {
            self.stats.increment_messages_unmatched();
            debug!(id, "Discarding response for an untracked request");
            return;
        };

        self.stats.increment_messages_routed();
        let response_type = response.get(FIELD_TYPE).map(String::as_str);

        if request.is_login() {
            // The login request is one-shot: once it has been acted upon it no
            // longer needs to be tracked.
            if self.session.on_login_response(id, response_type) {
                self.registry.remove(id);
            }
            return;
        }

        trace!(
            id,
            action = request.action(),
            response_type = response_type.unwrap_or("<missing>"),
            "Routed response"
        );
    }

    /// Called by the transport when the connection reports an error.
    /// A terminal `on_closed` is expected to follow.
    pub fn on_error(&self, error: &ClientError) {
        error!("Transport error: {error}");
    }

    /// Called by the transport once the connection is gone. There is no reconnect.
    pub fn on_closed(&self, code: u16, reason: &str, remote: bool) {
        info!(
            code,
            reason,
            "Connection closed by {}",
            if remote { "remote peer" } else { "us" }
        );
        *self.phase.lock() = ConnectionPhase::Closed {
            code,
            reason: reason.to_string(),
            remote,
        };
    }

    /// Tags a new request for `action` with a fresh correlation id.
    pub fn new_request(&self, action: &str) -> Request {
        Request::new(action, self.registry.next_id())
    }

    /// Registers `request` and hands its wire form to the transport.
    /// A request that could not be handed over is no longer tracked.
    pub fn send(&self, request: Request) -> Result<(), ClientError> {
        let id = request.id();
        let request = Arc::new(request);
        self.registry.register(Arc::clone(&request));

        let wire = request.to_wire();
        debug!(id, action = request.action(), "Sending request");
        if let Err(e) = self.transport.send_text(wire) {
            self.registry.remove(id);
            return Err(e);
        }
        self.stats.increment_requests_sent();
        Ok(())
    }

    /// Sends a `query` request and returns its correlation id without waiting
    /// for a response. It is not gated on the login outcome.
    pub fn submit_query(&self, query: &str) -> Result<u64, ClientError> {
        let request = Request::query(self.registry.next_id(), query);
        let id = request.id();
        self.send(request)?;
        Ok(id)
    }

    /// Blocks the calling thread until the login outcome is known or `timeout` elapses.
    /// Returns `true` only if the login succeeded.
    ///
    /// Do not call this from an async task; use [`Client::wait_for_login_async`].
    pub fn wait_for_login(&self, timeout: Duration) -> bool {
        self.session.wait_for_login(timeout)
    }

    pub async fn wait_for_login_async(&self, timeout: Duration) -> bool {
        self.session.wait_for_login_async(timeout).await
    }

    /// Evicts registry entries older than the configured time-to-live.
    /// Returns the number of evicted entries; `0` when eviction is disabled.
    pub fn purge_expired_requests(&self) -> usize {
        let Some(ttl) = self.registry_config.ttl() else {
            return 0;
        };
        let evicted = self.registry.purge_expired(ttl);
        if evicted > 0 {
            self.stats.add_requests_expired(evicted as u64);
            debug!(evicted, "Evicted expired requests from the registry");
        }
        evicted
    }

    pub fn login_state(&self) -> LoginState {
        self.session.state()
    }

    pub fn is_logged_in(&self) -> bool {
        self.session.is_logged_in()
    }

    pub fn phase(&self) -> ConnectionPhase {
        self.phase.lock().clone()
    }

    /// Whether the session is established and the transport still accepts frames.
    pub fn is_connected(&self) -> bool {
        *self.phase.lock() == ConnectionPhase::Established && self.transport.is_open()
    }

    pub fn registry(&self) -> &CorrelationRegistry {
        &self.registry
    }

    pub fn registry_config(&self) -> &RegistryConfig {
        &self.registry_config
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }
}
