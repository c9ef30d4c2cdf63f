// src/core/session/controller.rs

//! Owns the login handshake state machine.
//!
//! The controller starts in `AwaitingLogin`. The first response that carries the
//! pending login correlation id moves it to either `LoggedIn` or `LoginFailed`
//! and opens the gate. Anything that arrives afterwards is ignored for login
//! purposes.

use crate::core::session::gate::Gate;
use parking_lot::Mutex;
use std::fmt;
use std::time::Duration;
use tracing::{debug, info, warn};

/// The response type that marks a successful login.
pub const RESPONSE_TYPE_OK: &str = "ok";

/// The observable state of the login handshake.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginState {
    /// The login request may or may not have been sent yet; no answer has been seen.
    AwaitingLogin,
    /// The server accepted the credentials.
    LoggedIn,
    /// The server answered the login request with a non-`ok` type.
    LoginFailed,
}

impl LoginState {
    pub fn is_terminal(self) -> bool {
        !matches!(self, LoginState::AwaitingLogin)
    }
}

impl fmt::Display for LoginState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LoginState::AwaitingLogin => "awaiting-login",
            LoginState::LoggedIn => "logged-in",
            LoginState::LoginFailed => "login-failed",
        };
        f.write_str(s)
    }
}

#[derive(Debug)]
struct Handshake {
    state: LoginState,
    pending_login_id: Option<u64>,
}

#[derive(Debug)]
pub struct SessionController {
    handshake: Mutex<Handshake>,
    gate: Gate,
}

impl Default for SessionController {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionController {
    pub fn new() -> Self {
        Self {
            handshake: Mutex::new(Handshake {
                state: LoginState::AwaitingLogin,
                pending_login_id: None,
            }),
            gate: Gate::new(),
        }
    }

    /// Records the correlation id of the login request that was just sent.
    /// Returns `false` if a login is already pending or has completed.
    pub fn begin_login(&self, id: u64) -> bool {
        let mut handshake = self.handshake.lock();
        if handshake.pending_login_id.is_some() || handshake.state.is_terminal() {
            warn!(
                id,
                state = %handshake.state,
                "Ignoring a second login attempt on the same session"
            );
            return false;
        }
        handshake.pending_login_id = Some(id);
        debug!(id, "Login request in flight");
        true
    }

    /// The correlation id of the login request, if one was sent.
    pub fn pending_login_id(&self) -> Option<u64> {
        self.handshake.lock().pending_login_id
    }

    /// Returns `true` if `id` is the login request and no answer has been processed yet.
    pub fn is_awaiting(&self, id: u64) -> bool {
        let handshake = self.handshake.lock();
        handshake.state == LoginState::AwaitingLogin && handshake.pending_login_id == Some(id)
    }

    /// Applies a response to the login request.
    ///
    /// Acts at most once: returns `true` only for the response that performed
    /// the transition. The gate is opened after the state is updated, so a
    /// released waiter always sees the final state.
    pub fn on_login_response(&self, id: u64, response_type: Option<&str>) -> bool {
        let new_state = {
            let mut handshake = self.handshake.lock();
            if handshake.state.is_terminal() || handshake.pending_login_id != Some(id) {
                return false;
            }
            handshake.state = if response_type == Some(RESPONSE_TYPE_OK) {
                LoginState::LoggedIn
            } else {
                LoginState::LoginFailed
            };
            handshake.state
        };

        match new_state {
            LoginState::LoggedIn => info!(id, "Login accepted"),
            _ => warn!(
                id,
                response_type = response_type.unwrap_or("<missing>"),
                "Login rejected"
            ),
        }
        self.gate.open();
        true
    }

    pub fn state(&self) -> LoginState {
        self.handshake.lock().state
    }

    pub fn is_logged_in(&self) -> bool {
        self.state() == LoginState::LoggedIn
    }

    pub fn gate(&self) -> &Gate {
        &self.gate
    }

    /// Blocks until the login outcome is known or `timeout` elapses.
    /// Returns `true` only if the login succeeded in time.
    pub fn wait_for_login(&self, timeout: Duration) -> bool {
        self.gate.wait_timeout(timeout) && self.is_logged_in()
    }

    /// Async variant of [`SessionController::wait_for_login`].
    pub async fn wait_for_login_async(&self, timeout: Duration) -> bool {
        self.gate.wait(timeout).await && self.is_logged_in()
    }
}
