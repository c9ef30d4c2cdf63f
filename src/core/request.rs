// src/core/request.rs

//! Defines the outbound `Request` value and the actions the client knows about.

use crate::core::protocol::encode_request;
use indexmap::IndexMap;

/// The action used for the authentication handshake.
pub const ACTION_LOGIN: &str = "login";
/// The action used to submit an opaque query string.
pub const ACTION_QUERY: &str = "query";

/// Parameter names carried by the well-known actions.
pub const PARAM_LOGIN: &str = "login";
pub const PARAM_PASS: &str = "pass";
pub const PARAM_QUERY_STRING: &str = "query_string";

/// A single outbound request: an action, the correlation id it was tagged with,
/// and its parameters in insertion order.
///
/// Parameters may only be accumulated before the request is handed to the send
/// path. After that the request is shared immutably with the correlation registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    action: String,
    id: u64,
    params: IndexMap<String, String>,
}

impl Request {
    /// Creates a request with no parameters.
    pub fn new(action: impl Into<String>, id: u64) -> Self {
        Self {
            action: action.into(),
            id,
            params: IndexMap::new(),
        }
    }

    /// Builds the login request for the given credentials.
    pub fn login(id: u64, login: &str, password: &str) -> Self {
        Self::new(ACTION_LOGIN, id)
            .with_param(PARAM_LOGIN, login)
            .with_param(PARAM_PASS, password)
    }

    /// Builds a query request carrying `query` verbatim.
    pub fn query(id: u64, query: &str) -> Self {
        Self::new(ACTION_QUERY, id).with_param(PARAM_QUERY_STRING, query)
    }

    /// Adds (or replaces) a parameter and returns `self` so calls can be chained.
    pub fn add_param(&mut self, name: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.params.insert(name.into(), value.into());
        self
    }

    /// Builder-style variant of [`Request::add_param`].
    pub fn with_param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.add_param(name, value);
        self
    }

    pub fn action(&self) -> &str {
        &self.action
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn params(&self) -> &IndexMap<String, String> {
        &self.params
    }

    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name).map(String::as_str)
    }

    pub fn is_login(&self) -> bool {
        self.action == ACTION_LOGIN
    }

    /// Renders the request into the text frame sent over the transport.
    pub fn to_wire(&self) -> String {
        encode_request(&self.action, self.id, &self.params)
    }
}
