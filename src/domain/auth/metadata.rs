//! Inbound call metadata

use std::collections::HashMap;
use std::net::SocketAddr;

const GATEWAY_USER_AGENT_HEADER: &str = "grpcgateway-user-agent";
const USER_AGENT_HEADER: &str = "user-agent";
const FORWARDED_FOR_HEADER: &str = "x-forwarded-for";

/// Multi-valued, case-insensitive header map plus the transport peer
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestMetadata {
    values: HashMap<String, Vec<String>>,
    peer_addr: Option<SocketAddr>,
}

impl RequestMetadata {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a value under `key`
    pub fn insert(&mut self, key: &str, value: impl Into<String>) {
        self.values
            .entry(key.to_ascii_lowercase())
            .or_default()
            .push(value.into());
    }

    pub fn with(mut self, key: &str, value: impl Into<String>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn with_peer_addr(mut self, addr: SocketAddr) -> Self {
        self.peer_addr = Some(addr);
        self
    }

    /// All values stored under `key`
    pub fn get_all(&self, key: &str) -> &[String] {
        self.values
            .get(&key.to_ascii_lowercase())
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn first(&self, key: &str) -> Option<&str> {
        self.get_all(key).first().map(String::as_str)
    }

    pub fn peer_addr(&self) -> Option<SocketAddr> {
        self.peer_addr
    }

    /// Describe the client that sent this call
    pub fn client(&self) -> ClientMetadata {
        let user_agent = self
            .first(USER_AGENT_HEADER)
            .or_else(|| self.first(GATEWAY_USER_AGENT_HEADER))
            .unwrap_or_default()
            .to_string();

        // Forwarded header only when there is no peer
        let client_ip = self
            .peer_addr
            .map(|addr| addr.ip().to_string())
            .or_else(|| {
                self.first(FORWARDED_FOR_HEADER)
                    .and_then(|v| v.split(',').next())
                    .map(|v| v.trim().to_string())
                    .filter(|v| !v.is_empty())
            })
            .unwrap_or_default();

        ClientMetadata {
            user_agent,
            client_ip,
        }
    }
}

/// Client description recorded on sessions
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClientMetadata {
    pub user_agent: String,
    pub client_ip: String,
}
