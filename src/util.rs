use std::net::{IpAddr, Ipv4Addr};

use tracing::debug;

const HOSTWATCH_PORT: &str = "HOSTWATCH_PORT";

const DEFAULT_PORT: u16 = 3030;

pub fn get_default_port() -> u16 {
    DEFAULT_PORT
}

pub fn get_port() -> u16 {
    let port_from_env = std::env::var(HOSTWATCH_PORT);
    port_from_env.map_or(DEFAULT_PORT, |res| res.parse().unwrap_or(DEFAULT_PORT))
}

const HOSTWATCH_ADDR: &str = "HOSTWATCH_ADDR";

const DEFAULT_ADDR: IpAddr = IpAddr::V4(Ipv4Addr::LOCALHOST);

pub fn get_default_addr() -> IpAddr {
    DEFAULT_ADDR
}

pub fn get_addr() -> IpAddr {
    let addr_from_env = std::env::var(HOSTWATCH_ADDR);
    addr_from_env.map_or(DEFAULT_ADDR, |res| res.parse().unwrap_or(DEFAULT_ADDR))
}

const HOSTWATCH_SECRET: &str = "HOSTWATCH_SECRET";

pub fn get_secret() -> Option<String> {
    let secret_from_env = std::env::var(HOSTWATCH_SECRET);
    secret_from_env.ok().filter(|secret| !secret.trim().is_empty())
}

/// Reads at most `limit` bytes of the response body. A read error ends the
/// body early; whatever arrived before it is returned.
pub(crate) async fn read_body_limited(mut response: reqwest::Response, limit: usize) -> Vec<u8> {
    let mut body = Vec::new();
    while body.len() < limit {
        match response.chunk().await {
            Ok(Some(chunk)) => {
                let remaining = limit - body.len();
                body.extend_from_slice(&chunk[..chunk.len().min(remaining)]);
            }
            Ok(None) => break,
            Err(e) => {
                debug!("failed to read response body: {}", e.without_url());
                break;
            }
        }
    }
    body
}
