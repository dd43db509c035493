//! Tunnel collaborator (spec §6.3): an optional component that exposes the
//! local WS endpoint under a public URL (e.g. for participants outside the
//! coordinator's network). Failures here are non-fatal by design — a
//! deployment with no reachable public URL just falls back to
//! `Config::public_base_url`.

use async_trait::async_trait;

#[derive(Debug, Clone, thiserror::Error)]
pub enum TunnelError {
    #[error("tunnel unavailable: {0}")]
    Unavailable(String),
}

#[async_trait]
pub trait Tunnel: Send + Sync {
    /// Start exposing `local_port` publicly, returning the externally
    /// reachable base URL on success.
    async fn start(&self, local_port: u16) -> Result<String, TunnelError>;

    /// Tear down the tunnel. Best-effort; errors are logged, never
    /// propagated (a failed teardown does not fail process shutdown).
    async fn stop(&self);
}

/// Default tunnel: does nothing. Used whenever `Config::tunnel_enabled` is
/// `false`, or as the fallback when a real tunnel provider fails to start
/// (spec §6.3: tunnel failures are non-fatal).
pub struct NoopTunnel;

#[async_trait]
impl Tunnel for NoopTunnel {
    async fn start(&self, _local_port: u16) -> Result<String, TunnelError> {
        Err(TunnelError::Unavailable("no tunnel provider configured".into()))
    }

    async fn stop(&self) {}
}

/// Attempt to start `tunnel`, falling back to `public_base_url` (and
/// logging a warning) on failure rather than aborting startup.
pub async fn start_or_fallback(tunnel: &dyn Tunnel, local_port: u16, public_base_url: &str) -> String {
    match tunnel.start(local_port).await {
        Ok(url) => {
            tracing::info!(url = %url, "tunnel established");
            url
        }
        Err(e) => {
            tracing::warn!(error = %e, fallback = %public_base_url, "tunnel unavailable, using configured public base URL");
            public_base_url.to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn noop_tunnel_falls_back() {
        let url = start_or_fallback(&NoopTunnel, 8080, "https://example.test").await;
        assert_eq!(url, "https://example.test");
    }
}
