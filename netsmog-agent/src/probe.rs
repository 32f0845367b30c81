//! ICMP echo prober.
//!
//! One socket per probe, opened for the resolved address family and closed
//! when the probe returns or its future is dropped.

use async_trait::async_trait;
use netsmog_contracts::{ProbeError, Prober};
use std::net::IpAddr;
use std::sync::atomic::{AtomicU16, Ordering};
use std::time::{Duration, Instant};
use surge_ping::{Client, Config, PingIdentifier, PingSequence, SurgeError, ICMP};
use tokio::time::timeout;

/// Echo payload: `"ping"` repeated to 56 bytes.
const PAYLOAD_WORD: &[u8] = b"ping";
const PAYLOAD_REPEAT: usize = 14;

pub struct EchoProber {
    identifier: u16,
    sequence: AtomicU16,
    payload: Vec<u8>,
}

impl Default for EchoProber {
    fn default() -> Self {
        Self::new()
    }
}

impl EchoProber {
    pub fn new() -> Self {
        Self {
            identifier: (std::process::id() & 0xffff) as u16,
            sequence: AtomicU16::new(0),
            payload: PAYLOAD_WORD.repeat(PAYLOAD_REPEAT),
        }
    }

    fn next_sequence(&self) -> PingSequence {
        PingSequence(self.sequence.fetch_add(1, Ordering::Relaxed))
    }
}

/// Resolve hostname to IP address.
pub async fn resolve_host(host: &str) -> Result<IpAddr, std::io::Error> {
    if let Ok(ip) = host.parse::<IpAddr>() {
        return Ok(ip);
    }
    let addrs = tokio::net::lookup_host(format!("{host}:0")).await?;
    addrs
        .into_iter()
        .next()
        .map(|addr| addr.ip())
        .ok_or_else(|| std::io::Error::new(std::io::ErrorKind::NotFound, "no addresses found"))
}

fn client_for(ip: IpAddr) -> std::io::Result<Client> {
    match ip {
        IpAddr::V4(_) => Client::new(&Config::default()),
        IpAddr::V6(_) => Client::new(&Config::builder().kind(ICMP::V6).build()),
    }
}

#[async_trait]
impl Prober for EchoProber {
    async fn probe(&self, host: &str, deadline: Duration) -> Result<Duration, ProbeError> {
        let started = Instant::now();
        let resolution_error = |reason: String| ProbeError::Resolution {
            host: host.to_string(),
            reason,
        };

        let ip = timeout(deadline, resolve_host(host))
            .await
            .map_err(|_| resolution_error("resolution timed out".into()))?
            .map_err(|e| resolution_error(e.to_string()))?;

        let remaining = deadline.saturating_sub(started.elapsed());
        if remaining.is_zero() {
            return Err(ProbeError::Timeout(deadline));
        }

        let client = client_for(ip).map_err(|e| ProbeError::Transport(e.to_string()))?;
        let mut pinger = client.pinger(ip, PingIdentifier(self.identifier)).await;
        pinger.timeout(remaining);

        let sequence = self.next_sequence();
        let seq = sequence.0;
        // replies with another identifier or sequence are skipped by the pinger
        match timeout(remaining, pinger.ping(sequence, &self.payload)).await {
            Ok(Ok((_, rtt))) => {
                tracing::trace!(host, %ip, seq, rtt_ms = rtt.as_secs_f64() * 1000.0, "echo reply");
                Ok(rtt)
            }
            Ok(Err(SurgeError::Timeout { .. })) | Err(_) => Err(ProbeError::Timeout(deadline)),
            Ok(Err(e)) => Err(ProbeError::Transport(e.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payload_and_identifier() {
        let prober = EchoProber::new();
        assert_eq!(prober.payload.len(), 56);
        assert!(prober.payload.starts_with(b"pingping"));
        assert_eq!(prober.identifier, (std::process::id() & 0xffff) as u16);
    }

    #[test]
    fn test_sequence_increases() {
        let prober = EchoProber::new();
        let a = prober.next_sequence().0;
        let b = prober.next_sequence().0;
        assert_eq!(b, a.wrapping_add(1));
    }

    #[tokio::test]
    async fn test_literal_addresses_skip_dns() {
        assert_eq!(resolve_host("192.0.2.1").await.unwrap(), "192.0.2.1".parse::<IpAddr>().unwrap());
        assert!(resolve_host("::1").await.unwrap().is_ipv6());
    }

    #[tokio::test]
    async fn test_unresolvable_host() {
        let prober = EchoProber::new();
        let err = prober
            .probe("netsmog-does-not-exist.invalid", Duration::from_secs(2))
            .await
            .unwrap_err();
        assert!(matches!(err, ProbeError::Resolution { .. }), "{err:?}");
    }

    #[tokio::test]
    async fn test_silent_address_returns_within_deadline() {
        // TEST-NET-1 never answers; without ICMP privileges this is a transport error
        let prober = EchoProber::new();
        let deadline = Duration::from_millis(300);
        let started = Instant::now();
        let err = prober.probe("192.0.2.1", deadline).await.unwrap_err();
        assert!(
            matches!(err, ProbeError::Timeout(_) | ProbeError::Transport(_)),
            "{err:?}"
        );
        assert!(started.elapsed() < deadline + Duration::from_millis(500));
    }
}
