//! Reachability probing, used before a batch starts and on-demand by the CLI
//! to distinguish "offline" from a genuine per-item download failure.

use std::net::{SocketAddr, TcpStream, ToSocketAddrs};
use std::time::Duration;

/// Host:port probed by [`probe_tcp`] when the caller doesn't supply one.
const DEFAULT_TCP_PROBE: &str = "8.8.8.8:53";
/// URL probed by [`probe_http`] when the caller doesn't supply one.
const DEFAULT_HTTP_PROBE: &str = "https://www.google.com";
const PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// Result of a reachability check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetworkStatus {
	Online,
	Offline,
}

/// Opens a TCP connection to `addr` (or [`DEFAULT_TCP_PROBE`] if `None`) with a
/// 5 second timeout. Cheaper than [`probe_http`] and sufficient for most
/// "are we online at all" checks.
#[must_use]
pub fn probe_tcp(addr: Option<&str>) -> NetworkStatus {
	let addr = addr.unwrap_or(DEFAULT_TCP_PROBE);

	let resolved: Option<SocketAddr> = match addr.to_socket_addrs() {
		Ok(mut iter) => iter.next(),
		Err(_) => return NetworkStatus::Offline,
	};

	let Some(resolved) = resolved else {
		return NetworkStatus::Offline;
	};

	return match TcpStream::connect_timeout(&resolved, PROBE_TIMEOUT) {
		Ok(_) => NetworkStatus::Online,
		Err(_) => NetworkStatus::Offline,
	};
}

/// Issues a `GET` against `url` (or [`DEFAULT_HTTP_PROBE`] if `None`). Slower
/// than [`probe_tcp`] but catches captive portals and proxies that accept raw
/// TCP connections while still blocking real traffic.
#[must_use]
pub fn probe_http(url: Option<&str>) -> NetworkStatus {
	let url = url.unwrap_or(DEFAULT_HTTP_PROBE);

	let client = match reqwest::blocking::Client::builder().timeout(PROBE_TIMEOUT).build() {
		Ok(client) => client,
		Err(_) => return NetworkStatus::Offline,
	};

	return match client.get(url).send() {
		Ok(resp) if resp.status().is_success() || resp.status().is_redirection() => NetworkStatus::Online,
		_ => NetworkStatus::Offline,
	};
}

/// Tracks the last-observed [`NetworkStatus`] so callers (e.g. the Scheduler)
/// don't have to re-probe on every item when a batch is already known-offline.
pub struct NetworkMonitor {
	last: NetworkStatus,
}

impl NetworkMonitor {
	#[must_use]
	pub fn new() -> Self {
		return Self { last: NetworkStatus::Online };
	}

	/// Re-probes using [`probe_tcp`] and updates the cached status.
	pub fn check(&mut self) -> NetworkStatus {
		self.last = probe_tcp(None);
		return self.last;
	}

	#[must_use]
	pub fn status(&self) -> NetworkStatus {
		return self.last;
	}

	#[must_use]
	pub fn is_online(&self) -> bool {
		return self.last == NetworkStatus::Online;
	}
}

impl Default for NetworkMonitor {
	fn default() -> Self {
		return Self::new();
	}
}
