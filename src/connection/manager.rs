//! Connection establishment with candidate failover.
//!
//! The manager walks an ordered list of candidate hosts, opening the push
//! channel on the first one that answers. When a full pass fails it waits a
//! fixed interval and starts over from the first candidate. A failed candidate
//! is never an error for the caller; only an unusable candidate list is.

use crate::remote::RemoteError;

use async_trait::async_trait;
use backoff::backoff::{Backoff, Constant};
use std::time::Duration;
use tokio::net::TcpStream;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::{info, warn};

/// Push-channel stream produced by [`WebSocketDialer`].
pub type NotificationStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Opens a persistent channel to a single address.
#[async_trait]
pub trait Dialer: Send + Sync {
	type Stream: Send;

	async fn dial(&self, url: &str) -> Result<Self::Stream, RemoteError>;
}

/// Websocket dialer used against a real server.
#[derive(Debug, Clone, Copy, Default)]
pub struct WebSocketDialer;

#[async_trait]
impl Dialer for WebSocketDialer {
	type Stream = NotificationStream;

	async fn dial(&self, url: &str) -> Result<Self::Stream, RemoteError> {
		let (stream, _response) = connect_async(url).await?;
		Ok(stream)
	}
}

/// An open channel and the candidate it was opened against.
///
/// Snapshot queries must target the same host as the push channel.
pub struct Connection<S> {
	pub host: String,
	pub stream: S,
}

/// Error types for connection setup
#[derive(Debug, thiserror::Error)]
pub enum ConnectionError {
	#[error("No candidate hosts configured")]
	NoCandidates,

	#[error("Invalid candidate host: {0:?}")]
	InvalidAddress(String),
}

/// Failover connector over an ordered list of candidate hosts.
pub struct ConnectionManager<D = WebSocketDialer> {
	hosts: Vec<String>,
	ws_port: u16,
	retry_interval: Duration,
	dialer: D,
}

impl ConnectionManager<WebSocketDialer> {
	/// Create a manager that dials real websockets.
	pub fn new(
		hosts: Vec<String>,
		ws_port: u16,
		retry_interval: Duration,
	) -> Result<Self, ConnectionError> {
		Self::with_dialer(hosts, ws_port, retry_interval, WebSocketDialer)
	}
}

impl<D: Dialer> ConnectionManager<D> {
	/// Create a manager with a custom dialer.
	///
	/// # Errors
	/// `NoCandidates` for an empty list, `InvalidAddress` for a blank entry.
	pub fn with_dialer(
		hosts: Vec<String>,
		ws_port: u16,
		retry_interval: Duration,
		dialer: D,
	) -> Result<Self, ConnectionError> {
		if hosts.is_empty() {
			return Err(ConnectionError::NoCandidates);
		}
		if let Some(bad) = hosts.iter().find(|h| h.trim().is_empty() || h.contains('/')) {
			return Err(ConnectionError::InvalidAddress(bad.clone()));
		}

		Ok(Self {
			hosts,
			ws_port,
			retry_interval,
			dialer,
		})
	}

	/// Candidate hosts in the order they are tried.
	pub fn hosts(&self) -> &[String] {
		&self.hosts
	}

	/// Push-channel address for a host.
	pub fn ws_url(&self, host: &str) -> String {
		format!("ws://{}:{}", host, self.ws_port)
	}

	/// Connect to the first candidate that accepts, retrying forever.
	///
	/// Candidates are tried in order; after a full failed pass the manager
	/// sleeps for the retry interval and starts again from the first one.
	pub async fn connect(&self) -> Connection<D::Stream> {
		let mut pause = Constant::new(self.retry_interval);

		loop {
			for host in &self.hosts {
				let url = self.ws_url(host);
				match self.dialer.dial(&url).await {
					Ok(stream) => {
						info!("OpenLP: connected to {}", host);
						return Connection {
							host: host.clone(),
							stream,
						};
					}
					Err(e) => {
						warn!("OpenLP: failed to connect to {}: {}", host, e);
					}
				}
			}

			let delay = pause.next_backoff().unwrap_or(self.retry_interval);
			warn!(
				"OpenLP: all {} candidates failed, retrying in {}s",
				self.hosts.len(),
				delay.as_secs()
			);
			tokio::time::sleep(delay).await;
		}
	}
}
