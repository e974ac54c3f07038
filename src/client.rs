//! OpenLP client
//!
//! Wires the connection manager to the synchronization engine: connect to the
//! first reachable candidate, point snapshot queries at that host, then feed
//! every inbound frame to the engine until the channel closes.

use crate::config::ClientConfig;
use crate::connection::{Connection, ConnectionManager, Dialer, WebSocketDialer};
use crate::remote::{OpenLpApiClient, RemoteError, SnapshotSource};
use crate::sync::{SyncEngine, SyncError};

use futures_util::{Stream, StreamExt};
use tokio_tungstenite::tungstenite::{self, Message};
use tracing::{error, info, warn};

type SourceFactory =
	Box<dyn Fn(&str) -> Result<Box<dyn SnapshotSource>, RemoteError> + Send + Sync>;

/// Client following one OpenLP instance.
pub struct OpenLpClient<D = WebSocketDialer> {
	config: ClientConfig,
	connections: ConnectionManager<D>,
	engine: SyncEngine,
	source_for_host: SourceFactory,
}

impl OpenLpClient<WebSocketDialer> {
	/// Create a client that dials real websockets and queries the HTTP API.
	pub fn new(config: ClientConfig) -> Result<Self, SyncError> {
		let connections =
			ConnectionManager::new(config.hosts.clone(), config.ws_port, config.retry_interval)?;
		Ok(Self::with_connections(config, connections))
	}
}

impl<D> OpenLpClient<D>
where
	D: Dialer,
	D::Stream: Stream<Item = Result<Message, tungstenite::Error>> + Unpin,
{
	pub fn with_connections(config: ClientConfig, connections: ConnectionManager<D>) -> Self {
		let api_port = config.api_port;
		let timeout = config.request_timeout;
		let source_for_host: SourceFactory = Box::new(move |host: &str| {
			let client = OpenLpApiClient::new(host, api_port, timeout)?;
			Ok(Box::new(client) as Box<dyn SnapshotSource>)
		});

		Self {
			config,
			connections,
			engine: SyncEngine::new(),
			source_for_host,
		}
	}

	/// Replace how snapshot sources are built for a connected host.
	pub fn with_source_factory<F>(mut self, factory: F) -> Self
	where
		F: Fn(&str) -> Result<Box<dyn SnapshotSource>, RemoteError> + Send + Sync + 'static,
	{
		self.source_for_host = Box::new(factory);
		self
	}

	pub fn engine(&self) -> &SyncEngine {
		&self.engine
	}

	/// Register subscribers here before calling [`run`](Self::run).
	pub fn engine_mut(&mut self) -> &mut SyncEngine {
		&mut self.engine
	}

	/// Connect and synchronize until the channel closes.
	///
	/// With `reconnect_on_drop` the failover procedure runs again after a
	/// drop and the engine keeps its state across connections.
	pub async fn run(&mut self) -> Result<(), SyncError> {
		loop {
			let Connection { host, stream } = self.connections.connect().await;
			let source = (self.source_for_host)(&host)?;
			self.engine.set_boxed_source(source);

			self.forward(stream).await;

			if !self.config.reconnect_on_drop {
				info!("OpenLP: connection to {} closed", host);
				return Ok(());
			}
			warn!("OpenLP: connection to {} dropped, reconnecting", host);
		}
	}

	/// Feed frames to the engine one at a time until the stream ends.
	async fn forward(&mut self, mut stream: D::Stream) {
		while let Some(message) = stream.next().await {
			let result = match message {
				Ok(Message::Text(text)) => self.engine.handle_message(text.as_bytes()).await,
				Ok(Message::Binary(bytes)) => self.engine.handle_message(&bytes).await,
				Ok(Message::Close(_)) => break,
				Ok(_) => continue,
				Err(e) => {
					warn!("OpenLP: websocket error: {}", e);
					break;
				}
			};

			if let Err(e) = result {
				error!("OpenLP: failed to synchronize notification: {}", e);
			}
		}
	}
}
