//!
//! HTTP client for the OpenLP v2 API.
//!
//! The synchronization engine only ever needs two snapshots: the service item
//! list and the live item. Both are exposed through the [`SnapshotSource`]
//! trait so the engine can be driven by something other than a live server.

use super::types::*;
use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::debug;

/// Pull-style access to full resource snapshots.
#[async_trait]
pub trait SnapshotSource: Send + Sync {
	/// Fetch every item of the current service (`service/items`).
	async fn service_items(&self) -> Result<Vec<ServiceItem>, RemoteError>;

	/// Fetch the detailed descriptor of the live item (`controller/live-items`).
	async fn live_item(&self) -> Result<LiveItem, RemoteError>;
}

/// OpenLP HTTP API client
#[derive(Clone)]
pub struct OpenLpApiClient {
	/// The underlying HTTP client.
	http_client: Client,
	/// `http://<host>:<port>/api/v2/`
	base_url: String,
}

impl OpenLpApiClient {
	/// Create a new API client for the given host.
	///
	/// # Arguments
	/// * `host` - Host selected by the connection manager.
	/// * `port` - API port (OpenLP defaults to 4316).
	/// * `timeout` - Upper bound for a single request.
	pub fn new(host: &str, port: u16, timeout: Duration) -> Result<Self, RemoteError> {
		let http_client = Client::builder().timeout(timeout).build()?;

		Ok(Self {
			http_client,
			base_url: format!("http://{}:{}/api/v2/", host, port),
		})
	}

	/// Full URL of an API path.
	pub fn url(&self, path: &str) -> String {
		format!("{}{}", self.base_url, path)
	}

	/// GET an API path and decode its JSON body.
	async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, RemoteError> {
		let url = self.url(path);
		debug!("Fetching {}", url);

		let response = self.http_client.get(&url).send().await?;

		if !response.status().is_success() {
			return Err(RemoteError::StatusError {
				status: response.status(),
				url,
			});
		}

		let body = response.bytes().await?;
		Ok(serde_json::from_slice(&body)?)
	}
}

#[async_trait]
impl SnapshotSource for OpenLpApiClient {
	async fn service_items(&self) -> Result<Vec<ServiceItem>, RemoteError> {
		self.get_json("service/items").await
	}

	async fn live_item(&self) -> Result<LiveItem, RemoteError> {
		self.get_json("controller/live-items").await
	}
}
