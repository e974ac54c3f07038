use crate::connection::ConnectionError;
use crate::remote::RemoteError;

/// Error types for the synchronization engine
#[allow(clippy::enum_variant_names)]
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
	#[error("Notification decode error: {0}")]
	DecodeError(#[from] serde_json::Error),

	#[error("Snapshot fetch error: {0}")]
	FetchError(#[from] RemoteError),

	#[error("Connection error: {0}")]
	ConnectionError(#[from] ConnectionError),

	#[error("No snapshot source; the push channel has not connected yet")]
	NotConnected,

	#[error("Handler error: {0}")]
	HandlerError(String),
}
