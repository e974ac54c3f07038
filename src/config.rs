//! Client configuration
//!
//! Candidate hosts, well-known ports and timing for the push channel and the
//! snapshot queries. The CLI arguments map one-to-one onto [`ClientConfig`].

use clap::Parser;
use std::time::Duration;

/// OpenLP push-channel port
pub const DEFAULT_WS_PORT: u16 = 4317;
/// OpenLP HTTP API port
pub const DEFAULT_API_PORT: u16 = 4316;

/// Configuration for an [`OpenLpClient`](crate::client::OpenLpClient)
#[derive(Debug, Clone)]
pub struct ClientConfig {
	/// Candidate hosts, tried in order.
	pub hosts: Vec<String>,
	pub ws_port: u16,
	pub api_port: u16,
	/// Pause after every candidate failed, before starting over.
	pub retry_interval: Duration,
	/// Upper bound for a single snapshot fetch.
	pub request_timeout: Duration,
	/// Run the failover procedure again when an open channel drops.
	pub reconnect_on_drop: bool,
}

impl Default for ClientConfig {
	fn default() -> Self {
		Self {
			hosts: vec!["localhost".to_string()],
			ws_port: DEFAULT_WS_PORT,
			api_port: DEFAULT_API_PORT,
			retry_interval: Duration::from_secs(5),
			request_timeout: Duration::from_secs(30),
			reconnect_on_drop: false,
		}
	}
}

/// Command line arguments
#[derive(Parser, Debug, Clone)]
#[command(name = "openlp-sync", about = "Follow what an OpenLP instance has live")]
pub struct ClientArgs {
	/// Candidate hosts in failover order (repeatable or comma separated)
	#[arg(
		long = "host",
		env = "OPENLP_HOSTS",
		value_delimiter = ',',
		default_value = "localhost"
	)]
	pub hosts: Vec<String>,

	/// Websocket port
	#[arg(long, env = "OPENLP_WS_PORT", default_value_t = DEFAULT_WS_PORT)]
	pub ws_port: u16,

	/// HTTP API port
	#[arg(long, env = "OPENLP_API_PORT", default_value_t = DEFAULT_API_PORT)]
	pub api_port: u16,

	/// Seconds to wait after all candidates failed
	#[arg(long, default_value_t = 5)]
	pub retry_secs: u64,

	/// Snapshot request timeout in seconds
	#[arg(long, default_value_t = 30)]
	pub timeout_secs: u64,

	/// Reconnect when an established connection drops
	#[arg(long)]
	pub reconnect: bool,
}

impl From<ClientArgs> for ClientConfig {
	fn from(args: ClientArgs) -> Self {
		Self {
			hosts: args.hosts,
			ws_port: args.ws_port,
			api_port: args.api_port,
			retry_interval: Duration::from_secs(args.retry_secs),
			request_timeout: Duration::from_secs(args.timeout_secs),
			reconnect_on_drop: args.reconnect,
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn defaults_match_openlp() {
		let config = ClientConfig::default();
		assert_eq!(config.ws_port, 4317);
		assert_eq!(config.api_port, 4316);
		assert_eq!(config.retry_interval, Duration::from_secs(5));
		assert!(!config.reconnect_on_drop);
	}

	#[test]
	fn parses_comma_separated_hosts() {
		let args = ClientArgs::parse_from([
			"openlp-sync",
			"--host",
			"openlp.local,192.168.1.20",
			"--reconnect",
		]);
		let config = ClientConfig::from(args);
		assert_eq!(config.hosts, vec!["openlp.local", "192.168.1.20"]);
		assert!(config.reconnect_on_drop);
		assert_eq!(config.request_timeout, Duration::from_secs(30));
	}
}
