use clap::Parser;
use openlp_sync::{ClientArgs, ClientConfig, EventKind, OpenLpClient, SyncEvent};
use tracing::{error, info};

#[tokio::main(flavor = "current_thread")]
async fn main() {
	tracing_subscriber::fmt()
		.with_env_filter(
			tracing_subscriber::EnvFilter::builder()
				.with_default_directive(tracing::Level::INFO.into())
				.from_env_lossy(),
		)
		.with_target(false)
		.with_thread_ids(false)
		.with_thread_names(false)
		.with_file(false)
		.with_line_number(false)
		.with_timer(tracing_subscriber::fmt::time::time())
		.init();

	let config = ClientConfig::from(ClientArgs::parse());
	info!("Starting OpenLP sync for {:?}", config.hosts);

	let mut client = match OpenLpClient::new(config) {
		Ok(client) => client,
		Err(e) => {
			error!("Invalid configuration: {}", e);
			return;
		}
	};

	for kind in EventKind::ALL {
		client.engine_mut().on_fn(kind, "log", log_event);
	}

	if let Err(e) = client.run().await {
		error!("OpenLP sync stopped: {}", e);
	}
}

fn log_event(event: &SyncEvent) {
	match event {
		SyncEvent::ModeChanged(mode) => info!("Mode: {}", mode),
		SyncEvent::ServiceChanged(service) => {
			info!("Service {} loaded with {} items", service.id(), service.len())
		}
		SyncEvent::ItemChanged(item) => info!("Item: {} ({})", item.title(), item.plugin()),
		SyncEvent::SlideChanged { id, slide: Some(slide) } => {
			info!("Slide {}: {}", id, slide.text().lines().next().unwrap_or_default())
		}
		SyncEvent::SlideChanged { id, slide: None } => info!("Slide {}: not loaded", id),
	}
}
