use std::sync::Arc;
use std::time::Duration;

use coderoom::store::{DurableStore, EphemeralStore, RoomRepository};
use coderoom::{AppState, RealtimeHub, RoomService};
use tokio::net::TcpListener;
use tracing::{info, Level};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::fmt().with_max_level(Level::INFO).init();

    info!("Starting room server...");

    let data_dir = std::env::var("ROOMS_DATA_DIR").unwrap_or_else(|_| "./rooms-data".to_string());

    let ephemeral = Arc::new(EphemeralStore::new());
    let durable = Arc::new(DurableStore::open(&data_dir).await?);
    let service = Arc::new(RoomService::new(RoomRepository::new(
        ephemeral.clone(),
        durable,
    )));
    let hub = Arc::new(RealtimeHub::new());

    // Janitor for expired guest rooms; expiry is also enforced lazily on
    // every read, this just keeps unread dead rooms from piling up.
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(600));
        loop {
            interval.tick().await;
            ephemeral.purge_expired();
        }
    });

    let app = coderoom::router(AppState::new(service, hub));

    let listener = TcpListener::bind("0.0.0.0:4000").await?;
    info!("Server running on http://0.0.0.0:4000");
    info!("WebSocket endpoint available at ws://0.0.0.0:4000/rooms/ws");
    info!("API endpoints:");
    info!("  POST   /rooms            - Create a room");
    info!("  GET    /rooms            - List your rooms (authenticated)");
    info!("  GET    /rooms/:id        - Fetch a room");
    info!("  PATCH  /rooms/:id        - Update a room");
    info!("  PATCH  /rooms/:id/share  - Change a room's members");
    info!("  DELETE /rooms/:id        - Delete a room");

    axum::serve(listener, app).await?;
    Ok(())
}
