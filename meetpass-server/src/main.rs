use std::error::Error;
use std::net::SocketAddr;

use meetpass_server::session::Session;
use meetpass_server::web::{AppState, DatasetRequest, create_router};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Default bind address.
const DEFAULT_ADDR: &str = "127.0.0.1:3000";

/// Load the dataset named by `MEETPASS_DATASET`, or start empty.
fn initial_session() -> Result<Session, Box<dyn Error>> {
    let Ok(path) = std::env::var("MEETPASS_DATASET") else {
        return Ok(Session::default());
    };
    let text = std::fs::read_to_string(&path)?;
    let dataset: DatasetRequest = serde_json::from_str(&text)?;
    let session = dataset.into_session()?;
    info!(
        path = %path,
        trains = session.trains().len(),
        unknown_stations = session.unknown_stations().len(),
        "preloaded dataset"
    );
    Ok(session)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("meetpass_server=info,tower_http=info")),
        )
        .init();

    let addr: SocketAddr = std::env::var("MEETPASS_ADDR")
        .unwrap_or_else(|_| DEFAULT_ADDR.to_string())
        .parse()?;

    let state = AppState::new(initial_session()?);
    let app = create_router(state);

    info!(%addr, "meet/pass scheduler listening");
    info!("endpoints: GET /health, PUT /dataset, GET /timetable, GET /conflicts, GET /warnings");
    info!("endpoints: POST /repair, POST /suggest, POST /optimize, POST /resolve");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
