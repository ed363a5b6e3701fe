//! REST server startup and configuration

use anyhow::Result;
use axum::serve;
use std::{net::SocketAddr, sync::Arc};
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::engine::QueryEngine;
use crate::server::routing::create_router;

/// Start the REST server and serve until shutdown
pub async fn start_server(addr: SocketAddr, engine: Arc<QueryEngine>) -> Result<()> {
  bentley::info!("Starting quill REST server on {addr}");

  let app = create_router(engine).layer(
    ServiceBuilder::new().layer(TraceLayer::new_for_http()).layer(CorsLayer::permissive()),
  );

  let listener = TcpListener::bind(addr).await?;
  bentley::event_info!("Server listening on {addr}");

  match serve(listener, app).await {
    Ok(()) => {
      bentley::event_info!("Server shutdown gracefully");
      Ok(())
    }
    Err(e) => {
      bentley::event_error!("Server error: {e}");
      Err(anyhow::anyhow!("Server error: {e}"))
    }
  }
}
