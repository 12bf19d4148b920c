use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use cohort_crawler::api::{self, ApiDoc};
use cohort_crawler::{Config, Pipeline};
use tracing::info;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env();
    tracing_subscriber::fmt::init();

    let pipeline = Pipeline::new(&config)?;

    // `cohort-crawler harvest` runs once and prints JSON instead of serving.
    if std::env::args().nth(1).as_deref() == Some("harvest") {
        let records = pipeline.run().await;
        println!("{}", serde_json::to_string_pretty(&records)?);
        return Ok(());
    }

    let state = Arc::new(api::AppState { pipeline });

    let app = Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .route("/companies", get(api::list_companies))
        .route("/companies/refresh", post(api::refresh_companies))
        .with_state(state);

    let listener = tokio::net::TcpListener::bind(&config.server.bind_addr).await?;
    info!("🚀 Listening on {}", listener.local_addr()?);
    axum::serve(listener, app).await?;

    Ok(())
}
