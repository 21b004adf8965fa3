//! HTTP front end for the map pages.
//!
//! | Method | Path      | Description                          |
//! |--------|-----------|--------------------------------------|
//! | GET    | `/`       | Map for the configured default year  |
//! | GET    | `/{year}` | Map for the year in the path         |
//!
//! Every request runs the pipeline on the blocking pool; nothing besides the
//! on-disk cache is shared between requests.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use axum::routing::get;
use tower_http::trace::TraceLayer;

use crate::app::{App, TracingSink};
use crate::config::PipelineConfig;
use crate::correspondence::CorrespondenceTable;
use crate::domain::{Selection, Year};
use crate::error::GhgError;
use crate::exiobase::ExiobaseHttpClient;
use crate::geo::GeoJsonHttpClient;
use crate::store::Store;

/// Produces the HTML page for one year.
pub trait MapPages: Send + Sync + 'static {
    fn page(&self, year: Year) -> Result<String, GhgError>;
}

/// Builds a fresh pipeline for each page from the shared configuration.
pub struct PipelinePages {
    config: PipelineConfig,
}

impl PipelinePages {
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }
}

impl MapPages for PipelinePages {
    fn page(&self, year: Year) -> Result<String, GhgError> {
        let correspondence = match &self.config.correspondence {
            Some(path) => CorrespondenceTable::from_csv_path(path.as_std_path())?,
            None => CorrespondenceTable::exio3()?,
        };
        let app = App::new(
            Store::new(self.config.folder.clone()),
            ExiobaseHttpClient::new(self.config.source_url.clone())?,
            GeoJsonHttpClient::new(self.config.geojson_url.clone())?,
            correspondence,
        );
        app.map_page(
            year,
            self.config.classification,
            &Selection::Internal,
            &TracingSink,
        )
    }
}

struct ServerState {
    pages: Arc<dyn MapPages>,
    default_year: Year,
}

pub fn router(pages: Arc<dyn MapPages>, default_year: Year) -> Router {
    let state = Arc::new(ServerState {
        pages,
        default_year,
    });
    Router::new()
        .route("/", get(default_map))
        .route("/{year}", get(year_map))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn serve(
    addr: SocketAddr,
    pages: Arc<dyn MapPages>,
    default_year: Year,
) -> Result<(), GhgError> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|err| GhgError::Server(format!("bind {addr}: {err}")))?;
    let local = listener
        .local_addr()
        .map_err(|err| GhgError::Server(err.to_string()))?;
    tracing::info!("listening on http://{local}");
    axum::serve(listener, router(pages, default_year))
        .await
        .map_err(|err| GhgError::Server(err.to_string()))
}

async fn default_map(State(state): State<Arc<ServerState>>) -> Response {
    render(state.pages.clone(), state.default_year).await
}

async fn year_map(
    State(state): State<Arc<ServerState>>,
    Path(year): Path<String>,
) -> Response {
    match year.parse::<Year>() {
        Ok(year) => render(state.pages.clone(), year).await,
        Err(err) => (StatusCode::BAD_REQUEST, err.to_string()).into_response(),
    }
}

async fn render(pages: Arc<dyn MapPages>, year: Year) -> Response {
    let result = tokio::task::spawn_blocking(move || pages.page(year)).await;
    match result {
        Ok(Ok(page)) => Html(page).into_response(),
        Ok(Err(err)) => {
            tracing::error!(%year, "map rendering failed: {err}");
            (StatusCode::INTERNAL_SERVER_ERROR, err.to_string()).into_response()
        }
        Err(err) => {
            tracing::error!(%year, "map task panicked: {err}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "map rendering failed".to_string(),
            )
                .into_response()
        }
    }
}
