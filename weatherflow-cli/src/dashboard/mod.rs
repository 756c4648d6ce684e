//! Local dashboard server over the latest transformed batch.

use anyhow::Context;
use axum::{
    Json, Router,
    extract::{Query, State},
    response::Html,
    routing::get,
};
use serde::{Deserialize, Serialize};
use std::{net::SocketAddr, sync::Arc};
use weatherflow_core::{BlobStore, Parameter, table};

mod chart;
mod page;

#[derive(Clone)]
pub struct AppState {
    store: Arc<dyn BlobStore>,
}

/// Selections made on the page; unknown or empty values fall back to defaults.
#[derive(Debug, Default, Deserialize)]
pub struct DashboardQuery {
    pub compare: Option<String>,
    pub trend: Option<String>,
    pub aggregate: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
}

impl DashboardQuery {
    fn parameter(value: &Option<String>) -> Parameter {
        value.as_deref().and_then(Parameter::from_column).unwrap_or_default()
    }

    pub fn compare(&self) -> Parameter {
        Self::parameter(&self.compare)
    }

    pub fn trend(&self) -> Parameter {
        Self::parameter(&self.trend)
    }

    pub fn aggregate(&self) -> Parameter {
        Self::parameter(&self.aggregate)
    }

    pub fn city(&self) -> Option<&str> {
        self.city.as_deref().filter(|s| !s.is_empty())
    }

    pub fn state(&self) -> Option<&str> {
        self.state.as_deref().filter(|s| !s.is_empty())
    }
}

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

pub fn router(store: Arc<dyn BlobStore>) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/health", get(health))
        .with_state(AppState { store })
}

pub async fn serve(store: Arc<dyn BlobStore>, addr: SocketAddr) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind dashboard to {addr}"))?;

    tracing::info!("Dashboard listening on http://{addr}");
    println!("Dashboard running at http://{addr} (Ctrl+C to stop)");

    axum::serve(listener, router(store)).await.context("Dashboard server failed")?;
    Ok(())
}

async fn index(State(state): State<AppState>, Query(query): Query<DashboardQuery>) -> Html<String> {
    let body = match table::load_latest(state.store.as_ref()).await {
        Ok(Some(loaded)) if !loaded.table.is_empty() => page::render(&loaded, &query),
        Ok(_) => page::render_no_data(None),
        Err(err) => {
            tracing::error!("Error fetching data: {err}");
            page::render_no_data(Some(&err.to_string()))
        }
    };
    Html(body)
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Minimal HTML escaping for text and attribute values.
pub(crate) fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::{Body, to_bytes},
        http::{Request, StatusCode},
    };
    use chrono::Utc;
    use tower::ServiceExt;
    use weatherflow_core::store::MemoryStore;

    const CSV: &str = "\
city,state,temperature_c,humidity,wind_kph,rainfall_mm,visibility_km,condition,timestamp
Austin,Texas,30,50,10,0,10,Clear,2024-01-01 00:00:00
Reno,Nevada,20,30,6,1.5,16,Sunny,2024-01-01 00:00:00
";

    async fn get_body(store: Arc<MemoryStore>, uri: &str) -> (StatusCode, String) {
        let res = router(store)
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = res.status();
        let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
        (status, String::from_utf8(bytes.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn empty_store_shows_no_data_notice() {
        let (status, body) = get_body(Arc::new(MemoryStore::new()), "/").await;

        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("No data available to display."));
        assert!(!body.contains("<svg"));
    }

    #[tokio::test]
    async fn header_only_batch_shows_no_data_notice() {
        let store = Arc::new(MemoryStore::new());
        store.insert_at(
            "transformed/weather_data_transformed_2024-01-01_00-00-00.csv",
            "city,state,temperature_c,humidity,wind_kph,rainfall_mm,visibility_km,condition,timestamp\n",
            "text/csv",
            Utc::now(),
        );

        let (_, body) = get_body(store, "/").await;
        assert!(body.contains("No data available to display."));
    }

    #[tokio::test]
    async fn unreadable_batch_degrades_to_notice_with_error() {
        let store = Arc::new(MemoryStore::new());
        store.insert_at(
            "transformed/bad.csv",
            "city,temperature_c\nAustin,hot\n",
            "text/csv",
            Utc::now(),
        );

        let (status, body) = get_body(store, "/").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("No data available to display."));
        assert!(body.contains("transformed/bad.csv"));
    }

    #[tokio::test]
    async fn renders_latest_batch_with_selections() {
        let store = Arc::new(MemoryStore::new());
        store.insert_at("transformed/latest.csv", CSV, "text/csv", Utc::now());

        let uri = "/?compare=humidity&trend=wind_kph&aggregate=bogus&city=Reno&state=Nevada";
        let (status, body) = get_body(store, uri).await;

        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("transformed/latest.csv"));
        assert!(body.contains("Weather Details for Reno, Nevada"));
        assert!(body.contains(r#"<option value="humidity" selected>"#));
        assert!(body.contains("Correlation Heatmap"));
        // 25.0 average temperature, 1.5 total rainfall
        assert!(body.contains(">25<"));
        assert!(body.contains(">1.5<"));
    }

    #[tokio::test]
    async fn health_reports_version() {
        let (status, body) = get_body(Arc::new(MemoryStore::new()), "/health").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("healthy"));
        assert!(body.contains(env!("CARGO_PKG_VERSION")));
    }

    #[test]
    fn query_falls_back_to_defaults() {
        let q = DashboardQuery {
            compare: Some("nope".into()),
            city: Some(String::new()),
            ..DashboardQuery::default()
        };
        assert_eq!(q.compare(), Parameter::TemperatureC);
        assert_eq!(q.city(), None);
    }

    #[test]
    fn escapes_markup() {
        assert_eq!(
            escape(r#"<a href="x">O'Hare & co</a>"#),
            "&lt;a href=&quot;x&quot;&gt;O&#39;Hare &amp; co&lt;/a&gt;"
        );
    }
}
