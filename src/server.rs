// http server mode - generate, validate and run sql over an api

use axum::{
    Json, Router,
    extract::{Path, State},
    http::{HeaderValue, StatusCode},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::core::{Execution, Pipeline, QueryType, RiskLevel};
use crate::Error;

const LOCAL_FRONTEND: &str = "http://localhost:3000";

struct AppState {
    pipeline: Pipeline,
}

#[derive(Deserialize)]
struct GenerateRequest {
    query: String,
    #[serde(default)]
    operation_type: Option<String>,
}

#[derive(Deserialize)]
struct SqlRequest {
    sql: String,
}

#[derive(Serialize, Default)]
struct GenerateResponse {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    sql: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    explanation: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    warnings: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    errors: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    risk_level: Option<RiskLevel>,
    #[serde(skip_serializing_if = "Option::is_none")]
    query_type: Option<QueryType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
}

pub struct Server;

impl Server {
    pub fn router(pipeline: Pipeline, frontend_url: &str) -> Router {
        let state = Arc::new(AppState { pipeline });

        Router::new()
            .route("/", get(root))
            .route("/health", get(health))
            .route("/api/schema", get(get_schema))
            .route("/api/schema/{table}", get(get_table_schema))
            .route("/api/generate-sql", post(generate_sql))
            .route("/api/execute-sql", post(execute_sql))
            .route("/api/validate", post(validate_sql))
            .route("/api/test-connection", get(test_connection))
            .layer(cors(frontend_url))
            .layer(TraceLayer::new_for_http())
            .with_state(state)
    }

    pub async fn run(
        pipeline: Pipeline,
        host: &str,
        port: u16,
        frontend_url: &str,
    ) -> Result<(), Error> {
        let app = Self::router(pipeline, frontend_url);

        let addr = format!("{host}:{port}");
        let listener = tokio::net::TcpListener::bind(&addr)
            .await
            .map_err(|e| Error::Server(e.to_string()))?;

        tracing::info!("server running at http://{addr}");

        axum::serve(listener, app)
            .await
            .map_err(|e| Error::Server(e.to_string()))?;

        Ok(())
    }
}

fn cors(frontend_url: &str) -> CorsLayer {
    let origins: Vec<HeaderValue> = [frontend_url, LOCAL_FRONTEND]
        .into_iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(v) => Some(v),
            Err(_) => {
                tracing::warn!(origin, "ignoring invalid cors origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods(Any)
        .allow_headers(Any)
}

async fn root(State(state): State<Arc<AppState>>) -> Json<Value> {
    Json(json!({
        "status": "running",
        "message": "Natural Language to SQL API is running",
        "database_connected": state.pipeline.is_connected().await,
    }))
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

fn failure(status: StatusCode, detail: String) -> (StatusCode, Json<Value>) {
    (status, Json(json!({ "success": false, "detail": detail })))
}

async fn get_schema(State(state): State<Arc<AppState>>) -> (StatusCode, Json<Value>) {
    let tables = match state.pipeline.full_schema().await {
        Ok(t) => t,
        Err(e) => {
            tracing::warn!(error = %e, "schema lookup failed");
            return failure(
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Error fetching schema: {e}"),
            );
        }
    };

    let names: Vec<&str> = tables.iter().map(|t| t.name.as_str()).collect();
    let schema: serde_json::Map<String, Value> = tables
        .iter()
        .map(|t| (t.name.clone(), json!(t.columns)))
        .collect();

    (
        StatusCode::OK,
        Json(json!({
            "success": true,
            "tables": names,
            "schema": schema,
            "table_count": tables.len(),
        })),
    )
}

async fn get_table_schema(
    State(state): State<Arc<AppState>>,
    Path(table): Path<String>,
) -> (StatusCode, Json<Value>) {
    match state.pipeline.describe(&table).await {
        Ok(columns) => (
            StatusCode::OK,
            Json(json!({
                "success": true,
                "table_name": table,
                "columns": columns,
            })),
        ),
        Err(e @ Error::UnknownTable(_)) => failure(StatusCode::NOT_FOUND, e.to_string()),
        Err(e) => failure(
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Error fetching table schema: {e}"),
        ),
    }
}

async fn generate_sql(
    State(state): State<Arc<AppState>>,
    Json(req): Json<GenerateRequest>,
) -> (StatusCode, Json<GenerateResponse>) {
    let generation = match state
        .pipeline
        .generate(&req.query, req.operation_type.as_deref())
        .await
    {
        Ok(g) => g,
        Err(e) => {
            tracing::warn!(error = %e, "sql generation failed");
            let message = e.to_string();
            return (
                StatusCode::OK,
                Json(GenerateResponse {
                    success: false,
                    errors: Some(vec![message.clone()]),
                    message: Some(message),
                    ..Default::default()
                }),
            );
        }
    };

    let validation = generation.validation;
    (
        StatusCode::OK,
        Json(GenerateResponse {
            success: validation.is_valid,
            sql: Some(generation.sql),
            explanation: Some(generation.explanation),
            warnings: Some(validation.warnings),
            errors: Some(validation.errors),
            risk_level: Some(validation.risk_level),
            query_type: Some(validation.query_type),
            message: None,
        }),
    )
}

async fn execute_sql(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SqlRequest>,
) -> Json<Value> {
    match state.pipeline.execute(&req.sql).await {
        Ok(Execution::Rows(result)) => Json(json!({
            "success": true,
            "columns": result.columns,
            "rows": result.rows,
            "row_count": result.row_count,
            "query_type": QueryType::detect(&req.sql),
        })),
        Ok(Execution::Affected {
            query_type,
            affected_rows,
        }) => Json(json!({
            "success": true,
            "affected_rows": affected_rows,
            "query_type": query_type,
            "message": format!("Query executed successfully. {affected_rows} row(s) affected."),
        })),
        Err(Error::Rejected { errors }) => Json(json!({
            "success": false,
            "message": "Query validation failed",
            "errors": errors,
        })),
        Err(e) => {
            tracing::warn!(error = %e, "statement execution failed");
            Json(json!({
                "success": false,
                "error": e.to_string(),
                "message": format!("Error executing query: {e}"),
            }))
        }
    }
}

async fn validate_sql(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SqlRequest>,
) -> Json<Value> {
    Json(json!(state.pipeline.safety().validate(&req.sql)))
}

async fn test_connection(State(state): State<Arc<AppState>>) -> Json<Value> {
    let connected = state.pipeline.is_connected().await;
    Json(json!({
        "success": connected,
        "message": if connected { "Database connected" } else { "Database connection failed" },
    }))
}
