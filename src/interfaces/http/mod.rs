mod sessions;

use crate::domain::compliance::recognized_standards;
use crate::domain::error::AppError;
use crate::infrastructure::config::ServerConfig;
use crate::interfaces::AppState;
use actix_cors::Cors;
use actix_web::http::StatusCode;
use actix_web::{
    dev::Server, get, web, App, HttpResponse, HttpServer, Responder, ResponseError,
};
use chrono::Local;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};

const MAX_LOG_ENTRIES: usize = 100;
const MAX_JSON_BODY_BYTES: usize = 32 * 1024 * 1024;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct LogEntry {
    pub time: String,
    pub level: String,
    pub source: String,
    pub message: String,
}

pub struct HttpState {
    pub app_state: Arc<AppState>,
    pub logs: Arc<Mutex<Vec<LogEntry>>>,
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    error: &'a str,
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::ValidationError(_) | AppError::ParseError(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Busy(_) | AppError::InvalidTransition(_) => StatusCode::CONFLICT,
            AppError::IngestionError(_)
            | AppError::GenerationError(_)
            | AppError::RefinementError(_)
            | AppError::ExportError(_)
            | AppError::LLMError(_) => StatusCode::BAD_GATEWAY,
            AppError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(ErrorBody {
            error: self.message(),
        })
    }
}

/// Logs a failed request and renders the error body.
fn failure(logs: &Mutex<Vec<LogEntry>>, context: &str, error: AppError) -> HttpResponse {
    let level = if error.status_code().is_server_error() {
        "ERROR"
    } else {
        "WARN"
    };
    add_log(logs, level, "HttpApi", &format!("{} failed: {}", context, error));
    error.error_response()
}

#[get("/health")]
async fn health() -> impl Responder {
    HttpResponse::Ok().json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

#[get("/logs")]
async fn get_logs(data: web::Data<HttpState>) -> impl Responder {
    let logs = data.logs.lock().unwrap_or_else(|p| p.into_inner());
    HttpResponse::Ok().json(&*logs)
}

#[get("/standards")]
async fn list_standards() -> impl Responder {
    HttpResponse::Ok().json(recognized_standards())
}

#[get("/models")]
async fn list_models(data: web::Data<HttpState>) -> impl Responder {
    let config = &data.app_state.llm_config;
    add_log(
        &data.logs,
        "INFO",
        "HttpApi",
        &format!(
            "Fetching models (provider={:?} base_url={})",
            config.provider, config.base_url
        ),
    );

    match data.app_state.llm_client.list_models(config).await {
        Ok(models) => HttpResponse::Ok().json(models),
        Err(e) => failure(&data.logs, "Listing models", e),
    }
}

/// Registers every route under `/api`.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api")
            .service(health)
            .service(get_logs)
            .service(list_standards)
            .service(list_models)
            .configure(sessions::configure),
    );
}

pub fn add_log_entry(
    logs: &Mutex<Vec<LogEntry>>,
    level: &str,
    source: &str,
    message: &str,
) -> LogEntry {
    let entry = LogEntry {
        time: Local::now().format("%H:%M:%S").to_string(),
        level: level.to_string(),
        source: source.to_string(),
        message: message.to_string(),
    };
    let mut logs = logs.lock().unwrap_or_else(|p| p.into_inner());
    logs.push(entry.clone());
    if logs.len() > MAX_LOG_ENTRIES {
        logs.remove(0);
    }
    entry
}

pub fn add_log(logs: &Mutex<Vec<LogEntry>>, level: &str, source: &str, message: &str) {
    add_log_entry(logs, level, source, message);
}

pub fn start_server(
    app_state: Arc<AppState>,
    logs: Arc<Mutex<Vec<LogEntry>>>,
    config: &ServerConfig,
) -> std::io::Result<Server> {
    let state = web::Data::new(HttpState { app_state, logs });

    let server = HttpServer::new(move || {
        let cors = Cors::permissive(); // Allow all origins for the local UI

        App::new()
            .wrap(cors)
            .app_data(state.clone())
            .app_data(web::JsonConfig::default().limit(MAX_JSON_BODY_BYTES))
            .configure(configure)
    })
    .bind((config.host.as_str(), config.port))?
    .run();

    Ok(server)
}

// Helper trait to avoid move issues in handlers
trait RequestData<T> {
    fn req_data(&self) -> &T;
}

impl<T> RequestData<T> for web::Json<T> {
    fn req_data(&self) -> &T {
        &**self
    }
}
