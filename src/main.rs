use actix_cors::Cors;
use actix_web::{error, http::StatusCode, middleware, web, App, HttpResponse, HttpServer};
use spark_match::config::Settings;
use spark_match::core::{Collaborators, Matcher, ThreadRandom};
use spark_match::routes::{self, AppState};
use spark_match::services::{CdnPhotoLinker, HttpNotifier, PostgresClient};
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// JSON error response for JSON payload errors
#[derive(Debug, serde::Serialize)]
pub struct JsonError {
    pub error: String,
    pub message: String,
    pub status_code: u16,
}

impl std::fmt::Display for JsonError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.error, self.message)
    }
}

impl std::error::Error for JsonError {}

impl error::ResponseError for JsonError {
    fn status_code(&self) -> StatusCode {
        StatusCode::from_u16(self.status_code).unwrap_or(StatusCode::BAD_REQUEST)
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(self)
    }
}

/// Handle JSON payload errors
pub fn handle_json_payload_error(err: error::JsonPayloadError, req: &actix_web::HttpRequest) -> actix_web::Error {
    tracing::info!("JSON payload error on {}: {}", req.path(), err);
    JsonError {
        error: "invalid_input".to_string(),
        message: format!("Invalid JSON: {}", err),
        status_code: 400,
    }
    .into()
}

fn init_tracing(level: &str, format: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_level(true);

    if format == "pretty" {
        subscriber.pretty().init();
    } else {
        subscriber.json().init();
    }
}

fn startup_error(context: &str, e: impl std::fmt::Display) -> std::io::Error {
    error!("{}: {}", context, e);
    std::io::Error::new(std::io::ErrorKind::Other, format!("{}: {}", context, e))
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Load .env file if present
    dotenv::dotenv().ok();

    let settings = Settings::load();

    // LOG_LEVEL / LOG_FORMAT win over the config file
    let (level, format) = match &settings {
        Ok(s) => (s.logging.level.clone(), s.logging.format.clone()),
        Err(_) => ("info".to_string(), "json".to_string()),
    };
    let level = std::env::var("LOG_LEVEL").unwrap_or(level);
    let format = std::env::var("LOG_FORMAT").unwrap_or(format);
    init_tracing(&level, &format);

    info!("Starting Spark matching service...");

    let settings = settings.map_err(|e| startup_error("Failed to load configuration", e))?;

    info!("Configuration loaded successfully");

    let postgres = Arc::new(
        PostgresClient::from_settings(
            &settings.database.url,
            settings.database.max_connections,
            settings.database.min_connections,
            settings.database.acquire_timeout_secs,
            settings.database.idle_timeout_secs,
        )
        .await
        .map_err(|e| startup_error("Failed to connect to PostgreSQL", e))?,
    );

    info!("PostgreSQL client initialized");

    let notifier = HttpNotifier::new(
        settings.notifications.endpoint.clone(),
        settings.notifications.timeout(),
    )
    .map_err(|e| startup_error("Failed to build notification client", e))?;

    let matcher = Matcher::new(Collaborators {
        profiles: postgres.clone(),
        attempts: postgres.clone(),
        events: postgres.clone(),
        photos: postgres.clone(),
        photo_links: Arc::new(CdnPhotoLinker::new(settings.photos.base_url.clone())),
        chats: postgres.clone(),
        notifier: Arc::new(notifier),
        random: Arc::new(ThreadRandom),
    })
    .with_selection_retries(settings.matching.max_selection_retries);

    info!(
        "Matcher initialized (selection retries: {}, request timeout: {}ms)",
        settings.matching.max_selection_retries, settings.matching.request_timeout_ms
    );

    let app_state = AppState {
        matcher: Arc::new(matcher),
        store_health: postgres,
        jwt_secret: Arc::from(settings.auth.jwt_secret.as_str()),
        request_timeout: settings.matching.request_timeout(),
    };

    // Configure HTTP server
    let host = settings.server.host.clone();
    let port = settings.server.port;
    let workers = settings.server.workers.unwrap_or(4);

    info!("Starting HTTP server on {}:{}", host, port);

    HttpServer::new(move || {
        let cors = Cors::permissive();

        App::new()
            .app_data(web::Data::new(app_state.clone()))
            .app_data(web::JsonConfig::default().error_handler(handle_json_payload_error))
            .wrap(cors)
            .wrap(middleware::Logger::default())
            .wrap(middleware::Compress::default())
            .configure(routes::configure_routes)
    })
    .workers(workers)
    .bind((host, port))?
    .run()
    .await
}
