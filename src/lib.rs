use actix_cors::Cors;
use actix_web::middleware::Compress;
use actix_web::{http::header, web, App, HttpServer};
use actix_web_prometheus::PrometheusMetricsBuilder;
use serde::{Deserialize, Serialize};
use utoipa::{OpenApi, ToSchema};
use utoipa_swagger_ui::SwaggerUi;

pub mod assembler;
pub mod config;
pub mod data_url;
pub mod dates;
pub mod signature;
pub mod state;
pub mod submission;
pub mod viewer;

pub use crate::config::AppConfig;
pub use crate::state::AppState;

#[derive(Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    pub timestamp: String,
}

impl ErrorResponse {
    pub fn new(error_type: &str, message: &str) -> Self {
        Self {
            error: error_type.to_string(),
            message: message.to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }

    pub fn not_found(message: &str) -> Self {
        Self::new("NotFound", message)
    }

    pub fn bad_request(message: &str) -> Self {
        Self::new("BadRequest", message)
    }

    pub fn internal_error(message: &str) -> Self {
        Self::new("InternalServerError", message)
    }

    pub fn conflict(message: &str) -> Self {
        Self::new("Conflict", message)
    }

    pub fn validation_failed(message: &str) -> Self {
        Self::new("ValidationFailed", message)
    }

    pub fn submission_failed(message: &str) -> Self {
        Self::new("SubmissionFailed", message)
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::viewer::handlers::get_document,
        crate::viewer::handlers::get_page,
        crate::submission::handlers::create_session,
        crate::submission::handlers::get_session,
        crate::submission::handlers::update_fields,
        crate::submission::handlers::signature_events,
        crate::submission::handlers::clear_signature,
        crate::submission::handlers::accept_signature,
        crate::submission::handlers::submit_session,
        crate::submission::handlers::submit_form
    ),
    components(
        schemas(
            viewer::handlers::DocumentResponse,
            viewer::handlers::PageResponse,
            submission::handlers::SessionResponse,
            submission::handlers::UpdateFieldsRequest,
            submission::handlers::SignatureEventsRequest,
            submission::handlers::SignatureEventsResponse,
            submission::handlers::AgreementForm,
            submission::handlers::AcceptSignatureResponse,
            submission::page::PageView,
            signature::PadEvent,
            signature::EventOutcome,
            signature::AcceptFeedback,
            ErrorResponse,
        )
    ),
    tags(
        (name = "Agreement Viewer", description = "Agreement document rendering."),
        (name = "Agreement Sessions", description = "Form filling, signature capture and submission.")
    ),
    servers(
        (url = "http://127.0.0.1:8080", description = "Localhost server")
    )
)]
pub struct ApiDoc;

pub async fn run() -> std::io::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = match AppConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            log::error!("Invalid configuration. Please check your .env file. Error: {}", e);
            std::process::exit(1);
        }
    };
    let bind = (config.bind_address.clone(), config.port);
    let static_dir = config.static_dir.clone();
    let origins = config.cors_allowed_origins.clone();

    let app_state = match AppState::new(config).await {
        Ok(state) => web::Data::new(state),
        Err(e) => {
            log::error!("Failed to build the relay HTTP client. Error: {}", e);
            std::process::exit(1);
        }
    };

    let prometheus = PrometheusMetricsBuilder::new("agreement_signing")
        .endpoint("/metrics")
        .build()
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e.to_string()))?;

    log::info!("Starting server at http://{}:{}", bind.0, bind.1);

    HttpServer::new(move || {
        let app_state = app_state.clone();
        let prometheus = prometheus.clone();
        let cors = origins
            .iter()
            .fold(Cors::default(), |cors, origin| cors.allowed_origin(origin))
            .allowed_methods(vec!["GET", "POST", "PUT", "OPTIONS"])
            .allowed_headers(vec![header::ACCEPT, header::CONTENT_TYPE])
            .expose_headers(vec![header::CONTENT_DISPOSITION])
            .max_age(3600);

        let mut app = App::new()
            .wrap(Compress::default())
            .wrap(prometheus)
            .wrap(cors)
            .app_data(app_state)
            .service(
                web::scope("/api")
                    .configure(viewer::handlers::config)
                    .configure(submission::handlers::config),
            )
            .service(
                SwaggerUi::new("/swagger-ui/{_:.*}")
                    .url("/api-doc/openapi.json", ApiDoc::openapi()),
            );
        if let Some(dir) = &static_dir {
            app = app.service(actix_files::Files::new("/", dir).index_file("index.html"));
        }
        app
    })
    .keep_alive(actix_web::http::KeepAlive::Os)
    .bind(bind)?
    .run()
    .await
}
