//! Shared application state.

use moka::future::Cache;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::assembler::AgreementAssembler;
use crate::config::AppConfig;
use crate::dates::AgreementDates;
use crate::submission::{
    AgreementPage, FileSource, HttpRelay, SubmissionOrchestrator,
};
use crate::viewer::{DocumentViewer, PdfiumRasterizer};

pub type SharedPage = Arc<Mutex<AgreementPage>>;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub sessions: Cache<Uuid, SharedPage>,
    pub viewer: Arc<DocumentViewer>,
    pub orchestrator: Arc<SubmissionOrchestrator>,
}

impl AppState {
    /// Wire the production components: Pdfium viewer, file source, HTTP relay.
    pub async fn new(config: AppConfig) -> Result<Self, reqwest::Error> {
        let http_client = reqwest::Client::builder()
            .pool_idle_timeout(Duration::from_secs(900))
            .user_agent("agreement-signing-server/1.0")
            .build()?;

        let rasterizer = Arc::new(PdfiumRasterizer::new(
            config.agreement_pdf_path.clone(),
            config.pdfium_library_path.as_deref(),
        ));
        let viewer = DocumentViewer::open(rasterizer, config.render_scale).await;

        let orchestrator = SubmissionOrchestrator::new(
            Arc::new(FileSource::new(config.agreement_pdf_path.clone())),
            AgreementAssembler::new(config.signature_placement),
            Arc::new(HttpRelay::new(http_client, config.relay_endpoint.clone())),
            config.empty_signature_threshold,
            config.redirect.clone(),
        );

        Ok(Self::from_parts(config, viewer, orchestrator))
    }

    pub fn from_parts(
        config: AppConfig,
        viewer: DocumentViewer,
        orchestrator: SubmissionOrchestrator,
    ) -> Self {
        let sessions = Cache::builder()
            .time_to_idle(Duration::from_secs(config.session_ttl_secs))
            .max_capacity(10_000)
            .build();

        Self {
            config: Arc::new(config),
            sessions,
            viewer: Arc::new(viewer),
            orchestrator: Arc::new(orchestrator),
        }
    }

    /// Start a page session with today's dates and a fresh signature pad.
    pub async fn create_session(&self) -> (Uuid, SharedPage) {
        let id = Uuid::new_v4();
        let page = Arc::new(Mutex::new(AgreementPage::with_pad(
            AgreementDates::today(),
            self.config.signature_pad_width,
            self.config.signature_pad_height,
        )));
        self.sessions.insert(id, page.clone()).await;
        log::info!("Created agreement session {}", id);
        (id, page)
    }

    pub async fn session(&self, id: &Uuid) -> Option<SharedPage> {
        self.sessions.get(id).await
    }
}
