#![allow(dead_code)]

use agreement_signing::assembler::{AgreementAssembler, SignaturePlacement};
use agreement_signing::config::AppConfig;
use agreement_signing::signature::{PadEvent, PointerSample};
use agreement_signing::submission::{
    AgreementPage, RedirectSettings, RelayPayload, RelayTransport, StaticSource,
    SubmissionOrchestrator, TransportError,
};
use agreement_signing::viewer::{DocumentViewer, PageRasterizer, ViewerError};
use agreement_signing::AppState;
use image::{Rgba, RgbaImage};
use lopdf::{dictionary, Dictionary, Document, Object, Stream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Notify;

pub const TEXT_FIELDS: [&str; 5] = ["Name", "StartDate", "EndDate", "SigDate", "PercentageValue"];
pub const CHECKBOX_FIELDS: [&str; 2] = ["Residential", "Percentage"];

fn text_widget(name: &str, y: i64) -> Dictionary {
    dictionary! {
        "Type" => "Annot",
        "Subtype" => "Widget",
        "FT" => "Tx",
        "T" => Object::string_literal(name),
        "DA" => Object::string_literal("/Helv 10 Tf 0 g"),
        "Rect" => vec![100.into(), y.into(), 300.into(), (y + 20).into()],
    }
}

fn checkbox_widget(name: &str, y: i64) -> Dictionary {
    dictionary! {
        "Type" => "Annot",
        "Subtype" => "Widget",
        "FT" => "Btn",
        "T" => Object::string_literal(name),
        "Rect" => vec![100.into(), y.into(), 112.into(), (y + 12).into()],
        "AP" => dictionary! {
            "N" => dictionary! { "On" => Object::Null, "Off" => Object::Null },
        },
        "AS" => "Off",
    }
}

/// A letter-size PDF with `pages` pages. With `with_form`, page 1 carries the
/// agreement's text fields and checkboxes.
pub fn agreement_pdf(pages: usize, with_form: bool) -> Vec<u8> {
    let mut doc = Document::with_version("1.7");
    let pages_id = doc.new_object_id();

    let mut page_ids = Vec::new();
    let mut field_refs = Vec::new();
    for index in 0..pages {
        let content = format!("BT /F1 12 Tf 72 720 Td (Page {}) Tj ET", index + 1);
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.into_bytes()));
        let page_id = doc.new_object_id();

        let mut annots = Vec::new();
        if with_form && index == 0 {
            let mut y = 700;
            let widgets = TEXT_FIELDS
                .iter()
                .map(|name| text_widget(name, y))
                .chain(CHECKBOX_FIELDS.iter().map(|name| checkbox_widget(name, y)))
                .collect::<Vec<_>>();
            for mut widget in widgets {
                widget.set("P", Object::Reference(page_id));
                let widget_ref = Object::Reference(doc.add_object(widget));
                annots.push(widget_ref.clone());
                field_refs.push(widget_ref);
                y -= 40;
            }
        }

        doc.objects.insert(
            page_id,
            Object::Dictionary(dictionary! {
                "Type" => "Page",
                "Parent" => Object::Reference(pages_id),
                "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
                "Contents" => Object::Reference(content_id),
                "Resources" => dictionary! {},
                "Annots" => annots,
            }),
        );
        page_ids.push(Object::Reference(page_id));
    }

    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => page_ids,
            "Count" => pages as i64,
        }),
    );

    let mut catalog = dictionary! {
        "Type" => "Catalog",
        "Pages" => Object::Reference(pages_id),
    };
    if with_form {
        catalog.set("AcroForm", dictionary! { "Fields" => field_refs });
    }
    let catalog_id = doc.add_object(catalog);
    doc.trailer.set("Root", Object::Reference(catalog_id));

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes).unwrap();
    bytes
}

/// Draw a dense pseudo-random scribble, enough to pass the blank-signature check.
pub fn scribble(page: &mut AgreementPage) {
    let mut seed: u32 = 11;
    let mut next = |bound: u32| {
        seed = seed.wrapping_mul(1_103_515_245).wrapping_add(12_345);
        ((seed >> 16) % bound) as f32
    };
    let mouse = |x: f32, y: f32| PointerSample::Mouse {
        offset_x: x,
        offset_y: y,
    };

    for _ in 0..120 {
        let start = mouse(next(500), next(200));
        let end = mouse(next(500), next(200));
        page.signature_event(PadEvent::Down { sample: start }).unwrap();
        page.signature_event(PadEvent::Move { sample: end }).unwrap();
        page.signature_event(PadEvent::Up { touch: false }).unwrap();
    }
}

/// Fill every required control and draw a signature.
pub fn complete(page: &mut AgreementPage) {
    page.set_value("fullName", "Jane Q Buyer").unwrap();
    page.set_value("initials", "JQB").unwrap();
    page.set_checked("read", true).unwrap();
    page.set_checked("terms", true).unwrap();
    scribble(page);
}

/// Relay double that answers with a fixed status and keeps every payload.
pub struct RecordingRelay {
    status: u16,
    payloads: parking_lot::Mutex<Vec<RelayPayload>>,
}

impl RecordingRelay {
    pub fn new(status: u16) -> Self {
        Self {
            status,
            payloads: parking_lot::Mutex::new(Vec::new()),
        }
    }

    pub fn payloads(&self) -> Vec<RelayPayload> {
        self.payloads.lock().clone()
    }
}

#[async_trait::async_trait]
impl RelayTransport for RecordingRelay {
    async fn post(&self, payload: RelayPayload) -> Result<u16, TransportError> {
        self.payloads.lock().push(payload);
        Ok(self.status)
    }
}

/// Rasterizer double. Renders a solid bitmap per page, records the order of
/// renders and can be held mid-render.
pub struct FakeRasterizer {
    page_count: u32,
    load_error: Option<String>,
    failing_pages: Vec<u32>,
    rendered: parking_lot::Mutex<Vec<u32>>,
    held: AtomicBool,
    release: Notify,
}

impl FakeRasterizer {
    pub fn new(page_count: u32) -> Self {
        Self {
            page_count,
            load_error: None,
            failing_pages: Vec::new(),
            rendered: parking_lot::Mutex::new(Vec::new()),
            held: AtomicBool::new(false),
            release: Notify::new(),
        }
    }

    pub fn failing_load(message: &str) -> Self {
        Self {
            load_error: Some(message.to_string()),
            ..Self::new(0)
        }
    }

    pub fn failing_pages(mut self, pages: &[u32]) -> Self {
        self.failing_pages = pages.to_vec();
        self
    }

    pub fn rendered(&self) -> Vec<u32> {
        self.rendered.lock().clone()
    }

    /// Park the next render until `release`.
    pub fn hold(&self) {
        self.held.store(true, Ordering::SeqCst);
    }

    pub fn release(&self) {
        self.held.store(false, Ordering::SeqCst);
        self.release.notify_one();
    }
}

#[async_trait::async_trait]
impl PageRasterizer for FakeRasterizer {
    async fn load(&self) -> Result<u32, ViewerError> {
        match &self.load_error {
            Some(message) => Err(ViewerError::Load(message.clone())),
            None => Ok(self.page_count),
        }
    }

    async fn render(&self, page: u32, scale: f32) -> Result<RgbaImage, ViewerError> {
        self.rendered.lock().push(page);
        if self.held.load(Ordering::SeqCst) {
            self.release.notified().await;
        }
        if page > self.page_count {
            return Err(ViewerError::PageOutOfRange(page));
        }
        if self.failing_pages.contains(&page) {
            return Err(ViewerError::Render(page, "broken content stream".to_string()));
        }
        let width = (40.0 * scale) as u32;
        let height = (50.0 * scale) as u32;
        Ok(RgbaImage::from_pixel(width, height, Rgba([page as u8, 0, 0, 255])))
    }
}

pub fn test_config() -> AppConfig {
    AppConfig::from_lookup(|key: &str| match key {
        "RELAY_ENDPOINT" => Some("http://relay.test/agreements".to_string()),
        "REDIRECT_SECONDS" => Some("10".to_string()),
        _ => None,
    })
    .unwrap()
}

pub fn orchestrator(relay: Arc<dyn RelayTransport>, source: Vec<u8>) -> SubmissionOrchestrator {
    SubmissionOrchestrator::new(
        Arc::new(StaticSource(Arc::new(source))),
        AgreementAssembler::new(SignaturePlacement::default()),
        relay,
        1000,
        RedirectSettings::default(),
    )
}

/// App state wired with test doubles instead of Pdfium and the network.
pub async fn test_state(relay: Arc<dyn RelayTransport>) -> AppState {
    let viewer = DocumentViewer::open(Arc::new(FakeRasterizer::new(3)), 1.0).await;
    AppState::from_parts(
        test_config(),
        viewer,
        orchestrator(relay, agreement_pdf(2, true)),
    )
}
