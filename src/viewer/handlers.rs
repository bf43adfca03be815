use actix_web::{web, HttpResponse, Responder};
use serde::Serialize;
use utoipa::ToSchema;

use crate::viewer::{DocumentHandle, PageFrame, RenderTicket};
use crate::{AppState, ErrorResponse};

#[derive(Serialize, ToSchema)]
pub struct DocumentResponse {
    pub page_count: u32,
    #[schema(value_type = Object)]
    pub state: serde_json::Value,
}

impl From<DocumentHandle> for DocumentResponse {
    fn from(handle: DocumentHandle) -> Self {
        Self {
            page_count: handle.page_count,
            state: serde_json::to_value(&handle.state).unwrap_or_default(),
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct PageResponse {
    #[schema(value_type = Object)]
    pub ticket: RenderTicket,
    #[schema(value_type = Object)]
    pub frame: PageFrame,
}

#[utoipa::path(
    context_path = "/api",
    tag = "Agreement Viewer",
    get,
    path = "/agreement/document",
    responses(
        (status = 200, description = "Loaded agreement document", body = DocumentResponse),
        (status = 404, description = "The agreement could not be loaded", body = ErrorResponse)
    )
)]
pub async fn get_document(data: web::Data<AppState>) -> impl Responder {
    match data.viewer.document() {
        Some(handle) => HttpResponse::Ok().json(DocumentResponse::from(handle)),
        None => HttpResponse::NotFound().json(ErrorResponse::not_found("No PDF document loaded")),
    }
}

#[utoipa::path(
    context_path = "/api",
    tag = "Agreement Viewer",
    get,
    path = "/agreement/pages/{page}",
    responses(
        (status = 200, description = "Render ticket and the current canvas frame", body = PageResponse),
        (status = 400, description = "Page numbers start at 1", body = ErrorResponse)
    ),
    params(
        ("page" = u32, Path, description = "1-based page number")
    )
)]
pub async fn get_page(page: web::Path<u32>, data: web::Data<AppState>) -> impl Responder {
    let page = page.into_inner();
    if page == 0 {
        return HttpResponse::BadRequest().json(ErrorResponse::bad_request("Page numbers start at 1"));
    }

    let ticket = data.viewer.show_page(page).await;
    HttpResponse::Ok().json(PageResponse {
        ticket,
        frame: data.viewer.frame(),
    })
}

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/agreement/document").route(web::get().to(get_document)))
        .service(web::resource("/agreement/pages/{page}").route(web::get().to(get_page)));
}
