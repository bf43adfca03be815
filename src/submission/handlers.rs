use actix_multipart::Multipart;
use actix_web::http::header::{ContentDisposition, DispositionParam, DispositionType};
use actix_web::{web, HttpResponse, Responder};
use sanitize_filename::sanitize;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::signature::{AcceptFeedback, EventOutcome, PadEvent};
use crate::submission::multipart_parser::MultipartParser;
use crate::submission::page::PageView;
use crate::submission::{PageError, SubmissionOutcome};
use crate::{AppState, ErrorResponse};

/// Response header carrying the relay's status code on success.
pub const RELAY_STATUS_HEADER: &str = "X-Relay-Status";

#[derive(Serialize, ToSchema)]
pub struct SessionResponse {
    pub id: Uuid,
    pub page: PageView,
}

#[derive(Deserialize, IntoParams)]
pub struct SessionQuery {
    /// `true` reproduces the submitted, read-only confirmation state.
    pub success: Option<String>,
}

#[derive(Deserialize, ToSchema, Default)]
pub struct UpdateFieldsRequest {
    /// Text and hidden control values by control id
    #[serde(default)]
    pub values: BTreeMap<String, String>,
    /// Checkbox states by control id
    #[serde(default)]
    pub checked: BTreeMap<String, bool>,
}

#[derive(Deserialize, ToSchema)]
pub struct SignatureEventsRequest {
    pub events: Vec<PadEvent>,
}

#[derive(Serialize, ToSchema)]
pub struct SignatureEventsResponse {
    pub outcomes: Vec<EventOutcome>,
}

/// The agreement form as a browser posts it. Unknown text fields are relayed as-is.
#[derive(Deserialize, ToSchema)]
pub struct AgreementForm {
    #[serde(rename = "fullName")]
    pub full_name: String,
    pub initials: String,
    /// `on` when checked
    pub read: Option<String>,
    pub terms: Option<String>,
    #[serde(rename = "hiddenStartDate")]
    pub start_date: Option<String>,
    #[serde(rename = "hiddenExpirationDate")]
    pub expiration_date: Option<String>,
    /// PNG data URL of the drawn signature
    pub signature: String,
}

#[derive(Serialize, ToSchema)]
pub struct AcceptSignatureResponse {
    pub feedback: AcceptFeedback,
    pub page: PageView,
}

fn session_not_found(id: &Uuid) -> HttpResponse {
    HttpResponse::NotFound().json(ErrorResponse::not_found(&format!("Session {} not found", id)))
}

fn page_error_response(error: PageError) -> HttpResponse {
    match error {
        PageError::ReadOnly(_) | PageError::SignatureLocked => {
            HttpResponse::Conflict().json(ErrorResponse::conflict(&error.to_string()))
        }
        PageError::UnknownControl(_)
        | PageError::WrongKind { .. }
        | PageError::SignatureDetached => {
            HttpResponse::BadRequest().json(ErrorResponse::bad_request(&error.to_string()))
        }
        PageError::Signature(_) => {
            HttpResponse::InternalServerError().json(ErrorResponse::internal_error(&error.to_string()))
        }
    }
}

/// Success streams the signed PDF back as the one download.
fn outcome_response(outcome: SubmissionOutcome) -> HttpResponse {
    match outcome {
        SubmissionOutcome::Succeeded {
            download, status, ..
        } => {
            let content_type = mime_guess::from_path(&download.filename).first_or_octet_stream();
            HttpResponse::Ok()
                .content_type(content_type.as_ref())
                .insert_header(ContentDisposition {
                    disposition: DispositionType::Attachment,
                    parameters: vec![DispositionParam::Filename(sanitize(&download.filename))],
                })
                .insert_header((RELAY_STATUS_HEADER, status.to_string()))
                .body(download.bytes)
        }
        SubmissionOutcome::Invalid(errors) => HttpResponse::UnprocessableEntity()
            .json(ErrorResponse::validation_failed(&errors.to_alert_message())),
        SubmissionOutcome::Failed { alert, .. } => {
            HttpResponse::BadGateway().json(ErrorResponse::submission_failed(&alert))
        }
        SubmissionOutcome::Ignored => HttpResponse::Conflict()
            .json(ErrorResponse::conflict("The agreement has already been submitted")),
    }
}

#[utoipa::path(
    context_path = "/api",
    tag = "Agreement Sessions",
    post,
    path = "/agreement/sessions",
    responses(
        (status = 201, description = "Session created with dates pre-filled", body = SessionResponse)
    )
)]
pub async fn create_session(data: web::Data<AppState>) -> impl Responder {
    let (id, page) = data.create_session().await;
    let page = page.lock().await.view();
    HttpResponse::Created().json(SessionResponse { id, page })
}

#[utoipa::path(
    context_path = "/api",
    tag = "Agreement Sessions",
    get,
    path = "/agreement/sessions/{id}",
    responses(
        (status = 200, description = "Current page state", body = SessionResponse),
        (status = 404, description = "Session not found", body = ErrorResponse)
    ),
    params(
        ("id" = Uuid, Path, description = "Session id"),
        SessionQuery
    )
)]
pub async fn get_session(
    id: web::Path<Uuid>,
    query: web::Query<SessionQuery>,
    data: web::Data<AppState>,
) -> impl Responder {
    let id = id.into_inner();
    let Some(page) = data.session(&id).await else {
        return session_not_found(&id);
    };

    let mut page = page.lock().await;
    if query.success.as_deref() == Some("true") {
        page.restore_submitted(data.orchestrator.redirect().start());
    }
    HttpResponse::Ok().json(SessionResponse {
        id,
        page: page.view(),
    })
}

#[utoipa::path(
    context_path = "/api",
    tag = "Agreement Sessions",
    put,
    path = "/agreement/sessions/{id}/fields",
    request_body = UpdateFieldsRequest,
    responses(
        (status = 200, description = "Fields updated", body = SessionResponse),
        (status = 400, description = "Unknown control or wrong control kind", body = ErrorResponse),
        (status = 404, description = "Session not found", body = ErrorResponse),
        (status = 409, description = "The form is locked", body = ErrorResponse)
    ),
    params(
        ("id" = Uuid, Path, description = "Session id")
    )
)]
pub async fn update_fields(
    id: web::Path<Uuid>,
    req: web::Json<UpdateFieldsRequest>,
    data: web::Data<AppState>,
) -> impl Responder {
    let id = id.into_inner();
    let Some(page) = data.session(&id).await else {
        return session_not_found(&id);
    };

    let mut page = page.lock().await;
    let req = req.into_inner();
    for (control, value) in &req.values {
        if let Err(e) = page.set_value(control, value) {
            return page_error_response(e);
        }
    }
    for (control, checked) in &req.checked {
        if let Err(e) = page.set_checked(control, *checked) {
            return page_error_response(e);
        }
    }

    HttpResponse::Ok().json(SessionResponse {
        id,
        page: page.view(),
    })
}

#[utoipa::path(
    context_path = "/api",
    tag = "Agreement Sessions",
    post,
    path = "/agreement/sessions/{id}/signature/events",
    request_body = SignatureEventsRequest,
    responses(
        (status = 200, description = "Events applied in order", body = SignatureEventsResponse),
        (status = 404, description = "Session not found", body = ErrorResponse),
        (status = 409, description = "The signature pad is locked", body = ErrorResponse)
    ),
    params(
        ("id" = Uuid, Path, description = "Session id")
    )
)]
pub async fn signature_events(
    id: web::Path<Uuid>,
    req: web::Json<SignatureEventsRequest>,
    data: web::Data<AppState>,
) -> impl Responder {
    let id = id.into_inner();
    let Some(page) = data.session(&id).await else {
        return session_not_found(&id);
    };

    let mut page = page.lock().await;
    let mut outcomes = Vec::with_capacity(req.events.len());
    for event in &req.events {
        match page.signature_event(*event) {
            Ok(outcome) => outcomes.push(outcome),
            Err(e) => return page_error_response(e),
        }
    }
    HttpResponse::Ok().json(SignatureEventsResponse { outcomes })
}

#[utoipa::path(
    context_path = "/api",
    tag = "Agreement Sessions",
    post,
    path = "/agreement/sessions/{id}/signature/clear",
    responses(
        (status = 200, description = "Signature cleared", body = SessionResponse),
        (status = 404, description = "Session not found", body = ErrorResponse),
        (status = 409, description = "The signature pad is locked", body = ErrorResponse)
    ),
    params(
        ("id" = Uuid, Path, description = "Session id")
    )
)]
pub async fn clear_signature(id: web::Path<Uuid>, data: web::Data<AppState>) -> impl Responder {
    let id = id.into_inner();
    let Some(page) = data.session(&id).await else {
        return session_not_found(&id);
    };

    let mut page = page.lock().await;
    match page.clear_signature() {
        Ok(()) => HttpResponse::Ok().json(SessionResponse {
            id,
            page: page.view(),
        }),
        Err(e) => page_error_response(e),
    }
}

#[utoipa::path(
    context_path = "/api",
    tag = "Agreement Sessions",
    post,
    path = "/agreement/sessions/{id}/signature/accept",
    responses(
        (status = 200, description = "Signature accepted", body = AcceptSignatureResponse),
        (status = 404, description = "Session not found", body = ErrorResponse),
        (status = 409, description = "The signature pad is locked", body = ErrorResponse)
    ),
    params(
        ("id" = Uuid, Path, description = "Session id")
    )
)]
pub async fn accept_signature(id: web::Path<Uuid>, data: web::Data<AppState>) -> impl Responder {
    let id = id.into_inner();
    let Some(page) = data.session(&id).await else {
        return session_not_found(&id);
    };

    let mut page = page.lock().await;
    match page.accept_signature() {
        Ok(feedback) => HttpResponse::Ok().json(AcceptSignatureResponse {
            feedback,
            page: page.view(),
        }),
        Err(e) => page_error_response(e),
    }
}

#[utoipa::path(
    context_path = "/api",
    tag = "Agreement Sessions",
    post,
    path = "/agreement/sessions/{id}/submit",
    responses(
        (status = 200, description = "Submitted; the body is the signed PDF", content_type = "application/pdf"),
        (status = 404, description = "Session not found", body = ErrorResponse),
        (status = 409, description = "Already submitted or submitting", body = ErrorResponse),
        (status = 422, description = "Required items are missing", body = ErrorResponse),
        (status = 502, description = "The relay rejected the submission", body = ErrorResponse)
    ),
    params(
        ("id" = Uuid, Path, description = "Session id")
    )
)]
pub async fn submit_session(id: web::Path<Uuid>, data: web::Data<AppState>) -> impl Responder {
    let id = id.into_inner();
    let Some(page) = data.session(&id).await else {
        return session_not_found(&id);
    };

    let mut page = page.lock().await;
    let outcome = data.orchestrator.submit(&mut page).await;
    outcome_response(outcome)
}

#[utoipa::path(
    context_path = "/api",
    tag = "Agreement Sessions",
    post,
    path = "/agreement/submit",
    request_body(content = AgreementForm, content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Submitted; the body is the signed PDF", content_type = "application/pdf"),
        (status = 400, description = "Malformed multipart body", body = ErrorResponse),
        (status = 422, description = "Required items are missing", body = ErrorResponse),
        (status = 502, description = "The relay rejected the submission", body = ErrorResponse)
    )
)]
pub async fn submit_form(payload: Multipart, data: web::Data<AppState>) -> impl Responder {
    let form = match MultipartParser::parse_agreement_multipart(payload).await {
        Ok(form) => form,
        Err(e) => {
            log::error!("Failed to parse agreement form: {}", e);
            return HttpResponse::from(e);
        }
    };

    let mut page = form.into_page();
    let outcome = data.orchestrator.submit(&mut page).await;
    outcome_response(outcome)
}

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/agreement/sessions").route(web::post().to(create_session)))
        .service(web::resource("/agreement/sessions/{id}").route(web::get().to(get_session)))
        .service(
            web::resource("/agreement/sessions/{id}/fields").route(web::put().to(update_fields)),
        )
        .service(
            web::resource("/agreement/sessions/{id}/signature/events")
                .route(web::post().to(signature_events)),
        )
        .service(
            web::resource("/agreement/sessions/{id}/signature/clear")
                .route(web::post().to(clear_signature)),
        )
        .service(
            web::resource("/agreement/sessions/{id}/signature/accept")
                .route(web::post().to(accept_signature)),
        )
        .service(
            web::resource("/agreement/sessions/{id}/submit").route(web::post().to(submit_session)),
        )
        .service(web::resource("/agreement/submit").route(web::post().to(submit_form)));
}
