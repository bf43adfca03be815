use actix_multipart::Multipart;
use actix_web::HttpResponse;
use futures::StreamExt;
use log::error;

use super::page::{
    AgreementPage, FormControl, EXPIRATION_DATE, FULL_NAME, INITIALS, READ, SIGNATURE_DATA,
    SIGNATURE_NAME, START_DATE, TERMS,
};
use crate::dates::AgreementDates;
use crate::ErrorResponse;

/// Upper bound for any single text field; signatures are the largest.
const MAX_FIELD_BYTES: usize = 2 * 1024 * 1024;

/// Text fields of a browser-posted agreement form, in arrival order.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SubmittedForm {
    pub fields: Vec<(String, String)>,
}

impl SubmittedForm {
    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    fn checked(&self, name: &str) -> bool {
        matches!(
            self.get(name).map(|v| v.trim().to_ascii_lowercase()).as_deref(),
            Some("on" | "true" | "1" | "yes")
        )
    }

    /// Rebuild the page this form was posted from. The signature canvas stays
    /// client-side; missing dates are computed for today.
    pub fn into_page(self) -> AgreementPage {
        let today = AgreementDates::today();
        let mut page = AgreementPage::detached(today);

        for (id, value) in [
            (FULL_NAME, self.get(FULL_NAME)),
            (INITIALS, self.get(INITIALS)),
            (START_DATE, self.get(START_DATE)),
            (EXPIRATION_DATE, self.get(EXPIRATION_DATE)),
            (SIGNATURE_DATA, self.get(SIGNATURE_NAME)),
        ] {
            if let Some(value) = value.filter(|v| !v.is_empty()) {
                if let Err(e) = page.set_value(id, value) {
                    error!("Failed to restore control {}: {}", id, e);
                }
            }
        }
        for id in [READ, TERMS] {
            if let Err(e) = page.set_checked(id, self.checked(id)) {
                error!("Failed to restore control {}: {}", id, e);
            }
        }

        let known = [
            FULL_NAME,
            INITIALS,
            READ,
            TERMS,
            START_DATE,
            EXPIRATION_DATE,
            SIGNATURE_NAME,
            SIGNATURE_DATA,
        ];
        for (name, value) in self.fields {
            if !known.contains(&name.as_str()) {
                page = page.with_extra_control(FormControl::hidden(&name, &name, &value));
            }
        }
        page
    }
}

#[derive(Debug, thiserror::Error)]
pub enum MultipartParseError {
    #[error("Multipart field error: {0}")]
    FieldError(String),
    #[error("IO error: {0}")]
    IoError(String),
    #[error("Invalid UTF-8 data: {0}")]
    Utf8Error(String),
    #[error("Field {0} is too large")]
    TooLarge(String),
}

impl From<MultipartParseError> for HttpResponse {
    fn from(error: MultipartParseError) -> Self {
        match error {
            MultipartParseError::Utf8Error(_)
            | MultipartParseError::TooLarge(_)
            | MultipartParseError::FieldError(_) => {
                HttpResponse::BadRequest().json(ErrorResponse::bad_request(&format!("{}", error)))
            }
            MultipartParseError::IoError(_) => HttpResponse::InternalServerError()
                .json(ErrorResponse::internal_error(&format!("{}", error))),
        }
    }
}

pub struct MultipartParser;

impl MultipartParser {
    pub async fn parse_agreement_multipart(
        mut multipart: Multipart,
    ) -> Result<SubmittedForm, MultipartParseError> {
        let mut form = SubmittedForm::default();

        while let Some(item) = multipart.next().await {
            let mut field = item.map_err(|e| MultipartParseError::FieldError(e.to_string()))?;
            let content_disposition = field.content_disposition().ok_or_else(|| {
                MultipartParseError::FieldError("Content disposition not found".to_string())
            })?;
            let name = content_disposition
                .get_name()
                .ok_or_else(|| MultipartParseError::FieldError("Field name not found".to_string()))?
                .to_string();

            // Files are never part of the agreement form.
            if content_disposition.get_filename().is_some() {
                while let Some(chunk) = field.next().await {
                    chunk.map_err(|e| MultipartParseError::IoError(e.to_string()))?;
                }
                continue;
            }

            let mut buffer = Vec::new();
            while let Some(chunk) = field.next().await {
                let data_chunk = chunk.map_err(|e| MultipartParseError::IoError(e.to_string()))?;
                if buffer.len() + data_chunk.len() > MAX_FIELD_BYTES {
                    return Err(MultipartParseError::TooLarge(name));
                }
                buffer.extend_from_slice(&data_chunk);
            }

            let value =
                String::from_utf8(buffer).map_err(|e| MultipartParseError::Utf8Error(e.to_string()))?;
            form.fields.push((name, value));
        }

        Ok(form)
    }
}
