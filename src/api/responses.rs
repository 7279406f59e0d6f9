//! API response types and error handling.

use axum::{
    extract::rejection::JsonRejection,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use serde_json::json;

use crate::storage::Row;
use crate::{MonorepoError, Result};

/// API error rendered as `{"error": message}`
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    // Convenience constructors

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, message)
    }

    pub fn not_found(resource: &str) -> Self {
        Self::new(StatusCode::NOT_FOUND, format!("{} not found", resource))
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }

    pub fn bad_gateway(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_GATEWAY, message)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}

impl From<MonorepoError> for ApiError {
    fn from(err: MonorepoError) -> Self {
        let status =
            StatusCode::from_u16(err.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        // Engine messages go back to the caller unfiltered
        Self::new(status, err.to_string())
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::bad_request(rejection.body_text())
    }
}

/// Result type alias for API handlers
pub type ApiResult<T> = std::result::Result<T, ApiError>;

/// Unwrap a JSON body, turning any rejection into a 400 `{"error": ..}`
pub fn json_body<T>(payload: std::result::Result<Json<T>, JsonRejection>) -> ApiResult<T> {
    payload.map(|Json(value)| value).map_err(ApiError::from)
}

/// Render rows as `<root><item><column>value</column>..</item>..</root>`
pub fn rows_to_xml(root: &str, item: &str, rows: &[Row]) -> Result<String> {
    let mut writer = Writer::new(Vec::new());

    writer
        .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))
        .map_err(MonorepoError::xml)?;
    writer
        .write_event(Event::Start(BytesStart::new(root)))
        .map_err(MonorepoError::xml)?;

    for row in rows {
        writer
            .write_event(Event::Start(BytesStart::new(item)))
            .map_err(MonorepoError::xml)?;
        for (column, value) in row.iter() {
            let text = value.to_string();
            writer
                .write_event(Event::Start(BytesStart::new(column)))
                .map_err(MonorepoError::xml)?;
            writer
                .write_event(Event::Text(BytesText::new(&text)))
                .map_err(MonorepoError::xml)?;
            writer
                .write_event(Event::End(BytesEnd::new(column)))
                .map_err(MonorepoError::xml)?;
        }
        writer
            .write_event(Event::End(BytesEnd::new(item)))
            .map_err(MonorepoError::xml)?;
    }

    writer
        .write_event(Event::End(BytesEnd::new(root)))
        .map_err(MonorepoError::xml)?;

    String::from_utf8(writer.into_inner()).map_err(MonorepoError::xml)
}

/// XML body with an `application/xml` content type
pub struct Xml(pub String);

impl IntoResponse for Xml {
    fn into_response(self) -> Response {
        (
            [(header::CONTENT_TYPE, "application/xml; charset=utf-8")],
            self.0,
        )
            .into_response()
    }
}
