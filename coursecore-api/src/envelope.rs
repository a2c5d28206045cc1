//! The JSON response envelope shared by every endpoint.
//!
//! Wire shape: `{ success, status_code, message?, data?, errors?, meta? }`.
//! Only the delivery layer maps error kinds to status codes; the domain
//! core never sees them.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use coursecore::errors::{DomainError, ValidationErrors};
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::error;

/// Builder and serialized form of the response envelope.
#[derive(Debug, Clone, Serialize)]
pub struct ApiResponse {
    /// True for 2xx responses.
    pub success: bool,
    /// HTTP status code, duplicated into the body for client convenience.
    pub status_code: u16,
    /// Human-readable outcome description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Response payload.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    /// Field-keyed validation errors.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<ValidationErrors>,
    /// Auxiliary metadata (e.g. list totals).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<Map<String, Value>>,
}

impl ApiResponse {
    fn with_status(status_code: u16, message: impl Into<String>) -> Self {
        Self {
            success: (200..300).contains(&status_code),
            status_code,
            message: Some(message.into()),
            data: None,
            errors: None,
            meta: None,
        }
    }

    /// A 200 response with a payload.
    pub fn success(data: impl Serialize, message: impl Into<String>) -> Self {
        let mut response = Self::with_status(200, message);
        response.data = serde_json::to_value(data).ok();
        response
    }

    /// A 200 response without a payload.
    pub fn success_empty(message: impl Into<String>) -> Self {
        Self::with_status(200, message)
    }

    /// A 201 response with the created resource.
    pub fn created(data: impl Serialize, message: impl Into<String>) -> Self {
        let mut response = Self::with_status(201, message);
        response.data = serde_json::to_value(data).ok();
        response
    }

    /// An error response with the given status code.
    pub fn error(message: impl Into<String>, status_code: u16) -> Self {
        Self::with_status(status_code, message)
    }

    /// A 404 response.
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::with_status(404, message)
    }

    /// A 422 response carrying field-keyed errors.
    pub fn validation_error(errors: ValidationErrors) -> Self {
        let mut response = Self::with_status(422, "Validation failed");
        response.errors = Some(errors);
        response
    }

    /// Attaches a metadata entry.
    #[must_use]
    pub fn with_meta(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.meta
            .get_or_insert_with(Map::new)
            .insert(key.into(), value.into());
        self
    }
}

impl From<DomainError> for ApiResponse {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::NotFound { .. } => Self::not_found(err.to_string()),
            DomainError::Business(message) => Self::error(message, 400),
            DomainError::Validation(errors) => Self::validation_error(errors),
            DomainError::Infrastructure(store_err) => {
                // the store detail goes to the log, never onto the wire
                error!(error = %store_err, "request failed on the store");
                Self::error("Internal server error", 500)
            }
        }
    }
}

impl IntoResponse for ApiResponse {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.status_code)
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(self)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use coursecore::errors::ResourceKind;

    #[test]
    fn success_envelope_shape() {
        let response = ApiResponse::success(serde_json::json!({"id": 1}), "Done")
            .with_meta("total", 1);
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["success"], true);
        assert_eq!(json["status_code"], 200);
        assert_eq!(json["message"], "Done");
        assert_eq!(json["data"]["id"], 1);
        assert_eq!(json["meta"]["total"], 1);
        assert!(json.get("errors").is_none());
    }

    #[test]
    fn domain_errors_map_to_their_status_codes() {
        let not_found: ApiResponse =
            DomainError::not_found(ResourceKind::Course, 9_i64).into();
        assert_eq!(not_found.status_code, 404);
        assert_eq!(not_found.message.as_deref(), Some("Course with ID 9 not found"));

        let business: ApiResponse = DomainError::business("Course is full").into();
        assert_eq!(business.status_code, 400);
        assert!(!business.success);

        let validation: ApiResponse = DomainError::Validation(ValidationErrors::single(
            "email",
            "Email is required",
        ))
        .into();
        assert_eq!(validation.status_code, 422);

        let infra: ApiResponse = DomainError::Infrastructure(
            coursecore::errors::StoreError::Unavailable("down".into()),
        )
        .into();
        assert_eq!(infra.status_code, 500);
        assert_eq!(infra.message.as_deref(), Some("Internal server error"));
    }
}
