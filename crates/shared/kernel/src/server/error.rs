use axum::Json;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use crate::server::state::ApiStateError;
use mkt_billing::BillingError;
use mkt_derive::api_model;
use mkt_index::IndexError;
use mkt_store::StoreError;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::collections::BTreeMap;
use tracing::{debug, error, warn};

/// Field name used for errors that concern the whole payload.
pub const NON_FIELD_ERRORS: &str = "non_field_errors";

/// Validation messages collected per field.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<String, Vec<String>>);

impl FieldErrors {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.0.entry(field.into()).or_default().push(message.into());
    }

    #[must_use]
    pub fn with(mut self, field: impl Into<String>, message: impl Into<String>) -> Self {
        self.add(field, message);
        self
    }

    /// Adds every message of `other`, keeping existing ones.
    pub fn merge(&mut self, other: Self) {
        for (field, messages) in other.0 {
            self.0.entry(field).or_default().extend(messages);
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.0.get(field).map(Vec::as_slice)
    }

    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// `Ok(())` when nothing was collected.
    ///
    /// # Errors
    /// Returns [`ApiError::Validation`] carrying the collected messages.
    pub fn into_result(self) -> Result<(), ApiError> {
        if self.is_empty() { Ok(()) } else { Err(ApiError::validation(self)) }
    }
}

/// Errors returned by API handlers.
#[mkt_derive::mkt_error]
pub enum ApiError {
    #[http(400)]
    #[error("Validation failed{}: {message}", format_context(.context))]
    Validation {
        message: Cow<'static, str>,
        errors: FieldErrors,
        context: Option<Cow<'static, str>>,
    },

    /// A remote collaborator refused the input; `payload` is passed through verbatim.
    #[http(400)]
    #[error("Rejected by remote service{}: {message}", format_context(.context))]
    Rejected {
        message: Cow<'static, str>,
        payload: serde_json::Value,
        context: Option<Cow<'static, str>>,
    },

    #[http(403)]
    #[error("Forbidden{}: {message}", format_context(.context))]
    Forbidden { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    #[http(404)]
    #[error("Not found{}: {message}", format_context(.context))]
    NotFound { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    #[http(405)]
    #[error("Method not allowed{}: {message}", format_context(.context))]
    MethodNotAllowed { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    /// The request conflicts with local state; retrying will not help.
    #[http(409)]
    #[error("Conflict{}: {message}", format_context(.context))]
    Conflict { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    /// `details` are rendered next to the reason so clients can still show contact data.
    #[http(451)]
    #[error("Unavailable in region{}: {message}", format_context(.context))]
    RegionRestricted {
        message: Cow<'static, str>,
        details: serde_json::Map<String, serde_json::Value>,
        context: Option<Cow<'static, str>>,
    },

    #[http(502)]
    #[error("Remote service unavailable{}: {message}", format_context(.context))]
    BadGateway { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    #[error("Internal error{}: {message}", format_context(.context))]
    Internal { message: Cow<'static, str>, context: Option<Cow<'static, str>> },
}

impl ApiError {
    #[must_use]
    pub fn validation(errors: FieldErrors) -> Self {
        Self::Validation { message: "Invalid input".into(), errors, context: None }
    }

    /// A validation error on a single field.
    #[must_use]
    pub fn field(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::validation(FieldErrors::new().with(field, message))
    }

    #[must_use]
    pub fn forbidden(message: impl Into<Cow<'static, str>>) -> Self {
        Self::Forbidden { message: message.into(), context: None }
    }

    #[must_use]
    pub fn not_found(message: impl Into<Cow<'static, str>>) -> Self {
        Self::NotFound { message: message.into(), context: None }
    }

    #[must_use]
    pub fn method_not_allowed(message: impl Into<Cow<'static, str>>) -> Self {
        Self::MethodNotAllowed { message: message.into(), context: None }
    }

    #[must_use]
    pub fn conflict(message: impl Into<Cow<'static, str>>) -> Self {
        Self::Conflict { message: message.into(), context: None }
    }

    #[must_use]
    pub fn region_restricted(details: serde_json::Map<String, serde_json::Value>) -> Self {
        Self::RegionRestricted { message: "Not available in your region.".into(), details, context: None }
    }

    #[must_use]
    pub fn bad_gateway(message: impl Into<Cow<'static, str>>) -> Self {
        Self::BadGateway { message: message.into(), context: None }
    }

    /// The human readable reason sent to clients.
    #[must_use]
    pub fn reason(&self) -> &str {
        match self {
            Self::Internal { .. } => "Internal server error",
            Self::Validation { message, .. }
            | Self::Rejected { message, .. }
            | Self::Forbidden { message, .. }
            | Self::NotFound { message, .. }
            | Self::MethodNotAllowed { message, .. }
            | Self::Conflict { message, .. }
            | Self::RegionRestricted { message, .. }
            | Self::BadGateway { message, .. } => message.as_ref(),
        }
    }
}

/// Error body: `{"reason": "...", "errors": {"field": ["message"]}}`.
#[api_model]
pub struct ErrorResponse {
    pub reason: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[cfg_attr(feature = "server", schema(value_type = Option<Object>))]
    pub errors: Option<FieldErrors>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        match status.as_u16() {
            500.. => error!(status = status.as_u16(), "{self}"),
            _ => debug!(status = status.as_u16(), "{self}"),
        }

        match self {
            Self::Rejected { payload, .. } => (status, Json(payload)).into_response(),
            Self::RegionRestricted { message, mut details, .. } => {
                details.insert("reason".to_owned(), serde_json::Value::from(message.into_owned()));
                (status, Json(details)).into_response()
            },
            Self::Validation { message, errors, .. } => {
                let body = ErrorResponse { reason: message.into_owned(), errors: Some(errors) };
                (status, Json(body)).into_response()
            },
            other => {
                let body = ErrorResponse { reason: other.reason().to_owned(), errors: None };
                (status, Json(body)).into_response()
            },
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound { message, .. } => Self::NotFound { message, context: None },
            StoreError::Unique { message, .. } => {
                Self::validation(FieldErrors::new().with(NON_FIELD_ERRORS, message))
            },
            other => Self::Internal { message: other.to_string().into(), context: None },
        }
    }
}

impl From<IndexError> for ApiError {
    fn from(err: IndexError) -> Self {
        if err.http_status() == 502 {
            warn!(error = %err, "Search backend failure");
            Self::bad_gateway("Search backend unavailable")
        } else {
            Self::Internal { message: err.to_string().into(), context: None }
        }
    }
}

impl From<BillingError> for ApiError {
    fn from(err: BillingError) -> Self {
        warn!(error = %err, "Billing provider call failed");
        match err {
            BillingError::Rejected { message, payload, .. } => {
                Self::Rejected { message, payload, context: None }
            },
            BillingError::NotFound { message, .. } => Self::NotFound { message, context: None },
            err if err.is_unavailable() => Self::bad_gateway("Billing provider unavailable"),
            other => Self::Internal { message: other.to_string().into(), context: None },
        }
    }
}

impl From<ApiStateError> for ApiError {
    fn from(err: ApiStateError) -> Self {
        Self::Internal { message: err.to_string().into(), context: None }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::field(NON_FIELD_ERRORS, rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        Self::field(NON_FIELD_ERRORS, rejection.body_text())
    }
}
