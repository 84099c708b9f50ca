//! HTTP plumbing shared by the feature slices: application state, request context,
//! the API error model and pagination.

mod context;
mod error;
mod health;
mod pagination;
pub mod router;
mod state;

pub use context::{QueryParams, RequestContext};
pub use error::{ApiError, ApiErrorExt, ErrorResponse, FieldErrors, NON_FIELD_ERRORS};
pub use pagination::{Page, PageMeta, PageParams};
pub use state::{ApiState, ApiStateBuilder, ApiStateError, ApiStateErrorExt, ApiStateInner};
