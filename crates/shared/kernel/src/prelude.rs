//! Common imports for feature slices.

pub use crate::domain::config::ApiConfig;
pub use crate::domain::registry::{FeatureSlice, InitializedSlice};
pub use crate::{safe_nanoid, slugify};

#[cfg(feature = "server")]
pub use crate::server::{
    ApiError, ApiErrorExt, ApiState, ErrorResponse, FieldErrors, Page, PageParams, QueryParams,
    RequestContext,
};
