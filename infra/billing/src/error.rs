use std::borrow::Cow;

/// A specialized [`BillingError`] enum of this crate.
#[mkt_derive::mkt_error]
pub enum BillingError {
    /// The provider refused the request; `payload` is its response body.
    #[http(400)]
    #[error("Billing provider rejected the request{}: {message}", format_context(.context))]
    Rejected {
        message: Cow<'static, str>,
        payload: serde_json::Value,
        context: Option<Cow<'static, str>>,
    },

    #[http(404)]
    #[error("Billing record not found{}: {message}", format_context(.context))]
    NotFound { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    /// The provider failed or answered with a server error.
    #[http(502)]
    #[error("Billing provider unavailable{}: {message}", format_context(.context))]
    Unavailable { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    #[http(502)]
    #[error("Billing transport error{}: {source}", format_context(.context))]
    Transport { source: reqwest::Error, context: Option<Cow<'static, str>> },

    #[http(502)]
    #[error("Billing response decoding error{}: {source}", format_context(.context))]
    Decode { source: serde_json::Error, context: Option<Cow<'static, str>> },

    #[error("Internal billing error{}: {message}", format_context(.context))]
    Internal { message: Cow<'static, str>, context: Option<Cow<'static, str>> },
}

impl BillingError {
    /// Whether the provider could not be reached or failed on its side.
    #[must_use]
    pub const fn is_unavailable(&self) -> bool {
        matches!(self, Self::Unavailable { .. } | Self::Transport { .. } | Self::Decode { .. })
    }
}
