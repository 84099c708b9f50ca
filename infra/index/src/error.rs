use std::borrow::Cow;

/// A specialized [`IndexError`] enum of this crate.
#[mkt_derive::mkt_error]
pub enum IndexError {
    /// The search backend could not be reached.
    #[cfg(feature = "elastic")]
    #[http(502)]
    #[error("Search transport error{}: {source}", format_context(.context))]
    Transport { source: reqwest::Error, context: Option<Cow<'static, str>> },

    /// The search backend answered with an error status.
    #[http(502)]
    #[error("Search backend error{}: {message}", format_context(.context))]
    Backend { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    #[error("Search document encoding error{}: {source}", format_context(.context))]
    Encode { source: serde_json::Error, context: Option<Cow<'static, str>> },

    #[error("Internal search error{}: {message}", format_context(.context))]
    Internal { message: Cow<'static, str>, context: Option<Cow<'static, str>> },
}
