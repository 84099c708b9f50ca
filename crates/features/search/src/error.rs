use std::borrow::Cow;

/// A specialized [`SearchError`] enum of this crate.
#[mkt_derive::mkt_error]
pub enum SearchError {
    /// Result limits are unusable.
    #[error("Search config error{}: {message}", format_context(.context))]
    Config { message: Cow<'static, str>, context: Option<Cow<'static, str>> },
    #[error("Internal search error{}: {message}", format_context(.context))]
    Internal { message: Cow<'static, str>, context: Option<Cow<'static, str>> },
}
