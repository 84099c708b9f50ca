use std::borrow::Cow;

/// A specialized [`ListingsError`] enum of this crate.
#[mkt_derive::mkt_error]
pub enum ListingsError {
    /// Slice configuration is unusable.
    #[error("Listings config error{}: {message}", format_context(.context))]
    Config { message: Cow<'static, str>, context: Option<Cow<'static, str>> },
    /// Internal fallback for unexpected issues or logic errors.
    #[error("Internal listings error{}: {message}", format_context(.context))]
    Internal { message: Cow<'static, str>, context: Option<Cow<'static, str>> },
}
