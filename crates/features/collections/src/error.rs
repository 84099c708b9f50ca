use std::borrow::Cow;

/// A specialized [`CollectionsError`] enum of this crate.
#[mkt_derive::mkt_error]
pub enum CollectionsError {
    #[error("Collections config error{}: {message}", format_context(.context))]
    Config { message: Cow<'static, str>, context: Option<Cow<'static, str>> },
    #[error("Internal collections error{}: {message}", format_context(.context))]
    Internal { message: Cow<'static, str>, context: Option<Cow<'static, str>> },
}
