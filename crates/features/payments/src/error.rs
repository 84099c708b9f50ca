use std::borrow::Cow;

/// A specialized [`PaymentsError`] enum of this crate.
#[mkt_derive::mkt_error]
pub enum PaymentsError {
    /// Slice configuration is unusable.
    #[error("Payments config error{}: {message}", format_context(.context))]
    Config { message: Cow<'static, str>, context: Option<Cow<'static, str>> },
    /// Internal fallback for unexpected issues or logic errors.
    #[error("Internal payments error{}: {message}", format_context(.context))]
    Internal { message: Cow<'static, str>, context: Option<Cow<'static, str>> },
}
