use std::borrow::Cow;

/// A specialized [`StoreError`] enum of this crate.
#[mkt_derive::mkt_error]
pub enum StoreError {
    #[http(404)]
    #[error("Record not found{}: {message}", format_context(.context))]
    NotFound { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    /// A uniqueness constraint rejected the write.
    #[http(400)]
    #[error("Uniqueness violation{}: {message}", format_context(.context))]
    Unique { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    #[error("Seed I/O failure{}: {source}", format_context(.context))]
    Io { source: std::io::Error, context: Option<Cow<'static, str>> },

    #[error("Seed decoding failure{}: {source}", format_context(.context))]
    Decode { source: serde_json::Error, context: Option<Cow<'static, str>> },
}

impl StoreError {
    pub(crate) fn not_found(kind: &'static str, id: u64) -> Self {
        Self::NotFound { message: format!("{kind} {id}").into(), context: None }
    }
}
