use mkt_derive::mkt_error;
use std::borrow::Cow;

#[mkt_error]
pub enum DemoError {
    #[error("IO error{}: {source}", format_context(.context))]
    Io {
        #[source]
        source: std::io::Error,
        context: Option<Cow<'static, str>>,
    },

    #[http(409)]
    #[error("Conflict{}: {message}", format_context(.context))]
    Conflict { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    #[error("Internal error{}: {message}", format_context(.context))]
    Internal { message: Cow<'static, str>, context: Option<Cow<'static, str>> },
}

fn main() {
    let conflict = DemoError::Conflict { message: "taken".into(), context: None };
    assert_eq!(conflict.http_status(), 409);
    assert_eq!(DemoError::from("boom").http_status(), 500);
}
