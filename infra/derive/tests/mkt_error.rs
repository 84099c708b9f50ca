use mkt_derive::mkt_error;
use std::borrow::Cow;

#[mkt_error]
pub enum CatalogError {
    #[error("IO error{}: {source}", format_context(.context))]
    Io { source: std::io::Error, context: Option<Cow<'static, str>> },

    #[http(404)]
    #[error("Not found{}: {message}", format_context(.context))]
    NotFound { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    #[http(451)]
    #[error("Unavailable for legal reasons{}: {message}", format_context(.context))]
    Region { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    #[error("Internal error{}: {message}", format_context(.context))]
    Internal { message: Cow<'static, str>, context: Option<Cow<'static, str>> },
}

#[test]
fn mkt_error_ui() {
    let t = trybuild::TestCases::new();
    t.pass("tests/ui/mkt_error_pass.rs");
}

#[test]
fn annotated_variants_report_their_status() {
    let err = CatalogError::NotFound { message: "listing 7".into(), context: None };
    assert_eq!(err.http_status(), 404);

    let err = CatalogError::Region { message: "excluded".into(), context: None };
    assert_eq!(err.http_status(), 451);
}

#[test]
fn unannotated_variants_default_to_internal_status() {
    let io = std::io::Error::other("disk");
    assert_eq!(CatalogError::from(io).http_status(), 500);
    assert_eq!(CatalogError::from("boom").http_status(), 500);
}

#[test]
fn context_is_rendered_in_display() {
    let res: Result<(), std::io::Error> = Err(std::io::Error::other("disk"));
    let err = res.context("reading catalog").expect_err("should fail");
    assert_eq!(err.to_string(), "IO error (reading catalog): disk");
    assert!(matches!(err, CatalogError::Io { context: Some(_), .. }));
}
