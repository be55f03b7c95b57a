use shed_derive::shed_error;
use std::borrow::Cow;

#[shed_error]
pub enum DemoError {
    #[error("I/O failure{}: {source}", format_context(.context))]
    Io {
        #[source]
        source: std::io::Error,
        context: Option<Cow<'static, str>>,
    },

    #[error("Missing entry{}: {message}", format_context(.context))]
    NotFound { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    #[error("Internal error{}: {message}", format_context(.context))]
    Internal { message: Cow<'static, str>, context: Option<Cow<'static, str>> },
}

fn io_failure() -> Result<(), std::io::Error> {
    Err(std::io::Error::new(std::io::ErrorKind::NotFound, "gone"))
}

#[test]
fn source_variant_converts_with_question_mark() {
    fn run() -> Result<(), DemoError> {
        io_failure()?;
        Ok(())
    }

    let err = run().unwrap_err();
    assert!(matches!(err, DemoError::Io { context: None, .. }));
}

#[test]
fn context_attaches_to_source_results() {
    let err: DemoError = io_failure().context("reading settings").unwrap_err();
    assert_eq!(err.to_string(), "I/O failure (reading settings): gone");
}

#[test]
fn context_attaches_to_own_results() {
    let res: Result<(), DemoError> =
        Err(DemoError::NotFound { message: "key".into(), context: None });
    let err = res.context("lookup").unwrap_err();
    assert_eq!(err.to_string(), "Missing entry (lookup): key");
}

#[test]
fn strings_become_internal_errors() {
    let err: DemoError = "boom".into();
    assert_eq!(err.to_string(), "Internal error: boom");

    let err: DemoError = format!("boom {}", 2).into();
    assert_eq!(err.to_string(), "Internal error: boom 2");
}

#[test]
fn source_chain_is_preserved() {
    let err: DemoError = io_failure().unwrap_err().into();
    let source = std::error::Error::source(&err).map(ToString::to_string);
    assert_eq!(source.as_deref(), Some("gone"));
}
