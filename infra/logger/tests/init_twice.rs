use shed_logger::{LevelFilter, Logger, LoggerError};

#[test]
fn second_init_fails() {
    let _logger = Logger::builder()
        .console(true)
        .level(LevelFilter::INFO)
        .init()
        .unwrap();

    let err = Logger::builder().console(true).init().unwrap_err();
    assert!(matches!(err, LoggerError::Subscriber { .. }));
}

#[test]
fn console_disabled_without_topic_is_rejected() {
    let err = Logger::builder().console(false).init().unwrap_err();
    assert!(matches!(err, LoggerError::InvalidConfiguration { .. }));
    assert!(err.to_string().contains("No logging layers enabled"));
}
