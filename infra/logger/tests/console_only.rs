use shed_logger::{LevelFilter, Logger};

#[test]
fn console_only_has_no_guard() {
    let logger = Logger::builder()
        .console(true)
        .level(LevelFilter::DEBUG)
        .env_filter("console_only=trace")
        .init()
        .unwrap();

    assert!(logger.guard().is_none());
    assert!(logger.log_dir().is_none());

    tracing::info!("console only message");
    logger.flush();
}
