use sluice_logger::{LevelFilter, Logger, LoggerErrorKind};

#[test]
fn console_only_then_second_init_fails() {
    let logger = Logger::builder()
        .name("integration-console-only")
        .console(true)
        .level(LevelFilter::INFO)
        .init()
        .expect("logger should initialize");

    assert!(!logger.has_file_sink(), "console-only logger should not create a file guard");
    assert_eq!(logger.name(), "integration-console-only");

    let err = Logger::builder().name("integration-second").init().expect_err("second init");
    assert_eq!(err.kind(), LoggerErrorKind::Subscriber);
}
