use surplus_charge::config::LoggingConfig;
use surplus_charge::logging::{LogContext, get_logger_with_context, init_logging};

#[test]
fn init_is_idempotent() {
    let config = LoggingConfig {
        level: "debug".to_string(),
        ..Default::default()
    };
    assert!(init_logging(&config).is_ok());
    assert!(init_logging(&config).is_ok());

    let logger = get_logger_with_context(LogContext::new("test").with_vehicle_id("1".into()));
    logger.info("logging initialized twice without error");
}
