use mkt_domain::config::LoggingConfig;
use mkt_logger::Logger;
use std::fs;
use std::time::Duration;
use tempfile::tempdir;

#[test]
fn config_with_directory_writes_json_lines() -> Result<(), Box<dyn std::error::Error>> {
    let tmp_dir = tempdir()?;
    let log_dir = tmp_dir.path().join("logs");
    let config = LoggingConfig {
        level: "debug".to_owned(),
        filter: Some("file_logging=debug".to_owned()),
        console: false,
        directory: Some(log_dir.clone()),
        json: true,
    };

    let logger = Logger::from_config("integration-file-logging", &config)?;
    assert!(logger.guard().is_some());

    tracing::info!(listing = 7, "hello from integration test");

    std::thread::sleep(Duration::from_millis(30));
    drop(logger);

    let log_file = fs::read_dir(&log_dir)?
        .flatten()
        .map(|entry| entry.path())
        .find(|path| path.extension().and_then(|ext| ext.to_str()) == Some("log"))
        .expect("log file should be created");

    let contents = fs::read_to_string(&log_file)?;
    let first = contents.lines().next().expect("log file should not be empty");
    let record: serde_json::Value = serde_json::from_str(first)?;
    assert_eq!(record["fields"]["listing"], 7);

    Ok(())
}
