use crate::services::ingest::IngestOptions;
use crate::services::playback::DEFAULT_STEP_SECS;

/// Application configuration, parsed from environment variables.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub port: u16,
    /// Directory scanned for `*.csv` boat logs.
    pub data_dir: String,
    /// Race course XML document.
    pub course_xml: String,
    /// Prefix stripped from log file names to get the boat name.
    pub log_file_prefix: String,
    /// Simulated seconds advanced per playback tick.
    pub playback_step_secs: i64,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self {
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .expect("PORT must be a valid u16"),
            data_dir: std::env::var("DATA_DIR").unwrap_or_else(|_| "./data".to_string()),
            course_xml: std::env::var("COURSE_XML")
                .unwrap_or_else(|_| "./data/course.xml".to_string()),
            log_file_prefix: std::env::var("LOG_FILE_PREFIX")
                .unwrap_or_else(|_| "data_".to_string()),
            playback_step_secs: std::env::var("PLAYBACK_STEP_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .filter(|&secs: &i64| secs > 0)
                .unwrap_or(DEFAULT_STEP_SECS),
        }
    }

    pub fn ingest_options(&self) -> IngestOptions {
        IngestOptions {
            file_prefix: self.log_file_prefix.clone(),
            ..IngestOptions::default()
        }
    }
}
