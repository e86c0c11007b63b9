use std::path::PathBuf;

use anyhow::Context;
use lens_service::store::DEFAULT_SESSION_AGE_SECS;

#[derive(Debug, Clone)]
pub struct Config {
    /// Server bind address (e.g., "0.0.0.0:8000").
    pub bind_addr: String,

    /// Directory holding the mdbx environment.
    pub data_dir: PathBuf,

    /// Shown in page titles and the header.
    pub site_name: String,

    /// Mark the session cookie `Secure`. Enable behind HTTPS.
    pub secure_cookies: bool,

    /// Request body cap, which bounds uploaded pictures.
    pub max_upload_bytes: usize,

    /// Lifetime of a login session and its cookie, in seconds.
    pub session_age_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:8000".to_string(),
            data_dir: PathBuf::from("./data"),
            site_name: "Lens".to_string(),
            secure_cookies: false,
            max_upload_bytes: 5 * 1024 * 1024,
            session_age_secs: DEFAULT_SESSION_AGE_SECS,
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// All optional:
    /// - `LENS_BIND_ADDR`: Server bind address (default: "0.0.0.0:8000")
    /// - `LENS_DATA_DIR`: Database directory (default: "./data")
    /// - `LENS_SITE_NAME`: Site name (default: "Lens")
    /// - `LENS_SECURE_COOKIES`: "true"/"false" (default: false)
    /// - `LENS_MAX_UPLOAD_BYTES`: Body limit in bytes (default: 5 MiB)
    /// - `LENS_SESSION_AGE_SECS`: Session lifetime (default: two weeks)
    pub fn from_env() -> anyhow::Result<Self> {
        let defaults = Self::default();

        let bind_addr = std::env::var("LENS_BIND_ADDR").unwrap_or(defaults.bind_addr);

        let data_dir = std::env::var("LENS_DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or(defaults.data_dir);

        let site_name = std::env::var("LENS_SITE_NAME").unwrap_or(defaults.site_name);

        let secure_cookies = match std::env::var("LENS_SECURE_COOKIES") {
            Ok(raw) => raw
                .trim()
                .parse::<bool>()
                .with_context(|| format!("LENS_SECURE_COOKIES must be true or false, got {raw:?}"))?,
            Err(_) => defaults.secure_cookies,
        };

        let max_upload_bytes = match std::env::var("LENS_MAX_UPLOAD_BYTES") {
            Ok(raw) => raw
                .trim()
                .parse::<usize>()
                .with_context(|| format!("LENS_MAX_UPLOAD_BYTES must be a byte count, got {raw:?}"))?,
            Err(_) => defaults.max_upload_bytes,
        };

        let session_age_secs = match std::env::var("LENS_SESSION_AGE_SECS") {
            Ok(raw) => raw
                .trim()
                .parse::<u64>()
                .with_context(|| format!("LENS_SESSION_AGE_SECS must be a number of seconds, got {raw:?}"))?,
            Err(_) => defaults.session_age_secs,
        };

        tracing::info!(
            bind_addr = %bind_addr,
            data_dir = %data_dir.display(),
            site_name = %site_name,
            secure_cookies,
            max_upload_bytes,
            session_age_secs,
            "configuration loaded"
        );

        Ok(Self {
            bind_addr,
            data_dir,
            site_name,
            secure_cookies,
            max_upload_bytes,
            session_age_secs,
        })
    }
}
