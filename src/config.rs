use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_API_URL: &str = "https://joyful-reflection-production-1049.up.railway.app/api";
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub api_url: String,
    pub session_dir: PathBuf,
    pub request_timeout: Duration,
    pub connect_timeout: Duration,
}

impl Config {
    /// Build config from CLI values and the timeout environment variables.
    /// `api_url` and `session_dir` arrive already resolved by clap, which
    /// reads `VCPORTAL_API_URL` and `VCPORTAL_SESSION_DIR`.
    ///
    /// - `VCPORTAL_REQUEST_TIMEOUT_SECS`: default 30
    /// - `VCPORTAL_CONNECT_TIMEOUT_SECS`: default 10
    pub fn from_env(api_url: Option<String>, session_dir: Option<PathBuf>) -> Self {
        let api_url = api_url
            .filter(|u| !u.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_API_URL.to_string());
        let session_dir = session_dir.unwrap_or_else(default_session_dir);

        Self {
            api_url: normalize_base_url(&api_url),
            session_dir,
            request_timeout: Duration::from_secs(env_parse_u64(
                "VCPORTAL_REQUEST_TIMEOUT_SECS",
                DEFAULT_REQUEST_TIMEOUT_SECS,
            )),
            connect_timeout: Duration::from_secs(env_parse_u64(
                "VCPORTAL_CONNECT_TIMEOUT_SECS",
                DEFAULT_CONNECT_TIMEOUT_SECS,
            )),
        }
    }

    #[cfg(test)]
    pub fn with_api_url(api_url: &str, session_dir: PathBuf) -> Self {
        Self {
            api_url: normalize_base_url(api_url),
            session_dir,
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            connect_timeout: Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS),
        }
    }
}

fn default_session_dir() -> PathBuf {
    // XDG config directory, or a dot-directory next to the caller
    if let Some(proj_dirs) = directories::ProjectDirs::from("", "", "vcportal") {
        proj_dirs.config_dir().to_path_buf()
    } else {
        PathBuf::from(".vcportal")
    }
}

fn normalize_base_url(url: &str) -> String {
    url.trim().trim_end_matches('/').to_string()
}

fn env_parse_u64(key: &str, default: u64) -> u64 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.trim().parse::<u64>().ok())
        .unwrap_or(default)
}
