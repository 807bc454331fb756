use std::time::Duration;

/// Remote document-store settings. Presence of a usable base URL is the one
/// switch between online and offline mode for the whole session.
#[derive(Debug, Clone)]
pub struct RemoteConfig {
    pub base_url: String,
    pub token: Option<String>,
    pub poll_interval: Duration,
}

const URL_VAR: &str = "ERAPOR_REMOTE_URL";
const TOKEN_VAR: &str = "ERAPOR_REMOTE_TOKEN";
const POLL_VAR: &str = "ERAPOR_SYNC_POLL_SECS";

const DEFAULT_POLL_SECS: u64 = 5;

impl RemoteConfig {
    /// Read configuration from the environment (a `.env` file is honored if
    /// present). Returns None when the deployment never configured a remote,
    /// or left a placeholder value in the URL slot; the caller then runs
    /// purely off the local cache.
    pub fn from_env() -> Option<RemoteConfig> {
        let _ = dotenvy::dotenv();

        let base_url = std::env::var(URL_VAR).ok()?;
        let base_url = base_url.trim().trim_end_matches('/').to_string();
        if !is_plausible_url(&base_url) {
            log::warn!("{} is missing or a placeholder; running in offline mode", URL_VAR);
            return None;
        }

        let token = std::env::var(TOKEN_VAR)
            .ok()
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty());

        let poll_secs = std::env::var(POLL_VAR)
            .ok()
            .and_then(|v| v.trim().parse::<u64>().ok())
            .filter(|v| *v > 0)
            .unwrap_or(DEFAULT_POLL_SECS);

        Some(RemoteConfig {
            base_url,
            token,
            poll_interval: Duration::from_secs(poll_secs),
        })
    }
}

fn is_plausible_url(url: &str) -> bool {
    if url.is_empty() || url.contains("INSERT_YOUR") || url.contains("ANDA_DISINI") {
        return false;
    }
    url.starts_with("http://") || url.starts_with("https://")
}
