//! Shared User-Agent strings for index, probe, and archival HTTP traffic.
//!
//! Single source for project URL and UA format so all outbound requests
//! identify the tool consistently.

/// Project URL for User-Agent identification.
const PROJECT_UA_URL: &str = "https://github.com/saveweb/fdroidswh";

/// Default User-Agent applied to HTTP sessions (index download, archival API).
#[must_use]
pub(crate) fn default_session_user_agent() -> String {
    let version = env!("CARGO_PKG_VERSION");
    format!("fdroidswh/{version} (git-archival-tool; +{PROJECT_UA_URL})")
}

/// Fixed User-Agent sent on git smart-HTTP probe requests.
#[must_use]
pub(crate) fn default_probe_user_agent() -> String {
    let version = env!("CARGO_PKG_VERSION");
    format!("fdroidswh-git/{version} (+{PROJECT_UA_URL})")
}
