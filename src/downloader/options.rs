// Options builder - assembles the network identity for each extraction
//
// Cookie precedence, first configured wins:
//   raw header > inline jar content > jar file on disk > anonymous

use std::path::PathBuf;

use super::models::{CookieSource, NetworkIdentity, OptionsBundle};

/// Desktop Chrome UA; Instagram serves a login wall to obvious bots
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/121.0.0.0 Safari/537.36";

/// Progressive mp4, else best single combined stream, else best available
pub const DEFAULT_FORMAT_PREFERENCE: &str = "b[ext=mp4]/b/bv*+ba";

pub const ENV_COOKIE_HEADER: &str = "INSTAGRAM_COOKIE_HEADER";
pub const ENV_COOKIES_INLINE: &str = "INSTAGRAM_COOKIES";
pub const ENV_COOKIES_FILE: &str = "INSTAGRAM_COOKIES_FILE";
pub const ENV_USER_AGENT: &str = "INSTAGRAM_USER_AGENT";

/// Process-wide defaults fixed at startup
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractorDefaults {
    pub user_agent: String,
    pub format_preference: String,
    pub retries: u32,
}

impl Default for ExtractorDefaults {
    fn default() -> Self {
        Self {
            user_agent: DEFAULT_USER_AGENT.to_string(),
            format_preference: DEFAULT_FORMAT_PREFERENCE.to_string(),
            retries: 2,
        }
    }
}

/// Credential settings as configured; values may rotate under a running process
#[derive(Debug, Clone, Default)]
pub struct CredentialSettings {
    pub cookie_header: Option<String>,
    pub cookies_inline: Option<String>,
    pub cookies_file: Option<PathBuf>,
    pub user_agent: Option<String>,
}

impl CredentialSettings {
    pub fn from_env() -> Self {
        Self {
            cookie_header: non_empty_env(ENV_COOKIE_HEADER),
            cookies_inline: non_empty_env(ENV_COOKIES_INLINE),
            cookies_file: non_empty_env(ENV_COOKIES_FILE).map(PathBuf::from),
            user_agent: non_empty_env(ENV_USER_AGENT),
        }
    }
}

fn non_empty_env(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .filter(|v| !v.trim().is_empty())
}

/// Where credentials are read from on each request
#[derive(Debug, Clone)]
pub enum CredentialSource {
    /// Re-read the process environment every time
    Environment,
    /// Fixed values, for tests and one-shot CLI runs
    Fixed(CredentialSettings),
}

#[derive(Debug, Clone)]
pub struct OptionsBuilder {
    defaults: ExtractorDefaults,
    source: CredentialSource,
}

impl OptionsBuilder {
    pub fn new(defaults: ExtractorDefaults, source: CredentialSource) -> Self {
        Self { defaults, source }
    }

    /// Build a fresh bundle. Not cached: credentials may change between requests.
    pub fn build(&self) -> OptionsBundle {
        match &self.source {
            CredentialSource::Environment => self.build_from(&CredentialSettings::from_env()),
            CredentialSource::Fixed(settings) => self.build_from(settings),
        }
    }

    pub fn build_from(&self, creds: &CredentialSettings) -> OptionsBundle {
        let user_agent = creds
            .user_agent
            .clone()
            .unwrap_or_else(|| self.defaults.user_agent.clone());

        OptionsBundle {
            identity: NetworkIdentity {
                user_agent,
                cookies: Self::resolve_cookies(creds),
            },
            format_preference: self.defaults.format_preference.clone(),
            retries: self.defaults.retries,
        }
    }

    fn resolve_cookies(creds: &CredentialSettings) -> CookieSource {
        if let Some(header) = creds.cookie_header.as_deref().map(str::trim) {
            if !header.is_empty() {
                return CookieSource::Header(header.to_string());
            }
        }

        if let Some(content) = creds.cookies_inline.as_deref() {
            if !content.trim().is_empty() {
                return CookieSource::InlineJar(content.to_string());
            }
        }

        if let Some(path) = &creds.cookies_file {
            if path.exists() {
                return CookieSource::JarFile(path.clone());
            }
            tracing::warn!("Cookie file {:?} does not exist, continuing without a session", path);
        }

        CookieSource::Anonymous
    }
}
