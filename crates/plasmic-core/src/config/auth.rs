//! Credentials for the Plasmic server (`.plasmic.auth`)

use plasmic_fs::{JsonStore, NormalizedPath, io};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::store::find_file_upwards;
use crate::error::{Error, Result};

pub const AUTH_FILE_NAME: &str = ".plasmic.auth";
pub const DEFAULT_HOST: &str = "https://studio.plasmic.app";

pub const ENV_AUTH_HOST: &str = "PLASMIC_AUTH_HOST";
pub const ENV_AUTH_USER: &str = "PLASMIC_AUTH_USER";
pub const ENV_AUTH_TOKEN: &str = "PLASMIC_AUTH_TOKEN";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthConfig {
    #[serde(default = "default_host")]
    pub host: String,
    pub user: String,
    pub token: String,
}

impl AuthConfig {
    /// Credentials from `PLASMIC_AUTH_*` variables, read through `lookup`.
    ///
    /// Both user and token must be set; the host is optional.
    pub fn from_env(lookup: impl Fn(&str) -> Option<String>) -> Option<Self> {
        let user = lookup(ENV_AUTH_USER).filter(|v| !v.is_empty())?;
        let token = lookup(ENV_AUTH_TOKEN).filter(|v| !v.is_empty())?;
        let host = lookup(ENV_AUTH_HOST)
            .filter(|v| !v.is_empty())
            .unwrap_or_else(default_host);
        Some(Self { host, user, token })
    }
}

/// Where credentials were found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthSource {
    Environment,
    File(NormalizedPath),
}

/// Find `.plasmic.auth` in `start` or an ancestor, else in `home`.
pub fn find_auth_file(start: &NormalizedPath, home: Option<&NormalizedPath>) -> Option<NormalizedPath> {
    find_file_upwards(start, AUTH_FILE_NAME).or_else(|| {
        home.map(|h| h.join(AUTH_FILE_NAME))
            .filter(|p| p.is_file())
    })
}

/// Resolve credentials: an explicit file wins, then the environment, then
/// the nearest auth file.
pub fn load_auth(
    explicit: Option<&NormalizedPath>,
    start: &NormalizedPath,
    home: Option<&NormalizedPath>,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<(AuthConfig, AuthSource)> {
    if let Some(path) = explicit {
        let auth = read_auth_file(path)?;
        return Ok((auth, AuthSource::File(path.clone())));
    }
    if let Some(auth) = AuthConfig::from_env(lookup) {
        debug!("using credentials from the environment");
        return Ok((auth, AuthSource::Environment));
    }
    let path = find_auth_file(start, home).ok_or(Error::MissingAuth)?;
    let auth = read_auth_file(&path)?;
    Ok((auth, AuthSource::File(path)))
}

/// Write credentials readable only by the current user.
pub fn write_auth(path: &NormalizedPath, auth: &AuthConfig) -> Result<()> {
    let content = JsonStore::render(path, auth)?;
    io::write_private(path, content.as_bytes())?;
    Ok(())
}

/// Default location for a new auth file.
pub fn default_auth_path() -> Option<NormalizedPath> {
    dirs::home_dir().map(|home| NormalizedPath::new(home).join(AUTH_FILE_NAME))
}

fn read_auth_file(path: &NormalizedPath) -> Result<AuthConfig> {
    match JsonStore::new().load::<AuthConfig>(path) {
        Ok(auth) => Ok(auth),
        Err(plasmic_fs::Error::NotFound { .. }) => Err(Error::MissingAuth),
        Err(plasmic_fs::Error::Parse { path, message }) => Err(Error::InvalidConfig { path, message }),
        Err(e) => Err(e.into()),
    }
}

fn default_host() -> String {
    DEFAULT_HOST.to_string()
}
