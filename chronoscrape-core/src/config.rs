//! Live API credentials and list files.

use crate::error::{ConfigError, CoreError, Result};
use serde::Deserialize;
use std::fmt;
use std::path::Path;
use tracing::{debug, warn};

pub const ENV_CLIENT_ID: &str = "REDDIT_CLIENT_ID";
pub const ENV_CLIENT_SECRET: &str = "REDDIT_CLIENT_SECRET";
pub const ENV_USERNAME: &str = "REDDIT_USERNAME";
pub const ENV_PASSWORD: &str = "REDDIT_PASSWORD";
pub const ENV_USER_AGENT: &str = "REDDIT_USER_AGENT";

pub fn default_user_agent() -> String {
    format!("rust:chronoscrape:v{}", env!("CARGO_PKG_VERSION"))
}

#[derive(Clone, Deserialize)]
pub struct RedditCredentials {
    pub client_id: String,
    pub client_secret: String,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub user_agent: Option<String>,
}

#[derive(Deserialize)]
struct CredentialsFile {
    reddit: RedditCredentials,
}

impl RedditCredentials {
    pub fn from_toml_str(contents: &str) -> std::result::Result<Self, ConfigError> {
        let file: CredentialsFile = toml::from_str(contents)?;
        file.reddit.validated()
    }

    pub fn from_file(path: &Path) -> std::result::Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|_| ConfigError::FileNotFound {
            path: path.display().to_string(),
        })?;
        Self::from_toml_str(&contents)
    }

    pub fn from_lookup<F>(lookup: F) -> std::result::Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| {
            lookup(key).ok_or_else(|| ConfigError::MissingEnvironmentVariable {
                var_name: key.to_string(),
            })
        };

        Self {
            client_id: required(ENV_CLIENT_ID)?,
            client_secret: required(ENV_CLIENT_SECRET)?,
            username: lookup(ENV_USERNAME),
            password: lookup(ENV_PASSWORD),
            user_agent: lookup(ENV_USER_AGENT),
        }
        .validated()
    }

    /// Reads `path` when it exists. A missing file only warns and falls back
    /// to `REDDIT_*` environment variables.
    pub fn load(path: &Path) -> std::result::Result<Self, ConfigError> {
        Self::load_with(path, |key| std::env::var(key).ok())
    }

    /// Same as [`RedditCredentials::load`], reading fallback variables
    /// through `lookup`.
    pub fn load_with<F>(path: &Path, lookup: F) -> std::result::Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if path.is_file() {
            debug!(path = %path.display(), "Loading credentials file");
            return Self::from_file(path);
        }

        warn!(
            "Couldn't find {} in this directory, falling back to {} and {}",
            path.display(),
            ENV_CLIENT_ID,
            ENV_CLIENT_SECRET
        );
        Self::from_lookup(lookup)
    }

    pub fn user_agent(&self) -> String {
        self.user_agent
            .clone()
            .filter(|ua| !ua.trim().is_empty())
            .unwrap_or_else(default_user_agent)
    }

    /// Script apps log in as a user; everything else gets an app-only token.
    pub fn uses_password_grant(&self) -> bool {
        matches!((&self.username, &self.password), (Some(u), Some(p)) if !u.is_empty() && !p.is_empty())
    }

    fn validated(self) -> std::result::Result<Self, ConfigError> {
        if self.client_id.trim().is_empty() {
            return Err(ConfigError::MissingField {
                field: "client_id".to_string(),
            });
        }
        if self.client_secret.trim().is_empty() {
            return Err(ConfigError::MissingField {
                field: "client_secret".to_string(),
            });
        }
        Ok(self)
    }
}

impl fmt::Debug for RedditCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RedditCredentials")
            .field("client_id", &self.client_id)
            .field("client_secret", &"[redacted]")
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "[redacted]"))
            .field("user_agent", &self.user_agent)
            .finish()
    }
}

/// One entry per non-blank line, trimmed.
pub fn read_list_file(path: &Path) -> Result<Vec<String>> {
    let contents = std::fs::read_to_string(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => CoreError::Config(ConfigError::FileNotFound {
            path: path.display().to_string(),
        }),
        _ => CoreError::Io(e),
    })?;

    Ok(contents
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_credentials_from_toml() {
        let creds = RedditCredentials::from_toml_str(
            r#"
            [reddit]
            client_id = "abc"
            client_secret = "shh"
            username = "bot"
            password = "hunter2"
            "#,
        )
        .unwrap();

        assert_eq!(creds.client_id, "abc");
        assert!(creds.uses_password_grant());
        assert_eq!(creds.user_agent(), default_user_agent());
    }

    #[test]
    fn test_credentials_without_user_are_app_only() {
        let creds = RedditCredentials::from_toml_str(
            r#"
            [reddit]
            client_id = "abc"
            client_secret = "shh"
            user_agent = "custom/1.0"
            "#,
        )
        .unwrap();

        assert!(!creds.uses_password_grant());
        assert_eq!(creds.user_agent(), "custom/1.0");
    }

    #[test]
    fn test_empty_client_id_rejected() {
        let result = RedditCredentials::from_toml_str(
            r#"
            [reddit]
            client_id = ""
            client_secret = "shh"
            "#,
        );
        assert!(matches!(result, Err(ConfigError::MissingField { field }) if field == "client_id"));
    }

    #[test]
    fn test_bad_toml_is_parse_error() {
        let result = RedditCredentials::from_toml_str("[reddit\nclient_id=");
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_credentials_from_lookup() {
        let vars: HashMap<&str, &str> = [
            (ENV_CLIENT_ID, "id"),
            (ENV_CLIENT_SECRET, "secret"),
            (ENV_USER_AGENT, "ua/2"),
        ]
        .into_iter()
        .collect();

        let creds = RedditCredentials::from_lookup(|k| vars.get(k).map(|v| v.to_string())).unwrap();
        assert_eq!(creds.client_secret, "secret");
        assert_eq!(creds.user_agent(), "ua/2");
        assert!(creds.username.is_none());
    }

    #[test]
    fn test_missing_env_var_reported() {
        let result = RedditCredentials::from_lookup(|_| None);
        assert!(matches!(
            result,
            Err(ConfigError::MissingEnvironmentVariable { var_name }) if var_name == ENV_CLIENT_ID
        ));
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let creds = RedditCredentials::from_toml_str(
            r#"
            [reddit]
            client_id = "abc"
            client_secret = "topsecret"
            username = "bot"
            password = "hunter2"
            "#,
        )
        .unwrap();
        let debug = format!("{:?}", creds);
        assert!(!debug.contains("topsecret"));
        assert!(!debug.contains("hunter2"));
    }

    #[test]
    fn test_load_prefers_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("reddit.toml");
        std::fs::write(
            &path,
            "[reddit]\nclient_id = \"from_file\"\nclient_secret = \"shh\"\n",
        )
        .unwrap();

        let creds = RedditCredentials::load_with(&path, |_| Some("from_env".to_string())).unwrap();
        assert_eq!(creds.client_id, "from_file");
    }

    #[test]
    fn test_load_falls_back_to_environment() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("reddit.toml");
        let vars: HashMap<&str, &str> = [(ENV_CLIENT_ID, "env_id"), (ENV_CLIENT_SECRET, "env_secret")]
            .into_iter()
            .collect();

        let creds =
            RedditCredentials::load_with(&path, |k| vars.get(k).map(|v| v.to_string())).unwrap();
        assert_eq!(creds.client_id, "env_id");
        assert_eq!(creds.client_secret, "env_secret");
    }

    #[test]
    fn test_load_fails_without_file_or_environment() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("reddit.toml");

        let result = RedditCredentials::load_with(&path, |_| None);
        assert!(matches!(
            result,
            Err(ConfigError::MissingEnvironmentVariable { var_name }) if var_name == ENV_CLIENT_ID
        ));
    }

    #[test]
    fn test_read_list_file_skips_blank_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("subs.txt");
        std::fs::write(&path, "me_irl\n\n  rust  \r\nAskReddit\n").unwrap();

        let subs = read_list_file(&path).unwrap();
        assert_eq!(subs, vec!["me_irl", "rust", "AskReddit"]);
    }

    #[test]
    fn test_read_list_file_missing() {
        let result = read_list_file(Path::new("/definitely/not/here.txt"));
        assert!(matches!(
            result,
            Err(CoreError::Config(ConfigError::FileNotFound { .. }))
        ));
    }
}
