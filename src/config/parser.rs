//! Parameter parser for loading the desired-state document.
//!
//! This module handles loading parameters from YAML or JSON files and
//! environment variables, with proper precedence and error handling.

use crate::error::{ConfigError, GatewayError, Result};
use std::path::Path;
use tracing::{debug, info};

use super::spec::ModuleParams;

/// Parameter parser for loading invocation parameters.
#[derive(Debug, Default)]
pub struct ConfigParser {
    /// Base path for resolving the `.env` file.
    base_path: Option<std::path::PathBuf>,
}

impl ConfigParser {
    /// Creates a new parameter parser.
    #[must_use]
    pub const fn new() -> Self {
        Self { base_path: None }
    }

    /// Sets the base path for resolving relative paths.
    #[must_use]
    pub fn with_base_path(mut self, path: impl Into<std::path::PathBuf>) -> Self {
        self.base_path = Some(path.into());
        self
    }

    /// Loads parameters from a YAML or JSON file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load_file(&self, path: impl AsRef<Path>) -> Result<ModuleParams> {
        let path = path.as_ref();
        info!("Loading parameters from: {}", path.display());

        if !path.exists() {
            return Err(GatewayError::Config(ConfigError::FileNotFound {
                path: path.to_path_buf(),
            }));
        }

        let content = std::fs::read_to_string(path).map_err(|e| {
            GatewayError::Config(ConfigError::ParseError {
                message: format!("Failed to read file: {e}"),
                location: Some(path.display().to_string()),
            })
        })?;

        self.parse_str(&content, Some(path))
    }

    /// Parses parameters from a YAML (or JSON) string.
    ///
    /// Unknown keys are rejected.
    ///
    /// # Errors
    ///
    /// Returns an error if the document is invalid.
    pub fn parse_str(&self, content: &str, source: Option<&Path>) -> Result<ModuleParams> {
        debug!("Parsing parameter document");

        let params: ModuleParams = serde_yaml::from_str(content).map_err(|e| {
            let location = source.map(|p| p.display().to_string());
            GatewayError::Config(ConfigError::ParseError {
                message: format!("Parameter parse error: {e}"),
                location,
            })
        })?;

        debug!(
            "Parsed parameters (api_id: {})",
            params.api_id.as_deref().unwrap_or("<new>")
        );
        Ok(params)
    }

    /// Loads parameters with environment variable overrides.
    ///
    /// Environment variables fill in connection and credential keys only
    /// when the document leaves them unset:
    /// `GRAVITEE_URL`, `GRAVITEE_USER`, `GRAVITEE_PASSWORD`,
    /// `GRAVITEE_TOKEN`, `GRAVITEE_ACCESS_TOKEN`, `GRAVITEE_AUTH_RESOURCE_ID`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load_with_env(&self, path: impl AsRef<Path>) -> Result<ModuleParams> {
        let mut params = self.load_file(path)?;
        Self::apply_env_overrides(&mut params, |name| std::env::var(name).ok());
        Ok(params)
    }

    /// Applies environment variable overrides to the parameters.
    fn apply_env_overrides(params: &mut ModuleParams, lookup: impl Fn(&str) -> Option<String>) {
        if params.url.is_none()
            && let Some(url) = lookup("GRAVITEE_URL")
        {
            debug!("Using url from environment");
            params.url = Some(url);
        }

        // Credentials are only taken from the environment when the document
        // declares none, so the strategy stays unambiguous.
        let has_credentials = params.user.is_some()
            || params.password.is_some()
            || params.token.is_some()
            || params.access_token.is_some();
        if has_credentials {
            return;
        }

        if let Some(token) = lookup("GRAVITEE_TOKEN") {
            debug!("Using bearer token from environment");
            params.token = Some(token);
        } else if let Some(access_token) = lookup("GRAVITEE_ACCESS_TOKEN") {
            debug!("Using access token from environment");
            params.access_token = Some(access_token);
            if params.auth_resource_id.is_none() {
                params.auth_resource_id = lookup("GRAVITEE_AUTH_RESOURCE_ID");
            }
        } else if let (Some(user), Some(password)) =
            (lookup("GRAVITEE_USER"), lookup("GRAVITEE_PASSWORD"))
        {
            debug!("Using basic credentials from environment");
            params.user = Some(user);
            params.password = Some(password);
        }
    }

    /// Loads the .env file if present.
    ///
    /// # Errors
    ///
    /// Returns an error if the .env file exists but cannot be loaded.
    pub fn load_dotenv(&self) -> Result<()> {
        let env_path = self
            .base_path
            .as_ref()
            .map_or_else(|| std::path::PathBuf::from(".env"), |p| p.join(".env"));

        if env_path.exists() {
            info!("Loading environment from: {}", env_path.display());
            dotenvy::from_path(&env_path).map_err(|e| {
                GatewayError::Config(ConfigError::ParseError {
                    message: format!("Failed to load .env file: {e}"),
                    location: Some(env_path.display().to_string()),
                })
            })?;
        } else {
            debug!(".env file not found at: {}", env_path.display());
        }

        Ok(())
    }
}

/// Default parameter file names to search for.
pub const DEFAULT_PARAMS_FILES: &[&str] = &[
    "gravitee.api.yaml",
    "gravitee.api.yml",
    "gravitee.api.json",
];

/// Finds the parameter file in the current directory, its parents, or the
/// user configuration directory.
///
/// # Errors
///
/// Returns an error if no parameter file is found.
pub fn find_params_file(start_dir: impl AsRef<Path>) -> Result<std::path::PathBuf> {
    let start = start_dir.as_ref();
    let mut current = start.to_path_buf();

    loop {
        if let Some(found) = find_in(&current) {
            return Ok(found);
        }

        if !current.pop() {
            break;
        }
    }

    if let Some(found) = dirs::config_dir()
        .map(|dir| dir.join("gravitee-gateway"))
        .and_then(|dir| find_in(&dir))
    {
        return Ok(found);
    }

    Err(GatewayError::Config(ConfigError::FileNotFound {
        path: start.join(DEFAULT_PARAMS_FILES[0]),
    }))
}

/// Looks for a default parameter file inside one directory.
fn find_in(dir: &Path) -> Option<std::path::PathBuf> {
    DEFAULT_PARAMS_FILES
        .iter()
        .map(|filename| dir.join(filename))
        .find(|path| path.exists())
        .inspect(|path| info!("Found parameter file: {}", path.display()))
}
