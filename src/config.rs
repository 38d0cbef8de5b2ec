//! Routing configuration: API prefix, app folder and file mappings.
//!
//! Every value is validated before serving starts; a bad configuration is
//! the only fatal error class of the crate.
//!
//! # TOML
//!
//! ```toml
//! api_uri = "/api"
//! app_folder = "app/"
//!
//! [file_mappings]
//! "" = "index.html"
//! "about" = "about.html"
//! ```
//!
//! Every key is optional and falls back to [`Config::default`].

use serde::Deserialize;
use std::{collections::HashMap, error, fmt, fs, io, path::Path};

/// Validated routing configuration.
///
/// # Examples
/// ```
/// use spindle::config::Config;
///
/// let config = Config::from_toml_str(r#"
///     api_uri = "/v1"
///
///     [file_mappings]
///     "" = "index.html"
/// "#).unwrap();
///
/// assert_eq!(config.api_uri, "/v1");
/// assert_eq!(config.app_folder, "app/");
/// assert_eq!(config.file_mappings[""], "index.html");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Prefix of API requests (default: `"/api"`). Must be `/` followed by
    /// at least one character.
    pub api_uri: String,

    /// Folder holding the files served outside the API prefix
    /// (default: `"app/"`). Must be a single folder name ending with `/`.
    pub app_folder: String,

    /// Literal request path (without the leading `/`) to file path
    /// replacements (default: empty).
    pub file_mappings: HashMap<String, String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_uri: "/api".to_string(),
            app_folder: "app/".to_string(),
            file_mappings: HashMap::new(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct RawConfig {
    api_uri: Option<String>,
    app_folder: Option<String>,
    file_mappings: Option<toml::Value>,
}

impl Config {
    /// Checks the API prefix and the app folder.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !is_api_uri(&self.api_uri) {
            return Err(ConfigError::ApiUri(self.api_uri.clone()));
        }

        if !is_app_folder(&self.app_folder) {
            return Err(ConfigError::AppFolder(self.app_folder.clone()));
        }

        Ok(())
    }

    /// Parses and validates a TOML document.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let raw: RawConfig = toml::from_str(content).map_err(ConfigError::Parse)?;
        let defaults = Config::default();

        let config = Config {
            api_uri: raw.api_uri.unwrap_or(defaults.api_uri),
            app_folder: raw.app_folder.unwrap_or(defaults.app_folder),
            file_mappings: match raw.file_mappings {
                Some(value) => file_mappings(value)?,
                None => defaults.file_mappings,
            },
        };

        config.validate()?;
        Ok(config)
    }

    /// Loads and validates a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(ConfigError::Io)?;
        Self::from_toml_str(&content)
    }
}

// ^/.+$
fn is_api_uri(uri: &str) -> bool {
    uri.strip_prefix('/')
        .is_some_and(|rest| !rest.is_empty() && !rest.contains('\n'))
}

// ^[^/]+/$
fn is_app_folder(folder: &str) -> bool {
    folder
        .strip_suffix('/')
        .is_some_and(|name| !name.is_empty() && !name.contains('/'))
}

fn file_mappings(value: toml::Value) -> Result<HashMap<String, String>, ConfigError> {
    let table = match value {
        toml::Value::Table(table) => table,
        other => return Err(ConfigError::FileMappings(other.to_string())),
    };

    let mut mappings = HashMap::with_capacity(table.len());
    for (key, value) in table.iter() {
        match value {
            toml::Value::String(target) => {
                mappings.insert(key.clone(), target.clone());
            }
            _ => {
                let shown = toml::Value::Table(table.clone()).to_string();
                return Err(ConfigError::FileMappings(shown));
            }
        }
    }

    Ok(mappings)
}

/// Error type for configuration loading.
#[derive(Debug)]
pub enum ConfigError {
    ApiUri(String),
    AppFolder(String),
    FileMappings(String),
    Io(io::Error),
    Parse(toml::de::Error),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::ApiUri(uri) => write!(
                f,
                "API URI should start with '/' and contain at least one character, '{uri}' was given"
            ),
            ConfigError::AppFolder(folder) => write!(
                f,
                "App folder should end with '/' and contain at least one character, '{folder}' was given"
            ),
            ConfigError::FileMappings(mappings) => write!(
                f,
                "File mappings should be a table of string to string, '{mappings}' given"
            ),
            ConfigError::Io(e) => write!(f, "IO error: {e}"),
            ConfigError::Parse(e) => write!(f, "Parse error: {e}"),
        }
    }
}

impl error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match self {
            ConfigError::Io(e) => Some(e),
            ConfigError::Parse(e) => Some(e),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_uri_syntax() {
        #[rustfmt::skip]
        let cases = [
            ("/api",      true),
            ("/a",        true),
            ("/api/v1",   true),
            ("//",        true),

            ("/",         false),
            ("",          false),
            ("api",       false),
            ("/a\nb",     false),
        ];

        for (uri, valid) in cases {
            assert_eq!(is_api_uri(uri), valid, "{uri:?}");
        }
    }

    #[test]
    fn app_folder_syntax() {
        #[rustfmt::skip]
        let cases = [
            ("app/",      true),
            ("public/",   true),
            ("a/",        true),

            ("/",         false),
            ("app",       false),
            ("/app/",     false),
            ("app/sub/",  false),
            ("",          false),
        ];

        for (folder, valid) in cases {
            assert_eq!(is_app_folder(folder), valid, "{folder:?}");
        }
    }

    #[test]
    fn defaults_are_valid() {
        assert!(Config::default().validate().is_ok());
        assert_eq!(Config::from_toml_str("").unwrap(), Config::default());
    }

    #[test]
    fn invalid_values() {
        let cases = [
            ("api_uri = \"api\"", "API URI"),
            ("app_folder = \"/srv/app/\"", "App folder"),
            ("[file_mappings]\nindex = 1", "File mappings"),
            ("file_mappings = [\"index.html\"]", "File mappings"),
            ("api_uri = 5", "Parse error"),
            ("api_uri = ", "Parse error"),
        ];

        for (content, message) in cases {
            let err = Config::from_toml_str(content).unwrap_err();
            assert!(err.to_string().starts_with(message), "{content:?}: {err}");
        }
    }

    #[test]
    fn error_variants() {
        let err = Config {
            api_uri: "/".into(),
            ..Config::default()
        }
        .validate()
        .unwrap_err();

        assert!(matches!(err, ConfigError::ApiUri(uri) if uri == "/"));

        let err = Config::load("/definitely/not/here.toml").unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }
}
