//! Configuration management
//!
//! Settings come from three layers, highest precedence first:
//! command-line/environment overrides, the optional TOML configuration file
//! (default `~/.config/cosup/config.toml`), and built-in defaults.
//! The layers are resolved once at startup into an [`UploadConfig`].

use std::path::PathBuf;

use serde::Deserialize;

use crate::error::{Error, Result};
use crate::key::KeyPrefix;

/// Current configuration schema version
pub const SCHEMA_VERSION: u32 = 1;

/// Default source directory, relative to the working directory
pub const DEFAULT_SOURCE_DIR: &str = "docs/.vitepress/dist";

/// Configuration file layout
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Schema version for migration support
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,

    /// Storage connection settings
    #[serde(default)]
    pub cos: CosSection,

    /// What to upload and where
    #[serde(default)]
    pub upload: UploadSection,
}

fn default_schema_version() -> u32 {
    SCHEMA_VERSION
}

impl Default for Config {
    fn default() -> Self {
        Self {
            schema_version: SCHEMA_VERSION,
            cos: CosSection::default(),
            upload: UploadSection::default(),
        }
    }
}

/// `[cos]` table
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CosSection {
    pub secret_id: Option<String>,
    pub secret_key: Option<String>,
    pub bucket: Option<String>,
    pub region: Option<String>,
    pub endpoint: Option<String>,
    pub path_style: Option<bool>,
}

/// `[upload]` table
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UploadSection {
    pub source_dir: Option<PathBuf>,
    pub prefix: Option<String>,
}

/// Configuration manager handles locating and loading the config file
#[derive(Debug)]
pub struct ConfigManager {
    config_path: PathBuf,
}

impl ConfigManager {
    /// Create a new ConfigManager with the default config path
    pub fn new() -> Result<Self> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| Error::Config("Could not determine config directory".into()))?;
        let config_path = config_dir.join("cosup").join("config.toml");
        Ok(Self { config_path })
    }

    /// Create a ConfigManager with a custom path
    pub fn with_path(path: PathBuf) -> Self {
        Self { config_path: path }
    }

    /// Get the configuration file path
    pub fn config_path(&self) -> &PathBuf {
        &self.config_path
    }

    /// Load configuration from disk
    ///
    /// If the configuration file doesn't exist, returns a default configuration.
    pub fn load(&self) -> Result<Config> {
        if !self.config_path.exists() {
            tracing::debug!("No config file at {}", self.config_path.display());
            return Ok(Config::default());
        }

        let content = std::fs::read_to_string(&self.config_path)?;
        let config: Config = toml::from_str(&content)?;

        if config.schema_version > SCHEMA_VERSION {
            return Err(Error::Config(format!(
                "Configuration file version {} is newer than supported version {}. Please upgrade cosup.",
                config.schema_version, SCHEMA_VERSION
            )));
        }

        tracing::debug!("Loaded config from {}", self.config_path.display());
        Ok(config)
    }
}

/// Values given on the command line or through environment variables
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub secret_id: Option<String>,
    pub secret_key: Option<String>,
    pub bucket: Option<String>,
    pub region: Option<String>,
    pub endpoint: Option<String>,
    pub path_style: Option<bool>,
    pub source_dir: Option<PathBuf>,
    pub prefix: Option<String>,
}

/// Static API credentials
#[derive(Clone)]
pub struct Credentials {
    pub secret_id: String,
    pub secret_key: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("secret_id", &self.secret_id)
            .field("secret_key", &"<redacted>")
            .finish()
    }
}

/// Everything needed to talk to the bucket
#[derive(Debug, Clone)]
pub struct StoreConfig {
    pub bucket: String,
    pub region: String,
    /// Explicit endpoint; the regional COS endpoint is used when absent
    pub endpoint: Option<url::Url>,
    /// Use path-style instead of virtual-hosted addressing
    pub path_style: bool,
    pub credentials: Credentials,
}

impl StoreConfig {
    /// Endpoint URL the client should send requests to
    pub fn endpoint_url(&self) -> String {
        match &self.endpoint {
            Some(url) => url.as_str().trim_end_matches('/').to_string(),
            None => format!("https://cos.{}.myqcloud.com", self.region),
        }
    }
}

/// Fully resolved settings for one upload run
#[derive(Debug, Clone)]
pub struct UploadConfig {
    pub store: StoreConfig,
    pub source_dir: PathBuf,
    pub prefix: KeyPrefix,
}

impl UploadConfig {
    /// Merge overrides over the file configuration and validate the result
    pub fn resolve(file: Config, overrides: ConfigOverrides) -> Result<Self> {
        let cos = file.cos;
        let upload = file.upload;

        let secret_id = required(
            overrides.secret_id.or(cos.secret_id),
            "secret_id",
            "COS_SECRET_ID",
        )?;
        let secret_key = required(
            overrides.secret_key.or(cos.secret_key),
            "secret_key",
            "COS_SECRET_KEY",
        )?;
        let bucket = required(overrides.bucket.or(cos.bucket), "bucket", "COS_BUCKET")?;
        let region = required(overrides.region.or(cos.region), "region", "COS_REGION")?;

        if !is_valid_region(&region) {
            return Err(Error::Config(format!(
                "Region '{region}' may only contain lowercase letters, digits and '-'"
            )));
        }

        let endpoint = match non_empty(overrides.endpoint.or(cos.endpoint)) {
            Some(raw) => Some(parse_endpoint(&raw)?),
            None => None,
        };

        let prefix = KeyPrefix::new(&overrides.prefix.or(upload.prefix).unwrap_or_default())?;
        let source_dir = overrides
            .source_dir
            .or(upload.source_dir)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_SOURCE_DIR));

        Ok(Self {
            store: StoreConfig {
                bucket,
                region,
                endpoint,
                path_style: overrides.path_style.or(cos.path_style).unwrap_or(false),
                credentials: Credentials {
                    secret_id,
                    secret_key,
                },
            },
            source_dir,
            prefix,
        })
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

fn required(value: Option<String>, field: &str, env: &str) -> Result<String> {
    non_empty(value).ok_or_else(|| {
        Error::Config(format!(
            "Missing {field}: set {env}, pass --{}, or add it to the [cos] table",
            field.replace('_', "-")
        ))
    })
}

fn parse_endpoint(raw: &str) -> Result<url::Url> {
    let url = url::Url::parse(raw)?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        scheme => Err(Error::Config(format!(
            "Endpoint scheme '{scheme}' is not supported, use http or https"
        ))),
    }
}

fn is_valid_region(region: &str) -> bool {
    region
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn temp_config_manager() -> (ConfigManager, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.toml");
        let manager = ConfigManager::with_path(config_path);
        (manager, temp_dir)
    }

    fn full_overrides() -> ConfigOverrides {
        ConfigOverrides {
            secret_id: Some("AKIDexample".into()),
            secret_key: Some("secret".into()),
            bucket: Some("site-1250000000".into()),
            region: Some("ap-guangzhou".into()),
            ..Default::default()
        }
    }

    #[test]
    fn test_load_nonexistent_returns_default() {
        let (manager, _temp_dir) = temp_config_manager();
        let config = manager.load().unwrap();
        assert_eq!(config.schema_version, SCHEMA_VERSION);
        assert!(config.cos.bucket.is_none());
    }

    #[test]
    fn test_load_file() {
        let (manager, _temp_dir) = temp_config_manager();
        std::fs::write(
            manager.config_path(),
            r#"
            schema_version = 1

            [cos]
            bucket = "docs-1250000000"
            region = "ap-shanghai"
            path_style = true

            [upload]
            source_dir = "public"
            prefix = "v2"
            "#,
        )
        .unwrap();

        let config = manager.load().unwrap();
        assert_eq!(config.cos.bucket.as_deref(), Some("docs-1250000000"));
        assert_eq!(config.cos.path_style, Some(true));
        assert_eq!(config.upload.source_dir, Some(PathBuf::from("public")));
        assert_eq!(config.upload.prefix.as_deref(), Some("v2"));
    }

    #[test]
    fn test_schema_version_too_new() {
        let (manager, _temp_dir) = temp_config_manager();

        let content = format!("schema_version = {}\n", SCHEMA_VERSION + 1);
        std::fs::write(manager.config_path(), content).unwrap();

        let result = manager.load();
        assert!(result.is_err());
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("newer than supported"));
    }

    #[test]
    fn test_malformed_file() {
        let (manager, _temp_dir) = temp_config_manager();
        std::fs::write(manager.config_path(), "[cos\nbucket = ").unwrap();

        assert!(matches!(manager.load(), Err(Error::TomlParse(_))));
    }

    #[test]
    fn test_resolve_defaults() {
        let config = UploadConfig::resolve(Config::default(), full_overrides()).unwrap();

        assert_eq!(config.source_dir, PathBuf::from(DEFAULT_SOURCE_DIR));
        assert!(config.prefix.is_empty());
        assert!(!config.store.path_style);
        assert_eq!(
            config.store.endpoint_url(),
            "https://cos.ap-guangzhou.myqcloud.com"
        );
    }

    #[test]
    fn test_overrides_beat_file() {
        let mut file = Config::default();
        file.cos.bucket = Some("from-file".into());
        file.cos.secret_id = Some("file-id".into());
        file.upload.prefix = Some("file-prefix".into());

        let mut overrides = full_overrides();
        overrides.secret_id = None;
        overrides.prefix = Some("/cli-prefix/".into());

        let config = UploadConfig::resolve(file, overrides).unwrap();
        assert_eq!(config.store.bucket, "site-1250000000");
        assert_eq!(config.store.credentials.secret_id, "file-id");
        assert_eq!(config.prefix.as_str(), "cli-prefix");
    }

    #[test]
    fn test_missing_required_value_is_named() {
        let mut overrides = full_overrides();
        overrides.bucket = Some("   ".into());

        let err = UploadConfig::resolve(Config::default(), overrides).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
        assert!(err.to_string().contains("COS_BUCKET"));
    }

    #[test]
    fn test_invalid_region() {
        let mut overrides = full_overrides();
        overrides.region = Some("AP Guangzhou".into());

        assert!(UploadConfig::resolve(Config::default(), overrides).is_err());
    }

    #[test]
    fn test_custom_endpoint() {
        let mut overrides = full_overrides();
        overrides.endpoint = Some("http://localhost:9000/".into());
        overrides.path_style = Some(true);

        let config = UploadConfig::resolve(Config::default(), overrides).unwrap();
        assert_eq!(config.store.endpoint_url(), "http://localhost:9000");
        assert!(config.store.path_style);
    }

    #[test]
    fn test_invalid_endpoint() {
        let mut overrides = full_overrides();
        overrides.endpoint = Some("not a url".into());
        assert!(matches!(
            UploadConfig::resolve(Config::default(), overrides),
            Err(Error::InvalidUrl(_))
        ));

        let mut overrides = full_overrides();
        overrides.endpoint = Some("ftp://example.com".into());
        assert!(matches!(
            UploadConfig::resolve(Config::default(), overrides),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn test_credentials_debug_redacts_secret() {
        let creds = Credentials {
            secret_id: "AKIDexample".into(),
            secret_key: "very-secret".into(),
        };
        let debug = format!("{creds:?}");
        assert!(debug.contains("AKIDexample"));
        assert!(!debug.contains("very-secret"));
    }
}
