//! File loading and environment overrides.

use crate::error::{ConfigError, ConfigResult};
use gateway_core::{
    ApiKey, BedrockConnection, OpenAiConnection, ProviderConnectionParams, YandexConnection,
};
use gateway_telemetry::LoggingConfig;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::debug;
use validator::Validate;

/// OpenAI API key
pub const OPENAI_API_KEY: &str = "OPENAI_API_KEY";
/// OpenAI base URL
pub const OPENAI_API_URL: &str = "OPENAI_API_URL";
/// OpenAI admin key for cost reports
pub const OPENAI_API_ADMIN_KEY: &str = "OPENAI_API_ADMIN_KEY";
/// Yandex API key
pub const YANDEX_FM_API_KEY: &str = "YANDEX_FM_API_KEY";
/// Yandex cloud folder
pub const YANDEX_FM_API_FOLDER: &str = "YANDEX_FM_API_FOLDER";
/// Bedrock region
pub const AWS_BEDROCK_REGION: &str = "AWS_BEDROCK_REGION";
/// Bedrock access key id
pub const AWS_BEDROCK_ACCESS_KEY_ID: &str = "AWS_BEDROCK_ACCESS_KEY_ID";
/// Bedrock secret access key
pub const AWS_BEDROCK_SECRET_ACCESS_KEY: &str = "AWS_BEDROCK_SECRET_ACCESS_KEY";
/// Bedrock session token
pub const AWS_BEDROCK_SESSION_TOKEN: &str = "AWS_BEDROCK_SESSION_TOKEN";
/// Log level directive
pub const LOG_LEVEL: &str = "LOG_LEVEL";

/// Loaded configuration
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// Provider connections
    pub providers: ProviderConnectionParams,
    /// Logging settings
    pub logging: LoggingConfig,
}

#[derive(Debug, Validate)]
struct ConnectionChecks {
    #[validate(url)]
    openai_base_url: Option<String>,
    #[validate(url)]
    yandex_base_url: Option<String>,
    #[validate(url)]
    bedrock_endpoint_url: Option<String>,
    #[validate(length(min = 1))]
    bedrock_region: Option<String>,
    #[validate(range(min = 1))]
    bedrock_max_attempts: Option<u32>,
}

impl GatewayConfig {
    /// Check URLs and Bedrock settings
    pub fn validate(&self) -> ConfigResult<()> {
        let providers = &self.providers;
        let checks = ConnectionChecks {
            openai_base_url: providers.openai.as_ref().map(|c| c.base_url.clone()),
            yandex_base_url: providers.yandex.as_ref().map(|c| c.base_url.clone()),
            bedrock_endpoint_url: providers
                .bedrock
                .as_ref()
                .and_then(|c| c.endpoint_url.clone()),
            bedrock_region: providers.bedrock.as_ref().map(|c| c.region.clone()),
            bedrock_max_attempts: providers.bedrock.as_ref().map(|c| c.max_attempts),
        };
        checks
            .validate()
            .map_err(|errors| ConfigError::Validation(errors.to_string()))
    }
}

/// Builder-style configuration loader
#[derive(Debug, Default)]
pub struct ConfigLoader {
    file: Option<PathBuf>,
    env: Option<HashMap<String, String>>,
}

impl ConfigLoader {
    /// Loader with no file that reads the process environment
    pub fn new() -> Self {
        Self::default()
    }

    /// Read settings from `path`
    #[must_use]
    pub fn with_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.file = Some(path.into());
        self
    }

    /// Use `vars` instead of the process environment
    #[must_use]
    pub fn with_env<I, K, V>(mut self, vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.env = Some(
            vars.into_iter()
                .map(|(key, value)| (key.into(), value.into()))
                .collect(),
        );
        self
    }

    /// Load, override and validate
    pub async fn load(self) -> ConfigResult<GatewayConfig> {
        let mut config = match &self.file {
            Some(path) => read_file(path).await?,
            None => GatewayConfig::default(),
        };

        let env = self.env.unwrap_or_else(|| std::env::vars().collect());
        apply_env_overrides(&mut config, &env);
        config.validate()?;
        Ok(config)
    }
}

/// Load `path` with process environment overrides
pub async fn load_config(path: impl AsRef<Path>) -> ConfigResult<GatewayConfig> {
    ConfigLoader::new().with_file(path.as_ref()).load().await
}

async fn read_file(path: &Path) -> ConfigResult<GatewayConfig> {
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase);

    let content = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
    debug!(path = %path.display(), "Loaded configuration file");

    let parse_error = |message: String| ConfigError::Parse {
        path: path.to_path_buf(),
        message,
    };

    match extension.as_deref() {
        Some("toml") => toml::from_str(&content).map_err(|e| parse_error(e.to_string())),
        Some("yaml" | "yml") => {
            serde_yaml::from_str(&content).map_err(|e| parse_error(e.to_string()))
        }
        _ => Err(ConfigError::UnsupportedFormat(path.to_path_buf())),
    }
}

/// Environment values win over file values; blank values are ignored.
fn apply_env_overrides(config: &mut GatewayConfig, env: &HashMap<String, String>) {
    let var = |name: &str| {
        env.get(name)
            .map(|value| value.trim())
            .filter(|value| !value.is_empty())
            .map(str::to_string)
    };
    let providers = &mut config.providers;

    if let Some(key) = var(OPENAI_API_KEY) {
        match providers.openai.as_mut() {
            Some(openai) => openai.api_key = ApiKey::new(key),
            None => providers.openai = Some(OpenAiConnection::new(key)),
        }
    }
    if let Some(openai) = providers.openai.as_mut() {
        if let Some(url) = var(OPENAI_API_URL) {
            openai.base_url = url;
        }
        if let Some(key) = var(OPENAI_API_ADMIN_KEY) {
            openai.admin_api_key = Some(ApiKey::new(key));
        }
    }

    let yandex_key = var(YANDEX_FM_API_KEY);
    let yandex_folder = var(YANDEX_FM_API_FOLDER);
    if yandex_key.is_some() || yandex_folder.is_some() {
        let yandex = providers.yandex.get_or_insert_with(YandexConnection::default);
        if let Some(key) = yandex_key {
            yandex.api_key = Some(ApiKey::new(key));
        }
        if let Some(folder) = yandex_folder {
            yandex.folder_id = Some(folder);
        }
    }

    let bedrock_vars = [
        AWS_BEDROCK_REGION,
        AWS_BEDROCK_ACCESS_KEY_ID,
        AWS_BEDROCK_SECRET_ACCESS_KEY,
        AWS_BEDROCK_SESSION_TOKEN,
    ];
    if bedrock_vars.iter().any(|name| var(name).is_some()) {
        let bedrock = providers.bedrock.get_or_insert_with(BedrockConnection::default);
        if let Some(region) = var(AWS_BEDROCK_REGION) {
            bedrock.region = region;
        }
        if let Some(id) = var(AWS_BEDROCK_ACCESS_KEY_ID) {
            bedrock.access_key_id = Some(id);
        }
        if let Some(secret) = var(AWS_BEDROCK_SECRET_ACCESS_KEY) {
            bedrock.secret_access_key = Some(ApiKey::new(secret));
        }
        if let Some(token) = var(AWS_BEDROCK_SESSION_TOKEN) {
            bedrock.session_token = Some(ApiKey::new(token));
        }
    }

    if let Some(level) = var(LOG_LEVEL) {
        config.logging.level = level;
    }
}
