//! Provider registry.
//!
//! Builds each configured adapter once from [`ProviderConnectionParams`] and
//! hands out shared handles per [`ProviderKind`]. Bedrock adapters are keyed
//! by model family and share one transport.

use crate::bedrock::{family_adapter, BedrockAccount, BedrockTransport, ModelFamily, SigV4Transport};
use crate::openai::{OpenAiCompatibleConfig, OpenAiCompatibleProvider};
use crate::yandex::YandexProvider;
use gateway_core::{
    BedrockConnection, GatewayError, GatewayResult, ModelProvider, ProviderAccount,
    ProviderConnectionParams, ProviderKind,
};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};

/// Registered Bedrock account and its family adapters
struct BedrockEntry {
    account: Arc<BedrockAccount>,
    adapters: HashMap<ModelFamily, Arc<dyn ModelProvider>>,
}

impl BedrockEntry {
    fn new(connection: &BedrockConnection, transport: Option<Arc<dyn BedrockTransport>>) -> Self {
        let adapters = transport
            .map(|transport| {
                ModelFamily::ALL
                    .into_iter()
                    .map(|family| (family, family_adapter(family, Arc::clone(&transport))))
                    .collect()
            })
            .unwrap_or_default();

        Self {
            account: Arc::new(BedrockAccount::new(connection)),
            adapters,
        }
    }
}

/// Adapters built from one set of connection parameters
#[derive(Default)]
pub struct ProviderRegistry {
    openai: Option<Arc<OpenAiCompatibleProvider>>,
    yandex: Option<Arc<YandexProvider>>,
    bedrock: Option<BedrockEntry>,
}

impl std::fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderRegistry")
            .field("kinds", &self.kinds())
            .finish_non_exhaustive()
    }
}

impl ProviderRegistry {
    /// Build every adapter `params` has a section for.
    ///
    /// A Bedrock section without credentials still registers the account
    /// surface; invocation then fails with a configuration error.
    pub fn from_connection(params: &ProviderConnectionParams) -> GatewayResult<Self> {
        let mut registry = Self::default();

        if let Some(connection) = &params.openai {
            let config = OpenAiCompatibleConfig::from_connection("openai", connection);
            registry.openai = Some(Arc::new(OpenAiCompatibleProvider::new(config)?));
        }

        if let Some(connection) = &params.yandex {
            registry.yandex = Some(Arc::new(YandexProvider::new("yandex", connection)?));
        }

        if let Some(connection) = &params.bedrock {
            let transport: Option<Arc<dyn BedrockTransport>> = if connection.has_credentials() {
                Some(Arc::new(SigV4Transport::new(connection)?))
            } else {
                debug!(region = %connection.region, "Bedrock credentials missing, invocation disabled");
                None
            };
            registry.bedrock = Some(BedrockEntry::new(connection, transport));
        }

        info!(providers = ?registry.kinds(), "Provider registry initialized");
        Ok(registry)
    }

    /// Register Bedrock with a caller-supplied transport
    #[must_use]
    pub fn with_bedrock_transport(
        mut self,
        connection: &BedrockConnection,
        transport: Arc<dyn BedrockTransport>,
    ) -> Self {
        self.bedrock = Some(BedrockEntry::new(connection, Some(transport)));
        self
    }

    /// Configured provider kinds, in declaration order
    pub fn kinds(&self) -> Vec<ProviderKind> {
        ProviderKind::ALL
            .into_iter()
            .filter(|kind| self.is_configured(*kind))
            .collect()
    }

    /// Whether `kind` has a connection section
    pub fn is_configured(&self, kind: ProviderKind) -> bool {
        match kind {
            ProviderKind::OpenAi => self.openai.is_some(),
            ProviderKind::YandexFm => self.yandex.is_some(),
            ProviderKind::AwsBedrock => self.bedrock.is_some(),
        }
    }

    fn not_configured(kind: ProviderKind) -> GatewayError {
        GatewayError::configuration(format!("{kind} is not configured"))
    }

    /// Adapter that serves `model_id` on `kind`
    pub fn adapter(&self, kind: ProviderKind, model_id: &str) -> GatewayResult<Arc<dyn ModelProvider>> {
        match kind {
            ProviderKind::OpenAi => self
                .openai
                .clone()
                .map(|provider| provider as Arc<dyn ModelProvider>)
                .ok_or_else(|| Self::not_configured(kind)),
            ProviderKind::YandexFm => self
                .yandex
                .clone()
                .map(|provider| provider as Arc<dyn ModelProvider>)
                .ok_or_else(|| Self::not_configured(kind)),
            ProviderKind::AwsBedrock => {
                let entry = self.bedrock.as_ref().ok_or_else(|| Self::not_configured(kind))?;
                let family = ModelFamily::from_model_id(model_id).ok_or_else(|| {
                    GatewayError::validation(
                        format!("Unsupported Bedrock model family for: {model_id}"),
                        Some("model_id".to_string()),
                        "unknown_model_family",
                    )
                })?;
                entry.adapters.get(&family).cloned().ok_or_else(|| {
                    GatewayError::configuration(
                        "AWS Bedrock credentials are not set. Set AWS_BEDROCK_ACCESS_KEY_ID/AWS_BEDROCK_SECRET_ACCESS_KEY in connection settings.",
                    )
                })
            }
        }
    }

    /// Account surface of `kind`
    pub fn account(&self, kind: ProviderKind) -> GatewayResult<Arc<dyn ProviderAccount>> {
        let account: Option<Arc<dyn ProviderAccount>> = match kind {
            ProviderKind::OpenAi => self
                .openai
                .clone()
                .map(|provider| provider as Arc<dyn ProviderAccount>),
            ProviderKind::YandexFm => self
                .yandex
                .clone()
                .map(|provider| provider as Arc<dyn ProviderAccount>),
            ProviderKind::AwsBedrock => self
                .bedrock
                .as_ref()
                .map(|entry| Arc::clone(&entry.account) as Arc<dyn ProviderAccount>),
        };
        account.ok_or_else(|| Self::not_configured(kind))
    }
}
