//! Configuration file plus environment feeding the provider registry

use crate::mock_providers::*;
use gateway_config::{ConfigError, ConfigLoader};
use gateway_core::ProviderKind;
use gateway_providers::ProviderRegistry;
use pretty_assertions::assert_eq;
use std::io::Write;

fn config_file(extension: &str, contents: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::Builder::new()
        .suffix(extension)
        .tempfile()
        .expect("temp file");
    file.write_all(contents.as_bytes()).expect("write config");
    file
}

#[tokio::test]
async fn test_file_and_env_build_registry() {
    let file = config_file(
        ".toml",
        r#"
[providers.yandex]
folder_id = "b1g"

[providers.bedrock]
region = "eu-central-1"
"#,
    );

    let config = ConfigLoader::new()
        .with_file(file.path())
        .with_env([("YANDEX_FM_API_KEY", "yc-key"), ("OPENAI_API_KEY", "sk-env")])
        .load()
        .await
        .expect("should load");
    let registry = ProviderRegistry::from_connection(&config.providers).expect("registry");

    assert_eq!(
        registry.kinds(),
        vec![ProviderKind::OpenAi, ProviderKind::YandexFm, ProviderKind::AwsBedrock]
    );

    let yandex = registry.account(ProviderKind::YandexFm).expect("yandex account").info();
    assert!(yandex.is_connected);
    assert_eq!(yandex.details["folderId"], "b1g");

    let bedrock = registry.account(ProviderKind::AwsBedrock).expect("bedrock account").info();
    assert!(!bedrock.is_connected);
    assert_eq!(bedrock.details["region"], "eu-central-1");
}

#[tokio::test]
async fn test_configured_openai_url_reaches_mock() {
    let mock = MockOpenAi::new().await;
    mock.mock_chat_completion("gpt-4.1-mini", "from config").await;

    let file = config_file(
        ".yaml",
        &format!(
            "providers:\n  openai:\n    api_key: sk-file\n    base_url: {}\n    max_retries: 0\n",
            mock.url()
        ),
    );
    let config = ConfigLoader::new()
        .with_file(file.path())
        .with_env(Vec::<(String, String)>::new())
        .load()
        .await
        .expect("should load");
    let registry = ProviderRegistry::from_connection(&config.providers).expect("registry");

    let response = registry
        .adapter(ProviderKind::OpenAi, "gpt-4.1-mini")
        .expect("openai adapter")
        .invoke(&crate::fixtures::simple_request("gpt-4.1-mini", "Hi"))
        .await
        .expect("invoke should succeed");
    assert_eq!(response.content, "from config");
}

#[tokio::test]
async fn test_invalid_endpoint_is_rejected() {
    let file = config_file(
        ".toml",
        r#"
[providers.bedrock]
endpoint_url = "not a url"
"#,
    );

    let err = ConfigLoader::new()
        .with_file(file.path())
        .with_env(Vec::<(String, String)>::new())
        .load()
        .await
        .expect_err("should fail");
    assert!(matches!(err, ConfigError::Validation(_)));
}
