use super::*;
use std::collections::HashMap;
use std::io::Write;

fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let map: HashMap<String, String> = pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    move |key| map.get(key).cloned()
}

#[test]
fn test_default_values() {
    let config = Config::default();
    assert_eq!(config.server.port, 3000);
    assert_eq!(config.indexer.url, "http://localhost:8000");
    assert_eq!(config.indexer.top_k, 5);
    assert_eq!(config.chat.history_window, 5);
    assert_eq!(config.chat.max_message_chars, 2000);
    assert_eq!(config.llm.provider, LlmProvider::Gemini);
    assert_eq!(config.llm.model, "gemini-2.5-flash");
}

#[test]
fn test_missing_secrets_fail_validation() {
    let config = Config::default();
    assert!(matches!(config.validate(), Err(ConfigError::Missing("DATABASE_URL"))));

    let mut config = Config::default();
    config.database.url = "postgres://localhost/tutor".to_string();
    assert!(matches!(config.validate(), Err(ConfigError::Missing("JWT_SECRET"))));
}

#[test]
fn test_env_overrides_file_values() {
    let mut config = Config::from_toml(
        r#"
        [server]
        port = 4000

        [indexer]
        url = "http://indexer:9000"
        "#,
    )
    .unwrap();

    config
        .apply_env(env(&[
            ("DATABASE_URL", "postgres://db/tutor"),
            ("JWT_SECRET", "s3cret-s3cret-s3cret"),
            ("PORT", "8080"),
            ("LLM_PROVIDER", "ollama"),
            ("CORS_ORIGINS", "http://a.test, http://b.test"),
        ]))
        .unwrap();

    assert_eq!(config.server.port, 8080);
    assert_eq!(config.indexer.url, "http://indexer:9000");
    assert_eq!(config.llm.provider, LlmProvider::Ollama);
    assert_eq!(config.server.cors_origins, vec!["http://a.test", "http://b.test"]);
    assert!(config.validate().is_ok());
}

#[test]
fn test_blank_env_values_are_ignored() {
    let mut config = Config::default();
    config.apply_env(env(&[("INDEXER_URL", "   ")])).unwrap();
    assert_eq!(config.indexer.url, "http://localhost:8000");
}

#[test]
fn test_invalid_port_is_rejected() {
    let mut config = Config::default();
    let err = config.apply_env(env(&[("PORT", "eighty")])).unwrap_err();
    assert!(matches!(err, ConfigError::Invalid { key: "PORT", .. }));
}

#[test]
fn test_gemini_key_wins_over_generic_key() {
    let mut config = Config::default();
    config
        .apply_env(env(&[("GEMINI_API_KEY", "g-key"), ("LLM_API_KEY", "other")]))
        .unwrap();
    assert_eq!(config.llm.api_key.as_deref(), Some("g-key"));
}

#[test]
fn test_from_file_reads_partial_sections() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(
        file,
        r#"
        [llm]
        provider = "openai_compatible"
        model = "llama-3.1-8b"
        base_url = "http://localhost:1234"

        [chat]
        history_window = 3
        "#
    )
    .unwrap();

    let config = Config::from_file(file.path()).unwrap();
    assert_eq!(config.llm.provider, LlmProvider::OpenaiCompatible);
    assert_eq!(config.llm.base_url.as_deref(), Some("http://localhost:1234"));
    assert_eq!(config.chat.history_window, 3);
    // untouched sections keep defaults
    assert_eq!(config.chat.session_title_chars, 100);
    assert_eq!(config.uploads.max_bytes, 10 * 1024 * 1024);
}
