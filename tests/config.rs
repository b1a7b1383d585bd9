// tests/config.rs
use fake_news_analyzer::config::ai::AiConfig;
use fake_news_analyzer::config::{AnalyzerConfig, ENV_CACHE_DIR, ENV_CONFIG_PATH, ENV_NEWS_THRESHOLD};
use serial_test::serial;
use std::path::PathBuf;

fn clear_env() {
    std::env::remove_var(ENV_CONFIG_PATH);
    std::env::remove_var(ENV_NEWS_THRESHOLD);
    std::env::remove_var(ENV_CACHE_DIR);
}

#[test]
#[serial]
fn missing_file_yields_defaults() {
    clear_env();
    std::env::set_var(ENV_CONFIG_PATH, "/definitely/not/here/analyzer.toml");
    let cfg = AnalyzerConfig::load().unwrap();
    assert!((cfg.news_gate.threshold - 0.6).abs() < 1e-6);
    assert_eq!(cfg.sources.len(), 10);
    clear_env();
}

#[test]
#[serial]
fn file_values_and_env_overrides() {
    clear_env();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("analyzer.toml");
    std::fs::write(
        &path,
        r#"
[news_gate]
threshold = 0.55

[fact_check]
max_matches = 3

[[sources]]
url = "https://example.org"
reliability = 0.9
region = "test"
"#,
    )
    .unwrap();
    std::env::set_var(ENV_CONFIG_PATH, &path);

    let cfg = AnalyzerConfig::load().unwrap();
    assert!((cfg.news_gate.threshold - 0.55).abs() < 1e-6);
    assert_eq!(cfg.fact_check.max_matches, 3);
    // untouched keys keep their defaults
    assert!((cfg.fact_check.min_similarity - 0.7).abs() < 1e-6);
    assert_eq!(cfg.sources.len(), 1);
    assert_eq!(cfg.sources[0].region, "test");

    std::env::set_var(ENV_NEWS_THRESHOLD, "1.7");
    std::env::set_var(ENV_CACHE_DIR, "/tmp/headlines");
    let cfg = AnalyzerConfig::load().unwrap();
    assert_eq!(cfg.news_gate.threshold, 1.0);
    assert_eq!(cfg.cache.dir, PathBuf::from("/tmp/headlines"));

    std::env::set_var(ENV_NEWS_THRESHOLD, "not a number");
    let cfg = AnalyzerConfig::load().unwrap();
    assert!((cfg.news_gate.threshold - 0.55).abs() < 1e-6);
    clear_env();
}

#[test]
#[serial]
fn malformed_file_is_an_error() {
    clear_env();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("analyzer.toml");
    std::fs::write(&path, "[news_gate\nthreshold = ").unwrap();
    std::env::set_var(ENV_CONFIG_PATH, &path);
    assert!(AnalyzerConfig::load().is_err());
    clear_env();
}

#[test]
fn out_of_range_weights_are_reset_and_zero_sum_rejected() {
    let cfg = AnalyzerConfig::from_toml_str("[news_gate]\nthreshold = 3.0\nrule_weight = -1.0\n").unwrap();
    assert!((cfg.news_gate.threshold - 0.6).abs() < 1e-6);
    assert!((cfg.news_gate.rule_weight - 0.7).abs() < 1e-6);

    assert!(AnalyzerConfig::from_toml_str("[news_gate]\nrule_weight = 0.0\nai_weight = 0.0\n").is_err());
}

#[test]
#[serial]
fn ai_config_resolves_env_key() {
    std::env::set_var("OPENAI_API_KEY", "sk-test");
    let cfg = AiConfig::from_json_str(r#"{"enabled": true, "provider": " OpenAI ", "api_key": "ENV"}"#).unwrap();
    assert_eq!(cfg.provider, "openai");
    assert_eq!(cfg.api_key, "sk-test");
    assert_eq!(cfg.daily_limit, 20);

    std::env::remove_var("OPENAI_API_KEY");
    assert!(AiConfig::from_json_str(r#"{"enabled": true, "provider": "openai"}"#).is_err());
}

#[test]
fn unreadable_ai_config_disables_generation() {
    let cfg = AiConfig::load_or_disabled("/definitely/not/here/ai.json");
    assert!(!cfg.enabled);
}
