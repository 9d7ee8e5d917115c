use std::{collections::HashMap, path::PathBuf, time::Duration};

use trilha::config::{OpenAiSettings, Paths, Settings};

fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let vars: HashMap<String, String> = vars
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    move |key| vars.get(key).cloned()
}

#[test]
fn defaults_match_the_documented_files() {
    let paths = Paths::default();

    assert_eq!(paths.rubric, PathBuf::from("trilha_ia_desafios.xlsx"));
    assert_eq!(paths.report, PathBuf::from("avaliacoes.xlsx"));
    assert_eq!(paths.downloads, PathBuf::from("pdf_downloads"));
    assert_eq!(paths.token, PathBuf::from("token.json"));
    assert_eq!(paths.credentials, PathBuf::from("credentials.json"));
}

#[test]
fn only_the_api_key_is_required() {
    let settings = OpenAiSettings::from_lookup(lookup(&[("OPENAI_API_KEY", "sk-1")])).expect("settings");

    assert_eq!(settings.api_key(), "sk-1");
    assert_eq!(settings.model(), "gpt-3.5-turbo");
    assert_eq!(settings.api_base(), None);
    assert_eq!(settings.max_tokens(), 120);
}

#[test]
fn missing_or_blank_api_key_fails() {
    assert!(OpenAiSettings::from_lookup(lookup(&[])).is_err());
    assert!(OpenAiSettings::from_lookup(lookup(&[("OPENAI_API_KEY", "   ")])).is_err());
}

#[test]
fn overrides_are_applied() {
    let settings = OpenAiSettings::from_lookup(lookup(&[
        ("OPENAI_API_KEY", "sk-1"),
        ("OPENAI_MODEL", "gpt-4o-mini"),
        ("OPENAI_ENDPOINT", "http://localhost:11434/v1"),
        ("OPENAI_MAX_TOKENS", "64"),
    ]))
    .expect("settings");

    assert_eq!(settings.model(), "gpt-4o-mini");
    assert_eq!(settings.api_base(), Some("http://localhost:11434/v1"));
    assert_eq!(settings.max_tokens(), 64);
}

#[test]
fn bad_token_cap_is_rejected() {
    let result = OpenAiSettings::from_lookup(lookup(&[
        ("OPENAI_API_KEY", "sk-1"),
        ("OPENAI_MAX_TOKENS", "many"),
    ]));

    assert!(result.is_err());
}

#[test]
fn api_key_is_redacted_in_debug_output() {
    let rendered = format!("{:?}", OpenAiSettings::new("sk-very-secret"));

    assert!(!rendered.contains("sk-very-secret"));
    assert!(rendered.contains("gpt-3.5-turbo"));
}

#[test]
fn http_timeout_defaults_and_overrides() {
    let settings =
        Settings::from_lookup(Paths::default(), lookup(&[("OPENAI_API_KEY", "sk-1")])).expect("settings");
    assert_eq!(settings.http_timeout, Duration::from_secs(120));

    let settings = Settings::from_lookup(
        Paths::default(),
        lookup(&[("OPENAI_API_KEY", "sk-1"), ("TRILHA_HTTP_TIMEOUT_SECS", "15")]),
    )
    .expect("settings");
    assert_eq!(settings.http_timeout, Duration::from_secs(15));

    let settings = Settings::from_lookup(
        Paths::default(),
        lookup(&[("OPENAI_API_KEY", "sk-1"), ("TRILHA_HTTP_TIMEOUT_SECS", "0")]),
    )
    .expect("settings");
    assert_eq!(settings.http_timeout, Duration::from_secs(120));
    assert!(settings.http_client().is_ok());
}
