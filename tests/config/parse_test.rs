//! Integration tests for configuration parsing and backend resolution.

use std::path::Path;

use serde_json::json;
use tokio_test::{assert_err, assert_ok};
use vibe_executor::backend::{resolve, ExecutionEnv, SpawnRequest};
use vibe_executor::config::{BackendKind, BackendOptions, ConfigError, Configuration};
use vibe_executor::Executor;

#[test]
fn every_single_key_resolves_to_its_backend() {
    for kind in BackendKind::ALL {
        let raw = json!({ kind.config_key(): {} });
        let config = assert_ok!(Configuration::parse(&raw));
        assert_eq!(config.backend(), kind);
        assert_eq!(config.options().kind(), kind);
        assert_eq!(resolve(config.options()).kind(), kind);
    }
}

#[test]
fn null_options_mean_defaults() {
    let config = assert_ok!(Configuration::parse(&json!({ "AMP": null })));
    assert_eq!(config.backend(), BackendKind::Amp);
}

#[test]
fn empty_configuration_is_rejected() {
    let err = assert_err!(Configuration::parse(&json!({})));
    assert!(matches!(err, ConfigError::EmptyConfiguration));
}

#[test]
fn two_keys_are_ambiguous() {
    let err = assert_err!(Configuration::parse(&json!({ "GEMINI": {}, "AMP": {} })));
    match err {
        ConfigError::AmbiguousSelection { keys } => assert_eq!(keys, ["AMP", "GEMINI"]),
        other => panic!("Expected AmbiguousSelection, got {other:?}"),
    }
}

#[test]
fn ambiguity_is_reported_before_unknown_names() {
    let err = assert_err!(Configuration::parse(&json!({ "AMP": {}, "FOO": {} })));
    assert!(matches!(err, ConfigError::AmbiguousSelection { .. }));
}

#[test]
fn unknown_key_is_rejected() {
    let err = assert_err!(Configuration::parse(&json!({ "CURSOR": {} })));
    match err {
        ConfigError::UnknownBackend { name } => assert_eq!(name, "CURSOR"),
        other => panic!("Expected UnknownBackend, got {other:?}"),
    }
}

#[test]
fn backend_keys_are_case_sensitive() {
    let err = assert_err!(Configuration::parse(&json!({ "gemini": {} })));
    assert!(matches!(err, ConfigError::UnknownBackend { .. }));
}

#[test]
fn wrong_option_type_is_malformed() {
    let err = assert_err!(Configuration::parse(&json!({ "GEMINI": { "yolo": "yes" } })));
    match err {
        ConfigError::MalformedOptions { backend, .. } => assert_eq!(backend, BackendKind::Gemini),
        other => panic!("Expected MalformedOptions, got {other:?}"),
    }
}

#[test]
fn options_must_be_a_mapping() {
    let err = assert_err!(Configuration::parse(&json!({ "AMP": [1, 2] })));
    assert!(matches!(err, ConfigError::MalformedOptions { .. }));
}

#[test]
fn blank_model_is_malformed() {
    let err = assert_err!(Configuration::parse(&json!({ "CLAUDE_CODE": { "model": "  " } })));
    assert!(matches!(err, ConfigError::MalformedOptions { .. }));
}

#[test]
fn blank_base_command_is_malformed() {
    let raw = json!({ "AMP": { "base_command_override": "   " } });
    let err = assert_err!(Configuration::parse(&raw));
    assert!(matches!(err, ConfigError::MalformedOptions { .. }));
}

#[test]
fn top_level_must_be_a_mapping() {
    let err = assert_err!(Configuration::parse(&json!("GEMINI")));
    match err {
        ConfigError::NotAMapping { found } => assert_eq!(found, "a string"),
        other => panic!("Expected NotAMapping, got {other:?}"),
    }
}

#[test]
fn invalid_json_text_is_reported() {
    let err = assert_err!(Executor::from_config("{not json"));
    assert!(matches!(err, ConfigError::Json(_)));
}

#[test]
fn toml_configuration_parses() {
    let config = assert_ok!(Configuration::from_toml_str(
        r#"
        [CODEX]
        model = "o4-mini"
        sandbox = "workspace-write"
        "#,
    ));
    assert_eq!(config.backend(), BackendKind::Codex);
}

#[test]
fn configuration_round_trips_through_value() {
    let raw = json!({ "OPENCODE": { "model": "anthropic/claude-sonnet-4", "agent": "build" } });
    let config = assert_ok!(Configuration::parse(&raw));
    let value = assert_ok!(config.to_value());
    assert_eq!(assert_ok!(Configuration::parse(&value)), config);
}

#[test]
fn gemini_scenario_command_includes_model_and_yolo() {
    let executor = assert_ok!(Executor::from_config(
        r#"{"GEMINI": {"model": "gemini-2.0-flash", "yolo": true}}"#
    ));
    let env = ExecutionEnv::new();
    let spec = executor.command_for(Path::new("/tmp/x"), "say hi", &env);

    assert_eq!(spec.program(), "npx");
    assert_eq!(spec.cwd(), Path::new("/tmp/x"));
    let args = spec.arguments();
    let model_at = args.iter().position(|a| a == "--model").unwrap();
    assert_eq!(args[model_at + 1], "gemini-2.0-flash");
    assert!(args.contains(&"--yolo".to_string()));
    assert_eq!(args.last().map(String::as_str), Some("say hi"));
}

#[test]
fn resolve_is_pure() {
    let config = assert_ok!(Configuration::parse(&json!({
        "CLAUDE_CODE": { "plan": true, "model": "sonnet" }
    })));
    let env: ExecutionEnv = [("HOME", "/home/test")].into_iter().collect();
    let request = SpawnRequest::new(Path::new("/work"), "fix the bug", &env);

    let builder = resolve(config.options());
    assert_eq!(builder.build(&request), builder.build(&request));
}

#[test]
fn shared_overrides_apply_to_every_backend() {
    for kind in BackendKind::ALL {
        let raw = json!({ kind.config_key(): {
            "append_prompt": " (be brief)",
            "additional_params": ["--extra"],
            "base_command_override": "/opt/agent --fast",
            "env": { "AGENT_TOKEN": "t" }
        }});
        let config = assert_ok!(Configuration::parse(&raw));
        let env = ExecutionEnv::new();
        let spec = resolve(config.options()).build(&SpawnRequest::new(Path::new("/w"), "hi", &env));

        assert_eq!(spec.program(), "/opt/agent", "{kind}");
        assert_eq!(spec.arguments()[0], "--fast", "{kind}");
        assert!(spec.arguments().contains(&"--extra".to_string()), "{kind}");
        assert!(spec.arguments().contains(&"hi (be brief)".to_string()), "{kind}");
        assert_eq!(
            spec.env_overrides().get("AGENT_TOKEN").map(String::as_str),
            Some("t"),
            "{kind}"
        );
    }
}

#[test]
fn typed_options_build_the_same_configuration() {
    let parsed = assert_ok!(Configuration::parse(&json!({ "GEMINI": { "yolo": true } })));
    let BackendOptions::Gemini(options) = parsed.options().clone() else {
        panic!("Expected Gemini options");
    };
    assert!(options.yolo);
    assert_eq!(
        Configuration::from_options(BackendOptions::Gemini(options)),
        parsed
    );
}
