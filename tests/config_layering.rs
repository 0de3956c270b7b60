use agentd::agent::OverwritePolicy;
use agentd::config::ConfigLoader;
use agentd::error::ApiError;
use std::fs;

// Environment variables are process-wide, so every layering case runs in one test.
#[test]
fn layers_defaults_global_explicit_and_environment() {
    let xdg = tempfile::tempdir().unwrap();
    let global_dir = xdg.path().join("agentd");
    fs::create_dir_all(&global_dir).unwrap();
    fs::write(
        global_dir.join("config.toml"),
        r#"
default_agent_id = "chat"

[server]
bind = "0.0.0.0:7000"
"#,
    )
    .unwrap();

    let work = tempfile::tempdir().unwrap();
    let explicit = work.path().join("agentd.toml");
    fs::write(
        &explicit,
        r#"
[server]
bind = "127.0.0.1:9000"

[registry]
overwrite = "replace"

[agents.local]
display_name = "Local Model"
tools = ["calculate"]
max_iterations = 3

[agents.local.model]
provider = "ollama"
model_name = "qwen2.5"
"#,
    )
    .unwrap();

    std::env::set_var("XDG_CONFIG_HOME", xdg.path());
    std::env::set_var("AGENTD_SERVER__BASE_PATH", "/api");

    let config = ConfigLoader::load(Some(&explicit)).unwrap();
    assert_eq!(config.default_agent_id, "chat");
    assert_eq!(config.server.bind, "127.0.0.1:9000");
    assert_eq!(config.server.agent_header, "X-Agent-Id");
    assert_eq!(config.base_path(), "/api");
    assert_eq!(config.registry.overwrite, OverwritePolicy::Replace);

    let specs = config.agent_specs();
    let ids: Vec<&str> = specs.iter().map(|s| s.id.as_str()).collect();
    assert_eq!(ids, vec!["default", "chat", "calculator", "local"]);
    assert_eq!(specs[3].max_iterations, 3);

    // Without the explicit file the global layer alone applies.
    let config = ConfigLoader::load(None).unwrap();
    assert_eq!(config.server.bind, "0.0.0.0:7000");

    // Environment beats every file.
    std::env::set_var("AGENTD_DEFAULT_AGENT_ID", "calculator");
    let config = ConfigLoader::load(Some(&explicit)).unwrap();
    assert_eq!(config.default_agent_id, "calculator");
    std::env::remove_var("AGENTD_DEFAULT_AGENT_ID");

    // An explicit file must exist.
    assert!(ConfigLoader::load(Some(&work.path().join("missing.toml"))).is_err());

    // A malformed default id is rejected at load.
    let bad = work.path().join("bad.toml");
    fs::write(&bad, "default_agent_id = \"not valid!\"\n").unwrap();
    assert!(matches!(
        ConfigLoader::load(Some(&bad)),
        Err(ApiError::ConfigError(_))
    ));

    std::env::remove_var("AGENTD_SERVER__BASE_PATH");
    std::env::remove_var("XDG_CONFIG_HOME");
}
