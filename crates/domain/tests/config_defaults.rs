use dm_domain::config::{Config, ConfigSeverity, TenantScope};

#[test]
fn default_listens_on_all_interfaces() {
    let config = Config::default();
    assert_eq!(config.server.host, "0.0.0.0");
    assert_eq!(config.server.port, 3000);
}

#[test]
fn default_messenger_env_names_match_deployment() {
    let config = Config::default();
    assert_eq!(config.messenger.page_access_token_env, "PAGE_ACCESS_TOKEN");
    assert_eq!(config.messenger.verify_token_env, "VERIFY_TOKEN");
    assert_eq!(config.messenger.api_version, "v20.0");
    assert_eq!(config.messenger.send_timeout_ms, 5_000);
}

#[test]
fn full_file_parses() {
    let toml_str = r#"
[server]
port = 8080

[server.cors]
allowed_origins = ["https://dashboard.dmfy.app"]

[messenger]
api_version = "v21.0"
send_timeout_ms = 2500

[sessions]
tenant_scope = "per_page"
idle_minutes = 120
"#;
    let config: Config = toml::from_str(toml_str).unwrap();
    assert_eq!(config.server.port, 8080);
    assert_eq!(config.messenger.api_version, "v21.0");
    assert_eq!(config.messenger.send_timeout_ms, 2500);
    assert_eq!(config.sessions.tenant_scope, TenantScope::PerPage);
    assert_eq!(config.sessions.idle_minutes, 120);
    assert!(config.validate().is_empty());
}

#[test]
fn wildcard_cors_is_only_a_warning() {
    let issues = Config::default().validate();
    assert_eq!(issues.len(), 1);
    assert_eq!(issues[0].severity, ConfigSeverity::Warning);
    assert_eq!(issues[0].field, "server.cors.allowed_origins");
}

#[test]
fn zero_port_is_rejected() {
    let config: Config = toml::from_str("[server]\nport = 0\n").unwrap();
    assert!(config
        .validate()
        .iter()
        .any(|i| i.severity == ConfigSeverity::Error && i.field == "server.port"));
}

#[test]
fn shipped_example_config_is_valid() {
    let config: Config = toml::from_str(include_str!("../../../config.example.toml")).unwrap();
    assert!(config
        .validate()
        .iter()
        .all(|i| i.severity == ConfigSeverity::Warning));
    assert_eq!(config.sessions.idle_by_channel.get("instagram"), Some(&720));
}
