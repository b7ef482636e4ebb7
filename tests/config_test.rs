use std::collections::HashMap;

use daylylog_server::config::{Config, ConfigError};

fn secret() -> String {
    "s".repeat(64)
}

fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let vars: HashMap<String, String> = vars
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    move |key| vars.get(key).cloned()
}

#[test]
fn defaults_apply_when_unset() {
    let config = Config::from_lookup(lookup(&[]), secret()).expect("config");
    assert_eq!(config.bind_address(), "0.0.0.0:3000");
    assert_eq!(config.data_path, "data");
    assert_eq!(config.frontend_origin, "http://localhost:8080");
    assert!(!config.production);
}

#[test]
fn overrides_are_read_from_lookup() {
    let config = Config::from_lookup(
        lookup(&[
            ("SERVER_HOST", "127.0.0.1"),
            ("SERVER_PORT", "8081"),
            ("DATABASE_PATH", "/tmp/dayly"),
            ("PRODUCTION", "TRUE"),
        ]),
        secret(),
    )
    .expect("config");
    assert_eq!(config.bind_address(), "127.0.0.1:8081");
    assert_eq!(config.data_path, "/tmp/dayly");
    assert!(config.production);
}

#[test]
fn invalid_port_is_rejected() {
    let result = Config::from_lookup(lookup(&[("SERVER_PORT", "70000")]), secret());
    assert!(matches!(result, Err(ConfigError::InvalidPort(port)) if port == "70000"));
}

#[test]
fn short_secret_is_rejected() {
    let result = Config::from_lookup(lookup(&[]), "short".to_string());
    assert!(matches!(result, Err(ConfigError::InvalidSessionSecret(_))));
}
