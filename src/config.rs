use serde::{Deserialize, Serialize};
use std::fs;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AppConfig {
    pub log_level: String,
    pub log_dir: String,
    pub log_file: String,
    pub use_json: bool,
    pub rotation: String,
    pub gateway: GatewayConfig,
    pub auth: AuthConfig,
    /// PostgreSQL connection URL; the in-memory store is used when absent.
    #[serde(default)]
    pub postgres_url: Option<String>,
    /// Agent account created at startup when no user with that email exists.
    #[serde(default)]
    pub seed_agent: Option<SeedAgentConfig>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct GatewayConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AuthConfig {
    pub jwt_secret: String,
    #[serde(default = "default_token_ttl_hours")]
    pub token_ttl_hours: i64,
}

fn default_token_ttl_hours() -> i64 {
    24
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct SeedAgentConfig {
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    pub phone: String,
    pub national_id: String,
}

impl AppConfig {
    pub fn load(env: &str) -> Self {
        let config_path = format!("config/{}.yaml", env);
        let content = fs::read_to_string(&config_path)
            .unwrap_or_else(|_| panic!("Failed to read config file: {}", config_path));
        serde_yaml::from_str(&content).expect("Failed to parse config yaml")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_minimal_yaml() {
        let yaml = r#"
log_level: info
log_dir: ./logs
log_file: minibank.log
use_json: false
rotation: daily
gateway:
  host: 127.0.0.1
  port: 8090
auth:
  jwt_secret: test-secret
"#;
        let config: AppConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.gateway.port, 8090);
        assert_eq!(config.auth.token_ttl_hours, 24);
        assert!(config.postgres_url.is_none());
        assert!(config.seed_agent.is_none());
    }
}
