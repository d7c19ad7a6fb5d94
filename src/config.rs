use std::collections::HashSet;
use std::net::SocketAddr;

use envconfig::Envconfig;

#[derive(Envconfig, Debug, Clone)]
pub struct Config {
    #[envconfig(from = "DATABASE_URL", default = "sqlite://forum.db?mode=rwc")]
    pub database_url: String,

    #[envconfig(from = "FORUM_BIND_ADDR", default = "127.0.0.1:3000")]
    pub bind_addr: SocketAddr,

    #[envconfig(from = "FORUM_MAX_CONNECTIONS", default = "5")]
    pub max_connections: u32,

    /// HMAC key for API tokens.
    #[envconfig(from = "FORUM_TOKEN_SECRET", default = "change-me-in-production")]
    pub token_secret: String,

    #[envconfig(from = "FORUM_TOKEN_TTL_SECONDS", default = "2592000")] // 30 days
    pub token_ttl_seconds: u64,

    /// Comma-separated user ids allowed to manage categories.
    #[envconfig(from = "FORUM_ADMIN_USER_IDS", default = "")]
    pub admin_user_ids: String,

    #[envconfig(from = "FORUM_BCRYPT_COST", default = "12")]
    pub bcrypt_cost: u32,

    #[envconfig(from = "FORUM_MAX_BODY_BYTES", default = "1048576")] // 1MB
    pub max_body_bytes: usize,

    #[envconfig(from = "RUST_LOG", default = "info")]
    pub log_level: String,
}

impl Config {
    pub fn from_env() -> Result<Self, envconfig::Error> {
        Self::init_from_env()
    }

    /// Parses `admin_user_ids`, skipping entries that are not integers.
    pub fn admin_ids(&self) -> HashSet<i64> {
        self.admin_user_ids
            .split(',')
            .filter_map(|id| {
                let id = id.trim();
                if id.is_empty() {
                    return None;
                }
                match id.parse::<i64>() {
                    Ok(id) => Some(id),
                    Err(_) => {
                        tracing::warn!(entry = %id, "Ignoring malformed admin user id");
                        None
                    }
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_with(vars: &[(&str, &str)]) -> Config {
        let env: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::init_from_hashmap(&env).unwrap()
    }

    #[test]
    fn defaults_apply_when_unset() {
        let config = config_with(&[]);
        assert_eq!(config.bind_addr.port(), 3000);
        assert_eq!(config.token_ttl_seconds, 2_592_000);
        assert_eq!(config.bcrypt_cost, 12);
        assert!(config.admin_ids().is_empty());
    }

    #[test]
    fn admin_ids_are_parsed_leniently() {
        let config = config_with(&[("FORUM_ADMIN_USER_IDS", "1, 7,,abc, 42")]);
        let ids = config.admin_ids();
        assert_eq!(ids.len(), 3);
        assert!(ids.contains(&1) && ids.contains(&7) && ids.contains(&42));
    }
}
