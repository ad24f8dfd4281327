use serde::{Deserialize, Serialize};
use std::env;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub environment: Environment,
    pub database: DatabaseConfig,
    pub security: SecurityConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Environment {
    Development,
    Staging,
    Production,
}

/// Connection parameters for the row store. Assembled into a driver URL by
/// [`DatabaseConfig::url`]; the individual fields mirror what operators set
/// in the environment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub driver: String,
    pub host: String,
    pub port: u16,
    pub dbname: String,
    pub user: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    pub jwt_secret: String,
    /// Token lifetime in seconds. Defaults to 30 days.
    pub jwt_ttl_secs: i64,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let environment = match env::var("APP_ENV").as_deref() {
            Ok("production") | Ok("prod") => Environment::Production,
            Ok("staging") | Ok("stage") => Environment::Staging,
            _ => Environment::Development,
        };

        Self {
            environment,
            database: DatabaseConfig::from_env(),
            security: SecurityConfig::from_env(),
        }
    }
}

impl DatabaseConfig {
    fn from_env() -> Self {
        Self {
            driver: env::var("DB_DRIVER").unwrap_or_else(|_| "postgres".to_string()),
            host: env::var("DB_HOST").unwrap_or_else(|_| "localhost".to_string()),
            port: env::var("DB_PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(5432),
            dbname: env::var("DB_NAME").unwrap_or_else(|_| "storefront".to_string()),
            user: env::var("DB_USER").unwrap_or_else(|_| "postgres".to_string()),
            password: env::var("DB_PASSWORD").unwrap_or_default(),
        }
    }

    /// Build the connection URL, validating the assembled string so that a
    /// bad host or port surfaces as a configuration error instead of a
    /// confusing driver failure later.
    pub fn url(&self) -> Result<String, url::ParseError> {
        let raw = format!(
            "{}://{}:{}@{}:{}/{}",
            self.driver, self.user, self.password, self.host, self.port, self.dbname
        );
        let parsed = url::Url::parse(&raw)?;
        Ok(parsed.into())
    }
}

impl SecurityConfig {
    fn from_env() -> Self {
        Self {
            jwt_secret: env::var("JWT_SECRET").unwrap_or_else(|_| "secret".to_string()),
            jwt_ttl_secs: env::var("JWT_TTL_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(60 * 60 * 24 * 30),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn database_url_is_assembled_from_parts() {
        let cfg = DatabaseConfig {
            driver: "postgres".into(),
            host: "db.internal".into(),
            port: 5433,
            dbname: "shop".into(),
            user: "app".into(),
            password: "pw".into(),
        };
        assert_eq!(cfg.url().unwrap(), "postgres://app:pw@db.internal:5433/shop");
    }

    #[test]
    fn invalid_host_fails_url_validation() {
        let cfg = DatabaseConfig {
            driver: "postgres".into(),
            host: "".into(),
            port: 5432,
            dbname: "shop".into(),
            user: "app".into(),
            password: "".into(),
        };
        assert!(cfg.url().is_err());
    }
}
