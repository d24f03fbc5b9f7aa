use config::ConfigError;

use crate::error;

#[derive(serde::Deserialize, Clone)]
pub struct Settings {
    pub database: DatabaseSettings,
    pub application: ApplicationSettings,
    pub jwt: JwtSettings,
    pub password: PasswordSettings,
}

#[derive(serde::Deserialize, Clone)]
pub struct ApplicationSettings {
    pub host: String,
    pub port: u16,
}

impl ApplicationSettings {
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[derive(serde::Deserialize, Clone)]
pub struct DatabaseSettings {
    /// sqlx connection url, e.g. `sqlite://locate_this.db` or `sqlite::memory:`
    pub url: String,
    pub max_connections: u32,
}

impl DatabaseSettings {
    pub fn in_memory() -> Self {
        Self {
            url: "sqlite::memory:".to_string(),
            max_connections: 1,
        }
    }

    pub fn is_in_memory(&self) -> bool {
        self.url.contains(":memory:")
    }
}

/// JWT authentication settings
///
/// Access and refresh tokens are signed with different secrets.
#[derive(serde::Deserialize, Clone)]
pub struct JwtSettings {
    pub access_secret: String,
    pub refresh_secret: String,
    pub access_token_expiry: i64,   // seconds (7200 = 2 hours)
    pub refresh_token_expiry: i64,  // seconds (10800 = 3 hours)
    pub issuer: String,
}

impl JwtSettings {
    /// Reject configurations that would make access and refresh tokens interchangeable
    pub fn validate(&self) -> Result<(), error::ConfigError> {
        if self.access_secret.trim().is_empty() {
            return Err(error::ConfigError::MissingRequired("jwt.access_secret".to_string()));
        }
        if self.refresh_secret.trim().is_empty() {
            return Err(error::ConfigError::MissingRequired("jwt.refresh_secret".to_string()));
        }
        if self.access_secret == self.refresh_secret {
            return Err(error::ConfigError::InvalidValue(
                "jwt.access_secret and jwt.refresh_secret must differ".to_string(),
            ));
        }
        if self.access_token_expiry <= 0 || self.refresh_token_expiry <= 0 {
            return Err(error::ConfigError::InvalidValue(
                "token expiries must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// Password hashing settings
#[derive(serde::Deserialize, Clone)]
pub struct PasswordSettings {
    /// bcrypt cost factor (4..=31)
    pub hash_cost: u32,
}

/// Load settings from `configuration.yaml` (optional) and `APP__*` environment variables.
///
/// `APP__JWT__ACCESS_SECRET=...` overrides `jwt.access_secret`.
pub fn get_configuration() -> Result<Settings, ConfigError> {
    let settings = config::Config::builder()
        .set_default("application.host", "127.0.0.1")?
        .set_default("application.port", 8080)?
        .set_default("database.url", "sqlite://locate_this.db")?
        .set_default("database.max_connections", 5)?
        .set_default("jwt.access_token_expiry", 7200)?
        .set_default("jwt.refresh_token_expiry", 10800)?
        .set_default("jwt.issuer", "locate_this")?
        .set_default("password.hash_cost", 12)?
        .add_source(config::File::with_name("configuration").required(false))
        .add_source(config::Environment::with_prefix("APP").separator("__"))
        .build()?;
    settings.try_deserialize::<Settings>()
}
