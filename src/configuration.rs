use config::{Config, Environment, File, FileFormat};
use serde::Deserialize;

#[derive(Deserialize, Clone, Debug)]
pub struct Settings {
    pub application_host: String,
    pub application_port: u16,
    pub frontend_url: String,
    pub database: Option<DatabaseSettings>,
    pub email: Option<EmailSettings>,
    pub credentials: CredentialSettings,
}

#[derive(Deserialize, Clone, Debug)]
pub struct DatabaseSettings {
    pub user_name: String,
    pub password: String,
    pub host: String,
    pub port: u16,
    pub database_name: String,
}

impl DatabaseSettings {
    pub fn connection_string(&self) -> String {
        format!(
            "postgresql://{}:{}@{}:{}/{}",
            self.user_name, self.password, self.host, self.port, self.database_name
        )
    }
}

#[derive(Deserialize, Clone, Debug)]
pub struct EmailSettings {
    pub smtp_host: String,
    pub smtp_port: u16,
    /// Use an implicit TLS relay; plain SMTP otherwise (local catchers like mailhog).
    pub tls: bool,
    pub sender: String,
    pub username: Option<String>,
    pub password: Option<String>,
}

#[derive(Deserialize, Clone, Debug)]
pub struct CredentialSettings {
    /// Where to send the browser after a reset request or a completed reset.
    pub reset_password_redirect: String,
    pub after_activate_url: String,
    pub after_login_url: String,
    #[serde(default)]
    pub login_after_activation: bool,
    #[serde(default = "default_reset_token_ttl_minutes")]
    pub reset_token_ttl_minutes: i64,
    #[serde(default = "default_session_ttl_days")]
    pub session_ttl_days: i64,
}

fn default_reset_token_ttl_minutes() -> i64 {
    10
}

fn default_session_ttl_days() -> i64 {
    7
}

/// Loads `<filename>.json`, then lets `APP__SECTION__KEY` variables override it.
pub fn get_configuration(filename: &str) -> Result<Settings, config::ConfigError> {
    let mut builder = Config::builder();
    builder = builder.add_source(File::new(filename, FileFormat::Json));
    builder = builder.add_source(
        Environment::with_prefix("APP")
            .prefix_separator("__")
            .separator("__"),
    );
    let config = builder.build()?;
    config.try_deserialize()
}
