use serde::Deserialize;
use config::{Config, ConfigError, Environment, File};

#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub payhere: PayHereConfig,
    #[serde(default)]
    pub email: EmailConfig,
    #[serde(default)]
    pub cart: CartConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub base_url: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct PayHereConfig {
    pub merchant_id: String,
    pub merchant_secret: String,
    #[serde(default)]
    pub sandbox: bool,
    pub currency: String,
    /// Lets the browser return path complete a payment still left PENDING
    /// when the server-to-server notification never arrived.
    #[serde(default = "default_true")]
    pub return_fallback_enabled: bool,
}

#[derive(Debug, Deserialize, Clone)]
pub struct EmailConfig {
    #[serde(default)]
    pub enabled: bool,
    pub smtp_host: Option<String>,
    #[serde(default = "default_smtp_port")]
    pub smtp_port: u16,
    pub smtp_username: Option<String>,
    pub smtp_password: Option<String>,
    pub from_address: String,
    /// Await delivery instead of spawning it onto a background task.
    #[serde(default)]
    pub deliver_inline: bool,
}

#[derive(Debug, Deserialize, Clone)]
pub struct CartConfig {
    #[serde(default = "default_true")]
    pub expiry_enabled: bool,
    #[serde(default = "default_cart_ttl")]
    pub ttl_minutes: i64,
}

/// Value shipped in sample configuration; never a real merchant secret.
pub const PLACEHOLDER_MERCHANT_SECRET: &str = "change-me-in-production";

fn default_true() -> bool {
    true
}

fn default_smtp_port() -> u16 {
    587
}

fn default_cart_ttl() -> i64 {
    60
}

impl Default for EmailConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            smtp_host: None,
            smtp_port: default_smtp_port(),
            smtp_username: None,
            smtp_password: None,
            from_address: "Archalley <noreply@archalley.com>".to_string(),
            deliver_inline: false,
        }
    }
}

impl Default for CartConfig {
    fn default() -> Self {
        Self {
            expiry_enabled: true,
            ttl_minutes: default_cart_ttl(),
        }
    }
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        let config = Config::builder()
            // Start with default values
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 8080)?
            .set_default("server.base_url", "http://localhost:8080")?
            .set_default("database.url", "sqlite://archalley.db?mode=rwc")?
            .set_default("database.max_connections", 10)?
            .set_default("payhere.sandbox", true)?
            .set_default("payhere.currency", "LKR")?
            .set_default("payhere.return_fallback_enabled", true)?
            .set_default("email.enabled", false)?
            .set_default("email.from_address", "Archalley <noreply@archalley.com>")?
            .set_default("cart.expiry_enabled", true)?
            .set_default("cart.ttl_minutes", 60)?

            // Add config file if it exists
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false))

            // Add environment variables (with ARCHALLEY__ prefix, double underscore separates levels)
            .add_source(Environment::with_prefix("ARCHALLEY").separator("__"))

            .build()?;

        config.try_deserialize()
    }

    /// Checks that must pass before the server accepts gateway traffic.
    /// Notification signatures are only as good as the merchant secret.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let secret = self.payhere.merchant_secret.trim();
        if secret.is_empty() || secret == PLACEHOLDER_MERCHANT_SECRET {
            return Err(ConfigError::Message(
                "payhere.merchant_secret is not set; configure ARCHALLEY__PAYHERE__MERCHANT_SECRET"
                    .to_string(),
            ));
        }

        if self.payhere.merchant_id.trim().is_empty() {
            return Err(ConfigError::Message("payhere.merchant_id is not set".to_string()));
        }

        Ok(())
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 8080,
                base_url: "http://localhost:8080".to_string(),
            },
            database: DatabaseConfig {
                url: "sqlite://archalley.db?mode=rwc".to_string(),
                max_connections: 10,
            },
            payhere: PayHereConfig {
                merchant_id: "1211149".to_string(),
                merchant_secret: String::new(),
                sandbox: true,
                currency: "LKR".to_string(),
                return_fallback_enabled: true,
            },
            email: EmailConfig::default(),
            cart: CartConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn with_secret(secret: &str) -> Settings {
        let mut settings = Settings::default();
        settings.payhere.merchant_secret = secret.to_string();
        settings
    }

    #[test]
    fn test_default_settings_are_rejected() {
        assert!(Settings::default().validate().is_err());
    }

    #[test]
    fn test_placeholder_secret_is_rejected() {
        assert!(with_secret(PLACEHOLDER_MERCHANT_SECRET).validate().is_err());
        assert!(with_secret("   ").validate().is_err());
    }

    #[test]
    fn test_real_secret_is_accepted() {
        assert!(with_secret("MzQ1NjcxOTgyMzQ1Njc4OTIzNDU2Nzg5").validate().is_ok());
    }

    #[test]
    fn test_merchant_id_is_required() {
        let mut settings = with_secret("MzQ1NjcxOTgyMzQ1Njc4OTIzNDU2Nzg5");
        settings.payhere.merchant_id = String::new();
        assert!(settings.validate().is_err());
    }
}
