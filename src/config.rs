use dotenvy::dotenv;
use serde::Deserialize;
use std::env;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server_port: u16,
    pub database_url: String,
    pub environment: String,
    /// Seed values for the merchant configuration singleton; used only when
    /// the row does not exist yet.
    pub merchant_receive_address: String,
    pub merchant_signing_secret: String,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenv().ok(); // Load .env file if present

        Ok(Config {
            server_port: env::var("SERVER_PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse()?,
            database_url: env::var("DATABASE_URL")?,
            environment: env::var("APP_ENVIRONMENT").unwrap_or_else(|_| "development".to_string()),
            merchant_receive_address: env::var("MERCHANT_RECEIVE_ADDRESS")
                .unwrap_or_else(|_| "merchant@upi".to_string()),
            merchant_signing_secret: env::var("MERCHANT_SIGNING_SECRET")?,
        })
    }
}
