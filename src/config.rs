use std::net::SocketAddr;

use anyhow::Context;

#[derive(Clone, Debug)]
pub struct Config {
    pub addr: SocketAddr,
    pub database_url: String,
    pub jwt_secret: String,
    pub token_ttl_hours: i64,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let port: u16 =
            std::env::var("PORT").unwrap_or_else(|_| "8000".to_string()).parse().context("PORT")?;

        let database_url = std::env::var("DATABASE_URL")
            .unwrap_or_else(|_| "sqlite://kinoteka.db?mode=rwc".to_string());

        let jwt_secret = std::env::var("JWT_SECRET").context("JWT_SECRET must be set")?;

        let token_ttl_hours: i64 =
            std::env::var("TOKEN_TTL_HOURS").ok().and_then(|s| s.parse().ok()).unwrap_or(24);

        Ok(Self {
            addr: format!("{host}:{port}").parse().context("HOST/PORT")?,
            database_url,
            jwt_secret,
            token_ttl_hours,
        })
    }
}
