use anyhow::{Context, Result};
use dotenvy::dotenv;
use secrecy::Secret;
use serde::Deserialize;
use std::env;

#[derive(Deserialize, Clone, Debug)]
pub struct Config {
    pub server: ServerConfig,
    pub supabase: SupabaseConfig,
    pub service_name: String,
}

#[derive(Deserialize, Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Deserialize, Clone, Debug)]
pub struct SupabaseConfig {
    pub url: String,
    pub key: Secret<String>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv().ok();

        let host = env::var("GATEWAY_HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let port = env::var("GATEWAY_PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse()?;

        // Store credentials are required; without them the process must not start.
        let supabase_url = env::var("SUPABASE_URL").context("SUPABASE_URL must be set")?;
        let supabase_key = env::var("SUPABASE_KEY").context("SUPABASE_KEY must be set")?;

        Ok(Self {
            server: ServerConfig { host, port },
            supabase: SupabaseConfig {
                url: supabase_url,
                key: Secret::new(supabase_key),
            },
            service_name: "gateway-service".to_string(),
        })
    }
}
