// Service configuration, loaded with the 'config' crate layered over .env.

use anyhow::Result;
use config::{Config, Environment, File};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct Settings {
    pub server_address: String,
    /// Base URL of the availability/pricing API, e.g. "https://api.hostaway.com/v1".
    pub hostaway_base_url: String,
    pub hostaway_account_id: Option<String>,
    pub hostaway_api_secret: Option<String>,
    pub webflow_api_token: Option<String>,
    pub webflow_collection_id: Option<String>,
    pub webflow_site_id: Option<String>,
    /// Base URL guests are redirected to when reserving.
    pub checkout_base_url: String,
}

impl Settings {
    pub fn new() -> Result<Self> {
        dotenv::dotenv().ok(); // Load .env file if present

        let builder = Config::builder()
            .set_default("server_address", "127.0.0.1:3000")?
            .set_default("hostaway_base_url", "https://api.hostaway.com/v1")?
            .set_default(
                "checkout_base_url",
                "https://properties.triadvacationrentals.com",
            )?
            // Load from a configuration file (e.g., config.toml)
            .add_source(File::with_name("config").required(false))
            // Load from environment variables (e.g., APP_HOSTAWAY_API_SECRET)
            .add_source(Environment::with_prefix("APP"));

        let settings = builder.build()?.try_deserialize()?;
        Ok(settings)
    }
}
