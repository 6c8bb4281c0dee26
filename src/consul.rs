pub mod kv;
mod request;

use anyhow::{Context, Result};
use reqwest::ClientBuilder;
use std::time::Duration;

#[derive(Debug)]
pub struct Client {
    config: Config,
    http_client: reqwest::Client,
}

impl Client {
    pub fn new(config: Config) -> Result<Self> {
        Ok(Self {
            http_client: ClientBuilder::new().timeout(config.request_timeout).build()?,
            config,
        })
    }
}

#[derive(Clone, Debug)]
pub struct Config {
    pub address: String,
    pub datacenter: Option<String>,
    pub token: Option<String>,
    pub request_timeout: Duration,
}

#[derive(Clone, Debug, Default)]
pub struct ConfigBuilder {
    address: Option<String>,
    datacenter: Option<String>,
    token: Option<String>,
    request_timeout: Option<Duration>,
}

impl Config {
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }
}

impl ConfigBuilder {
    pub fn address(mut self, address: String) -> Self {
        self.address = Some(address);
        self
    }

    pub fn datacenter(mut self, datacenter: String) -> Self {
        self.datacenter = Some(datacenter);
        self
    }

    pub fn token(mut self, token: String) -> Self {
        self.token = Some(token);
        self
    }

    pub fn request_timeout(mut self, request_timeout: Duration) -> Self {
        self.request_timeout = Some(request_timeout);
        self
    }

    pub fn build(self) -> Result<Config> {
        Ok(Config {
            address: self
                .address
                .map(|a| a.trim_end_matches('/').to_owned())
                .with_context(|| "Missing address")?,
            datacenter: self.datacenter,
            token: self.token,
            request_timeout: self.request_timeout.unwrap_or(Duration::from_secs(10)),
        })
    }
}
