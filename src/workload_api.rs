//! Client of the workload management API that stops workloads and manages routing targets.

pub mod error;
mod request;
pub mod workloads;

use reqwest::ClientBuilder;
use std::time::Duration;

pub type Result<T> = std::result::Result<T, error::Error>;

#[derive(Debug)]
pub struct Client {
    config: Config,
    http_client: reqwest::Client,
}

#[derive(Debug, Clone)]
pub struct Config {
    address: String,
    api_token: String,
}

impl Client {
    pub fn builder() -> Builder {
        Builder::default()
    }
}

#[derive(Clone, Debug, Default)]
pub struct Builder {
    address: Option<String>,
    api_token: Option<String>,
    request_timeout: Option<Duration>,
}

impl Builder {
    pub fn address(mut self, address: String) -> Self {
        self.address = Some(address);
        self
    }

    pub fn api_token(mut self, api_token: String) -> Self {
        self.api_token = Some(api_token);
        self
    }

    pub fn request_timeout(mut self, request_timeout: Duration) -> Self {
        self.request_timeout = Some(request_timeout);
        self
    }

    pub fn build(self) -> Result<Client> {
        use error::Error::*;

        Ok(Client {
            config: Config {
                address: self
                    .address
                    .map(|a| a.trim_end_matches('/').to_owned())
                    .ok_or(MissingConfig("address"))?,
                api_token: self.api_token.ok_or(MissingConfig("api_token"))?,
            },
            http_client: ClientBuilder::new()
                .timeout(self.request_timeout.unwrap_or(Duration::from_secs(30)))
                .build()?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_requires_token() {
        let result = Client::builder()
            .address("http://workloads.internal".into())
            .build();

        assert!(matches!(
            result,
            Err(error::Error::MissingConfig("api_token"))
        ));
    }

    #[test]
    fn test_builder_trims_address() -> Result<()> {
        let client = Client::builder()
            .address("http://workloads.internal/".into())
            .api_token("secret".into())
            .build()?;

        assert_eq!("http://workloads.internal", client.config.address);

        Ok(())
    }
}
