use crate::workload_api::{error::Error, Config, Result};
use http::header::ACCEPT;
use reqwest::{RequestBuilder, Url};
use serde::Serialize;

pub(super) async fn post<T: Serialize>(
    http_client: &reqwest::Client,
    config: &Config,
    url_path: &str,
    content: &T,
) -> Result<()> {
    let url = gen_url(config, url_path)?;
    let request_builder = http_client
        .post(url)
        .with_auth(config)
        .header(ACCEPT, "application/json")
        .json(content);

    let response = request_builder.send().await?;

    if !response.status().is_success() {
        return Err(Error::BadResponse {
            status: response.status(),
            headers: response.headers().clone(),
            body: response.text().await?,
        });
    }

    Ok(())
}

trait Authenticated {
    fn with_auth(self, config: &Config) -> Self;
}

impl Authenticated for RequestBuilder {
    fn with_auth(self, config: &Config) -> Self {
        self.bearer_auth(&config.api_token)
    }
}

fn gen_url(config: &Config, path: &str) -> Result<Url> {
    let url = format!("{}{}", config.address, path);
    Url::parse(&url).map_err(|e| Error::InvalidUrl { source: e, url })
}
