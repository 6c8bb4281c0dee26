use crate::consul::Config;
use anyhow::{anyhow, Context, Result};
use reqwest::{Client as HttpClient, RequestBuilder, StatusCode, Url};
use serde::de::DeserializeOwned;
use std::collections::HashMap;

/// GET a list endpoint; Consul answers 404 for prefixes without keys, which yields an empty list.
pub async fn get_vec<R: DeserializeOwned>(
    http_client: &HttpClient,
    config: &Config,
    path: &str,
    mut params: HashMap<String, String>,
) -> Result<Vec<R>> {
    params.fill_datacenter(config);

    let url = gen_url(config, path, &params)?;
    let response = http_client.get(url).with_token(config).send().await?;

    if response.status() == StatusCode::NOT_FOUND {
        return Ok(vec![]);
    }

    let response = ensure_success(response).await?;
    response
        .json()
        .await
        .with_context(|| "Failed to parse JSON response")
}

/// PUT a raw, non JSON encoded body.
pub async fn put_raw<R: DeserializeOwned>(
    http_client: &HttpClient,
    config: &Config,
    path: &str,
    body: String,
    params: HashMap<String, String>,
) -> Result<R> {
    let req = |http_client: &HttpClient, url: Url| -> RequestBuilder { http_client.put(url) };

    write_with_body(http_client, config, path, body, params, req).await
}

async fn write_with_body<R: DeserializeOwned, F>(
    http_client: &HttpClient,
    config: &Config,
    path: &str,
    body: String,
    mut params: HashMap<String, String>,
    req: F,
) -> Result<R>
where
    F: Fn(&HttpClient, Url) -> RequestBuilder,
{
    params.fill_datacenter(config);

    let url = gen_url(config, path, &params)?;
    let builder = req(http_client, url).with_token(config).body(body);

    let response = ensure_success(builder.send().await?).await?;

    response
        .json()
        .await
        .with_context(|| "Failed to parse JSON Response")
}

fn gen_url(config: &Config, path: &str, params: &HashMap<String, String>) -> Result<Url> {
    let url = format!("{}{}", config.address, path);
    Url::parse_with_params(&url, params.iter())
        .with_context(|| format!("Failed to parse URL: {}", url))
}

async fn ensure_success(response: reqwest::Response) -> Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    Err(anyhow!(
        "Consul responded with status {} and body {:?}",
        status,
        body
    ))
}

trait Authenticated {
    fn with_token(self, config: &Config) -> Self;
}

impl Authenticated for RequestBuilder {
    fn with_token(self, config: &Config) -> Self {
        match &config.token {
            Some(token) => self.header("X-Consul-Token", token),
            None => self,
        }
    }
}

trait Fillable {
    fn fill_datacenter(&mut self, config: &Config);
}

impl Fillable for HashMap<String, String> {
    fn fill_datacenter(&mut self, config: &Config) {
        if let Some(dc) = &config.datacenter {
            self.insert("dc".into(), dc.into());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn config(datacenter: Option<&str>) -> Config {
        Config {
            address: "http://127.0.0.1:8500".into(),
            datacenter: datacenter.map(String::from),
            token: None,
            request_timeout: Duration::from_secs(1),
        }
    }

    #[test]
    fn test_datacenter_is_filled_from_config() {
        let mut params: HashMap<String, String> = HashMap::new();
        params.fill_datacenter(&config(Some("dc1")));
        assert_eq!(Some(&"dc1".to_owned()), params.get("dc"));

        let mut params: HashMap<String, String> = HashMap::new();
        params.fill_datacenter(&config(None));
        assert!(params.is_empty());
    }

    #[test]
    fn test_url_generation() -> Result<()> {
        let mut params = HashMap::new();
        params.insert("recurse".to_owned(), "true".to_owned());

        let url = gen_url(&config(None), "/v1/kv/drain/n1/", &params)?;
        assert_eq!("http://127.0.0.1:8500/v1/kv/drain/n1/?recurse=true", url.as_str());

        Ok(())
    }
}
