use crate::consul::request::{get_vec, put_raw};
use crate::consul::Client;
use anyhow::{Context, Result};
use async_trait::async_trait;
use base64::Engine;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[allow(non_snake_case)]
#[derive(Clone, Default, Eq, PartialEq, Serialize, Deserialize, Debug)]
#[serde(default)]
pub struct KVPair {
    pub Key: String,
    pub CreateIndex: Option<u64>,
    pub ModifyIndex: Option<u64>,
    pub LockIndex: Option<u64>,
    pub Flags: Option<u64>,
    pub Value: Option<String>,
    pub Session: Option<String>,
}

impl KVPair {
    /// Decodes the base64 encoded value; keys without a value yield `None`.
    pub fn decoded_value(&self) -> Result<Option<String>> {
        self.Value
            .as_ref()
            .map(|v| {
                let bytes = base64::engine::general_purpose::STANDARD
                    .decode(v)
                    .with_context(|| format!("Failed to decode value of {}", self.Key))?;

                String::from_utf8(bytes)
                    .with_context(|| format!("Value of {} is not valid UTF-8", self.Key))
            })
            .transpose()
    }
}

#[async_trait]
pub trait KV {
    async fn list(&self, prefix: &str) -> Result<Vec<KVPair>>;

    async fn put(&self, key: &str, value: String) -> Result<bool>;
}

#[async_trait]
impl KV for Client {
    async fn list(&self, prefix: &str) -> Result<Vec<KVPair>> {
        let mut params = HashMap::new();
        params.insert("recurse".into(), "true".into());

        let path = format!("/v1/kv/{}", prefix);
        get_vec(&self.http_client, &self.config, &path, params).await
    }

    async fn put(&self, key: &str, value: String) -> Result<bool> {
        let path = format!("/v1/kv/{}", key);
        put_raw(&self.http_client, &self.config, &path, value, HashMap::new()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kv_pair_decoding() -> Result<()> {
        let pairs: Vec<KVPair> = serde_json::from_str(
            r#"[
                {"Key": "drain/n1/active_connections", "Value": "MTI=", "ModifyIndex": 7},
                {"Key": "drain/n1/", "Value": null}
            ]"#,
        )?;

        assert_eq!(Some("12".to_owned()), pairs[0].decoded_value()?);
        assert_eq!(Some(7), pairs[0].ModifyIndex);
        assert_eq!(None, pairs[1].decoded_value()?);

        Ok(())
    }

    #[test]
    fn test_kv_pair_with_invalid_base64() {
        let pair = KVPair {
            Key: "drain/n1/status".into(),
            Value: Some("not base64!".into()),
            ..Default::default()
        };

        assert!(pair.decoded_value().is_err());
    }
}
