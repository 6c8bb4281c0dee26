use crate::config::{self, Deregistration};
use crate::RetryPolicy;

#[derive(Clone, Debug, Default)]
pub struct Config {
    pub deregistration: Deregistration,
    pub force_close_on_timeout: bool,
    pub store_retry: RetryPolicy,
}

impl From<&config::Drain> for Config {
    fn from(drain: &config::Drain) -> Self {
        Self {
            deregistration: drain.deregistration,
            force_close_on_timeout: drain.force_close_on_timeout,
            store_retry: drain.store_retry.clone(),
        }
    }
}
