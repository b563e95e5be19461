//! Shared outbound HTTP plumbing

use reqwest::{Client, Response};

use crate::config::HttpConfig;
use crate::{Error, Result};

/// Build the HTTP client used by every upstream integration
pub fn build_client(config: &HttpConfig) -> Result<Client> {
    Client::builder()
        .timeout(config.timeout)
        .user_agent(config.user_agent.clone())
        .build()
        .map_err(Error::Http)
}

/// Turn a non-2xx response into [`Error::Upstream`]
pub fn ensure_success(service: &'static str, response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        Ok(response)
    } else {
        Err(Error::Upstream {
            service,
            status: status.as_u16(),
        })
    }
}
