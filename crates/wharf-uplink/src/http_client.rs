use std::time::Duration;

use ureq::{http::HeaderMap, Agent, Proxy, RequestBuilder};

/// Settings for building the HTTP agent behind one uplink.
///
/// Each uplink carries its own agent so per-uplink timeouts apply to every
/// request made through it.
#[derive(Clone, Debug)]
pub struct ClientConfig {
    pub user_agent: String,
    pub headers: Option<HeaderMap>,
    pub proxy: Option<Proxy>,
    pub timeout: Option<Duration>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            user_agent: "wharf".into(),
            headers: None,
            proxy: None,
            timeout: None,
        }
    }
}

impl ClientConfig {
    /// Builds an HTTP `Agent` from this configuration.
    ///
    /// Non-success statuses are reported on the response, not as transport
    /// errors, so callers can distinguish 304/404/5xx explicitly.
    pub fn build(&self) -> Agent {
        ureq::Agent::config_builder()
            .proxy(self.proxy.clone())
            .timeout_global(self.timeout)
            .user_agent(&self.user_agent)
            .http_status_as_error(false)
            .build()
            .into()
    }
}

/// Applies configured static headers (auth tokens and the like) to a
/// request.
pub fn apply_headers<B>(
    mut req: RequestBuilder<B>,
    headers: &Option<HeaderMap>,
) -> RequestBuilder<B> {
    if let Some(headers) = headers {
        for (key, value) in headers.iter() {
            req = req.header(key, value);
        }
    }
    req
}
