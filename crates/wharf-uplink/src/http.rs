//! HTTP implementation of [`UplinkClient`].

use std::time::Duration;

use tracing::debug;
use ureq::{
    http::{
        header::{CONTENT_LENGTH, CONTENT_RANGE, ETAG, IF_NONE_MATCH},
        HeaderMap, Response, StatusCode,
    },
    Agent, Body,
};
use url::Url;
use wharf_config::UplinkConfig;

use crate::{
    client::{FetchOutcome, RemoteStream, UplinkClient},
    error::{Result, UplinkError},
    http_client::{apply_headers, ClientConfig},
};

/// An uplink registry reached over HTTP.
pub struct HttpUplink {
    id: String,
    base: Url,
    max_age: Duration,
    agent: Agent,
    headers: Option<HeaderMap>,
}

impl HttpUplink {
    /// Creates an uplink from its configuration entry.
    pub fn new(config: &UplinkConfig, client: &ClientConfig) -> Result<Self> {
        let base = parse_base(&config.url)?;
        let client = ClientConfig {
            timeout: Some(config.timeout()),
            ..client.clone()
        };

        Ok(Self {
            id: config.name.clone(),
            base,
            max_age: config.max_age(),
            agent: client.build(),
            headers: client.headers,
        })
    }

    /// Synthesizes a throwaway uplink bound to one exact URL.
    ///
    /// Used when a distfile URL matches no configured uplink; such an
    /// uplink can serve only that URL and caches nothing (`max_age` zero).
    pub fn for_url(url: &str, client: &ClientConfig) -> Result<Self> {
        let base = Url::parse(url).map_err(|source| UplinkError::InvalidUrl {
            url: url.to_string(),
            source,
        })?;
        let id = base.host_str().unwrap_or("one-shot").to_string();

        Ok(Self {
            id,
            base,
            max_age: Duration::ZERO,
            agent: client.build(),
            headers: client.headers.clone(),
        })
    }

    fn package_url(&self, name: &str) -> Result<Url> {
        // Scoped names keep their slash encoded on the wire.
        let escaped = name.replace('/', "%2F");
        self.base
            .join(&escaped)
            .map_err(|source| UplinkError::InvalidUrl {
                url: format!("{}{}", self.base, escaped),
                source,
            })
    }
}

impl UplinkClient for HttpUplink {
    fn id(&self) -> &str {
        &self.id
    }

    fn max_age(&self) -> Duration {
        self.max_age
    }

    fn fetch_package(&self, name: &str, etag: Option<&str>) -> Result<FetchOutcome> {
        let url = self.package_url(name)?;
        debug!(uplink = self.id, package = name, "fetching metadata");

        let mut req = apply_headers(self.agent.get(url.as_str()), &self.headers);
        if let Some(etag) = etag {
            req = req.header(IF_NONE_MATCH, etag);
        }

        let mut resp = req.call()?;

        if resp.status() == StatusCode::NOT_MODIFIED {
            return Ok(FetchOutcome::NotModified);
        }

        if !resp.status().is_success() {
            return Err(UplinkError::HttpStatus {
                status: resp.status().as_u16(),
                url: url.to_string(),
            });
        }

        let etag = resp
            .headers()
            .get(ETAG)
            .and_then(|h| h.to_str().ok())
            .map(String::from);

        let body = resp
            .body_mut()
            .read_json()
            .map_err(|err| UplinkError::MalformedResponse(err.to_string()))?;

        Ok(FetchOutcome::Fetched { etag, body })
    }

    fn fetch_url(&self, url: &str) -> Result<RemoteStream> {
        debug!(uplink = self.id, url = url, "opening remote stream");
        let resp = apply_headers(self.agent.get(url), &self.headers).call()?;

        if !resp.status().is_success() {
            return Err(UplinkError::HttpStatus {
                status: resp.status().as_u16(),
                url: url.to_string(),
            });
        }

        let length = content_length(&resp);
        Ok(RemoteStream {
            length,
            reader: Box::new(resp.into_body().into_reader()),
        })
    }

    fn can_fetch_url(&self, url: &str) -> bool {
        url.starts_with(self.base.as_str())
    }

    fn search(&self, startkey: &str) -> Result<serde_json::Value> {
        let mut url = self
            .base
            .join("-/all/since")
            .map_err(|source| UplinkError::InvalidUrl {
                url: format!("{}-/all/since", self.base),
                source,
            })?;
        url.query_pairs_mut()
            .append_pair("stale", "update_after")
            .append_pair("startkey", startkey);

        debug!(uplink = self.id, "proxying search request");
        let mut resp = apply_headers(self.agent.get(url.as_str()), &self.headers).call()?;

        if !resp.status().is_success() && !resp.status().is_redirection() {
            return Err(UplinkError::HttpStatus {
                status: resp.status().as_u16(),
                url: url.to_string(),
            });
        }

        resp.body_mut()
            .read_json()
            .map_err(|err| UplinkError::MalformedResponse(err.to_string()))
    }
}

/// Total payload size from `Content-Range` (after the final '/') or
/// `Content-Length`, when either is present and parseable.
fn content_length(resp: &Response<Body>) -> Option<u64> {
    resp.headers()
        .get(CONTENT_RANGE)
        .and_then(|h| h.to_str().ok())
        .and_then(|range| range.rsplit_once('/').and_then(|(_, tot)| tot.parse().ok()))
        .or_else(|| {
            resp.headers()
                .get(CONTENT_LENGTH)
                .and_then(|h| h.to_str().ok())
                .and_then(|len| len.parse().ok())
        })
}

/// Parses an uplink base URL, forcing a trailing slash so joins append
/// instead of replacing the last path segment.
fn parse_base(url: &str) -> Result<Url> {
    let normalized = if url.ends_with('/') {
        url.to_string()
    } else {
        format!("{url}/")
    };
    Url::parse(&normalized).map_err(|source| UplinkError::InvalidUrl {
        url: url.to_string(),
        source,
    })
}
