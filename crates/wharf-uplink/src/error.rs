//! Per-uplink error type.
//!
//! An [`UplinkError`] describes the outcome of one call to one uplink. It is
//! informational for read paths (carried alongside results, never fatal on
//! its own) and only escalates when it changes an existence verdict.

use miette::Diagnostic;
use thiserror::Error;

#[derive(Error, Diagnostic, Debug)]
pub enum UplinkError {
    #[error(transparent)]
    #[diagnostic(
        code(wharf_uplink::network),
        help("Check your network connection or try again later")
    )]
    Network(#[from] Box<ureq::Error>),

    #[error("HTTP {status}: {url}")]
    #[diagnostic(code(wharf_uplink::http_status))]
    HttpStatus { status: u16, url: String },

    #[error("Invalid URL: {url}")]
    #[diagnostic(code(wharf_uplink::invalid_url))]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("Malformed response from uplink: {0}")]
    #[diagnostic(
        code(wharf_uplink::malformed_response),
        help("The uplink returned data that does not match the registry schema")
    )]
    MalformedResponse(String),

    #[error(transparent)]
    #[diagnostic(code(wharf_uplink::io))]
    Io(#[from] std::io::Error),
}

impl UplinkError {
    /// HTTP status carried by this error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::HttpStatus { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// True when the uplink positively confirmed the resource is absent.
    ///
    /// Anything else (timeout, 5xx, malformed payload) means the source
    /// could not be verified, which some callers treat differently.
    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }

    /// True when the uplink answered but its payload failed validation.
    ///
    /// The source was reachable; it just did not say anything usable. Write
    /// paths treat this as silence, not as an unverifiable source.
    pub fn is_malformed(&self) -> bool {
        matches!(self, Self::MalformedResponse(_))
    }
}

impl From<ureq::Error> for UplinkError {
    fn from(err: ureq::Error) -> Self {
        Self::Network(Box::new(err))
    }
}

/// A specialized Result type for uplink operations.
pub type Result<T> = std::result::Result<T, UplinkError>;
