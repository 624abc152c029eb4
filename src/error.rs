use thiserror::Error;

/// Boxed cause kept on the error chain.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Every failure mode exposed by the crate.
///
/// The six kinds map to distinct phases of a completion call: configuration,
/// request construction, transport, vendor-reported API failures, response
/// decoding, and mid-stream parsing. Each variant keeps its cause so callers
/// can walk the chain with [`std::error::Error::source`].
#[derive(Debug, Error)]
pub enum LlmError {
    /// Missing API key, unknown provider type, invalid model for thinking
    /// mode. Surfaced at construction or on the first call; never retryable.
    #[error("config error: {message}")]
    Config {
        message: String,
        #[source]
        source: Option<BoxError>,
    },

    /// Serialization failure or an invalid tool schema while building the
    /// request body.
    #[error("request error: failed to {stage} request")]
    Request {
        stage: &'static str,
        #[source]
        source: Option<BoxError>,
    },

    /// Transport-level failure before any HTTP status arrived: DNS,
    /// connection refused, read error before headers.
    #[error("http error: {message}")]
    Http {
        message: String,
        #[source]
        source: Option<BoxError>,
    },

    /// The vendor answered with HTTP status >= 400.
    #[error(transparent)]
    Api(#[from] ApiError),

    /// A complete response body failed to decode.
    #[error("response error: {message}")]
    Response {
        message: String,
        #[source]
        source: Option<BoxError>,
    },

    /// Parser-internal failure after the stream started. Callers normally see
    /// this as an [`crate::types::Event::Error`] on the channel instead.
    #[error("stream error: {message}")]
    Stream {
        message: String,
        #[source]
        source: Option<BoxError>,
    },
}

impl LlmError {
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
            source: None,
        }
    }

    pub fn config_with(message: impl Into<String>, source: impl Into<BoxError>) -> Self {
        Self::Config {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    pub fn request(stage: &'static str, source: impl Into<BoxError>) -> Self {
        Self::Request {
            stage,
            source: Some(source.into()),
        }
    }

    pub fn http(message: impl Into<String>, source: Option<BoxError>) -> Self {
        Self::Http {
            message: message.into(),
            source,
        }
    }

    pub fn response(message: impl Into<String>, source: impl Into<BoxError>) -> Self {
        Self::Response {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    pub fn stream(message: impl Into<String>, source: Option<BoxError>) -> Self {
        Self::Stream {
            message: message.into(),
            source,
        }
    }

    /// Returns the inner [`ApiError`] when this is a vendor API failure.
    pub fn as_api(&self) -> Option<&ApiError> {
        match self {
            LlmError::Api(api) => Some(api),
            _ => None,
        }
    }

    /// HTTP status code for API failures, `None` otherwise.
    pub fn status(&self) -> Option<u16> {
        self.as_api().map(|api| api.status)
    }

    /// True iff this is an [`ApiError`] with a transient status
    /// (429, 500, 502, 503, 504).
    pub fn is_retryable(&self) -> bool {
        self.as_api().is_some_and(ApiError::is_retryable)
    }
}

/// Vendor-reported API failure (HTTP status >= 400).
#[derive(Debug, Clone)]
pub struct ApiError {
    pub status: u16,
    /// Provider tag, e.g. `openrouter` or `anthropic`.
    pub provider: String,
    /// `X-Request-ID` response header when the vendor sent one.
    pub request_id: Option<String>,
    /// Vendor-specific error code extracted from the body when available.
    pub error_code: Option<String>,
    /// Raw response body, kept verbatim for debugging.
    pub body: String,
}

impl ApiError {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            provider: String::new(),
            request_id: None,
            error_code: None,
            body: body.into(),
        }
    }

    pub fn with_provider(mut self, provider: impl Into<String>) -> Self {
        self.provider = provider.into();
        self
    }

    pub fn with_request_id(mut self, request_id: impl Into<String>) -> Self {
        self.request_id = Some(request_id.into());
        self
    }

    pub fn with_error_code(mut self, code: impl Into<String>) -> Self {
        self.error_code = Some(code.into());
        self
    }

    /// Rate limits and transient server failures are worth retrying; every
    /// 4xx other than 429 is not.
    pub fn is_retryable(&self) -> bool {
        self.status == 429 || (500..=504).contains(&self.status)
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "api error: status {}", self.status)?;
        if !self.provider.is_empty() {
            write!(f, " from {}", self.provider)?;
        }
        if let Some(request_id) = &self.request_id {
            write!(f, " (request_id: {request_id})")?;
        }
        Ok(())
    }
}

impl std::error::Error for ApiError {}
