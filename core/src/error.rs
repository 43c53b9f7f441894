use std::time::Duration;

/// Failure talking to the data gateway (HTTP or network).
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// The gateway answered with a non-success status.
    #[error("gateway {endpoint} returned {status}: {message}")]
    Status {
        /// Endpoint path that failed.
        endpoint: String,
        /// HTTP status code.
        status: u16,
        /// Response body or reason phrase.
        message: String,
    },
    /// The request never produced a response.
    #[error("gateway {endpoint} unreachable: {reason}")]
    Transport {
        /// Endpoint path that failed.
        endpoint: String,
        /// Underlying client error.
        reason: String,
    },
    /// The response body did not match the expected envelope.
    #[error("gateway {endpoint} sent an unreadable body: {reason}")]
    Decode {
        /// Endpoint path that failed.
        endpoint: String,
        /// Decoder message.
        reason: String,
    },
}

/// Text-completion failure, including unparseable structured output.
#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    /// The request never produced a response.
    #[error("generation request failed: {reason}")]
    Request {
        /// Underlying client error.
        reason: String,
    },
    /// The service answered with a non-success status.
    #[error("generation service returned {status}: {message}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Response body.
        message: String,
    },
    /// The service answered but produced no text.
    #[error("generation returned no text")]
    Empty,
    /// Structured output could not be parsed.
    #[error("could not parse generated {what}: {reason}")]
    Unparseable {
        /// What we were trying to parse.
        what: &'static str,
        /// Parser message.
        reason: String,
    },
}

/// Speech synthesis or audio upload failure. Always non-fatal for callers.
#[derive(Debug, thiserror::Error)]
pub enum SpeechError {
    /// No speech endpoint is configured.
    #[error("speech synthesis disabled")]
    Disabled,
    /// The request never produced a response.
    #[error("speech request failed: {reason}")]
    Request {
        /// Underlying client error.
        reason: String,
    },
    /// The service answered with a non-success status.
    #[error("speech service returned {status}: {message}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Response body.
        message: String,
    },
    /// The service answered without an audio location.
    #[error("speech service returned no audio url")]
    MissingUrl,
}

/// Generated output that failed a domain check.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ValidationError {
    /// The animation is not part of the configured catalog.
    #[error("animation {value:?} is not in the catalog")]
    UnknownAnimation {
        /// Raw value as generated.
        value: String,
    },
}

/// Everything a job body can fail with. Logged by the scheduler, never rethrown.
#[derive(Debug, thiserror::Error)]
pub enum JobError {
    /// Data gateway failure.
    #[error(transparent)]
    Gateway(#[from] GatewayError),
    /// Generation failure.
    #[error(transparent)]
    Generation(#[from] GenerationError),
    /// Speech failure that escaped the inner no-audio boundary.
    #[error(transparent)]
    Speech(#[from] SpeechError),
    /// Validation failure.
    #[error(transparent)]
    Validation(#[from] ValidationError),
    /// Memory or KV store failure.
    #[error("memory store: {0:#}")]
    Store(#[from] anyhow::Error),
    /// The job did not finish within its time budget.
    #[error("job timed out after {0:?}")]
    Timeout(Duration),
    /// Some items of a batch failed; the rest were processed.
    #[error("{failed} of {total} items failed")]
    Partial {
        /// Failed item count.
        failed: usize,
        /// Batch size.
        total: usize,
    },
}

impl JobError {
    /// Whether this failure came from the timeout wrapper.
    pub fn is_timeout(&self) -> bool {
        matches!(self, JobError::Timeout(_))
    }
}
