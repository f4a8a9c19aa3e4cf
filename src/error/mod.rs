//! Error definitions
//!
//! Every failure raised by the engine is local and synchronous. None of them is
//! retryable: each one means either a misused API or an unmet expectation.

use std::sync::Arc;

use thiserror::Error;

/// Main error type for mockkit
#[derive(Error, Debug, Clone)]
pub enum Error {
    /// A strict mock received a call that no template matches.
    #[error("Call not mocked: {0}")]
    CallNotMocked(String),

    /// A call reached a mock while its templates were being modified, or a
    /// mock was bound to two recording sessions at once.
    #[error(
        "Concurrent templating detected: a mock was called while its templates were being \
         modified, or was bound to a second recording scope"
    )]
    ConcurrentTemplating,

    /// Some, but not all, elements of a spread vararg were given explicit matchers.
    #[error("Varargs ambiguity detected: use explicit matchers for every vararg element or wildcard matchers")]
    VarargAmbiguity,

    /// A vararg pattern contains more than one wildcard matcher.
    #[error("Multiple vararg generic matchers in a single vararg pattern")]
    MultipleVarargWildcards,

    /// Several matchers were left for one non-vararg parameter.
    #[error("Multiple matchers for single argument `{0}`")]
    MultipleMatchersForSingleArg(String),

    /// A composite matcher needed more operands than were recorded.
    #[error("Missing matchers for composite matcher on argument `{0}`")]
    MissingArgMatchers(String),

    /// A spread vararg value was not a sequence.
    #[error("Expected a sequence, but {0} encountered")]
    NotASequence(String),

    /// Assertion failure raised by a verifier.
    #[error("Verification failed: {0}")]
    VerificationFailed(String),

    /// A stubbing block finished without recording any mock call.
    #[error("No mock calls recorded inside the block")]
    NoCallsRecorded,

    /// A suspending answer was resolved for a blocking call.
    #[error("Suspending answer used for blocking call `{0}`")]
    SuspendAnswerInBlockingCall(String),

    /// The answer requested a supertype implementation that the call did not carry.
    #[error("Super call to `{0}` is not available for this call")]
    SuperCallNotAvailable(String),

    /// The object is not a registered mock of this context.
    #[error("Object is not a mock: {0}")]
    ObjectNotMocked(String),

    /// Error raised by a `Throws` answer or by an answer closure.
    #[error(transparent)]
    Thrown(Arc<dyn std::error::Error + Send + Sync>),
}

impl Error {
    /// Create a verification failure.
    #[must_use]
    pub fn verification_failed(message: impl Into<String>) -> Self {
        Self::VerificationFailed(message.into())
    }

    /// Wrap a user error so it can be thrown from an answer.
    #[must_use]
    pub fn thrown<E>(error: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Thrown(Arc::new(error))
    }

    /// Returns `true` for the failures a verifier raises.
    #[must_use]
    pub fn is_verification_failure(&self) -> bool {
        matches!(self, Self::VerificationFailed(_))
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;
