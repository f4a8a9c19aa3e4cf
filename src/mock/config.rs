use crate::answering::MockMode;
use crate::verify::VerifyMode;

/// Configuration of a [`MockContext`](super::MockContext).
///
/// # Example
///
/// ```rust
/// use mockkit::{MockConfig, MockContext, MockMode, VerifyMode};
///
/// let config = MockConfig::new()
///     .mode(MockMode::Autofill)
///     .verify_mode(VerifyMode::Exhaustive)
///     .isolated_autofill();
/// let ctx = MockContext::with_config(config);
///
/// assert_eq!(ctx.mock("Repo").mode(), MockMode::Autofill);
/// ```
#[derive(Debug, Clone, Default)]
pub struct MockConfig {
    /// Mode of mocks created without an explicit one.
    pub default_mode: MockMode,
    /// Mode used by [`MockContext::verify`](super::MockContext::verify).
    pub default_verify_mode: VerifyMode,
    /// Use a private autofill registry instead of the process-wide one.
    pub isolated_autofill: bool,
}

impl MockConfig {
    /// Create a new default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the default mock mode.
    #[must_use]
    pub fn mode(mut self, mode: MockMode) -> Self {
        self.default_mode = mode;
        self
    }

    /// Set the default verification mode.
    #[must_use]
    pub fn verify_mode(mut self, mode: VerifyMode) -> Self {
        self.default_verify_mode = mode;
        self
    }

    /// Give the context its own autofill registry.
    #[must_use]
    pub fn isolated_autofill(mut self) -> Self {
        self.isolated_autofill = true;
        self
    }
}
