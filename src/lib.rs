//! # mockkit
//!
//! > Runtime core of a call-mocking framework
//!
//! **mockkit** intercepts calls delivered by a proxy layer, answers them from
//! pre-programmed stubs, records them, and verifies recorded calls against
//! expectations.
//!
//! ## Quick Start
//!
//! ```rust
//! use mockkit::prelude::*;
//!
//! let ctx = MockContext::new();
//! let repo = ctx.mock("Repo");
//!
//! // stub: find(any Int) returns "bob"
//! ctx.every(|s| {
//!     s.on(&repo, "find")
//!         .returning(TypeDesc::Str)
//!         .arg("id", s.any(TypeDesc::Int))
//!         .invoke()
//! })?
//! .returns("bob")?;
//!
//! // what a proxy does on each call
//! let name = repo.call("find").returning(TypeDesc::Str).arg("id", 42).invoke()?;
//! assert_eq!(name, Value::from("bob"));
//!
//! ctx.verify_with(VerifyMode::Exactly(1), |s| {
//!     s.on(&repo, "find").arg("id", s.eq(42)).invoke()
//! })?;
//! ctx.verify_no_more_calls(&[&repo])?;
//! # Ok::<(), mockkit::Error>(())
//! ```
//!
//! ## Features
//!
//! - **Matchers** - equality, predicates, captures, `not` / `and` / `or`, vararg patterns
//! - **Answers** - constants, errors, sync and async closures, super calls, sequences
//! - **Modes** - strict, autofill and auto-unit fallbacks for unstubbed calls
//! - **Verification** - counted, exhaustive, ordered and no-more-calls checks
//! - **Autofill** - typed placeholder values with pluggable providers

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod answering;
pub mod autofill;
pub mod call;
pub mod error;
pub mod matcher;
pub mod mock;
pub mod templating;
pub mod trace;
pub mod value;
pub mod verify;

/// Prelude for convenient imports
///
/// ```rust
/// use mockkit::prelude::*;
/// ```
pub mod prelude {
    pub use crate::answering::{Answer, FunctionScope, MockMode};
    pub use crate::error::{Error, Result};
    pub use crate::matcher::{ArgMatcher, CaptureSink, Matcher};
    pub use crate::mock::{CallBuilder, Mock, MockConfig, MockContext, Stubbing};
    pub use crate::templating::TemplatingScope;
    pub use crate::value::{MockId, TypeDesc, Value};
    pub use crate::verify::VerifyMode;
}

// Re-exports
pub use answering::{Answer, FunctionScope, MockMode};
pub use error::{Error, Result};
pub use mock::{CallBuilder, Mock, MockConfig, MockContext, Stubbing};
pub use value::{MockId, TypeDesc, Value};
pub use verify::VerifyMode;

// Re-export the test macro when macros feature is enabled
#[cfg(feature = "macros")]
pub use mockkit_macros::test;
