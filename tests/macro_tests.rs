//! Integration tests for the `#[mockkit::test]` macro.

#![cfg(feature = "macros")]

use std::sync::Arc;

use mockkit::autofill::AutofillRegistry;
use mockkit::{Error, MockContext, MockMode, TypeDesc, Value};

/// Basic test without context injection.
#[mockkit::test]
fn test_basic_sync() {
    assert_eq!(2 + 2, 4);
}

/// Basic async test without context injection.
#[mockkit::test]
async fn test_basic_async() {
    assert_eq!(2 + 2, 4);
}

/// Default context: strict mocks on the global autofill.
#[mockkit::test]
fn test_with_context(ctx: MockContext) {
    let repo = ctx.mock("Repo");
    assert_eq!(repo.mode(), MockMode::Strict);
    assert!(Arc::ptr_eq(ctx.autofill(), AutofillRegistry::global()));

    let err = repo.call("find").arg("id", 1).invoke().unwrap_err();
    assert!(matches!(err, Error::CallNotMocked(_)));
}

#[mockkit::test(mode = "autofill", isolated = true)]
fn test_configured_context(ctx: MockContext) {
    assert!(!Arc::ptr_eq(ctx.autofill(), AutofillRegistry::global()));
    ctx.autofill().register(TypeDesc::named("Port"), || Value::from(8080));

    let server = ctx.mock("Server");
    let port = server
        .call("port")
        .returning(TypeDesc::named("Port"))
        .invoke()
        .unwrap();
    assert_eq!(port, Value::from(8080));
}

#[mockkit::test(mode = "autounit")]
async fn test_async_context(ctx: MockContext) {
    let repo = ctx.mock("Repo");
    let value = repo
        .call("save")
        .arg("id", 1)
        .invoke_suspend()
        .await
        .unwrap();
    assert!(value.is_unit());
    ctx.verify(|s| s.on(&repo, "save").arg("id", s.eq(1)).invoke())
        .unwrap();
    ctx.verify_no_more_calls(&[&repo]).unwrap();
}

#[mockkit::test(flavor = "multi_thread")]
async fn test_multi_thread_context(ctx: MockContext) {
    let counter = ctx.mock_with_mode("Counter", MockMode::Autofill);
    let tasks: Vec<_> = (0..4)
        .map(|_| {
            let counter = counter.clone();
            tokio::spawn(async move { counter.call("tick").invoke_suspend().await })
        })
        .collect();
    for task in tasks {
        task.await.unwrap().unwrap();
    }
    assert_eq!(counter.traces().len(), 4);
}

/// Result-returning tests keep their signature.
#[mockkit::test(mode = "autofill")]
fn test_result_return(ctx: MockContext) -> mockkit::Result<()> {
    let repo = ctx.mock("Repo");
    repo.call("find").arg("id", 7).invoke()?;
    ctx.verify(|s| s.on(&repo, "find").arg("id", s.any(TypeDesc::Int)).invoke())
}
