//! Procedural macros for mockkit
//!
//! This crate provides the `#[mockkit::test]` attribute macro, which hands a fresh
//! `MockContext` to a test function.
//!
//! # Example
//!
//! ```rust,ignore
//! use mockkit::{MockContext, TypeDesc};
//!
//! #[mockkit::test(mode = "autofill")]
//! fn my_test(ctx: MockContext) {
//!     let repo = ctx.mock("Repo");
//!     repo.call("save").arg("id", 1).invoke().unwrap();
//!     ctx.verify(|s| s.on(&repo, "save").arg("id", s.any(TypeDesc::Int)).invoke())
//!         .unwrap();
//! }
//! ```

use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::{
    parse::{Parse, ParseStream},
    parse_macro_input, FnArg, Ident, ItemFn, Lit, Pat, Token, Type,
};

/// Configuration options for the test macro.
#[derive(Default)]
struct TestConfig {
    /// Default mock mode ("strict", "autofill" or "autounit")
    mode: Option<String>,
    /// Whether the context gets its own autofill registry
    isolated: bool,
    /// Flavor for the tokio runtime of async tests ("current_thread" or "multi_thread")
    flavor: Option<String>,
}

impl Parse for TestConfig {
    fn parse(input: ParseStream) -> syn::Result<Self> {
        let mut config = TestConfig::default();

        while !input.is_empty() {
            let ident: Ident = input.parse()?;
            input.parse::<Token![=]>()?;
            let lit: Lit = input.parse()?;

            match (ident.to_string().as_str(), lit) {
                ("mode", Lit::Str(s)) => config.mode = Some(s.value()),
                ("isolated", Lit::Bool(b)) => config.isolated = b.value(),
                ("flavor", Lit::Str(s)) => config.flavor = Some(s.value()),
                ("mode" | "isolated" | "flavor", lit) => {
                    return Err(syn::Error::new_spanned(
                        lit,
                        format!("unexpected value for `{ident}`"),
                    ));
                }
                _ => {
                    return Err(syn::Error::new(
                        ident.span(),
                        format!("unknown attribute: {ident}"),
                    ));
                }
            }

            if input.peek(Token![,]) {
                input.parse::<Token![,]>()?;
            }
        }

        Ok(config)
    }
}

/// Determines if a function parameter is requesting a MockContext.
fn is_context_param(arg: &FnArg) -> bool {
    if let FnArg::Typed(pat_type) = arg {
        if let Type::Path(type_path) = &*pat_type.ty {
            if let Some(segment) = type_path.path.segments.last() {
                return segment.ident == "MockContext";
            }
        }
    }
    false
}

/// Extracts the parameter name from a function argument.
fn get_param_name(arg: &FnArg) -> Option<&Pat> {
    if let FnArg::Typed(pat_type) = arg {
        Some(&pat_type.pat)
    } else {
        None
    }
}

fn mode_tokens(mode: &str) -> syn::Result<TokenStream2> {
    match mode {
        "strict" => Ok(quote! { ::mockkit::MockMode::Strict }),
        "autofill" => Ok(quote! { ::mockkit::MockMode::Autofill }),
        "autounit" => Ok(quote! { ::mockkit::MockMode::AutoUnit }),
        other => Err(syn::Error::new(
            proc_macro2::Span::call_site(),
            format!("unsupported mode: {other}. Use \"strict\", \"autofill\" or \"autounit\""),
        )),
    }
}

/// Test attribute macro providing a `MockContext`.
///
/// Works on both blocking and async test functions; async tests run on tokio.
///
/// # With Context Injection
///
/// Add a `ctx: MockContext` parameter to receive a fresh context:
///
/// ```rust,ignore
/// #[mockkit::test]
/// async fn test_with_context(ctx: MockContext) {
///     let repo = ctx.mock("Repo");
///     assert!(repo.traces().is_empty());
/// }
/// ```
///
/// # Configuration Options
///
/// - `mode = "strict" | "autofill" | "autounit"` - Default mode of created mocks
/// - `isolated = true` - Use a private autofill registry
/// - `flavor = "multi_thread"` - Tokio runtime flavor for async tests
#[proc_macro_attribute]
pub fn test(attr: TokenStream, item: TokenStream) -> TokenStream {
    let config = parse_macro_input!(attr as TestConfig);
    let input = parse_macro_input!(item as ItemFn);

    expand_test(config, input)
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}

fn expand_test(config: TestConfig, input: ItemFn) -> syn::Result<TokenStream2> {
    let name = &input.sig.ident;
    let body = &input.block;
    let attrs = &input.attrs;
    let vis = &input.vis;
    let output = &input.sig.output;

    let mut context_param = None;
    for arg in &input.sig.inputs {
        if !is_context_param(arg) {
            return Err(syn::Error::new_spanned(
                arg,
                "only a `MockContext` parameter can be injected",
            ));
        }
        if context_param.is_some() {
            return Err(syn::Error::new_spanned(
                arg,
                "at most one `MockContext` parameter is allowed",
            ));
        }
        context_param = get_param_name(arg);
    }

    let mode = config.mode.as_deref().map(mode_tokens).transpose()?;
    let context_init = context_param.map(|ctx| {
        let mode = mode.map(|mode| quote! { .mode(#mode) });
        let isolated = config.isolated.then(|| quote! { .isolated_autofill() });
        quote! {
            let #ctx = ::mockkit::MockContext::with_config(
                ::mockkit::MockConfig::new() #mode #isolated
            );
        }
    });

    if input.sig.asyncness.is_none() {
        if config.flavor.is_some() {
            return Err(syn::Error::new_spanned(
                &input.sig,
                "`flavor` only applies to async tests",
            ));
        }
        return Ok(quote! {
            #[::core::prelude::v1::test]
            #(#attrs)*
            #vis fn #name() #output {
                #context_init
                #body
            }
        });
    }

    let flavor_attr = match config.flavor.as_deref().unwrap_or("current_thread") {
        "multi_thread" => quote! { #[::tokio::test(flavor = "multi_thread")] },
        "current_thread" => quote! { #[::tokio::test] },
        other => {
            return Err(syn::Error::new(
                proc_macro2::Span::call_site(),
                format!("unsupported flavor: {other}. Use \"current_thread\" or \"multi_thread\""),
            ));
        }
    };

    Ok(quote! {
        #flavor_attr
        #(#attrs)*
        #vis async fn #name() #output {
            #context_init
            #body
        }
    })
}
