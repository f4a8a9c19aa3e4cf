//! Placeholder values for un-stubbed calls and matcher call sites.
//!
//! An [`AutofillProvider`] maps a [`TypeDesc`] to a value, or to `None` when it
//! cannot provide one. Providers are chained; the first one that provides wins.
//!
//! Built-in defaults:
//! - `Int`, `Float` - zero
//! - `Bool` - `false`
//! - `Str` - empty string
//! - `Char` - `'\0'`
//! - `Unit` - [`Value::Unit`]
//! - `Nothing` - [`Value::Null`], `List<T>` - empty list
//! - `Array<T>` - one-element array, the element autofilled recursively
//! - anything else - [`Value::Placeholder`] named after the type
//!
//! # Example
//!
//! ```rust
//! use mockkit::autofill::{AutofillProvider, BuiltInProvider};
//! use mockkit::{TypeDesc, Value};
//!
//! let provided = BuiltInProvider.provide(&TypeDesc::array_of(TypeDesc::Int));
//! assert_eq!(provided, Some(Value::from(vec![0])));
//! ```

mod registry;

use std::fmt;
use std::sync::Arc;

use crate::value::{TypeDesc, Value};

pub use registry::AutofillRegistry;

/// Provides values by declared type.
pub trait AutofillProvider: Send + Sync {
    /// Returns a value of `ty`, or `None` when this provider has none.
    fn provide(&self, ty: &TypeDesc) -> Option<Value>;
}

impl<F> AutofillProvider for F
where
    F: Fn(&TypeDesc) -> Option<Value> + Send + Sync,
{
    fn provide(&self, ty: &TypeDesc) -> Option<Value> {
        self(ty)
    }
}

/// Defaults for primitive types.
#[derive(Clone, Copy, Debug, Default)]
pub struct PrimitiveValueProvider;

impl AutofillProvider for PrimitiveValueProvider {
    fn provide(&self, ty: &TypeDesc) -> Option<Value> {
        match ty {
            TypeDesc::Unit => Some(Value::Unit),
            TypeDesc::Bool => Some(Value::Bool(false)),
            TypeDesc::Int => Some(Value::Int(0)),
            TypeDesc::Float => Some(Value::Float(0.0)),
            TypeDesc::Char => Some(Value::Char('\0')),
            TypeDesc::Str => Some(Value::Str(String::new())),
            _ => None,
        }
    }
}

/// Defaults for `Nothing` and growable collections.
#[derive(Clone, Copy, Debug, Default)]
pub struct EmptyValueProvider;

impl AutofillProvider for EmptyValueProvider {
    fn provide(&self, ty: &TypeDesc) -> Option<Value> {
        match ty {
            TypeDesc::Nothing => Some(Value::Null),
            TypeDesc::List(_) => Some(Value::List(Vec::new())),
            _ => None,
        }
    }
}

/// Ordered chain of providers; the first that provides wins.
#[derive(Clone, Default)]
pub struct CombinedProviders {
    providers: Vec<Arc<dyn AutofillProvider>>,
}

impl CombinedProviders {
    /// Chain the given providers in order.
    #[must_use]
    pub fn new(providers: Vec<Arc<dyn AutofillProvider>>) -> Self {
        Self { providers }
    }

    /// A copy of this chain with `provider` consulted first.
    #[must_use]
    pub fn with_first(&self, provider: Arc<dyn AutofillProvider>) -> Self {
        let mut providers = Vec::with_capacity(self.providers.len() + 1);
        providers.push(provider);
        providers.extend(self.providers.iter().cloned());
        Self { providers }
    }

    /// A copy of this chain without `provider` (by identity).
    #[must_use]
    pub fn without(&self, provider: &Arc<dyn AutofillProvider>) -> Self {
        Self {
            providers: self
                .providers
                .iter()
                .filter(|p| !same_provider(p, provider))
                .cloned()
                .collect(),
        }
    }

    /// Number of chained providers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.providers.len()
    }

    /// Whether the chain is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}

impl AutofillProvider for CombinedProviders {
    fn provide(&self, ty: &TypeDesc) -> Option<Value> {
        self.providers.iter().find_map(|p| p.provide(ty))
    }
}

impl fmt::Debug for CombinedProviders {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CombinedProviders")
            .field("len", &self.providers.len())
            .finish()
    }
}

/// The built-in chain. Always provides.
#[derive(Clone, Copy, Debug, Default)]
pub struct BuiltInProvider;

impl AutofillProvider for BuiltInProvider {
    fn provide(&self, ty: &TypeDesc) -> Option<Value> {
        PrimitiveValueProvider
            .provide(ty)
            .or_else(|| EmptyValueProvider.provide(ty))
            .or_else(|| match ty {
                TypeDesc::Array(elem) => self.provide(elem).map(|v| Value::List(vec![v])),
                _ => None,
            })
            .or_else(|| Some(Value::Placeholder(ty.to_string())))
    }
}

pub(crate) fn same_provider(a: &Arc<dyn AutofillProvider>, b: &Arc<dyn AutofillProvider>) -> bool {
    std::ptr::eq(Arc::as_ptr(a).cast::<()>(), Arc::as_ptr(b).cast::<()>())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_primitive_defaults() {
        assert_eq!(BuiltInProvider.provide(&TypeDesc::Int), Some(Value::Int(0)));
        assert_eq!(BuiltInProvider.provide(&TypeDesc::Bool), Some(Value::Bool(false)));
        assert_eq!(BuiltInProvider.provide(&TypeDesc::Str), Some(Value::from("")));
        assert_eq!(BuiltInProvider.provide(&TypeDesc::Unit), Some(Value::Unit));
        assert_eq!(BuiltInProvider.provide(&TypeDesc::Float), Some(Value::Float(0.0)));
    }

    #[test]
    fn test_collections_and_nothing() {
        assert_eq!(BuiltInProvider.provide(&TypeDesc::Nothing), Some(Value::Null));
        assert_eq!(
            BuiltInProvider.provide(&TypeDesc::list_of(TypeDesc::Int)),
            Some(Value::List(Vec::new()))
        );
    }

    #[test]
    fn test_nested_arrays() {
        let ty = TypeDesc::array_of(TypeDesc::array_of(TypeDesc::Bool));
        assert_eq!(
            BuiltInProvider.provide(&ty),
            Some(Value::List(vec![Value::List(vec![Value::Bool(false)])]))
        );
    }

    #[test]
    fn test_placeholder_last_resort() {
        assert_eq!(
            BuiltInProvider.provide(&TypeDesc::named("User")),
            Some(Value::Placeholder("User".into()))
        );
    }

    #[test]
    fn test_combined_first_wins() {
        let seven: Arc<dyn AutofillProvider> = Arc::new(|ty: &TypeDesc| {
            (ty == &TypeDesc::Int).then_some(Value::Int(7))
        });
        let chain = CombinedProviders::new(vec![Arc::new(BuiltInProvider)]).with_first(seven.clone());
        assert_eq!(chain.len(), 2);
        assert_eq!(chain.provide(&TypeDesc::Int), Some(Value::Int(7)));
        assert_eq!(chain.provide(&TypeDesc::Bool), Some(Value::Bool(false)));

        let chain = chain.without(&seven);
        assert_eq!(chain.len(), 1);
        assert_eq!(chain.provide(&TypeDesc::Int), Some(Value::Int(0)));
    }

    #[test]
    fn test_empty_chain_is_absent() {
        let chain = CombinedProviders::default();
        assert!(chain.is_empty());
        assert_eq!(chain.provide(&TypeDesc::Int), None);
    }
}
