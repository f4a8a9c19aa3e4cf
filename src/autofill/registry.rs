//! Process-wide autofill service.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, OnceLock};

use parking_lot::RwLock;

use super::{AutofillProvider, BuiltInProvider, CombinedProviders};
use crate::value::{TypeDesc, Value};

type Factory = Arc<dyn Fn() -> Value + Send + Sync>;

/// Autofill service with user registrations in front of the built-in chain.
///
/// Lookup order:
/// 1. providers added with [`register_provider`](Self::register_provider), newest first
/// 2. factories added with [`register`](Self::register)
/// 3. arrays, filled with one element provided by this registry
/// 4. [`BuiltInProvider`]
///
/// [`global`](Self::global) is the process-wide instance. It lives for the whole
/// test process; call [`reset`](Self::reset) to drop registrations between runs.
/// Contexts can also be given a private instance.
///
/// # Example
///
/// ```rust
/// use mockkit::autofill::{AutofillProvider, AutofillRegistry};
/// use mockkit::{TypeDesc, Value};
///
/// let registry = AutofillRegistry::new();
/// registry.register(TypeDesc::named("User"), || Value::from("guest"));
///
/// assert_eq!(registry.provide(&TypeDesc::named("User")), Some(Value::from("guest")));
/// ```
#[derive(Default)]
pub struct AutofillRegistry {
    providers: RwLock<CombinedProviders>,
    factories: RwLock<HashMap<TypeDesc, Factory>>,
}

impl AutofillRegistry {
    /// Create a registry with no registrations.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide registry.
    pub fn global() -> &'static Arc<AutofillRegistry> {
        static GLOBAL: OnceLock<Arc<AutofillRegistry>> = OnceLock::new();
        GLOBAL.get_or_init(|| Arc::new(AutofillRegistry::new()))
    }

    /// Consult `provider` before every provider registered so far.
    pub fn register_provider(&self, provider: Arc<dyn AutofillProvider>) {
        let mut providers = self.providers.write();
        *providers = providers.with_first(provider);
    }

    /// Remove a provider added with [`register_provider`](Self::register_provider).
    pub fn unregister_provider(&self, provider: &Arc<dyn AutofillProvider>) {
        let mut providers = self.providers.write();
        *providers = providers.without(provider);
    }

    /// Register a factory for exactly `ty`, replacing any previous one.
    pub fn register<F>(&self, ty: TypeDesc, factory: F)
    where
        F: Fn() -> Value + Send + Sync + 'static,
    {
        self.factories.write().insert(ty, Arc::new(factory));
    }

    /// Remove the factory registered for `ty`.
    pub fn unregister(&self, ty: &TypeDesc) {
        self.factories.write().remove(ty);
    }

    /// Whether `provider` is currently registered.
    #[must_use]
    pub fn is_registered(&self, provider: &Arc<dyn AutofillProvider>) -> bool {
        let providers = self.providers.read();
        providers.without(provider).len() != providers.len()
    }

    /// Drop every registration.
    pub fn reset(&self) {
        *self.providers.write() = CombinedProviders::default();
        self.factories.write().clear();
        tracing::debug!("autofill registry reset");
    }

    /// Provide a value, never failing: the built-in chain ends with a placeholder.
    #[must_use]
    pub fn provide_value(&self, ty: &TypeDesc) -> Value {
        self.provide(ty)
            .unwrap_or_else(|| Value::Placeholder(ty.to_string()))
    }
}

impl AutofillProvider for AutofillRegistry {
    fn provide(&self, ty: &TypeDesc) -> Option<Value> {
        // Snapshots keep locks released while user code runs.
        let providers = self.providers.read().clone();
        if let Some(value) = providers.provide(ty) {
            return Some(value);
        }
        let factory = self.factories.read().get(ty).cloned();
        if let Some(factory) = factory {
            return Some(factory());
        }
        if let TypeDesc::Array(elem) = ty {
            return self.provide(elem).map(|v| Value::List(vec![v]));
        }
        let value = BuiltInProvider.provide(ty);
        if let Some(Value::Placeholder(_)) = &value {
            tracing::trace!(%ty, "autofill fell back to placeholder");
        }
        value
    }
}

impl fmt::Debug for AutofillRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AutofillRegistry")
            .field("providers", &self.providers.read().len())
            .field("factories", &self.factories.read().len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn int_provider(v: i64) -> Arc<dyn AutofillProvider> {
        Arc::new(move |ty: &TypeDesc| (ty == &TypeDesc::Int).then_some(Value::Int(v)))
    }

    #[test]
    fn test_defaults_without_registrations() {
        let registry = AutofillRegistry::new();
        assert_eq!(registry.provide(&TypeDesc::Int), Some(Value::Int(0)));
        assert_eq!(
            registry.provide_value(&TypeDesc::named("Repo")),
            Value::Placeholder("Repo".into())
        );
    }

    #[test]
    fn test_register_overwrites_and_unregister_removes() {
        let registry = AutofillRegistry::new();
        registry.register(TypeDesc::Int, || Value::Int(1));
        registry.register(TypeDesc::Int, || Value::Int(2));
        assert_eq!(registry.provide(&TypeDesc::Int), Some(Value::Int(2)));

        registry.unregister(&TypeDesc::Int);
        assert_eq!(registry.provide(&TypeDesc::Int), Some(Value::Int(0)));
    }

    #[test]
    fn test_custom_providers_newest_first_and_before_factories() {
        let registry = AutofillRegistry::new();
        registry.register(TypeDesc::Int, || Value::Int(1));
        let first = int_provider(10);
        let second = int_provider(20);
        registry.register_provider(first.clone());
        registry.register_provider(second.clone());
        assert!(registry.is_registered(&first));
        assert_eq!(registry.provide(&TypeDesc::Int), Some(Value::Int(20)));

        registry.unregister_provider(&second);
        assert!(!registry.is_registered(&second));
        assert_eq!(registry.provide(&TypeDesc::Int), Some(Value::Int(10)));

        registry.unregister_provider(&first);
        assert_eq!(registry.provide(&TypeDesc::Int), Some(Value::Int(1)));
    }

    #[test]
    fn test_arrays_use_registered_element_factories() {
        let registry = AutofillRegistry::new();
        registry.register(TypeDesc::named("User"), || Value::from("guest"));
        assert_eq!(
            registry.provide(&TypeDesc::array_of(TypeDesc::named("User"))),
            Some(Value::from(vec!["guest"]))
        );
    }

    #[test]
    fn test_reset() {
        let registry = AutofillRegistry::new();
        registry.register(TypeDesc::Int, || Value::Int(1));
        registry.register_provider(int_provider(5));
        registry.reset();
        assert_eq!(registry.provide(&TypeDesc::Int), Some(Value::Int(0)));
    }

    #[test]
    fn test_global_is_shared() {
        assert!(Arc::ptr_eq(AutofillRegistry::global(), AutofillRegistry::global()));
    }
}
