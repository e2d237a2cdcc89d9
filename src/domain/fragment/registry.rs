//! Registry of functions that fragment directives may invoke

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde_json::Value;

/// A renderable function: takes JSON arguments, returns markup
pub type FragmentFn = Arc<dyn Fn(&[Value]) -> String + Send + Sync>;

/// Explicit name → function mapping populated by the host application.
///
/// Directive payloads are read back from the store, so only names registered
/// here are ever invoked.
#[derive(Clone, Default)]
pub struct FragmentRegistry {
    functions: HashMap<String, FragmentFn>,
}

impl FragmentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a function, replacing any previous one with the same name
    pub fn register<F>(&mut self, name: impl Into<String>, function: F)
    where
        F: Fn(&[Value]) -> String + Send + Sync + 'static,
    {
        self.functions.insert(name.into(), Arc::new(function));
    }

    /// Builder form of [`register`](Self::register)
    pub fn with<F>(mut self, name: impl Into<String>, function: F) -> Self
    where
        F: Fn(&[Value]) -> String + Send + Sync + 'static,
    {
        self.register(name, function);
        self
    }

    pub fn contains(&self, name: &str) -> bool {
        self.functions.contains_key(name)
    }

    /// Invokes a registered function; `None` if the name is unknown
    pub fn invoke(&self, name: &str, args: &[Value]) -> Option<String> {
        self.functions.get(name).map(|function| function(args))
    }

    pub fn len(&self) -> usize {
        self.functions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }
}

impl fmt::Debug for FragmentRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&String> = self.functions.keys().collect();
        names.sort();

        f.debug_struct("FragmentRegistry")
            .field("functions", &names)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_invoke_registered_function() {
        let registry = FragmentRegistry::new().with("greet", |args: &[Value]| {
            format!("Hello {}", args.first().and_then(Value::as_str).unwrap_or("?"))
        });

        assert!(registry.contains("greet"));
        assert_eq!(
            registry.invoke("greet", &[json!("Ada")]).as_deref(),
            Some("Hello Ada")
        );
    }

    #[test]
    fn test_unknown_function_is_not_invoked() {
        let registry = FragmentRegistry::new();

        assert!(registry.is_empty());
        assert_eq!(registry.invoke("std::process::exit", &[]), None);
    }

    #[test]
    fn test_register_replaces_existing() {
        let mut registry = FragmentRegistry::new();
        registry.register("v", |_: &[Value]| "one".to_string());
        registry.register("v", |_: &[Value]| "two".to_string());

        assert_eq!(registry.len(), 1);
        assert_eq!(registry.invoke("v", &[]).as_deref(), Some("two"));
    }

    #[test]
    fn test_debug_lists_names() {
        let registry = FragmentRegistry::new()
            .with("b", |_: &[Value]| String::new())
            .with("a", |_: &[Value]| String::new());

        assert_eq!(
            format!("{:?}", registry),
            r#"FragmentRegistry { functions: ["a", "b"] }"#
        );
    }
}
