use crate::error::{Result, TemplateError};
use crate::value::Value;
use indexmap::IndexMap;
use serde::Serialize;

/// Variables a template is rendered against.
///
/// Rendering only reads the context; loop variables live in the renderer's
/// own scope stack, so a context can be reused across renders.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Context {
    vars: IndexMap<String, Value>,
}

impl Context {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a context from any value that serializes to a JSON object.
    pub fn from_serialize<T: Serialize>(data: &T) -> Result<Self> {
        let json = serde_json::to_value(data).map_err(|e| TemplateError::InvalidContext {
            message: e.to_string(),
        })?;
        match Value::from(json) {
            Value::Map(vars) => Ok(Self { vars }),
            other => Err(TemplateError::InvalidContext {
                message: format!("expected an object at the top level, got {}", other.type_name()),
            }),
        }
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.vars.insert(key.into(), value.into());
    }

    /// Builder-style [`Context::set`].
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set(key, value);
        self
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.vars.get(key)
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.vars.shift_remove(key)
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Context {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            vars: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}
