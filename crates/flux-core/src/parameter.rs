use crossbeam::channel::{unbounded, Receiver, Sender};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Shared handle to a parameter. Every layer that reads or writes the same
/// control value holds a clone of the same `Arc`.
pub type ParameterRef = Arc<FloatParameter>;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParameterError {
    #[error("parameter '{id}': minimum {min} is greater than maximum {max}")]
    InvalidRange { id: String, min: f32, max: f32 },
    #[error("parameter '{0}' is declared more than once")]
    Duplicate(String),
    #[error("unknown parameter '{0}'")]
    Unknown(String),
}

/// Atomic f32 wrapper for lock-free cross-thread access.
#[derive(Debug)]
pub struct AtomicF32(AtomicU32);

impl AtomicF32 {
    pub fn new(val: f32) -> Self {
        Self(AtomicU32::new(val.to_bits()))
    }

    pub fn load(&self) -> f32 {
        f32::from_bits(self.0.load(Ordering::Relaxed))
    }

    pub fn store(&self, val: f32) {
        self.0.store(val.to_bits(), Ordering::Relaxed);
    }

    /// Store `val` and return the previous value.
    pub fn swap(&self, val: f32) -> f32 {
        f32::from_bits(self.0.swap(val.to_bits(), Ordering::Relaxed))
    }
}

impl Default for AtomicF32 {
    fn default() -> Self {
        Self::new(0.0)
    }
}

impl Clone for AtomicF32 {
    fn clone(&self) -> Self {
        Self::new(self.load())
    }
}

/// Serializable description of a parameter, as it appears in configuration
/// files.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterSpec {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub value: f32,
    #[serde(default = "ParameterSpec::default_min")]
    pub min: f32,
    #[serde(default = "ParameterSpec::default_max")]
    pub max: f32,
}

impl ParameterSpec {
    fn default_min() -> f32 {
        0.0
    }

    fn default_max() -> f32 {
        1.0
    }
}

/// An observable scalar with a `[min, max]` range.
///
/// Values written through [`FloatParameter::set_value`] are clamped to the
/// range. When the stored value actually changes, every live subscriber
/// receives the new value on its channel. Readers that prefer polling can
/// ignore subscriptions and call [`FloatParameter::value`] once per tick.
#[derive(Debug)]
pub struct FloatParameter {
    id: String,
    name: String,
    min: f32,
    max: f32,
    value: AtomicF32,
    subscribers: Mutex<Vec<Sender<f32>>>,
}

impl FloatParameter {
    pub fn new(id: impl Into<String>, value: f32, min: f32, max: f32) -> Result<Self, ParameterError> {
        let id = id.into();
        if min > max || min.is_nan() || max.is_nan() {
            return Err(ParameterError::InvalidRange { id, min, max });
        }
        let value = if value.is_nan() { min } else { value.clamp(min, max) };
        Ok(Self {
            name: id.clone(),
            id,
            min,
            max,
            value: AtomicF32::new(value),
            subscribers: Mutex::new(Vec::new()),
        })
    }

    /// Build a shared parameter from its configuration description.
    pub fn from_spec(spec: &ParameterSpec) -> Result<ParameterRef, ParameterError> {
        let mut param = Self::new(spec.id.clone(), spec.value, spec.min, spec.max)?;
        if let Some(name) = &spec.name {
            param.name = name.clone();
        }
        Ok(Arc::new(param))
    }

    /// Convenience constructor for a shared parameter.
    pub fn shared(id: impl Into<String>, value: f32, min: f32, max: f32) -> Result<ParameterRef, ParameterError> {
        Self::new(id, value, min, max).map(Arc::new)
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn min(&self) -> f32 {
        self.min
    }

    pub fn max(&self) -> f32 {
        self.max
    }

    pub fn value(&self) -> f32 {
        self.value.load()
    }

    /// Clamp `value` into range and store it, notifying subscribers on change.
    pub fn set_value(&self, value: f32) {
        if value.is_nan() {
            return;
        }
        let clamped = value.clamp(self.min, self.max);
        let old = self.value.swap(clamped);
        if old != clamped {
            self.notify(clamped);
        }
    }

    /// Receive every future value change of this parameter.
    pub fn subscribe(&self) -> Receiver<f32> {
        let (tx, rx) = unbounded();
        if let Ok(mut subscribers) = self.subscribers.lock() {
            subscribers.push(tx);
        }
        rx
    }

    fn notify(&self, value: f32) {
        if let Ok(mut subscribers) = self.subscribers.lock() {
            subscribers.retain(|tx| tx.send(value).is_ok());
        }
    }
}

/// Read access to a parameter binding that may be absent.
pub trait OptionalParameter {
    /// The bound parameter's current value, or `default` when unbound.
    fn value_or(&self, default: f32) -> f32;
}

impl OptionalParameter for Option<ParameterRef> {
    fn value_or(&self, default: f32) -> f32 {
        self.as_ref().map_or(default, |p| p.value())
    }
}

/// Id-indexed collection of shared parameters.
#[derive(Debug, Default, Clone)]
pub struct ParameterSet {
    params: HashMap<String, ParameterRef>,
}

impl ParameterSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_specs(specs: &[ParameterSpec]) -> Result<Self, ParameterError> {
        let mut set = Self::new();
        for spec in specs {
            set.insert(FloatParameter::from_spec(spec)?)?;
        }
        Ok(set)
    }

    pub fn insert(&mut self, param: ParameterRef) -> Result<(), ParameterError> {
        if self.params.contains_key(param.id()) {
            return Err(ParameterError::Duplicate(param.id().to_string()));
        }
        self.params.insert(param.id().to_string(), param);
        Ok(())
    }

    pub fn get(&self, id: &str) -> Option<ParameterRef> {
        self.params.get(id).cloned()
    }

    /// Look up a parameter that must exist.
    pub fn require(&self, id: &str) -> Result<ParameterRef, ParameterError> {
        self.get(id).ok_or_else(|| ParameterError::Unknown(id.to_string()))
    }

    /// Resolve an optional id into an optional binding. A named id that does
    /// not exist is still an error.
    pub fn resolve(&self, id: Option<&str>) -> Result<Option<ParameterRef>, ParameterError> {
        id.map(|id| self.require(id)).transpose()
    }

    pub fn len(&self) -> usize {
        self.params.len()
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ParameterRef> {
        self.params.values()
    }
}
