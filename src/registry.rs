use std::borrow::Borrow;
use std::collections::HashMap;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use crate::error::DecodeError;

/// Short symbolic name of one decoder, e.g. `Ot`.
///
/// Cloning is cheap, so keys can be copied freely into alias environments.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DecoderKey(Arc<str>);

impl DecoderKey {
    pub fn new(name: &str) -> Self {
        Self(Arc::from(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for DecoderKey {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl Borrow<str> for DecoderKey {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DecoderKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A function that turns a numeric index into the string it stands for.
///
/// Implemented for every `Fn(i64) -> Result<String, DecodeError>`, so plain
/// closures can be registered directly.
pub trait Decoder {
    fn decode(&self, index: i64) -> Result<String, DecodeError>;
}

impl<F> Decoder for F
where
    F: Fn(i64) -> Result<String, DecodeError>,
{
    fn decode(&self, index: i64) -> Result<String, DecodeError> {
        self(index)
    }
}

/// Fixed table of decoders keyed by [`DecoderKey`].
///
/// The registry is only read during a run and may be shared between
/// independent runs, each of which tracks its own aliases.
///
/// # Examples
///
/// ```rust
/// use deobfuscator_rs::{DecodeError, DecoderRegistry};
///
/// let registry = DecoderRegistry::new().with("Ot", |index: i64| match index {
///     5 => Ok("hello".to_owned()),
///     _ => Err(DecodeError::OutOfDomain(index)),
/// });
///
/// assert_eq!(registry.decode("Ot", 5).unwrap(), "hello");
/// assert!(registry.decode("Ot", 6).is_err());
/// assert!(registry.decode("mt", 5).is_err());
/// ```
#[derive(Default)]
pub struct DecoderRegistry {
    decoders: HashMap<DecoderKey, Box<dyn Decoder + Send + Sync>>,
}

impl DecoderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `decoder` under `key`, replacing any previous entry.
    pub fn register<D>(&mut self, key: impl Into<DecoderKey>, decoder: D) -> &mut Self
    where
        D: Decoder + Send + Sync + 'static,
    {
        self.decoders.insert(key.into(), Box::new(decoder));
        self
    }

    /// Builder form of [`register`](Self::register).
    pub fn with<D>(mut self, key: impl Into<DecoderKey>, decoder: D) -> Self
    where
        D: Decoder + Send + Sync + 'static,
    {
        self.register(key, decoder);
        self
    }

    /// Registered keys, sorted by name.
    pub fn keys(&self) -> Vec<DecoderKey> {
        let mut keys: Vec<_> = self.decoders.keys().cloned().collect();
        keys.sort();
        keys
    }

    pub fn len(&self) -> usize {
        self.decoders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.decoders.is_empty()
    }

    /// Runs the decoder registered under `key`.
    ///
    /// Decoders are treated as fragile: a panic inside one is caught and
    /// reported as [`DecodeError::Panicked`] instead of unwinding through the
    /// traversal.
    ///
    /// # Errors
    ///
    /// Returns [`DecodeError::UnknownDecoder`] if nothing is registered under
    /// `key`, otherwise whatever the decoder itself reports.
    pub fn decode(&self, key: &str, index: i64) -> Result<String, DecodeError> {
        let decoder = self
            .decoders
            .get(key)
            .ok_or_else(|| DecodeError::UnknownDecoder(DecoderKey::new(key)))?;

        panic::catch_unwind(AssertUnwindSafe(|| decoder.decode(index)))
            .unwrap_or_else(|payload| Err(DecodeError::Panicked(panic_message(&*payload))))
    }
}

impl fmt::Debug for DecoderRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DecoderRegistry")
            .field("keys", &self.keys())
            .finish()
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_owned()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_owned()
    }
}
