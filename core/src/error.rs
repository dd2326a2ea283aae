//! Serialized error payloads.
//!
//! Unexpected failures never cross an operation boundary as raw errors or
//! panics. They are flattened into a [`SerializedError`]: a plain, cloneable,
//! serde-friendly record of the error's name, message and optional code and
//! source chain, suitable for storing in a state slice and rendering later.

use serde::{Deserialize, Serialize};
use std::any::Any;
use std::error::Error as StdError;

/// Plain-data form of an error.
///
/// # Example
///
/// ```
/// use switchboard_core::SerializedError;
///
/// let io = std::io::Error::new(std::io::ErrorKind::TimedOut, "socket timed out");
/// let serialized = SerializedError::from_error(&io).with_code("ETIMEDOUT");
///
/// assert_eq!(serialized.name, "Error");
/// assert_eq!(serialized.message, "socket timed out");
/// assert_eq!(serialized.code.as_deref(), Some("ETIMEDOUT"));
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[serde(rename_all = "camelCase")]
#[error("{name}: {message}")]
pub struct SerializedError {
    /// Short type name of the original error (`"Panic"` for caught panics)
    pub name: String,

    /// Display form of the original error
    pub message: String,

    /// Provider-specific error code, when the source exposes one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,

    /// Rendered source chain, one `Caused by:` line per source
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stack: Option<String>,
}

impl SerializedError {
    /// Create a serialized error from a name and message
    #[must_use]
    pub fn new(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            message: message.into(),
            code: None,
            stack: None,
        }
    }

    /// Serialize any error value.
    ///
    /// The name is the error's type name without its module path. Sources are
    /// rendered into `stack`. Serializing a `SerializedError` returns a copy of it.
    #[must_use]
    pub fn from_error<E>(error: &E) -> Self
    where
        E: StdError + 'static,
    {
        if let Some(serialized) = (error as &(dyn StdError + 'static)).downcast_ref::<Self>() {
            return serialized.clone();
        }

        let mut chain = Vec::new();
        let mut source = error.source();
        while let Some(cause) = source {
            chain.push(format!("Caused by: {cause}"));
            source = cause.source();
        }

        Self {
            name: short_type_name::<E>().to_string(),
            message: error.to_string(),
            code: None,
            stack: (!chain.is_empty()).then(|| chain.join("\n")),
        }
    }

    /// Serialize a panic payload caught with `catch_unwind`
    #[must_use]
    pub fn from_panic(payload: &(dyn Any + Send)) -> Self {
        let message = payload
            .downcast_ref::<&str>()
            .map(|s| (*s).to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "panic with non-string payload".to_string());

        Self::new("Panic", message)
    }

    /// Attach a provider-specific error code
    #[must_use]
    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }
}

/// `my_crate::module::MyError<T>` → `MyError`
fn short_type_name<T: ?Sized>() -> &'static str {
    let full = std::any::type_name::<T>();
    let without_generics = full.split('<').next().unwrap_or(full);
    without_generics
        .rsplit("::")
        .next()
        .unwrap_or(without_generics)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, thiserror::Error)]
    #[error("connection refused")]
    struct ConnectError;

    #[derive(Debug, thiserror::Error)]
    #[error("token exchange failed")]
    struct ExchangeError {
        #[source]
        source: ConnectError,
    }

    #[test]
    fn from_error_uses_short_type_name() {
        let serialized = SerializedError::from_error(&ConnectError);
        assert_eq!(serialized.name, "ConnectError");
        assert_eq!(serialized.message, "connection refused");
        assert_eq!(serialized.stack, None);
    }

    #[test]
    fn from_error_renders_source_chain() {
        let serialized = SerializedError::from_error(&ExchangeError {
            source: ConnectError,
        });
        assert_eq!(serialized.name, "ExchangeError");
        assert_eq!(serialized.stack.as_deref(), Some("Caused by: connection refused"));
    }

    #[test]
    fn serializing_a_serialized_error_is_identity() {
        let original = SerializedError::new("VoiceError", "registration failed").with_code("31301");
        assert_eq!(SerializedError::from_error(&original), original);
    }

    #[test]
    fn from_panic_reads_string_payloads() {
        let static_payload: Box<dyn Any + Send> = Box::new("boom");
        let owned_payload: Box<dyn Any + Send> = Box::new(String::from("kaboom"));
        let opaque_payload: Box<dyn Any + Send> = Box::new(42_u8);

        assert_eq!(SerializedError::from_panic(static_payload.as_ref()).message, "boom");
        assert_eq!(SerializedError::from_panic(owned_payload.as_ref()).message, "kaboom");
        assert_eq!(
            SerializedError::from_panic(opaque_payload.as_ref()).name,
            "Panic"
        );
    }

    #[test]
    fn optional_fields_are_omitted_from_json() -> Result<(), serde_json::Error> {
        let json = serde_json::to_value(SerializedError::new("Panic", "boom"))?;
        assert_eq!(json, serde_json::json!({ "name": "Panic", "message": "boom" }));
        Ok(())
    }
}
