//! Binding error types.
//!
//! Errors are split by the phase that produces them: [`SchemaError`] while a
//! target type is compiled, [`BindError`] while a request is bound, and
//! [`ConfigError`] while binder configuration is loaded. [`SetError`] is the
//! cause carried by a field-level [`BindError`].

use std::fmt;
use thiserror::Error;

/// Request part a field is bound from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceKind {
    /// URL query parameters
    Query,
    /// Path parameters captured by the router
    Path,
    /// HTTP headers
    Header,
    /// Cookies from the `Cookie` header
    Cookie,
}

impl SourceKind {
    /// All source kinds, in binding order.
    pub const ALL: [SourceKind; 4] = [Self::Query, Self::Path, Self::Header, Self::Cookie];
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Query => write!(f, "query"),
            Self::Path => write!(f, "path"),
            Self::Header => write!(f, "header"),
            Self::Cookie => write!(f, "cookie"),
        }
    }
}

/// Error raised while compiling a target type into a binding schema.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    /// The configured path delimiter is empty.
    #[error("path delimiter must not be empty")]
    EmptyDelimiter,

    /// A field resolved to an empty bind key.
    #[error("field {label} resolves to an empty {source_kind} name")]
    EmptyName {
        /// Diagnostic label of the field (`Type.field`).
        label: String,
        /// Source the field is bound from.
        source_kind: SourceKind,
    },

    /// A header field's dotted path is not a valid HTTP header name.
    #[error("field {label} declares invalid header name '{name}'")]
    InvalidHeaderName {
        /// Diagnostic label of the field (`Type.field`).
        label: String,
        /// The rejected header name.
        name: String,
    },
}

/// Cause of a failure to write a value into a single field.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SetError {
    /// The text could not be coerced into the field's scalar kind.
    #[error("cannot parse '{raw}' as {kind}: {reason}")]
    Parse {
        /// The raw text received.
        raw: String,
        /// Name of the target kind (e.g. `i32`).
        kind: &'static str,
        /// Why parsing failed.
        reason: String,
    },

    /// The field's type has no textual coercion (e.g. a sequence of records).
    #[error("unsupported field type: {type_name}")]
    UnsupportedFieldType {
        /// Name of the unsupported type.
        type_name: &'static str,
    },

    /// The field's own text decoder rejected the value.
    #[error("{0}")]
    CustomDecode(String),

    /// A header value contained bytes that are not visible ASCII.
    #[error("value is not valid text")]
    NonTextValue,
}

impl SetError {
    /// Creates a parse error for `raw` targeting `kind`.
    pub fn parse(raw: &str, kind: &'static str, reason: impl fmt::Display) -> Self {
        Self::Parse {
            raw: raw.to_string(),
            kind,
            reason: reason.to_string(),
        }
    }

    /// Creates an unsupported-type error.
    pub fn unsupported(type_name: &'static str) -> Self {
        Self::UnsupportedFieldType { type_name }
    }

    /// Creates a custom decode error, keeping the decoder's message verbatim.
    pub fn custom(message: impl fmt::Display) -> Self {
        Self::CustomDecode(message.to_string())
    }
}

/// Error raised while binding a request into a target value.
///
/// Binding stops at the first error. Passes that already ran are not rolled
/// back, so the target may be partially populated.
#[derive(Debug, Error)]
pub enum BindError {
    /// A value was found but could not be written into its field.
    #[error("field {label}: {source}")]
    Field {
        /// Diagnostic label of the field (`Type.field`).
        label: String,
        /// Source the value came from.
        source_kind: SourceKind,
        /// Bind key the value was found under.
        key: String,
        /// Underlying cause.
        #[source]
        source: SetError,
    },

    /// A cookie field was declared but the request does not carry it.
    #[error("missing required cookie '{name}' for field {label}")]
    MissingCookie {
        /// Cookie name.
        name: String,
        /// Diagnostic label of the field (`Type.field`).
        label: String,
    },

    /// The request declared a JSON body that could not be decoded.
    #[error("failed to decode JSON body: {source}")]
    BodyDecode {
        /// Decoder error.
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// The request body exceeds the configured limit.
    #[error("payload too large: max {max} bytes, got {actual} bytes")]
    PayloadTooLarge {
        /// Configured maximum body size.
        max: usize,
        /// Actual body size.
        actual: usize,
    },
}

impl BindError {
    pub(crate) fn field(
        label: &str,
        source_kind: SourceKind,
        key: &str,
        source: SetError,
    ) -> Self {
        Self::Field {
            label: label.to_string(),
            source_kind,
            key: key.to_string(),
            source,
        }
    }

    /// Returns the diagnostic label of the offending field, if any.
    #[must_use]
    pub fn field_label(&self) -> Option<&str> {
        match self {
            Self::Field { label, .. } | Self::MissingCookie { label, .. } => Some(label),
            Self::BodyDecode { .. } | Self::PayloadTooLarge { .. } => None,
        }
    }

    /// Returns the field-level cause, if this is a field error.
    #[must_use]
    pub fn set_error(&self) -> Option<&SetError> {
        match self {
            Self::Field { source, .. } => Some(source),
            _ => None,
        }
    }

    /// Returns the error code suitable for error envelopes.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Field { source, .. } => match source {
                SetError::Parse { .. } | SetError::NonTextValue => "INVALID_PARAMETER",
                SetError::UnsupportedFieldType { .. } => "UNSUPPORTED_FIELD_TYPE",
                SetError::CustomDecode(_) => "CUSTOM_DECODE_FAILED",
            },
            Self::MissingCookie { .. } => "MISSING_COOKIE",
            Self::BodyDecode { .. } => "DESERIALIZATION_FAILED",
            Self::PayloadTooLarge { .. } => "PAYLOAD_TOO_LARGE",
        }
    }
}

/// Errors that can occur while loading binder configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// TOML parsing error.
    #[error("failed to parse TOML configuration: {0}")]
    Toml(#[from] toml::de::Error),

    /// Invalid configuration value.
    #[error("invalid configuration value for {field}: {reason}")]
    InvalidValue {
        /// The field with the invalid value.
        field: String,
        /// Explanation of why the value is invalid.
        reason: String,
    },
}

impl ConfigError {
    /// Create a new invalid value error.
    pub fn invalid_value(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidValue {
            field: field.into(),
            reason: reason.into(),
        }
    }
}
