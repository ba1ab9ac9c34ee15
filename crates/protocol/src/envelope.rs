use serde::Deserialize;
use serde::de::DeserializeOwned;

/// Errors produced while decoding a response body.
#[derive(Debug, thiserror::Error)]
pub enum EnvelopeError {
    /// The body was well-formed but carried application-level errors.
    #[error("request rejected: {}", errors.join("; "))]
    Rejected {
        errors: Vec<String>,
        /// Set by the upload endpoint when resending the same chunk is pointless.
        prevent_retry: bool,
    },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl EnvelopeError {
    /// Human-readable reasons, one per server message.
    pub fn reasons(&self) -> Vec<String> {
        match self {
            Self::Rejected { errors, .. } => errors.clone(),
            Self::Json(e) => vec![e.to_string()],
        }
    }
}

/// The server reports errors either as a list, or as a single string.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ErrorList {
    One(String),
    Many(Vec<String>),
}

impl Default for ErrorList {
    fn default() -> Self {
        Self::Many(Vec::new())
    }
}

#[derive(Debug, Default, Deserialize)]
struct ErrorFields {
    #[serde(default)]
    errors: ErrorList,
    #[serde(default)]
    error: Option<String>,
    #[serde(default, rename = "preventRetry")]
    prevent_retry: bool,
}

impl ErrorFields {
    fn into_messages(self) -> Vec<String> {
        let mut messages = match self.errors {
            ErrorList::One(msg) => vec![msg],
            ErrorList::Many(list) => list,
        };
        if let Some(msg) = self.error {
            messages.push(msg);
        }
        messages.retain(|m| !m.is_empty());
        messages
    }
}

/// Decodes a 2xx response body.
///
/// The body is a success only when it carries no `errors`/`error`; in that
/// case it is deserialized as `T`. An empty body is treated as `{}`.
pub fn parse_response<T: DeserializeOwned>(body: &[u8]) -> Result<T, EnvelopeError> {
    let value: serde_json::Value = if body.iter().all(u8::is_ascii_whitespace) {
        serde_json::Value::Object(Default::default())
    } else {
        serde_json::from_slice(body)?
    };

    let fields = ErrorFields::deserialize(&value).unwrap_or_default();
    let prevent_retry = fields.prevent_retry;
    let errors = fields.into_messages();
    if !errors.is_empty() {
        return Err(EnvelopeError::Rejected {
            errors,
            prevent_retry,
        });
    }

    Ok(T::deserialize(&value)?)
}

/// Extracts error messages from a non-2xx body, if it is a JSON envelope.
pub fn error_messages(body: &[u8]) -> Vec<String> {
    serde_json::from_slice::<ErrorFields>(body)
        .map(ErrorFields::into_messages)
        .unwrap_or_default()
}
