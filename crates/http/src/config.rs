use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Connection settings of [`HttpClient`](crate::HttpClient).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct HttpConfig {
    /// Prefix for endpoint paths that are not absolute URLs.
    pub base_url: String,
    /// Limit for a whole request, chunk uploads included. Stalled
    /// transfers fail with a network error once it expires.
    #[serde(rename = "timeoutMs", with = "millis")]
    pub timeout: Duration,
    #[serde(rename = "connectTimeoutMs", with = "millis")]
    pub connect_timeout: Duration,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            timeout: Duration::from_secs(60),
            connect_timeout: Duration::from_secs(10),
        }
    }
}

impl HttpConfig {
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

mod millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}
