//! Request and response snapshots exchanged between the page, the proxy,
//! the cache store and the network.

use serde::{Deserialize, Serialize};
use url::Url;

/// Body of the response synthesized when a miss cannot reach the network
pub const OFFLINE_BODY: &str = "Offline";

/// Status of the synthesized offline response
pub const OFFLINE_STATUS: u16 = 503;

/// Maximum length for body previews in logs and CLI output
const MAX_PREVIEW_LENGTH: usize = 500;

/// How the page issued a request. Mirrors the fetch `mode` attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RequestMode {
    #[default]
    Navigate,
    SameOrigin,
    NoCors,
    Cors,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Request {
    pub method: String,
    pub url: String,
    #[serde(default)]
    pub headers: Vec<(String, String)>,
    #[serde(default)]
    pub mode: RequestMode,
}

impl Request {
    /// A plain GET navigation to `url`
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            method: "GET".to_string(),
            url: url.into(),
            headers: Vec::new(),
            mode: RequestMode::default(),
        }
    }

    pub fn with_method(mut self, method: impl Into<String>) -> Self {
        self.method = method.into().to_ascii_uppercase();
        self
    }

    pub fn with_mode(mut self, mode: RequestMode) -> Self {
        self.mode = mode;
        self
    }

    /// Identity under which this request is matched and stored.
    ///
    /// Only GET requests with a parseable URL have one. The URL is
    /// normalized the way the manifest resolves it, minus the fragment.
    pub fn cache_key(&self) -> Option<String> {
        if !self.method.eq_ignore_ascii_case("GET") {
            return None;
        }
        let mut url = Url::parse(&self.url).ok()?;
        url.set_fragment(None);
        Some(url.to_string())
    }
}

/// Response type as exposed to the page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseType {
    /// Same-origin, fully inspectable
    Basic,
    /// Cross-origin, readable
    Cors,
    /// Cross-origin no-cors; status and body hidden
    Opaque,
    /// Constructed locally rather than fetched
    Default,
    /// Network error placeholder
    Error,
}

impl ResponseType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResponseType::Basic => "basic",
            ResponseType::Cors => "cors",
            ResponseType::Opaque => "opaque",
            ResponseType::Default => "default",
            ResponseType::Error => "error",
        }
    }
}

/// A fully buffered response. `Clone` is the duplicate taken before a
/// response is handed to the page and a copy written to the cache.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Response {
    pub url: String,
    pub status: u16,
    #[serde(default)]
    pub status_text: String,
    pub response_type: ResponseType,
    #[serde(default)]
    pub headers: Vec<(String, String)>,
    #[serde(default, with = "body_base64")]
    pub body: Vec<u8>,
}

/// Bodies are stored as base64 text rather than JSON number arrays.
mod body_base64 {
    use base64::{engine::general_purpose::STANDARD, Engine as _};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(body: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(body))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        STANDARD.decode(encoded).map_err(serde::de::Error::custom)
    }
}

impl Response {
    pub fn new(url: impl Into<String>, status: u16, response_type: ResponseType) -> Self {
        Self {
            url: url.into(),
            status,
            status_text: String::new(),
            response_type,
            headers: Vec::new(),
            body: Vec::new(),
        }
    }

    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Cross-origin response to a no-cors request
    pub fn opaque(url: impl Into<String>) -> Self {
        Self::new(url, 0, ResponseType::Opaque)
    }

    /// Synthesized reply for a cache miss whose network request failed
    pub fn offline() -> Self {
        Self::new("", OFFLINE_STATUS, ResponseType::Default)
            .with_header("content-type", "text/plain;charset=UTF-8")
            .with_body(OFFLINE_BODY)
    }

    /// 2xx, as required for bulk pre-caching
    pub fn ok(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Only complete same-origin responses are safe to replay later
    pub fn is_cacheable(&self) -> bool {
        self.status == 200 && self.response_type == ResponseType::Basic
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// Body text truncated to avoid logging excessive data
    pub fn body_preview(&self) -> String {
        let text = self.text();
        if text.len() <= MAX_PREVIEW_LENGTH {
            return text;
        }
        let mut end = MAX_PREVIEW_LENGTH;
        while !text.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}... (truncated, {} total bytes)", &text[..end], text.len())
    }
}
