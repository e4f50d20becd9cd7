// SPDX-FileCopyrightText: 2026 EIR Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-request worker overrides via `x-speaker-*` / `x-executive-*`
//! headers.
//!
//! Clients may redirect either worker to a different model, key, or
//! OpenAI-compatible endpoint for a single request without touching
//! server configuration.

use axum::http::HeaderMap;

/// Worker overrides extracted from request headers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestOverrides {
    pub speaker_model: Option<String>,
    pub speaker_api_key: Option<String>,
    pub speaker_api_base: Option<String>,
    pub executive_model: Option<String>,
    pub executive_api_key: Option<String>,
    pub executive_api_base: Option<String>,
}

impl RequestOverrides {
    /// Parses the recognized override headers. Unparseable header
    /// values are ignored.
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let get = |name: &str| {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        };
        Self {
            speaker_model: get("x-speaker-model"),
            speaker_api_key: get("x-speaker-api-key"),
            speaker_api_base: get("x-speaker-api-base"),
            executive_model: get("x-executive-model"),
            executive_api_key: get("x-executive-api-key"),
            executive_api_base: get("x-executive-api-base"),
        }
    }

    /// Whether the speaker needs a dedicated upstream client.
    pub fn speaker_client_override(&self) -> bool {
        self.speaker_api_key.is_some() || self.speaker_api_base.is_some()
    }

    /// Whether the executive needs a dedicated upstream client.
    pub fn executive_client_override(&self) -> bool {
        self.executive_api_key.is_some() || self.executive_api_base.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn empty_headers_yield_defaults() {
        let overrides = RequestOverrides::from_headers(&HeaderMap::new());
        assert_eq!(overrides, RequestOverrides::default());
        assert!(!overrides.speaker_client_override());
        assert!(!overrides.executive_client_override());
    }

    #[test]
    fn override_headers_are_extracted() {
        let mut headers = HeaderMap::new();
        headers.insert("x-speaker-model", HeaderValue::from_static("gpt-4o-mini"));
        headers.insert("x-speaker-api-key", HeaderValue::from_static("sk-alt"));
        headers.insert(
            "x-executive-api-base",
            HeaderValue::from_static("https://alt.example/v1"),
        );

        let overrides = RequestOverrides::from_headers(&headers);
        assert_eq!(overrides.speaker_model.as_deref(), Some("gpt-4o-mini"));
        assert_eq!(overrides.speaker_api_key.as_deref(), Some("sk-alt"));
        assert_eq!(
            overrides.executive_api_base.as_deref(),
            Some("https://alt.example/v1")
        );
        assert!(overrides.speaker_client_override());
        assert!(overrides.executive_client_override());
    }

    #[test]
    fn empty_values_are_ignored() {
        let mut headers = HeaderMap::new();
        headers.insert("x-speaker-model", HeaderValue::from_static(""));
        let overrides = RequestOverrides::from_headers(&headers);
        assert!(overrides.speaker_model.is_none());
    }
}
