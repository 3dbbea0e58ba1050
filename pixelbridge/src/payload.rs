use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

// The length guard filters short accidental captures (file paths and the
// like) out of real base64 runs.
static DATA_URI_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"data:image/[a-zA-Z]+;base64,[A-Za-z0-9+/]{50,}={0,2}").unwrap()
});

/// One piece of a request payload, in injection order.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PayloadSegment {
    Text { text: String },
    Image {
        /// A `data:image/...;base64,` URI.
        data_uri: String,
        description: Option<String>,
    },
}

/// The caller's payload for one end-to-end request: an ordered sequence of
/// text and image segments.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RequestPayload {
    pub segments: Vec<PayloadSegment>,
}

impl RequestPayload {
    /// A plain-text payload.
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            segments: vec![PayloadSegment::Text { text: text.into() }],
        }
    }

    pub fn push_text(&mut self, text: impl Into<String>) {
        self.segments.push(PayloadSegment::Text { text: text.into() });
    }

    pub fn push_image(&mut self, data_uri: impl Into<String>, description: Option<String>) {
        self.segments.push(PayloadSegment::Image {
            data_uri: data_uri.into(),
            description,
        });
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// The textual rendition of the payload: text segments verbatim, image
    /// segments as a bracketed reference, joined by line breaks.
    pub fn prompt_text(&self) -> String {
        let parts: Vec<String> = self
            .segments
            .iter()
            .map(|segment| match segment {
                PayloadSegment::Text { text } => text.clone(),
                PayloadSegment::Image { description, .. } => {
                    let label = description.as_deref().unwrap_or("An uploaded image");
                    format!("[Image: {label}]")
                }
            })
            .collect();
        parts.join("\n")
    }

    /// Image data URIs in segment order.
    pub fn images(&self) -> impl Iterator<Item = &str> {
        self.segments.iter().filter_map(|segment| match segment {
            PayloadSegment::Image { data_uri, .. } => Some(data_uri.as_str()),
            PayloadSegment::Text { .. } => None,
        })
    }
}

/// Extract embedded image data URIs from free-form text, deduplicated
/// preserving first-seen order.
pub fn extract_data_uris(text: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut uris = Vec::new();
    for found in DATA_URI_RE.find_iter(text) {
        let uri = found.as_str();
        if seen.insert(uri.to_string()) {
            uris.push(uri.to_string());
        }
    }
    uris
}
