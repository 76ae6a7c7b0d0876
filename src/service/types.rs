//! Wire types for the comparison service.
//!
//! A session is created by uploading artifacts; its result is fetched as
//! JSON from the session URL. All structs derive `Serialize`/`Deserialize`
//! so results can be parsed off the wire and re-serialized for diagnostics.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Options passed to the service when creating a session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompareConfig {
    pub language: String,
    /// Matches appearing in more than this many submissions are ignored.
    pub max_until_ignored: u32,
    /// Upper bound on matches reported back.
    pub max_displayed_matches: u32,
}

/// Handle for one in-progress or completed comparison run on the service.
///
/// The service hands these out as plain text; [`SessionUrl::parse`] accepts
/// only absolute http(s) URLs pointing at a results page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionUrl(String);

impl SessionUrl {
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        if raw.starts_with("http") && raw.contains("/results/") {
            Some(Self(raw.to_string()))
        } else {
            None
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One pair of matched line spans, `(start, end)` per side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineMatch {
    pub first: (u32, u32),
    pub second: (u32, u32),
}

/// One similarity finding as reported by the service. The `first`/`second`
/// fields carry the submission identifiers echoed back from the upload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawMatch {
    pub first: String,
    pub second: String,
    pub first_percentage: f32,
    pub second_percentage: f32,
    pub lines_matched: u32,
    #[serde(default)]
    pub line_matches: Vec<LineMatch>,
}

/// Ephemeral result of a comparison run, as returned by the service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComparisonResult {
    pub url: SessionUrl,
    pub matches: Vec<RawMatch>,
}
