//! Outfit feed records and card identifiers
//!
//! Field names follow the backend's JSON keys (`outfit_id`, `image_data`, ...).

use serde::{Deserialize, Serialize};
use std::fmt;

/// Stable identifier of an on-screen card
///
/// Survives re-render, not card destruction. Opaque to the pool.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CardId(String);

impl CardId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CardId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for CardId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for CardId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Outfit record as delivered by the feed endpoints
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Outfit {
    pub outfit_id: i64,

    /// Encoded media payload (still image or video), usually base64 with an
    /// optional `data:` prefix
    pub image_data: String,

    #[serde(default)]
    pub description: Option<String>,

    #[serde(default)]
    pub items: Option<Vec<OutfitItem>>,
}

impl Outfit {
    /// Card identifier used for this outfit in a feed
    pub fn card_id(&self) -> CardId {
        CardId(format!("outfit-{}", self.outfit_id))
    }
}

/// Clothing item detected in an outfit
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutfitItem {
    pub item_id: i64,
    pub outfit_id: i64,
    pub description: String,
    #[serde(default)]
    pub search_query: Option<String>,
}

/// Parse a feed response body (JSON array of outfits)
pub fn parse_feed(json: &str) -> crate::Result<Vec<Outfit>> {
    Ok(serde_json::from_str(json)?)
}
