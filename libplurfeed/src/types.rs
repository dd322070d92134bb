//! Core types for Plurfeed
//!
//! The unified content model is the common currency between platform
//! adapters and callers. Adapters build these values from whatever their
//! platform returns; the engine only reads them.

use std::collections::HashMap;
use std::str::FromStr;

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// Credential material handed to `authenticate` (e.g. `{"token": "..."}`)
pub type CredentialMaterial = HashMap<String, String>;

/// Extra data for an interaction (e.g. `{"text": "..."}` for comments)
pub type InteractionData = HashMap<String, String>;

/// Supported platforms
///
/// The declaration order is the registry's iteration order, which in turn
/// breaks timestamp ties in the merged feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlatformId {
    Instagram,
    TikTok,
    YouTube,
    Bluesky,
    Mastodon,
}

impl PlatformId {
    pub const ALL: [PlatformId; 5] = [
        PlatformId::Instagram,
        PlatformId::TikTok,
        PlatformId::YouTube,
        PlatformId::Bluesky,
        PlatformId::Mastodon,
    ];

    /// Lowercase identifier used in config files, logs and credential names
    pub fn as_str(&self) -> &'static str {
        match self {
            PlatformId::Instagram => "instagram",
            PlatformId::TikTok => "tiktok",
            PlatformId::YouTube => "youtube",
            PlatformId::Bluesky => "bluesky",
            PlatformId::Mastodon => "mastodon",
        }
    }
}

impl FromStr for PlatformId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "instagram" => Ok(PlatformId::Instagram),
            "tiktok" => Ok(PlatformId::TikTok),
            "youtube" => Ok(PlatformId::YouTube),
            "bluesky" => Ok(PlatformId::Bluesky),
            "mastodon" => Ok(PlatformId::Mastodon),
            _ => Err(format!(
                "Unknown platform: '{}'. Valid options: instagram, tiktok, youtube, bluesky, mastodon",
                s
            )),
        }
    }
}

impl std::fmt::Display for PlatformId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnifiedAuthor {
    pub id: String,
    /// The platform's own user id
    pub platform_user_id: String,
    pub platform: PlatformId,
    pub handle: String,
    pub display_name: String,
    pub avatar_url: Option<String>,
    pub verified: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Image,
    Video,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnifiedMedia {
    pub id: String,
    pub kind: MediaKind,
    pub url: String,
    pub preview_url: Option<String>,
    pub width: u32,
    pub height: u32,
    /// Playback length in milliseconds; only videos carry one
    pub duration_ms: Option<u64>,
}

impl UnifiedMedia {
    pub fn image(id: String, url: String, width: u32, height: u32) -> Self {
        Self {
            id,
            kind: MediaKind::Image,
            url,
            preview_url: None,
            width,
            height,
            duration_ms: None,
        }
    }

    pub fn video(
        id: String,
        url: String,
        preview_url: Option<String>,
        width: u32,
        height: u32,
        duration_ms: u64,
    ) -> Self {
        Self {
            id,
            kind: MediaKind::Video,
            url,
            preview_url,
            width,
            height,
            duration_ms: Some(duration_ms),
        }
    }

    /// Images never carry a duration
    pub fn is_consistent(&self) -> bool {
        !(self.kind == MediaKind::Image && self.duration_ms.is_some())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnifiedPost {
    /// Unique within an aggregation session; assigned by the adapter
    #[serde(default)]
    pub id: String,
    /// The platform's own post id, used to address interactions
    pub platform_post_id: String,
    pub platform: PlatformId,
    pub author: UnifiedAuthor,
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub media: Vec<UnifiedMedia>,
    /// Epoch milliseconds
    pub published_at: i64,
    #[serde(default)]
    pub like_count: u64,
    #[serde(default)]
    pub comment_count: u64,
    #[serde(default)]
    pub share_count: u64,
    #[serde(default)]
    pub liked_by_viewer: bool,
    #[serde(default)]
    pub bookmarked_by_viewer: bool,
}

impl UnifiedPost {
    /// Check the model invariants
    ///
    /// The author must belong to the same platform as the post, and every
    /// image attachment must be free of a duration.
    pub fn validate(&self) -> Result<(), String> {
        if self.author.platform != self.platform {
            return Err(format!(
                "post {} is from {} but its author is from {}",
                self.platform_post_id, self.platform, self.author.platform
            ));
        }

        if let Some(media) = self.media.iter().find(|m| !m.is_consistent()) {
            return Err(format!(
                "post {} has image {} with a duration",
                self.platform_post_id, media.id
            ));
        }

        Ok(())
    }

    /// Publication time as a UTC timestamp
    pub fn published_at_utc(&self) -> Option<DateTime<Utc>> {
        Utc.timestamp_millis_opt(self.published_at).single()
    }
}

/// Interaction kinds understood by the HTTP adapter
///
/// The adapter contract takes free text; anything outside this set is
/// rejected by the adapter with a normal `false` result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InteractionKind {
    Like,
    Comment,
    Share,
    Bookmark,
}

impl InteractionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            InteractionKind::Like => "like",
            InteractionKind::Comment => "comment",
            InteractionKind::Share => "share",
            InteractionKind::Bookmark => "bookmark",
        }
    }

    /// Parse free-text interaction names, returning `None` for unknown kinds
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "like" => Some(InteractionKind::Like),
            "comment" | "reply" => Some(InteractionKind::Comment),
            "share" | "repost" | "boost" => Some(InteractionKind::Share),
            "bookmark" | "save" => Some(InteractionKind::Bookmark),
            _ => None,
        }
    }
}

impl std::fmt::Display for InteractionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
