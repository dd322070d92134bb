//! Static per-platform knowledge
//!
//! Which hosts belong to a platform, where its API lives by default, and
//! which interactions and post shapes it accepts.

use url::Url;

use crate::transport::host_matches;
use crate::types::{InteractionKind, PlatformId};

#[derive(Debug)]
pub struct PlatformProfile {
    pub platform: PlatformId,
    /// Hosts owned by the platform; subdomains of these match as well
    pub hosts: &'static [&'static str],
    /// Hosts shared with other services, owned only below a path prefix
    pub shared_hosts: &'static [(&'static str, &'static str)],
    pub default_base_url: &'static str,
    pub interactions: &'static [InteractionKind],
    pub accepts_text_posts: bool,
    /// Posting requires at least one media reference
    pub requires_media: bool,
}

impl PlatformProfile {
    pub fn supports(&self, kind: InteractionKind) -> bool {
        self.interactions.contains(&kind)
    }

    /// Whether `url` points at this platform's API
    pub fn owns(&self, url: &Url) -> bool {
        let Some(host) = url.host_str() else {
            return false;
        };

        self.hosts.iter().any(|known| host_matches(host, known))
            || self.shared_hosts.iter().any(|(shared, prefix)| {
                host.eq_ignore_ascii_case(shared) && url.path().starts_with(prefix)
            })
    }

    /// Every host an adapter for this platform may send its credential to
    ///
    /// Includes shared hosts; an adapter only ever talks to its own base URL.
    pub fn credential_hosts(&self) -> Vec<String> {
        self.hosts
            .iter()
            .chain(self.shared_hosts.iter().map(|(host, _)| host))
            .map(|h| h.to_string())
            .collect()
    }
}

static INSTAGRAM: PlatformProfile = PlatformProfile {
    platform: PlatformId::Instagram,
    hosts: &["instagram.com"],
    shared_hosts: &[],
    default_base_url: "https://graph.instagram.com/v18.0/",
    interactions: &[
        InteractionKind::Like,
        InteractionKind::Comment,
        InteractionKind::Bookmark,
    ],
    accepts_text_posts: true,
    requires_media: true,
};

static TIKTOK: PlatformProfile = PlatformProfile {
    platform: PlatformId::TikTok,
    hosts: &["tiktokapis.com", "tiktok.com"],
    shared_hosts: &[],
    default_base_url: "https://open.tiktokapis.com/v2/",
    interactions: &[
        InteractionKind::Like,
        InteractionKind::Comment,
        InteractionKind::Bookmark,
    ],
    accepts_text_posts: true,
    requires_media: true,
};

static YOUTUBE: PlatformProfile = PlatformProfile {
    platform: PlatformId::YouTube,
    hosts: &["youtube.googleapis.com", "youtube.com"],
    shared_hosts: &[("www.googleapis.com", "/youtube/")],
    default_base_url: "https://www.googleapis.com/youtube/v3/",
    interactions: &[InteractionKind::Comment, InteractionKind::Bookmark],
    accepts_text_posts: false,
    requires_media: false,
};

static BLUESKY: PlatformProfile = PlatformProfile {
    platform: PlatformId::Bluesky,
    hosts: &["bsky.social", "bsky.app"],
    shared_hosts: &[],
    default_base_url: "https://bsky.social/xrpc/",
    interactions: &[
        InteractionKind::Like,
        InteractionKind::Comment,
        InteractionKind::Share,
    ],
    accepts_text_posts: true,
    requires_media: false,
};

static MASTODON: PlatformProfile = PlatformProfile {
    platform: PlatformId::Mastodon,
    hosts: &["mastodon.social"],
    shared_hosts: &[],
    default_base_url: "https://mastodon.social/api/v1/",
    interactions: &[
        InteractionKind::Like,
        InteractionKind::Comment,
        InteractionKind::Share,
    ],
    accepts_text_posts: true,
    requires_media: false,
};

pub fn profile(platform: PlatformId) -> &'static PlatformProfile {
    match platform {
        PlatformId::Instagram => &INSTAGRAM,
        PlatformId::TikTok => &TIKTOK,
        PlatformId::YouTube => &YOUTUBE,
        PlatformId::Bluesky => &BLUESKY,
        PlatformId::Mastodon => &MASTODON,
    }
}
