//! Supported platforms and their static capability descriptors.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::IntegrationError;

/// Every external platform the integration layer can connect to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    #[serde(alias = "twitter")]
    X,
    Facebook,
    Instagram,
    #[serde(rename = "linkedin")]
    LinkedIn,
    #[serde(rename = "tiktok")]
    TikTok,
    #[serde(rename = "youtube")]
    YouTube,
    Reddit,
    Mastodon,
    Threads,
}

impl Platform {
    /// All platforms in declaration order.
    pub const ALL: [Platform; 9] = [
        Platform::X,
        Platform::Facebook,
        Platform::Instagram,
        Platform::LinkedIn,
        Platform::TikTok,
        Platform::YouTube,
        Platform::Reddit,
        Platform::Mastodon,
        Platform::Threads,
    ];

    /// Lowercase identifier used in config keys, logs and URLs.
    pub const fn slug(self) -> &'static str {
        match self {
            Self::X => "x",
            Self::Facebook => "facebook",
            Self::Instagram => "instagram",
            Self::LinkedIn => "linkedin",
            Self::TikTok => "tiktok",
            Self::YouTube => "youtube",
            Self::Reddit => "reddit",
            Self::Mastodon => "mastodon",
            Self::Threads => "threads",
        }
    }

    /// Whether the platform is federated and needs an instance URL.
    pub const fn is_federated(self) -> bool {
        matches!(self, Self::Mastodon)
    }

    /// Static capability descriptor for this platform.
    pub const fn capabilities(self) -> PlatformCapabilities {
        use MediaCategory::{Gif, Image, Video};

        match self {
            Self::X => PlatformCapabilities {
                can_post: true,
                can_schedule: false,
                can_upload_media: true,
                can_upload_video: false,
                supports_threading: true,
                supports_geotagging: false,
                supports_mentions: true,
                supports_hashtags: true,
                can_delete: true,
                can_fetch_analytics: true,
                can_fetch_profile: true,
                requires_media: false,
                max_text_length: 280,
                max_media_attachments: 4,
                supported_media: &[Image, Gif],
            },
            Self::Facebook => PlatformCapabilities {
                can_post: true,
                can_schedule: true,
                can_upload_media: true,
                can_upload_video: true,
                supports_threading: false,
                supports_geotagging: true,
                supports_mentions: true,
                supports_hashtags: true,
                can_delete: true,
                can_fetch_analytics: true,
                can_fetch_profile: true,
                requires_media: false,
                max_text_length: 63_206,
                max_media_attachments: 10,
                supported_media: &[Image, Gif, Video],
            },
            Self::Instagram => PlatformCapabilities {
                can_post: true,
                can_schedule: false,
                can_upload_media: true,
                can_upload_video: true,
                supports_threading: false,
                supports_geotagging: true,
                supports_mentions: true,
                supports_hashtags: true,
                can_delete: false,
                can_fetch_analytics: true,
                can_fetch_profile: true,
                requires_media: true,
                max_text_length: 2_200,
                max_media_attachments: 10,
                supported_media: &[Image, Video],
            },
            Self::LinkedIn => PlatformCapabilities {
                can_post: true,
                can_schedule: false,
                can_upload_media: true,
                can_upload_video: false,
                supports_threading: false,
                supports_geotagging: false,
                supports_mentions: true,
                supports_hashtags: true,
                can_delete: true,
                can_fetch_analytics: false,
                can_fetch_profile: true,
                requires_media: false,
                max_text_length: 3_000,
                max_media_attachments: 9,
                supported_media: &[Image],
            },
            Self::TikTok => PlatformCapabilities {
                can_post: true,
                can_schedule: false,
                can_upload_media: true,
                can_upload_video: true,
                supports_threading: false,
                supports_geotagging: false,
                supports_mentions: true,
                supports_hashtags: true,
                can_delete: false,
                can_fetch_analytics: true,
                can_fetch_profile: true,
                requires_media: true,
                max_text_length: 2_200,
                max_media_attachments: 1,
                supported_media: &[Video],
            },
            Self::YouTube => PlatformCapabilities {
                can_post: true,
                can_schedule: true,
                can_upload_media: true,
                can_upload_video: true,
                supports_threading: false,
                supports_geotagging: false,
                supports_mentions: false,
                supports_hashtags: true,
                can_delete: true,
                can_fetch_analytics: true,
                can_fetch_profile: true,
                requires_media: true,
                max_text_length: 5_000,
                max_media_attachments: 1,
                supported_media: &[Video],
            },
            Self::Reddit => PlatformCapabilities {
                can_post: true,
                can_schedule: false,
                can_upload_media: true,
                can_upload_video: false,
                supports_threading: false,
                supports_geotagging: false,
                supports_mentions: true,
                supports_hashtags: false,
                can_delete: true,
                can_fetch_analytics: true,
                can_fetch_profile: true,
                requires_media: false,
                max_text_length: 40_000,
                max_media_attachments: 1,
                supported_media: &[Image, Gif],
            },
            Self::Mastodon => PlatformCapabilities {
                can_post: true,
                can_schedule: true,
                can_upload_media: true,
                can_upload_video: true,
                supports_threading: true,
                supports_geotagging: false,
                supports_mentions: true,
                supports_hashtags: true,
                can_delete: true,
                can_fetch_analytics: true,
                can_fetch_profile: true,
                requires_media: false,
                max_text_length: 500,
                max_media_attachments: 4,
                supported_media: &[Image, Gif, Video],
            },
            Self::Threads => PlatformCapabilities {
                can_post: true,
                can_schedule: false,
                can_upload_media: true,
                can_upload_video: true,
                supports_threading: true,
                supports_geotagging: false,
                supports_mentions: true,
                supports_hashtags: true,
                can_delete: false,
                can_fetch_analytics: true,
                can_fetch_profile: true,
                requires_media: false,
                max_text_length: 500,
                max_media_attachments: 1,
                supported_media: &[Image, Video],
            },
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.slug())
    }
}

impl FromStr for Platform {
    type Err = IntegrationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase();
        if normalized == "twitter" {
            return Ok(Self::X);
        }
        Self::ALL
            .into_iter()
            .find(|platform| platform.slug() == normalized)
            .ok_or_else(|| IntegrationError::InvalidRequest(format!("unknown platform '{s}'")))
    }
}

/// Coarse media families a platform accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaCategory {
    Image,
    Gif,
    Video,
}

impl MediaCategory {
    /// Classify a MIME type; `None` for anything that is not image or video.
    pub fn from_mime(mime: &str) -> Option<Self> {
        let mime = mime.trim().to_ascii_lowercase();
        if mime == "image/gif" {
            Some(Self::Gif)
        } else if mime.starts_with("image/") {
            Some(Self::Image)
        } else if mime.starts_with("video/") {
            Some(Self::Video)
        } else {
            None
        }
    }
}

impl fmt::Display for MediaCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Image => f.write_str("image"),
            Self::Gif => f.write_str("gif"),
            Self::Video => f.write_str("video"),
        }
    }
}

/// Static description of what one platform supports.
///
/// Consulted before every dispatch; never discovered by attempting a call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PlatformCapabilities {
    pub can_post: bool,
    pub can_schedule: bool,
    pub can_upload_media: bool,
    pub can_upload_video: bool,
    pub supports_threading: bool,
    pub supports_geotagging: bool,
    pub supports_mentions: bool,
    pub supports_hashtags: bool,
    pub can_delete: bool,
    pub can_fetch_analytics: bool,
    pub can_fetch_profile: bool,
    /// Text-only posts are rejected.
    pub requires_media: bool,
    /// Limit in Unicode scalar values, applied to every thread part.
    pub max_text_length: usize,
    pub max_media_attachments: usize,
    pub supported_media: &'static [MediaCategory],
}

impl PlatformCapabilities {
    /// Whether media of `category` may be attached.
    pub fn accepts_media(&self, category: MediaCategory) -> bool {
        self.supported_media.contains(&category)
    }
}

/// A capability an operation may need, named in
/// [`IntegrationError::UnsupportedOperation`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    Post,
    Schedule,
    MediaUpload,
    VideoUpload,
    Threading,
    Geotagging,
    Mentions,
    Hashtags,
    Delete,
    Analytics,
    Profile,
    TextOnlyPost,
    Media(MediaCategory),
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Post => f.write_str("post"),
            Self::Schedule => f.write_str("schedule"),
            Self::MediaUpload => f.write_str("media_upload"),
            Self::VideoUpload => f.write_str("video_upload"),
            Self::Threading => f.write_str("threading"),
            Self::Geotagging => f.write_str("geotagging"),
            Self::Mentions => f.write_str("mentions"),
            Self::Hashtags => f.write_str("hashtags"),
            Self::Delete => f.write_str("delete"),
            Self::Analytics => f.write_str("analytics"),
            Self::Profile => f.write_str("profile"),
            Self::TextOnlyPost => f.write_str("text_only_post"),
            Self::Media(category) => write!(f, "{category}_media"),
        }
    }
}
