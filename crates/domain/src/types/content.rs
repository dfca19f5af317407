//! Operations callers can run against a connection and their outcomes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::connection::ProfileMetrics;
use super::platform::{Capability, MediaCategory, Platform};

/// Media referenced by URL; adapters fetch or hand the URL to the provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaAttachment {
    pub url: String,
    pub mime_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alt_text: Option<String>,
}

impl MediaAttachment {
    pub fn new(url: impl Into<String>, mime_type: impl Into<String>) -> Self {
        Self { url: url.into(), mime_type: mime_type.into(), alt_text: None }
    }

    pub fn category(&self) -> Option<MediaCategory> {
        MediaCategory::from_mime(&self.mime_type)
    }
}

/// Content of a post.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostDraft {
    pub text: String,
    /// Title for platforms that require one (Reddit, YouTube).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Community to publish into (Reddit subreddit).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
    #[serde(default)]
    pub media: Vec<MediaAttachment>,
    /// Continuation parts published as replies to the first post.
    #[serde(default)]
    pub thread: Vec<String>,
    /// Provider place or location identifier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reply_to: Option<String>,
}

impl PostDraft {
    pub fn text(text: impl Into<String>) -> Self {
        Self { text: text.into(), ..Self::default() }
    }

    pub fn with_media(mut self, media: MediaAttachment) -> Self {
        self.media.push(media);
        self
    }

    pub fn with_thread_part(mut self, part: impl Into<String>) -> Self {
        self.thread.push(part.into());
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_target(mut self, target: impl Into<String>) -> Self {
        self.target = Some(target.into());
        self
    }

    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    /// Whether any attachment is a video.
    pub fn has_video(&self) -> bool {
        self.media.iter().any(|m| m.category() == Some(MediaCategory::Video))
    }
}

/// Discriminant of a [`PlatformRequest`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    CreatePost,
    SchedulePost,
    DeletePost,
    GetAnalytics,
    GetProfile,
}

impl Operation {
    /// Capability gating this operation.
    pub const fn capability(self) -> Capability {
        match self {
            Self::CreatePost => Capability::Post,
            Self::SchedulePost => Capability::Schedule,
            Self::DeletePost => Capability::Delete,
            Self::GetAnalytics => Capability::Analytics,
            Self::GetProfile => Capability::Profile,
        }
    }
}

crate::impl_slug_conversions!(Operation {
    CreatePost => "create_post",
    SchedulePost => "schedule_post",
    DeletePost => "delete_post",
    GetAnalytics => "get_analytics",
    GetProfile => "get_profile",
});

/// Operation plus payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "operation", rename_all = "snake_case")]
pub enum PlatformRequest {
    CreatePost { draft: PostDraft },
    SchedulePost { draft: PostDraft, publish_at: DateTime<Utc> },
    DeletePost { post_id: String },
    GetAnalytics { post_id: Option<String> },
    GetProfile,
}

impl PlatformRequest {
    pub const fn operation(&self) -> Operation {
        match self {
            Self::CreatePost { .. } => Operation::CreatePost,
            Self::SchedulePost { .. } => Operation::SchedulePost,
            Self::DeletePost { .. } => Operation::DeletePost,
            Self::GetAnalytics { .. } => Operation::GetAnalytics,
            Self::GetProfile => Operation::GetProfile,
        }
    }

    /// Draft carried by post-producing operations.
    pub fn draft(&self) -> Option<&PostDraft> {
        match self {
            Self::CreatePost { draft } | Self::SchedulePost { draft, .. } => Some(draft),
            _ => None,
        }
    }

    pub fn draft_mut(&mut self) -> Option<&mut PostDraft> {
        match self {
            Self::CreatePost { draft } | Self::SchedulePost { draft, .. } => Some(draft),
            _ => None,
        }
    }
}

/// Successful publish or schedule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostResult {
    pub platform: Platform,
    pub post_id: String,
    pub url: Option<String>,
    pub published_at: Option<DateTime<Utc>>,
    pub scheduled_for: Option<DateTime<Utc>>,
    /// Ids of thread continuation posts, in order.
    #[serde(default)]
    pub thread_post_ids: Vec<String>,
    /// Capabilities dropped during negotiation.
    #[serde(default)]
    pub degraded: Vec<Capability>,
}

impl PostResult {
    pub fn published(platform: Platform, post_id: impl Into<String>, url: Option<String>) -> Self {
        Self {
            platform,
            post_id: post_id.into(),
            url,
            published_at: Some(Utc::now()),
            scheduled_for: None,
            thread_post_ids: Vec::new(),
            degraded: Vec::new(),
        }
    }

    pub fn scheduled(
        platform: Platform,
        post_id: impl Into<String>,
        url: Option<String>,
        publish_at: DateTime<Utc>,
    ) -> Self {
        Self {
            platform,
            post_id: post_id.into(),
            url,
            published_at: None,
            scheduled_for: Some(publish_at),
            thread_post_ids: Vec::new(),
            degraded: Vec::new(),
        }
    }
}

/// Engagement counters; a counter the provider did not report is `None`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlatformAnalytics {
    pub platform: Option<Platform>,
    pub post_id: Option<String>,
    pub impressions: Option<u64>,
    pub likes: Option<u64>,
    pub comments: Option<u64>,
    pub shares: Option<u64>,
    pub views: Option<u64>,
    pub followers: Option<u64>,
    pub fetched_at: Option<DateTime<Utc>>,
}

impl PlatformAnalytics {
    pub fn for_post(platform: Platform, post_id: Option<String>) -> Self {
        Self { platform: Some(platform), post_id, fetched_at: Some(Utc::now()), ..Self::default() }
    }
}

/// Account identity and metrics as reported by the provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlatformProfile {
    pub platform: Platform,
    pub account_id: String,
    pub handle: String,
    pub metrics: ProfileMetrics,
}

/// Outcome of [`PlatformRequest`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PlatformResponse {
    Post(PostResult),
    Deleted { post_id: String },
    Analytics(PlatformAnalytics),
    Profile(PlatformProfile),
}
