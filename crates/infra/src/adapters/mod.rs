//! Platform adapters and the registry that dispatches to them
//!
//! Each adapter wraps one provider API behind the same five operations.
//! The registry owns one adapter per platform and implements
//! [`PlatformGateway`], so core services never see provider HTTP shapes.

mod common;
pub mod facebook;
pub mod instagram;
pub mod linkedin;
pub mod mastodon;
pub mod reddit;
pub mod threads;
pub mod tiktok;
pub mod x;
pub mod youtube;

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use postbridge_core::{DispatchTarget, PlatformGateway, SecretsProvider};
use postbridge_domain::{
    IntegrationConfig, Platform, PlatformAnalytics, PlatformProfile,
    PlatformRequest, PlatformResponse, PostDraft, PostResult, Result,
};
use tracing::{debug, instrument};

pub use common::ContainerPolling;
pub use facebook::FacebookAdapter;
pub use instagram::InstagramAdapter;
pub use linkedin::LinkedInAdapter;
pub use mastodon::MastodonAdapter;
pub use reddit::RedditAdapter;
pub use threads::ThreadsAdapter;
pub use tiktok::TikTokAdapter;
pub use x::XAdapter;
pub use youtube::YouTubeAdapter;

use crate::http::HttpClient;

/// One adapter per supported platform.
#[derive(Debug)]
pub enum PlatformAdapter {
    X(XAdapter),
    Facebook(FacebookAdapter),
    Instagram(InstagramAdapter),
    LinkedIn(LinkedInAdapter),
    TikTok(TikTokAdapter),
    YouTube(YouTubeAdapter),
    Reddit(RedditAdapter),
    Mastodon(MastodonAdapter),
    Threads(ThreadsAdapter),
}

impl PlatformAdapter {
    /// Build the adapter for `platform` from configured endpoints.
    pub fn build(
        platform: Platform,
        config: &IntegrationConfig,
        http: HttpClient,
        secrets: Arc<dyn SecretsProvider>,
    ) -> Result<Self> {
        // Mastodon resolves its instance per connection.
        if platform == Platform::Mastodon {
            return Ok(Self::Mastodon(MastodonAdapter::new(http, config.clone())));
        }

        let endpoints = config.endpoints(platform, None)?;
        Ok(match platform {
            Platform::X => Self::X(XAdapter::new(http, &endpoints, secrets)),
            Platform::Facebook => Self::Facebook(FacebookAdapter::new(http, &endpoints)),
            Platform::Instagram => Self::Instagram(InstagramAdapter::new(http, &endpoints)),
            Platform::LinkedIn => Self::LinkedIn(LinkedInAdapter::new(http, &endpoints)),
            Platform::TikTok => Self::TikTok(TikTokAdapter::new(http, &endpoints)),
            Platform::YouTube => Self::YouTube(YouTubeAdapter::new(http, &endpoints)),
            Platform::Reddit => Self::Reddit(RedditAdapter::new(http, &endpoints)),
            Platform::Threads => Self::Threads(ThreadsAdapter::new(http, &endpoints)),
            Platform::Mastodon => Self::Mastodon(MastodonAdapter::new(http, config.clone())),
        })
    }

    pub const fn platform(&self) -> Platform {
        match self {
            Self::X(_) => Platform::X,
            Self::Facebook(_) => Platform::Facebook,
            Self::Instagram(_) => Platform::Instagram,
            Self::LinkedIn(_) => Platform::LinkedIn,
            Self::TikTok(_) => Platform::TikTok,
            Self::YouTube(_) => Platform::YouTube,
            Self::Reddit(_) => Platform::Reddit,
            Self::Mastodon(_) => Platform::Mastodon,
            Self::Threads(_) => Platform::Threads,
        }
    }

    pub async fn create_post(
        &self,
        target: &DispatchTarget,
        draft: &PostDraft,
    ) -> Result<PostResult> {
        match self {
            Self::X(a) => a.create_post(target, draft).await,
            Self::Facebook(a) => a.create_post(target, draft).await,
            Self::Instagram(a) => a.create_post(target, draft).await,
            Self::LinkedIn(a) => a.create_post(target, draft).await,
            Self::TikTok(a) => a.create_post(target, draft).await,
            Self::YouTube(a) => a.create_post(target, draft).await,
            Self::Reddit(a) => a.create_post(target, draft).await,
            Self::Mastodon(a) => a.create_post(target, draft).await,
            Self::Threads(a) => a.create_post(target, draft).await,
        }
    }

    pub async fn schedule_post(
        &self,
        target: &DispatchTarget,
        draft: &PostDraft,
        publish_at: DateTime<Utc>,
    ) -> Result<PostResult> {
        match self {
            Self::Facebook(a) => a.schedule_post(target, draft, publish_at).await,
            Self::YouTube(a) => a.schedule_post(target, draft, publish_at).await,
            Self::Mastodon(a) => a.schedule_post(target, draft, publish_at).await,
            Self::X(a) => a.schedule_post(target, draft).await,
            Self::Instagram(a) => a.schedule_post(target, draft).await,
            Self::LinkedIn(a) => a.schedule_post(target, draft).await,
            Self::TikTok(a) => a.schedule_post(target, draft).await,
            Self::Reddit(a) => a.schedule_post(target, draft).await,
            Self::Threads(a) => a.schedule_post(target, draft).await,
        }
    }

    pub async fn delete_post(&self, target: &DispatchTarget, post_id: &str) -> Result<()> {
        match self {
            Self::X(a) => a.delete_post(target, post_id).await,
            Self::Facebook(a) => a.delete_post(target, post_id).await,
            Self::Instagram(a) => a.delete_post(target, post_id).await,
            Self::LinkedIn(a) => a.delete_post(target, post_id).await,
            Self::TikTok(a) => a.delete_post(target, post_id).await,
            Self::YouTube(a) => a.delete_post(target, post_id).await,
            Self::Reddit(a) => a.delete_post(target, post_id).await,
            Self::Mastodon(a) => a.delete_post(target, post_id).await,
            Self::Threads(a) => a.delete_post(target, post_id).await,
        }
    }

    pub async fn get_analytics(
        &self,
        target: &DispatchTarget,
        post_id: Option<&str>,
    ) -> Result<PlatformAnalytics> {
        match self {
            Self::X(a) => a.get_analytics(target, post_id).await,
            Self::Facebook(a) => a.get_analytics(target, post_id).await,
            Self::Instagram(a) => a.get_analytics(target, post_id).await,
            Self::LinkedIn(a) => a.get_analytics(target, post_id).await,
            Self::TikTok(a) => a.get_analytics(target, post_id).await,
            Self::YouTube(a) => a.get_analytics(target, post_id).await,
            Self::Reddit(a) => a.get_analytics(target, post_id).await,
            Self::Mastodon(a) => a.get_analytics(target, post_id).await,
            Self::Threads(a) => a.get_analytics(target, post_id).await,
        }
    }

    pub async fn get_profile(&self, target: &DispatchTarget) -> Result<PlatformProfile> {
        match self {
            Self::X(a) => a.get_profile(target).await,
            Self::Facebook(a) => a.get_profile(target).await,
            Self::Instagram(a) => a.get_profile(target).await,
            Self::LinkedIn(a) => a.get_profile(target).await,
            Self::TikTok(a) => a.get_profile(target).await,
            Self::YouTube(a) => a.get_profile(target).await,
            Self::Reddit(a) => a.get_profile(target).await,
            Self::Mastodon(a) => a.get_profile(target).await,
            Self::Threads(a) => a.get_profile(target).await,
        }
    }

    /// Run one negotiated request.
    pub async fn dispatch(
        &self,
        target: &DispatchTarget,
        request: PlatformRequest,
    ) -> Result<PlatformResponse> {
        Ok(match request {
            PlatformRequest::CreatePost { draft } => {
                PlatformResponse::Post(self.create_post(target, &draft).await?)
            }
            PlatformRequest::SchedulePost { draft, publish_at } => {
                PlatformResponse::Post(self.schedule_post(target, &draft, publish_at).await?)
            }
            PlatformRequest::DeletePost { post_id } => {
                self.delete_post(target, &post_id).await?;
                PlatformResponse::Deleted { post_id }
            }
            PlatformRequest::GetAnalytics { post_id } => {
                PlatformResponse::Analytics(self.get_analytics(target, post_id.as_deref()).await?)
            }
            PlatformRequest::GetProfile => {
                PlatformResponse::Profile(self.get_profile(target).await?)
            }
        })
    }
}

/// Adapter lookup by platform; the infra implementation of
/// [`PlatformGateway`].
///
/// Holds exactly one adapter per platform, so lookup cannot fail.
#[derive(Debug)]
pub struct AdapterRegistry {
    x: PlatformAdapter,
    facebook: PlatformAdapter,
    instagram: PlatformAdapter,
    linkedin: PlatformAdapter,
    tiktok: PlatformAdapter,
    youtube: PlatformAdapter,
    reddit: PlatformAdapter,
    mastodon: PlatformAdapter,
    threads: PlatformAdapter,
}

impl AdapterRegistry {
    /// Build the adapter for every platform.
    pub fn new(
        config: &IntegrationConfig,
        http: HttpClient,
        secrets: Arc<dyn SecretsProvider>,
    ) -> Result<Self> {
        let build = |platform| {
            PlatformAdapter::build(platform, config, http.clone(), Arc::clone(&secrets))
        };
        Ok(Self {
            x: build(Platform::X)?,
            facebook: build(Platform::Facebook)?,
            instagram: build(Platform::Instagram)?,
            linkedin: build(Platform::LinkedIn)?,
            tiktok: build(Platform::TikTok)?,
            youtube: build(Platform::YouTube)?,
            reddit: build(Platform::Reddit)?,
            mastodon: build(Platform::Mastodon)?,
            threads: build(Platform::Threads)?,
        })
    }

    pub fn get(&self, platform: Platform) -> &PlatformAdapter {
        match platform {
            Platform::X => &self.x,
            Platform::Facebook => &self.facebook,
            Platform::Instagram => &self.instagram,
            Platform::LinkedIn => &self.linkedin,
            Platform::TikTok => &self.tiktok,
            Platform::YouTube => &self.youtube,
            Platform::Reddit => &self.reddit,
            Platform::Mastodon => &self.mastodon,
            Platform::Threads => &self.threads,
        }
    }
}

#[async_trait]
impl PlatformGateway for AdapterRegistry {
    #[instrument(skip_all, fields(platform = %target.platform, operation = ?request.operation()))]
    async fn dispatch(
        &self,
        target: DispatchTarget,
        request: PlatformRequest,
    ) -> Result<PlatformResponse> {
        let response = self.get(target.platform).dispatch(&target, request).await?;
        debug!("Platform request completed");
        Ok(response)
    }
}
