//! Instagram adapter (Instagram API with Instagram Login)
//!
//! Publishing is two-step: create a media container, then publish it.
//! Several attachments become a carousel of child containers. Video
//! containers are polled until processing finishes.

use postbridge_core::DispatchTarget;
use postbridge_domain::{
    Capability, IntegrationError, MediaAttachment, MediaCategory, Platform, PlatformAnalytics,
    PlatformProfile, PostDraft, PostResult, ProfileMetrics, ProviderEndpoints, Result,
};
use reqwest::{Method, RequestBuilder};
use serde_json::Value;

use super::common::{
    bearer, count_at, require_account, required_id, text_at, trim_base, ContainerPolling,
};
use crate::http::HttpClient;

const PLATFORM: Platform = Platform::Instagram;

#[derive(Debug)]
pub struct InstagramAdapter {
    http: HttpClient,
    api_base: String,
    polling: ContainerPolling,
}

impl InstagramAdapter {
    pub fn new(http: HttpClient, endpoints: &ProviderEndpoints) -> Self {
        Self {
            http,
            api_base: trim_base(&endpoints.api_base_url).to_string(),
            polling: ContainerPolling::default(),
        }
    }

    pub fn with_polling(mut self, polling: ContainerPolling) -> Self {
        self.polling = polling;
        self
    }

    fn call(&self, target: &DispatchTarget, method: Method, path: &str) -> RequestBuilder {
        bearer(self.http.request(method, format!("{}/{path}", self.api_base)), target)
    }

    async fn container(
        &self,
        target: &DispatchTarget,
        form: Vec<(&str, String)>,
        is_video: bool,
    ) -> Result<String> {
        let user = require_account(target)?;
        let request = self.call(target, Method::POST, &format!("{user}/media")).form(&form);
        let body: Value = self.http.json(PLATFORM, request).await?;
        let id = required_id(PLATFORM, &body, "/id")?;

        if is_video {
            let container_id = id.as_str();
            self.polling
                .wait(PLATFORM, || async move {
                    let status = self
                        .call(target, Method::GET, container_id)
                        .query(&[("fields", "status_code")]);
                    let body: Value = self.http.json(PLATFORM, status).await?;
                    Ok(text_at(&body, "/status_code"))
                })
                .await?;
        }
        Ok(id)
    }

    fn media_fields(media: &MediaAttachment, form: &mut Vec<(&str, String)>) -> bool {
        if media.category() == Some(MediaCategory::Video) {
            form.push(("media_type", "REELS".into()));
            form.push(("video_url", media.url.clone()));
            true
        } else {
            form.push(("image_url", media.url.clone()));
            false
        }
    }

    pub async fn create_post(
        &self,
        target: &DispatchTarget,
        draft: &PostDraft,
    ) -> Result<PostResult> {
        let creation_id = match draft.media.as_slice() {
            [] => return Err(IntegrationError::unsupported(PLATFORM, Capability::TextOnlyPost)),
            [single] => {
                let mut form = vec![("caption", draft.text.clone())];
                if let Some(location) = &draft.location {
                    form.push(("location_id", location.clone()));
                }
                let is_video = Self::media_fields(single, &mut form);
                self.container(target, form, is_video).await?
            }
            many => {
                let mut children = Vec::with_capacity(many.len());
                for media in many {
                    let mut form = vec![("is_carousel_item", "true".to_string())];
                    let is_video = Self::media_fields(media, &mut form);
                    if is_video {
                        // Carousel children use VIDEO rather than REELS.
                        form[1] = ("media_type", "VIDEO".into());
                    }
                    children.push(self.container(target, form, is_video).await?);
                }
                let mut form = vec![
                    ("media_type", "CAROUSEL".to_string()),
                    ("children", children.join(",")),
                    ("caption", draft.text.clone()),
                ];
                if let Some(location) = &draft.location {
                    form.push(("location_id", location.clone()));
                }
                self.container(target, form, false).await?
            }
        };

        let user = require_account(target)?;
        let publish = self
            .call(target, Method::POST, &format!("{user}/media_publish"))
            .form(&[("creation_id", creation_id.as_str())]);
        let body: Value = self.http.json(PLATFORM, publish).await?;
        let media_id = required_id(PLATFORM, &body, "/id")?;

        let permalink = self
            .call(target, Method::GET, &media_id)
            .query(&[("fields", "permalink")]);
        let url = match self.http.json::<Value>(PLATFORM, permalink).await {
            Ok(body) => text_at(&body, "/permalink"),
            Err(_) => None,
        };
        Ok(PostResult::published(PLATFORM, media_id, url))
    }

    pub async fn schedule_post(
        &self,
        _target: &DispatchTarget,
        _draft: &PostDraft,
    ) -> Result<PostResult> {
        Err(IntegrationError::unsupported(PLATFORM, Capability::Schedule))
    }

    pub async fn delete_post(&self, _target: &DispatchTarget, _post_id: &str) -> Result<()> {
        Err(IntegrationError::unsupported(PLATFORM, Capability::Delete))
    }

    pub async fn get_analytics(
        &self,
        target: &DispatchTarget,
        post_id: Option<&str>,
    ) -> Result<PlatformAnalytics> {
        let mut analytics = PlatformAnalytics::for_post(PLATFORM, post_id.map(str::to_string));
        match post_id {
            Some(id) => {
                let request = self
                    .call(target, Method::GET, &format!("{}/insights", urlencoding::encode(id)))
                    .query(&[("metric", "views,reach,likes,comments,shares")]);
                let body: Value = self.http.json(PLATFORM, request).await?;
                let metrics = body.pointer("/data").and_then(Value::as_array);
                for metric in metrics.into_iter().flatten() {
                    let value = count_at(metric, "/values/0/value");
                    match metric.get("name").and_then(Value::as_str) {
                        Some("views") => analytics.views = value,
                        Some("reach") => analytics.impressions = value,
                        Some("likes") => analytics.likes = value,
                        Some("comments") => analytics.comments = value,
                        Some("shares") => analytics.shares = value,
                        _ => {}
                    }
                }
            }
            None => {
                let request = self
                    .call(target, Method::GET, require_account(target)?)
                    .query(&[("fields", "followers_count")]);
                let body: Value = self.http.json(PLATFORM, request).await?;
                analytics.followers = count_at(&body, "/followers_count");
            }
        }
        Ok(analytics)
    }

    pub async fn get_profile(&self, target: &DispatchTarget) -> Result<PlatformProfile> {
        let request = self.call(target, Method::GET, "me").query(&[(
            "fields",
            "user_id,username,name,followers_count,follows_count,profile_picture_url",
        )]);
        let body: Value = self.http.json(PLATFORM, request).await?;

        let account_id = required_id(PLATFORM, &body, "/user_id")
            .or_else(|_| required_id(PLATFORM, &body, "/id"))?;
        let handle = text_at(&body, "/username")
            .ok_or_else(|| IntegrationError::exchange(PLATFORM, "response missing username"))?;
        Ok(PlatformProfile {
            platform: PLATFORM,
            account_id,
            metrics: ProfileMetrics {
                display_name: text_at(&body, "/name"),
                followers_count: count_at(&body, "/followers_count"),
                following_count: count_at(&body, "/follows_count"),
                profile_image_url: text_at(&body, "/profile_picture_url"),
                profile_url: Some(format!("https://www.instagram.com/{handle}")),
            },
            handle,
        })
    }
}
