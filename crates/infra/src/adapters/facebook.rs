//! Facebook Pages adapter (Graph API)
//!
//! The connected account is a page. Text posts go to `/{page}/feed`, a
//! single photo or video to `/{page}/photos` or `/{page}/videos`; several
//! photos are uploaded unpublished and attached to one feed post. Scheduling
//! uses `published=false` with `scheduled_publish_time`.

use chrono::{DateTime, Utc};
use postbridge_core::DispatchTarget;
use postbridge_domain::{
    MediaCategory, Platform, PlatformAnalytics, PlatformProfile, PostDraft, PostResult,
    ProfileMetrics, ProviderEndpoints, Result,
};
use reqwest::{Method, RequestBuilder};
use serde_json::{json, Value};

use super::common::{
    account_or_me, bearer, count_at, require_account, required_id, text_at, trim_base,
};
use crate::http::HttpClient;

const PLATFORM: Platform = Platform::Facebook;

#[derive(Debug)]
pub struct FacebookAdapter {
    http: HttpClient,
    api_base: String,
}

impl FacebookAdapter {
    pub fn new(http: HttpClient, endpoints: &ProviderEndpoints) -> Self {
        Self { http, api_base: trim_base(&endpoints.api_base_url).to_string() }
    }

    fn call(&self, target: &DispatchTarget, method: Method, path: &str) -> RequestBuilder {
        bearer(self.http.request(method, format!("{}/{path}", self.api_base)), target)
    }

    async fn publish(
        &self,
        target: &DispatchTarget,
        draft: &PostDraft,
        publish_at: Option<DateTime<Utc>>,
    ) -> Result<String> {
        let page = require_account(target)?;
        let mut form: Vec<(String, String)> = Vec::new();
        if let Some(at) = publish_at {
            form.push(("published".into(), "false".into()));
            form.push(("scheduled_publish_time".into(), at.timestamp().to_string()));
        }
        if let Some(place) = &draft.location {
            form.push(("place".into(), place.clone()));
        }

        let (path, pointer) = match draft.media.as_slice() {
            [] => {
                form.push(("message".into(), draft.text.clone()));
                (format!("{page}/feed"), "/id")
            }
            [single] if single.category() == Some(MediaCategory::Video) => {
                form.push(("file_url".into(), single.url.clone()));
                form.push(("description".into(), draft.text.clone()));
                (format!("{page}/videos"), "/id")
            }
            [single] => {
                form.push(("url".into(), single.url.clone()));
                form.push(("caption".into(), draft.text.clone()));
                (format!("{page}/photos"), "/post_id")
            }
            many => {
                for (index, media) in many.iter().enumerate() {
                    let photo = self
                        .call(target, Method::POST, &format!("{page}/photos"))
                        .form(&[("url", media.url.as_str()), ("published", "false")]);
                    let body: Value = self.http.json(PLATFORM, photo).await?;
                    let photo_id = required_id(PLATFORM, &body, "/id")?;
                    form.push((
                        format!("attached_media[{index}]"),
                        json!({ "media_fbid": photo_id }).to_string(),
                    ));
                }
                form.push(("message".into(), draft.text.clone()));
                (format!("{page}/feed"), "/id")
            }
        };

        let body: Value =
            self.http.json(PLATFORM, self.call(target, Method::POST, &path).form(&form)).await?;
        // Photo uploads report the feed story as post_id; fall back to the photo id.
        required_id(PLATFORM, &body, pointer).or_else(|_| required_id(PLATFORM, &body, "/id"))
    }

    pub async fn create_post(
        &self,
        target: &DispatchTarget,
        draft: &PostDraft,
    ) -> Result<PostResult> {
        let id = self.publish(target, draft, None).await?;
        let url = format!("https://www.facebook.com/{id}");
        Ok(PostResult::published(PLATFORM, id, Some(url)))
    }

    pub async fn schedule_post(
        &self,
        target: &DispatchTarget,
        draft: &PostDraft,
        publish_at: DateTime<Utc>,
    ) -> Result<PostResult> {
        let id = self.publish(target, draft, Some(publish_at)).await?;
        Ok(PostResult::scheduled(PLATFORM, id, None, publish_at))
    }

    pub async fn delete_post(&self, target: &DispatchTarget, post_id: &str) -> Result<()> {
        let request = self.call(target, Method::DELETE, &urlencoding::encode(post_id));
        self.http.execute(PLATFORM, request).await?;
        Ok(())
    }

    pub async fn get_analytics(
        &self,
        target: &DispatchTarget,
        post_id: Option<&str>,
    ) -> Result<PlatformAnalytics> {
        let mut analytics = PlatformAnalytics::for_post(PLATFORM, post_id.map(str::to_string));
        match post_id {
            Some(id) => {
                let request = self.call(target, Method::GET, &urlencoding::encode(id)).query(&[(
                    "fields",
                    "reactions.summary(total_count),comments.summary(total_count),shares",
                )]);
                let body: Value = self.http.json(PLATFORM, request).await?;
                analytics.likes = count_at(&body, "/reactions/summary/total_count");
                analytics.comments = count_at(&body, "/comments/summary/total_count");
                analytics.shares = count_at(&body, "/shares/count");
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
        let request = self
            .call(target, Method::GET, account_or_me(target))
            .query(&[("fields", "id,name,username,followers_count,link,picture{url}")]);
        let body: Value = self.http.json(PLATFORM, request).await?;

        let account_id = required_id(PLATFORM, &body, "/id")?;
        let name = text_at(&body, "/name");
        Ok(PlatformProfile {
            platform: PLATFORM,
            handle: text_at(&body, "/username")
                .or_else(|| name.clone())
                .unwrap_or_else(|| account_id.clone()),
            metrics: ProfileMetrics {
                display_name: name,
                followers_count: count_at(&body, "/followers_count"),
                following_count: None,
                profile_image_url: text_at(&body, "/picture/data/url"),
                profile_url: text_at(&body, "/link")
                    .or_else(|| Some(format!("https://www.facebook.com/{account_id}"))),
            },
            account_id,
        })
    }
}
