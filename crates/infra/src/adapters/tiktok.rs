//! TikTok adapter (Content Posting API v2)
//!
//! Videos are published with `PULL_FROM_URL`, so TikTok fetches the file
//! itself; the returned publish id identifies the post. Every response
//! carries an `error` object whose code is `"ok"` on success.

use postbridge_core::DispatchTarget;
use postbridge_domain::{
    Capability, IntegrationError, Platform, PlatformAnalytics, PlatformProfile, PostDraft,
    PostResult, ProfileMetrics, ProviderEndpoints, Result,
};
use reqwest::{Method, RequestBuilder};
use serde_json::{json, Value};

use super::common::{bearer, count_at, required_id, text_at, title_for, trim_base};
use crate::http::HttpClient;

const PLATFORM: Platform = Platform::TikTok;
const TITLE_LIMIT: usize = 2_200;
const USER_FIELDS: &str =
    "open_id,avatar_url,display_name,username,follower_count,following_count,profile_deep_link";

#[derive(Debug)]
pub struct TikTokAdapter {
    http: HttpClient,
    api_base: String,
}

/// Fail on a non-`ok` error code in a 2xx body.
fn check_envelope(body: &Value) -> Result<()> {
    match text_at(body, "/error/code").as_deref() {
        None | Some("ok") => Ok(()),
        Some(code) => {
            let message = text_at(body, "/error/message").unwrap_or_default();
            Err(IntegrationError::exchange(PLATFORM, format!("{code}: {message}")))
        }
    }
}

impl TikTokAdapter {
    pub fn new(http: HttpClient, endpoints: &ProviderEndpoints) -> Self {
        Self { http, api_base: trim_base(&endpoints.api_base_url).to_string() }
    }

    fn call(&self, target: &DispatchTarget, method: Method, path: &str) -> RequestBuilder {
        bearer(self.http.request(method, format!("{}{path}", self.api_base)), target)
    }

    async fn envelope(&self, request: RequestBuilder) -> Result<Value> {
        let body: Value = self.http.json(PLATFORM, request).await?;
        check_envelope(&body)?;
        Ok(body)
    }

    async fn user_info(&self, target: &DispatchTarget) -> Result<Value> {
        let request = self
            .call(target, Method::GET, "/v2/user/info/")
            .query(&[("fields", USER_FIELDS)]);
        self.envelope(request).await
    }

    pub async fn create_post(
        &self,
        target: &DispatchTarget,
        draft: &PostDraft,
    ) -> Result<PostResult> {
        let video = draft
            .media
            .first()
            .ok_or_else(|| IntegrationError::unsupported(PLATFORM, Capability::TextOnlyPost))?;

        let payload = json!({
            "post_info": {
                "title": title_for(draft, TITLE_LIMIT),
                "privacy_level": "PUBLIC_TO_EVERYONE",
                "disable_comment": false,
                "disable_duet": false,
                "disable_stitch": false
            },
            "source_info": { "source": "PULL_FROM_URL", "video_url": video.url }
        });
        let request =
            self.call(target, Method::POST, "/v2/post/publish/video/init/").json(&payload);
        let body = self.envelope(request).await?;
        let publish_id = required_id(PLATFORM, &body, "/data/publish_id")?;

        Ok(PostResult::published(PLATFORM, publish_id, None))
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
                    .call(target, Method::POST, "/v2/video/query/")
                    .query(&[("fields", "id,view_count,like_count,comment_count,share_count")])
                    .json(&json!({ "filters": { "video_ids": [id] } }));
                let body = self.envelope(request).await?;
                let video = body.pointer("/data/videos/0").ok_or_else(|| {
                    IntegrationError::NotFound { resource: "tiktok video", id: id.to_string() }
                })?;
                analytics.views = count_at(video, "/view_count");
                analytics.likes = count_at(video, "/like_count");
                analytics.comments = count_at(video, "/comment_count");
                analytics.shares = count_at(video, "/share_count");
            }
            None => {
                let body = self.user_info(target).await?;
                analytics.followers = count_at(&body, "/data/user/follower_count");
            }
        }
        Ok(analytics)
    }

    pub async fn get_profile(&self, target: &DispatchTarget) -> Result<PlatformProfile> {
        let body = self.user_info(target).await?;
        let account_id = required_id(PLATFORM, &body, "/data/user/open_id")?;
        let display_name = text_at(&body, "/data/user/display_name");

        Ok(PlatformProfile {
            platform: PLATFORM,
            handle: text_at(&body, "/data/user/username")
                .or_else(|| display_name.clone())
                .unwrap_or_else(|| account_id.clone()),
            metrics: ProfileMetrics {
                display_name,
                followers_count: count_at(&body, "/data/user/follower_count"),
                following_count: count_at(&body, "/data/user/following_count"),
                profile_image_url: text_at(&body, "/data/user/avatar_url"),
                profile_url: text_at(&body, "/data/user/profile_deep_link"),
            },
            account_id,
        })
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn error_envelope_is_checked() {
        assert!(check_envelope(&json!({"data": {}, "error": {"code": "ok"}})).is_ok());
        assert!(check_envelope(&json!({"data": {}})).is_ok());

        let err = check_envelope(&json!({
            "error": {"code": "spam_risk_too_many_posts", "message": "daily cap reached"}
        }))
        .unwrap_err();
        assert_eq!(
            err,
            IntegrationError::exchange(PLATFORM, "spam_risk_too_many_posts: daily cap reached")
        );
    }
}
