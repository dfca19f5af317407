//! X (Twitter) adapter: API v2 tweets signed with OAuth 1.0a user context
//!
//! Media goes through the v1.1 upload endpoint. Threads are posted as a
//! reply chain, each part answering the previous one.

use std::sync::Arc;

use postbridge_core::{DispatchTarget, SecretsProvider};
use postbridge_domain::{
    Capability, IntegrationError, MediaAttachment, Platform, PlatformAnalytics, PlatformProfile,
    PostDraft, PostResult, ProfileMetrics, ProviderEndpoints, Result,
};
use reqwest::header::AUTHORIZATION;
use reqwest::multipart::{Form, Part};
use reqwest::{Method, RequestBuilder};
use serde_json::{json, Value};
use tracing::debug;

use super::common::{count_at, required_id, text_at, trim_base};
use crate::http::{decode_json, ensure_success, HttpClient};
use crate::oauth::OAuth1Signer;

const PLATFORM: Platform = Platform::X;

pub struct XAdapter {
    http: HttpClient,
    api_base: String,
    upload_base: String,
    secrets: Arc<dyn SecretsProvider>,
}

impl XAdapter {
    pub fn new(
        http: HttpClient,
        endpoints: &ProviderEndpoints,
        secrets: Arc<dyn SecretsProvider>,
    ) -> Self {
        let api_base = trim_base(&endpoints.api_base_url).to_string();
        let upload_base = endpoints
            .upload_base_url
            .as_deref()
            .map_or_else(|| api_base.clone(), |u| trim_base(u).to_string());
        Self { http, api_base, upload_base, secrets }
    }

    async fn signer(&self, target: &DispatchTarget) -> Result<OAuth1Signer> {
        let token_secret = target.credential.token_secret.as_deref().ok_or_else(|| {
            IntegrationError::Internal("X credential is missing its token secret".into())
        })?;
        let consumer = self.secrets.client_credentials(PLATFORM).await?;
        Ok(OAuth1Signer::new(consumer.client_id, consumer.client_secret.expose())
            .with_token(&target.credential.access_token, token_secret))
    }

    /// Request with an OAuth 1.0a header; `url` must carry the final query.
    async fn signed(
        &self,
        target: &DispatchTarget,
        method: Method,
        url: &str,
    ) -> Result<RequestBuilder> {
        let authorization =
            self.signer(target).await?.authorization(method.as_str(), url, &[], &[])?;
        Ok(self.http.request(method, url).header(AUTHORIZATION, authorization))
    }

    async fn upload_media(
        &self,
        target: &DispatchTarget,
        media: &MediaAttachment,
    ) -> Result<String> {
        let (bytes, _) = self.http.download(PLATFORM, &media.url).await?;
        let url = format!("{}/1.1/media/upload.json", self.upload_base);
        let part = Part::bytes(bytes)
            .file_name("media")
            .mime_str(&media.mime_type)
            .map_err(|err| IntegrationError::InvalidRequest(format!("invalid media type: {err}")))?;

        let builder = self
            .signed(target, Method::POST, &url)
            .await?
            .multipart(Form::new().part("media", part));
        let response = self.http.send_once(PLATFORM, builder).await?;
        let response = ensure_success(PLATFORM, response).await?;
        let body: Value = decode_json(PLATFORM, response).await?;
        required_id(PLATFORM, &body, "/media_id_string")
    }

    async fn tweet(&self, target: &DispatchTarget, payload: Value) -> Result<String> {
        let url = format!("{}/2/tweets", self.api_base);
        let builder = self.signed(target, Method::POST, &url).await?.json(&payload);
        let body: Value = self.http.json(PLATFORM, builder).await?;
        required_id(PLATFORM, &body, "/data/id")
    }

    pub async fn create_post(
        &self,
        target: &DispatchTarget,
        draft: &PostDraft,
    ) -> Result<PostResult> {
        let mut media_ids = Vec::with_capacity(draft.media.len());
        for media in &draft.media {
            media_ids.push(self.upload_media(target, media).await?);
        }

        let mut first = json!({ "text": draft.text });
        if !media_ids.is_empty() {
            first["media"] = json!({ "media_ids": media_ids });
        }
        if let Some(reply_to) = &draft.reply_to {
            first["reply"] = json!({ "in_reply_to_tweet_id": reply_to });
        }
        let root_id = self.tweet(target, first).await?;

        let mut previous = root_id.clone();
        let mut thread_ids = Vec::with_capacity(draft.thread.len());
        for part in &draft.thread {
            let payload = json!({ "text": part, "reply": { "in_reply_to_tweet_id": previous } });
            let id = self.tweet(target, payload).await?;
            debug!(platform = %PLATFORM, parent = %previous, "Posted thread continuation");
            previous = id.clone();
            thread_ids.push(id);
        }

        let url = format!("https://x.com/i/web/status/{root_id}");
        let mut result = PostResult::published(PLATFORM, root_id, Some(url));
        result.thread_post_ids = thread_ids;
        Ok(result)
    }

    pub async fn schedule_post(
        &self,
        _target: &DispatchTarget,
        _draft: &PostDraft,
    ) -> Result<PostResult> {
        Err(IntegrationError::unsupported(PLATFORM, Capability::Schedule))
    }

    pub async fn delete_post(&self, target: &DispatchTarget, post_id: &str) -> Result<()> {
        let url = format!("{}/2/tweets/{}", self.api_base, urlencoding::encode(post_id));
        let builder = self.signed(target, Method::DELETE, &url).await?;
        let body: Value = self.http.json(PLATFORM, builder).await?;
        match body.pointer("/data/deleted").and_then(Value::as_bool) {
            Some(true) => Ok(()),
            _ => Err(IntegrationError::exchange(
                PLATFORM,
                format!("tweet {post_id} was not deleted"),
            )),
        }
    }

    pub async fn get_analytics(
        &self,
        target: &DispatchTarget,
        post_id: Option<&str>,
    ) -> Result<PlatformAnalytics> {
        let mut analytics = PlatformAnalytics::for_post(PLATFORM, post_id.map(str::to_string));
        match post_id {
            Some(id) => {
                let url = format!(
                    "{}/2/tweets/{}?tweet.fields=public_metrics",
                    self.api_base,
                    urlencoding::encode(id)
                );
                let request = self.signed(target, Method::GET, &url).await?;
                let body: Value = self.http.json(PLATFORM, request).await?;
                analytics.impressions = count_at(&body, "/data/public_metrics/impression_count");
                analytics.likes = count_at(&body, "/data/public_metrics/like_count");
                analytics.comments = count_at(&body, "/data/public_metrics/reply_count");
                analytics.shares = count_at(&body, "/data/public_metrics/retweet_count");
            }
            None => {
                let url = format!("{}/2/users/me?user.fields=public_metrics", self.api_base);
                let request = self.signed(target, Method::GET, &url).await?;
                let body: Value = self.http.json(PLATFORM, request).await?;
                analytics.followers = count_at(&body, "/data/public_metrics/followers_count");
            }
        }
        Ok(analytics)
    }

    pub async fn get_profile(&self, target: &DispatchTarget) -> Result<PlatformProfile> {
        let url =
            format!("{}/2/users/me?user.fields=public_metrics,profile_image_url", self.api_base);
        let request = self.signed(target, Method::GET, &url).await?;
        let body: Value = self.http.json(PLATFORM, request).await?;

        let handle = text_at(&body, "/data/username")
            .ok_or_else(|| IntegrationError::exchange(PLATFORM, "response missing data/username"))?;
        Ok(PlatformProfile {
            platform: PLATFORM,
            account_id: required_id(PLATFORM, &body, "/data/id")?,
            metrics: ProfileMetrics {
                display_name: text_at(&body, "/data/name"),
                followers_count: count_at(&body, "/data/public_metrics/followers_count"),
                following_count: count_at(&body, "/data/public_metrics/following_count"),
                profile_image_url: text_at(&body, "/data/profile_image_url"),
                profile_url: Some(format!("https://x.com/{handle}")),
            },
            handle,
        })
    }
}

impl std::fmt::Debug for XAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("XAdapter").field("api_base", &self.api_base).finish_non_exhaustive()
    }
}
