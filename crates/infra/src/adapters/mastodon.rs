//! Mastodon adapter
//!
//! Each connection talks to its own instance (`credential.instance_url`),
//! falling back to the configured default. Media is uploaded through
//! `/api/v2/media`, which may finish processing asynchronously; the status
//! is posted once every attachment has a URL. Scheduling is native via
//! `scheduled_at`.

use chrono::{DateTime, SecondsFormat, Utc};
use postbridge_core::DispatchTarget;
use postbridge_domain::{
    IntegrationConfig, IntegrationError, MediaAttachment, Platform, PlatformAnalytics,
    PlatformProfile, PostDraft, PostResult, ProfileMetrics, Result,
};
use reqwest::multipart::{Form, Part};
use reqwest::{Method, RequestBuilder};
use serde_json::{json, Value};
use tracing::debug;

use super::common::{bearer, count_at, required_id, text_at, ContainerPolling};
use crate::http::{decode_json, ensure_success, HttpClient};

const PLATFORM: Platform = Platform::Mastodon;

#[derive(Debug)]
pub struct MastodonAdapter {
    http: HttpClient,
    config: IntegrationConfig,
    polling: ContainerPolling,
}

/// Status payload for one post.
fn status_payload(
    text: &str,
    media_ids: &[String],
    reply_to: Option<&str>,
    publish_at: Option<DateTime<Utc>>,
) -> Value {
    let mut payload = json!({ "status": text, "visibility": "public" });
    if !media_ids.is_empty() {
        payload["media_ids"] = json!(media_ids);
    }
    if let Some(parent) = reply_to {
        payload["in_reply_to_id"] = json!(parent);
    }
    if let Some(at) = publish_at {
        payload["scheduled_at"] = json!(at.to_rfc3339_opts(SecondsFormat::Secs, true));
    }
    payload
}

impl MastodonAdapter {
    pub fn new(http: HttpClient, config: IntegrationConfig) -> Self {
        Self { http, config, polling: ContainerPolling::default() }
    }

    pub fn with_polling(mut self, polling: ContainerPolling) -> Self {
        self.polling = polling;
        self
    }

    fn instance(&self, target: &DispatchTarget) -> Result<String> {
        let endpoints =
            self.config.endpoints(PLATFORM, target.credential.instance_url.as_deref())?;
        Ok(endpoints.api_base_url.trim_end_matches('/').to_string())
    }

    fn call(
        &self,
        target: &DispatchTarget,
        method: Method,
        path: &str,
    ) -> Result<RequestBuilder> {
        let url = format!("{}{path}", self.instance(target)?);
        Ok(bearer(self.http.request(method, url), target))
    }

    async fn upload_media(
        &self,
        target: &DispatchTarget,
        media: &MediaAttachment,
    ) -> Result<String> {
        let (bytes, _) = self.http.download(PLATFORM, &media.url).await?;
        let mut form = Form::new().part(
            "file",
            Part::bytes(bytes).file_name("upload").mime_str(&media.mime_type).map_err(|err| {
                IntegrationError::InvalidRequest(format!("invalid media type: {err}"))
            })?,
        );
        if let Some(alt) = &media.alt_text {
            form = form.text("description", alt.clone());
        }

        let builder = self.call(target, Method::POST, "/api/v2/media")?.multipart(form);
        let response = self.http.send_once(PLATFORM, builder).await?;
        let response = ensure_success(PLATFORM, response).await?;
        let body: Value = decode_json(PLATFORM, response).await?;
        let id = required_id(PLATFORM, &body, "/id")?;

        if text_at(&body, "/url").is_none() {
            let path = format!("/api/v1/media/{id}");
            self.polling
                .wait(PLATFORM, || {
                    let request = self.call(target, Method::GET, &path);
                    async move {
                        let body: Value = self.http.json(PLATFORM, request?).await?;
                        Ok(text_at(&body, "/url").map(|_| "FINISHED".to_string()))
                    }
                })
                .await?;
        }
        Ok(id)
    }

    async fn post_status(&self, target: &DispatchTarget, payload: &Value) -> Result<Value> {
        let request = self.call(target, Method::POST, "/api/v1/statuses")?.json(payload);
        self.http.json(PLATFORM, request).await
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

        let payload = status_payload(&draft.text, &media_ids, draft.reply_to.as_deref(), None);
        let root = self.post_status(target, &payload).await?;
        let root_id = required_id(PLATFORM, &root, "/id")?;

        let mut previous = root_id.clone();
        let mut thread_ids = Vec::with_capacity(draft.thread.len());
        for part in &draft.thread {
            let payload = status_payload(part, &[], Some(previous.as_str()), None);
            let id = required_id(PLATFORM, &self.post_status(target, &payload).await?, "/id")?;
            debug!(platform = %PLATFORM, parent = %previous, "Posted thread continuation");
            previous = id.clone();
            thread_ids.push(id);
        }

        let mut result = PostResult::published(PLATFORM, root_id, text_at(&root, "/url"));
        result.thread_post_ids = thread_ids;
        Ok(result)
    }

    pub async fn schedule_post(
        &self,
        target: &DispatchTarget,
        draft: &PostDraft,
        publish_at: DateTime<Utc>,
    ) -> Result<PostResult> {
        // Scheduled statuses have no id to reply to until they are published.
        if !draft.thread.is_empty() {
            return Err(IntegrationError::InvalidRequest(
                "mastodon cannot schedule a thread".into(),
            ));
        }

        let mut media_ids = Vec::with_capacity(draft.media.len());
        for media in &draft.media {
            media_ids.push(self.upload_media(target, media).await?);
        }

        let payload =
            status_payload(&draft.text, &media_ids, draft.reply_to.as_deref(), Some(publish_at));
        let body = self.post_status(target, &payload).await?;
        let id = required_id(PLATFORM, &body, "/id")?;
        Ok(PostResult::scheduled(PLATFORM, id, None, publish_at))
    }

    pub async fn delete_post(&self, target: &DispatchTarget, post_id: &str) -> Result<()> {
        let path = format!("/api/v1/statuses/{}", urlencoding::encode(post_id));
        let request = self.call(target, Method::DELETE, &path)?;
        self.http.execute(PLATFORM, request).await?;
        Ok(())
    }

    async fn verify_credentials(&self, target: &DispatchTarget) -> Result<Value> {
        let request = self.call(target, Method::GET, "/api/v1/accounts/verify_credentials")?;
        self.http.json(PLATFORM, request).await
    }

    pub async fn get_analytics(
        &self,
        target: &DispatchTarget,
        post_id: Option<&str>,
    ) -> Result<PlatformAnalytics> {
        let mut analytics = PlatformAnalytics::for_post(PLATFORM, post_id.map(str::to_string));
        match post_id {
            Some(id) => {
                let path = format!("/api/v1/statuses/{}", urlencoding::encode(id));
                let request = self.call(target, Method::GET, &path)?;
                let body: Value = self.http.json(PLATFORM, request).await?;
                analytics.likes = count_at(&body, "/favourites_count");
                analytics.shares = count_at(&body, "/reblogs_count");
                analytics.comments = count_at(&body, "/replies_count");
            }
            None => {
                let body = self.verify_credentials(target).await?;
                analytics.followers = count_at(&body, "/followers_count");
            }
        }
        Ok(analytics)
    }

    pub async fn get_profile(&self, target: &DispatchTarget) -> Result<PlatformProfile> {
        let body = self.verify_credentials(target).await?;
        let acct = text_at(&body, "/acct")
            .ok_or_else(|| IntegrationError::exchange(PLATFORM, "response missing acct"))?;

        Ok(PlatformProfile {
            platform: PLATFORM,
            account_id: required_id(PLATFORM, &body, "/id")?,
            handle: format!("@{acct}"),
            metrics: ProfileMetrics {
                display_name: text_at(&body, "/display_name"),
                followers_count: count_at(&body, "/followers_count"),
                following_count: count_at(&body, "/following_count"),
                profile_image_url: text_at(&body, "/avatar"),
                profile_url: text_at(&body, "/url"),
            },
        })
    }
}
