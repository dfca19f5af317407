//! Threads adapter (Threads Graph API)
//!
//! Like Instagram, every post is a container that is published in a second
//! call. Thread continuations reply to the previously published post.

use postbridge_core::DispatchTarget;
use postbridge_domain::{
    Capability, IntegrationError, MediaCategory, Platform, PlatformAnalytics, PlatformProfile,
    PostDraft, PostResult, ProfileMetrics, ProviderEndpoints, Result,
};
use reqwest::{Method, RequestBuilder};
use serde_json::Value;
use tracing::debug;

use super::common::{
    account_or_me, bearer, count_at, required_id, text_at, trim_base, ContainerPolling,
};
use crate::http::HttpClient;

const PLATFORM: Platform = Platform::Threads;

#[derive(Debug)]
pub struct ThreadsAdapter {
    http: HttpClient,
    api_base: String,
    polling: ContainerPolling,
}

/// Value of one insights metric, in either of the two shapes the API uses.
fn metric_value(metric: &Value) -> Option<u64> {
    count_at(metric, "/total_value/value").or_else(|| count_at(metric, "/values/0/value"))
}

impl ThreadsAdapter {
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

    /// Create and publish one post; returns the published id.
    async fn publish(
        &self,
        target: &DispatchTarget,
        text: &str,
        draft: Option<&PostDraft>,
        reply_to: Option<&str>,
    ) -> Result<String> {
        let user = account_or_me(target);
        let mut form: Vec<(&str, String)> = vec![("text", text.to_string())];
        let mut is_video = false;

        match draft.and_then(|d| d.media.first()) {
            Some(media) if media.category() == Some(MediaCategory::Video) => {
                form.push(("media_type", "VIDEO".into()));
                form.push(("video_url", media.url.clone()));
                is_video = true;
            }
            Some(media) => {
                form.push(("media_type", "IMAGE".into()));
                form.push(("image_url", media.url.clone()));
            }
            None => form.push(("media_type", "TEXT".into())),
        }
        if let Some(parent) = reply_to {
            form.push(("reply_to_id", parent.to_string()));
        }

        let request = self.call(target, Method::POST, &format!("{user}/threads")).form(&form);
        let body: Value = self.http.json(PLATFORM, request).await?;
        let container = required_id(PLATFORM, &body, "/id")?;

        if is_video {
            let container_id = container.as_str();
            self.polling
                .wait(PLATFORM, || async move {
                    let status =
                        self.call(target, Method::GET, container_id).query(&[("fields", "status")]);
                    let body: Value = self.http.json(PLATFORM, status).await?;
                    Ok(text_at(&body, "/status"))
                })
                .await?;
        }

        let publish = self
            .call(target, Method::POST, &format!("{user}/threads_publish"))
            .form(&[("creation_id", container.as_str())]);
        let body: Value = self.http.json(PLATFORM, publish).await?;
        required_id(PLATFORM, &body, "/id")
    }

    pub async fn create_post(
        &self,
        target: &DispatchTarget,
        draft: &PostDraft,
    ) -> Result<PostResult> {
        let root = self.publish(target, &draft.text, Some(draft), draft.reply_to.as_deref()).await?;

        let mut previous = root.clone();
        let mut thread_ids = Vec::with_capacity(draft.thread.len());
        for part in &draft.thread {
            let id = self.publish(target, part, None, Some(previous.as_str())).await?;
            debug!(platform = %PLATFORM, parent = %previous, "Posted thread continuation");
            previous = id.clone();
            thread_ids.push(id);
        }

        let permalink = self.call(target, Method::GET, &root).query(&[("fields", "permalink")]);
        let url = match self.http.json::<Value>(PLATFORM, permalink).await {
            Ok(body) => text_at(&body, "/permalink"),
            Err(_) => None,
        };

        let mut result = PostResult::published(PLATFORM, root, url);
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

    pub async fn delete_post(&self, _target: &DispatchTarget, _post_id: &str) -> Result<()> {
        Err(IntegrationError::unsupported(PLATFORM, Capability::Delete))
    }

    pub async fn get_analytics(
        &self,
        target: &DispatchTarget,
        post_id: Option<&str>,
    ) -> Result<PlatformAnalytics> {
        let mut analytics = PlatformAnalytics::for_post(PLATFORM, post_id.map(str::to_string));
        let request = match post_id {
            Some(id) => self
                .call(target, Method::GET, &format!("{}/insights", urlencoding::encode(id)))
                .query(&[("metric", "views,likes,replies,reposts,quotes")]),
            None => self
                .call(target, Method::GET, &format!("{}/threads_insights", account_or_me(target)))
                .query(&[("metric", "followers_count")]),
        };
        let body: Value = self.http.json(PLATFORM, request).await?;

        for metric in body.pointer("/data").and_then(Value::as_array).into_iter().flatten() {
            let value = metric_value(metric);
            match metric.get("name").and_then(Value::as_str) {
                Some("views") => analytics.views = value,
                Some("likes") => analytics.likes = value,
                Some("replies") => analytics.comments = value,
                Some("reposts") => analytics.shares = value,
                Some("followers_count") => analytics.followers = value,
                _ => {}
            }
        }
        Ok(analytics)
    }

    pub async fn get_profile(&self, target: &DispatchTarget) -> Result<PlatformProfile> {
        let request = self
            .call(target, Method::GET, "me")
            .query(&[("fields", "id,username,name,threads_profile_picture_url")]);
        let body: Value = self.http.json(PLATFORM, request).await?;

        let handle = text_at(&body, "/username")
            .ok_or_else(|| IntegrationError::exchange(PLATFORM, "response missing username"))?;
        Ok(PlatformProfile {
            platform: PLATFORM,
            account_id: required_id(PLATFORM, &body, "/id")?,
            metrics: ProfileMetrics {
                display_name: text_at(&body, "/name"),
                followers_count: None,
                following_count: None,
                profile_image_url: text_at(&body, "/threads_profile_picture_url"),
                profile_url: Some(format!("https://www.threads.net/@{handle}")),
            },
            handle,
        })
    }
}
