//! YouTube adapter (Data API v3)
//!
//! Uploads use the resumable protocol: the metadata POST returns a session
//! URL in `Location`, then the video bytes are PUT to it. Scheduling uploads
//! the video as private with `publishAt`.

use chrono::{DateTime, SecondsFormat, Utc};
use postbridge_core::DispatchTarget;
use postbridge_domain::{
    IntegrationError, MediaCategory, Platform, PlatformAnalytics, PlatformProfile,
    PostDraft, PostResult, ProfileMetrics, ProviderEndpoints, Result,
};
use reqwest::{header, Method, RequestBuilder};
use serde_json::{json, Value};
use tracing::debug;

use super::common::{bearer, count_at, required_id, text_at, title_for, trim_base};
use crate::http::HttpClient;

const PLATFORM: Platform = Platform::YouTube;
const TITLE_LIMIT: usize = 100;

#[derive(Debug)]
pub struct YouTubeAdapter {
    http: HttpClient,
    api_base: String,
    upload_base: String,
}

fn watch_url(id: &str) -> String {
    format!("https://www.youtube.com/watch?v={id}")
}

/// Upload metadata: public now, or private until `publish_at`.
fn video_metadata(draft: &PostDraft, publish_at: Option<DateTime<Utc>>) -> Value {
    let mut status = json!({ "privacyStatus": "public", "selfDeclaredMadeForKids": false });
    if let Some(at) = publish_at {
        status["privacyStatus"] = json!("private");
        status["publishAt"] = json!(at.to_rfc3339_opts(SecondsFormat::Secs, true));
    }
    json!({
        "snippet": {
            "title": title_for(draft, TITLE_LIMIT),
            "description": draft.text,
            "categoryId": "22"
        },
        "status": status
    })
}

impl YouTubeAdapter {
    pub fn new(http: HttpClient, endpoints: &ProviderEndpoints) -> Self {
        let api_base = trim_base(&endpoints.api_base_url).to_string();
        let upload_base = endpoints
            .upload_base_url
            .as_deref()
            .map(|base| trim_base(base).to_string())
            .unwrap_or_else(|| format!("{api_base}/upload"));
        Self { http, api_base, upload_base }
    }

    fn call(&self, target: &DispatchTarget, method: Method, path: &str) -> RequestBuilder {
        bearer(self.http.request(method, format!("{}{path}", self.api_base)), target)
    }

    async fn upload(
        &self,
        target: &DispatchTarget,
        draft: &PostDraft,
        publish_at: Option<DateTime<Utc>>,
    ) -> Result<String> {
        let video = draft
            .media
            .iter()
            .find(|media| media.category() == Some(MediaCategory::Video))
            .ok_or_else(|| {
                IntegrationError::InvalidRequest("youtube posts need a video attachment".into())
            })?;
        let (bytes, content_type) = self.http.download(PLATFORM, &video.url).await?;

        let session = bearer(
            self.http.request(
                Method::POST,
                format!("{}/youtube/v3/videos", self.upload_base),
            ),
            target,
        )
        .query(&[("uploadType", "resumable"), ("part", "snippet,status")])
        .header("X-Upload-Content-Type", content_type.as_deref().unwrap_or(&video.mime_type))
        .header("X-Upload-Content-Length", bytes.len().to_string())
        .json(&video_metadata(draft, publish_at));
        let response = self.http.execute(PLATFORM, session).await?;
        let location = response
            .headers()
            .get(header::LOCATION)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string)
            .ok_or_else(|| {
                IntegrationError::exchange(PLATFORM, "upload session missing Location")
            })?;
        debug!(platform = %PLATFORM, size = bytes.len(), "Opened resumable upload session");

        let put = bearer(self.http.request(Method::PUT, location), target)
            .header(header::CONTENT_TYPE, video.mime_type.as_str())
            .body(bytes);
        let body: Value = self.http.json(PLATFORM, put).await?;
        required_id(PLATFORM, &body, "/id")
    }

    pub async fn create_post(
        &self,
        target: &DispatchTarget,
        draft: &PostDraft,
    ) -> Result<PostResult> {
        let id = self.upload(target, draft, None).await?;
        let url = watch_url(&id);
        Ok(PostResult::published(PLATFORM, id, Some(url)))
    }

    pub async fn schedule_post(
        &self,
        target: &DispatchTarget,
        draft: &PostDraft,
        publish_at: DateTime<Utc>,
    ) -> Result<PostResult> {
        let id = self.upload(target, draft, Some(publish_at)).await?;
        let url = watch_url(&id);
        Ok(PostResult::scheduled(PLATFORM, id, Some(url), publish_at))
    }

    pub async fn delete_post(&self, target: &DispatchTarget, post_id: &str) -> Result<()> {
        let request =
            self.call(target, Method::DELETE, "/youtube/v3/videos").query(&[("id", post_id)]);
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
                let request = self
                    .call(target, Method::GET, "/youtube/v3/videos")
                    .query(&[("part", "statistics"), ("id", id)]);
                let body: Value = self.http.json(PLATFORM, request).await?;
                let stats = body.pointer("/items/0/statistics").ok_or_else(|| {
                    IntegrationError::NotFound { resource: "youtube video", id: id.to_string() }
                })?;
                analytics.views = count_at(stats, "/viewCount");
                analytics.likes = count_at(stats, "/likeCount");
                analytics.comments = count_at(stats, "/commentCount");
            }
            None => {
                let request = self
                    .call(target, Method::GET, "/youtube/v3/channels")
                    .query(&[("part", "statistics"), ("mine", "true")]);
                let body: Value = self.http.json(PLATFORM, request).await?;
                analytics.followers = count_at(&body, "/items/0/statistics/subscriberCount");
                analytics.views = count_at(&body, "/items/0/statistics/viewCount");
            }
        }
        Ok(analytics)
    }

    pub async fn get_profile(&self, target: &DispatchTarget) -> Result<PlatformProfile> {
        let request = self
            .call(target, Method::GET, "/youtube/v3/channels")
            .query(&[("part", "snippet,statistics"), ("mine", "true")]);
        let body: Value = self.http.json(PLATFORM, request).await?;
        let channel = body
            .pointer("/items/0")
            .ok_or_else(|| IntegrationError::NotFound {
                resource: "youtube channel",
                id: "mine".into(),
            })?;

        let account_id = required_id(PLATFORM, channel, "/id")?;
        let title = text_at(channel, "/snippet/title");
        let handle = text_at(channel, "/snippet/customUrl")
            .or_else(|| title.clone())
            .unwrap_or_else(|| account_id.clone());
        Ok(PlatformProfile {
            platform: PLATFORM,
            metrics: ProfileMetrics {
                display_name: title,
                followers_count: count_at(channel, "/statistics/subscriberCount"),
                following_count: None,
                profile_image_url: text_at(channel, "/snippet/thumbnails/default/url"),
                profile_url: Some(format!("https://www.youtube.com/channel/{account_id}")),
            },
            account_id,
            handle,
        })
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn scheduled_uploads_are_private_until_publish_time() {
        let draft = PostDraft::text("Launch video\nmore details").with_title("Launch");
        let at = Utc.with_ymd_and_hms(2030, 1, 2, 3, 4, 5).unwrap();

        let now = video_metadata(&draft, None);
        assert_eq!(now["status"]["privacyStatus"], "public");
        assert!(now["status"].get("publishAt").is_none());

        let later = video_metadata(&draft, Some(at));
        assert_eq!(later["status"]["privacyStatus"], "private");
        assert_eq!(later["status"]["publishAt"], "2030-01-02T03:04:05Z");
        assert_eq!(later["snippet"]["title"], "Launch");
    }
}
