//! Reddit adapter
//!
//! Submissions need a subreddit (`draft.target`) and a title. A draft with
//! media becomes a link post to the first attachment; otherwise a self post.
//! Reddit reports validation failures inside a 200 body under `json.errors`.

use postbridge_core::DispatchTarget;
use postbridge_domain::{
    Capability, IntegrationError, Platform, PlatformAnalytics, PlatformProfile, PostDraft,
    PostResult, ProfileMetrics, ProviderEndpoints, Result,
};
use reqwest::{Method, RequestBuilder};
use serde_json::Value;

use super::common::{bearer, count_at, required_id, text_at, trim_base};
use crate::http::HttpClient;

const PLATFORM: Platform = Platform::Reddit;
const TITLE_LIMIT: usize = 300;
const USER_AGENT: &str = concat!("postbridge/", env!("CARGO_PKG_VERSION"));

#[derive(Debug)]
pub struct RedditAdapter {
    http: HttpClient,
    api_base: String,
}

/// Subreddit name without an `r/` prefix.
fn subreddit(target: &str) -> &str {
    let trimmed = target.trim().trim_start_matches('/');
    trimmed.strip_prefix("r/").unwrap_or(trimmed)
}

/// First entry of `json.errors`, rendered as `CODE: message`.
fn submit_error(body: &Value) -> Option<String> {
    let first = body.pointer("/json/errors/0")?.as_array()?;
    let parts: Vec<&str> = first.iter().filter_map(Value::as_str).take(2).collect();
    Some(parts.join(": "))
}

/// Fullname (`t3_...`) for a post id.
fn fullname(post_id: &str) -> String {
    if post_id.starts_with("t3_") {
        post_id.to_string()
    } else {
        format!("t3_{post_id}")
    }
}

impl RedditAdapter {
    pub fn new(http: HttpClient, endpoints: &ProviderEndpoints) -> Self {
        Self { http, api_base: trim_base(&endpoints.api_base_url).to_string() }
    }

    fn call(&self, target: &DispatchTarget, method: Method, path: &str) -> RequestBuilder {
        bearer(self.http.request(method, format!("{}{path}", self.api_base)), target)
            .header(reqwest::header::USER_AGENT, USER_AGENT)
    }

    pub async fn create_post(
        &self,
        target: &DispatchTarget,
        draft: &PostDraft,
    ) -> Result<PostResult> {
        let community = draft.target.as_deref().map(subreddit).filter(|s| !s.is_empty()).ok_or_else(
            || IntegrationError::InvalidRequest("reddit posts need a target subreddit".into()),
        )?;
        let title = draft
            .title
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| IntegrationError::InvalidRequest("reddit posts need a title".into()))?;

        let mut form = vec![
            ("api_type", "json".to_string()),
            ("sr", community.to_string()),
            ("title", title.chars().take(TITLE_LIMIT).collect()),
        ];
        match draft.media.first() {
            Some(media) => {
                form.push(("kind", "link".into()));
                form.push(("url", media.url.clone()));
            }
            None => {
                form.push(("kind", "self".into()));
                form.push(("text", draft.text.clone()));
            }
        }

        let request = self.call(target, Method::POST, "/api/submit").form(&form);
        let body: Value = self.http.json(PLATFORM, request).await?;
        if let Some(error) = submit_error(&body) {
            return Err(IntegrationError::exchange(PLATFORM, error));
        }

        let name = required_id(PLATFORM, &body, "/json/data/name")?;
        let url = text_at(&body, "/json/data/url");
        Ok(PostResult::published(PLATFORM, name, url))
    }

    pub async fn schedule_post(
        &self,
        _target: &DispatchTarget,
        _draft: &PostDraft,
    ) -> Result<PostResult> {
        Err(IntegrationError::unsupported(PLATFORM, Capability::Schedule))
    }

    pub async fn delete_post(&self, target: &DispatchTarget, post_id: &str) -> Result<()> {
        let request =
            self.call(target, Method::POST, "/api/del").form(&[("id", fullname(post_id))]);
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
                let request =
                    self.call(target, Method::GET, "/api/info").query(&[("id", fullname(id))]);
                let body: Value = self.http.json(PLATFORM, request).await?;
                let post = body.pointer("/data/children/0/data").ok_or_else(|| {
                    IntegrationError::NotFound { resource: "reddit post", id: id.to_string() }
                })?;
                analytics.likes = count_at(post, "/ups");
                analytics.comments = count_at(post, "/num_comments");
                analytics.views = count_at(post, "/view_count");
                analytics.shares = count_at(post, "/num_crossposts");
            }
            None => {
                let body: Value =
                    self.http.json(PLATFORM, self.call(target, Method::GET, "/api/v1/me")).await?;
                analytics.followers = count_at(&body, "/subreddit/subscribers");
            }
        }
        Ok(analytics)
    }

    pub async fn get_profile(&self, target: &DispatchTarget) -> Result<PlatformProfile> {
        let body: Value =
            self.http.json(PLATFORM, self.call(target, Method::GET, "/api/v1/me")).await?;
        let name = text_at(&body, "/name")
            .ok_or_else(|| IntegrationError::exchange(PLATFORM, "response missing name"))?;

        Ok(PlatformProfile {
            platform: PLATFORM,
            account_id: required_id(PLATFORM, &body, "/id")?,
            metrics: ProfileMetrics {
                display_name: text_at(&body, "/subreddit/title"),
                followers_count: count_at(&body, "/subreddit/subscribers"),
                following_count: None,
                profile_image_url: text_at(&body, "/icon_img")
                    .map(|url| url.split('?').next().unwrap_or_default().to_string()),
                profile_url: Some(format!("https://www.reddit.com/user/{name}")),
            },
            handle: format!("u/{name}"),
        })
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn subreddit_prefixes_are_stripped() {
        assert_eq!(subreddit("r/rust"), "rust");
        assert_eq!(subreddit("/r/rust"), "rust");
        assert_eq!(subreddit("rust"), "rust");
    }

    #[test]
    fn submit_errors_surface_first_entry() {
        let body = json!({
            "json": { "errors": [["SUBREDDIT_NOEXIST", "that subreddit doesn't exist", "sr"]] }
        });
        assert_eq!(
            submit_error(&body).as_deref(),
            Some("SUBREDDIT_NOEXIST: that subreddit doesn't exist")
        );
        assert_eq!(submit_error(&json!({"json": {"errors": [], "data": {}}})), None);
    }

    #[test]
    fn fullnames_are_prefixed_once() {
        assert_eq!(fullname("abc"), "t3_abc");
        assert_eq!(fullname("t3_abc"), "t3_abc");
    }
}
