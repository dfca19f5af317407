//! LinkedIn adapter (versioned REST API)
//!
//! Posts are authored by the member URN. Images are registered with
//! `initializeUpload`, uploaded with a PUT to the returned URL and then
//! referenced from the post. The new post's URN comes back in the
//! `x-restli-id` header.

use postbridge_core::DispatchTarget;
use postbridge_domain::{
    Capability, IntegrationError, MediaAttachment, Platform, PlatformAnalytics, PlatformProfile,
    PostDraft, PostResult, ProfileMetrics, ProviderEndpoints, Result,
};
use reqwest::{Method, RequestBuilder};
use serde_json::{json, Value};

use super::common::{bearer, require_account, required_id, text_at, trim_base};
use crate::http::HttpClient;

const PLATFORM: Platform = Platform::LinkedIn;
const API_VERSION: &str = "202405";
const RESTLI_ID: &str = "x-restli-id";

#[derive(Debug)]
pub struct LinkedInAdapter {
    http: HttpClient,
    api_base: String,
}

fn person_urn(account_id: &str) -> String {
    if account_id.starts_with("urn:li:") {
        account_id.to_string()
    } else {
        format!("urn:li:person:{account_id}")
    }
}

impl LinkedInAdapter {
    pub fn new(http: HttpClient, endpoints: &ProviderEndpoints) -> Self {
        Self { http, api_base: trim_base(&endpoints.api_base_url).to_string() }
    }

    fn call(&self, target: &DispatchTarget, method: Method, path: &str) -> RequestBuilder {
        bearer(self.http.request(method, format!("{}{path}", self.api_base)), target)
            .header("LinkedIn-Version", API_VERSION)
            .header("X-Restli-Protocol-Version", "2.0.0")
    }

    async fn upload_image(
        &self,
        target: &DispatchTarget,
        owner: &str,
        media: &MediaAttachment,
    ) -> Result<String> {
        let init = self
            .call(target, Method::POST, "/rest/images?action=initializeUpload")
            .json(&json!({ "initializeUploadRequest": { "owner": owner } }));
        let body: Value = self.http.json(PLATFORM, init).await?;
        let upload_url = text_at(&body, "/value/uploadUrl")
            .ok_or_else(|| IntegrationError::exchange(PLATFORM, "response missing uploadUrl"))?;
        let image = required_id(PLATFORM, &body, "/value/image")?;

        let (bytes, _) = self.http.download(PLATFORM, &media.url).await?;
        let upload = bearer(self.http.request(Method::PUT, upload_url), target)
            .header(reqwest::header::CONTENT_TYPE, media.mime_type.as_str())
            .body(bytes);
        self.http.execute(PLATFORM, upload).await?;
        Ok(image)
    }

    pub async fn create_post(
        &self,
        target: &DispatchTarget,
        draft: &PostDraft,
    ) -> Result<PostResult> {
        let author = person_urn(require_account(target)?);

        let mut images = Vec::with_capacity(draft.media.len());
        for media in &draft.media {
            images.push(self.upload_image(target, &author, media).await?);
        }

        let mut post = json!({
            "author": author,
            "commentary": draft.text,
            "visibility": "PUBLIC",
            "distribution": {
                "feedDistribution": "MAIN_FEED",
                "targetEntities": [],
                "thirdPartyDistributionChannels": []
            },
            "lifecycleState": "PUBLISHED",
            "isReshareDisabledByAuthor": false
        });
        match images.as_slice() {
            [] => {}
            [single] => post["content"] = json!({ "media": { "id": single } }),
            many => {
                let items: Vec<Value> = many.iter().map(|id| json!({ "id": id })).collect();
                post["content"] = json!({ "multiImage": { "images": items } });
            }
        }

        let request = self.call(target, Method::POST, "/rest/posts").json(&post);
        let response = self.http.execute(PLATFORM, request).await?;
        let urn = response
            .headers()
            .get(RESTLI_ID)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string)
            .ok_or_else(|| IntegrationError::exchange(PLATFORM, "response missing x-restli-id"))?;

        let url = format!("https://www.linkedin.com/feed/update/{urn}");
        Ok(PostResult::published(PLATFORM, urn, Some(url)))
    }

    pub async fn schedule_post(
        &self,
        _target: &DispatchTarget,
        _draft: &PostDraft,
    ) -> Result<PostResult> {
        Err(IntegrationError::unsupported(PLATFORM, Capability::Schedule))
    }

    pub async fn delete_post(&self, target: &DispatchTarget, post_id: &str) -> Result<()> {
        let path = format!("/rest/posts/{}", urlencoding::encode(post_id));
        self.http.execute(PLATFORM, self.call(target, Method::DELETE, &path)).await?;
        Ok(())
    }

    pub async fn get_analytics(
        &self,
        _target: &DispatchTarget,
        _post_id: Option<&str>,
    ) -> Result<PlatformAnalytics> {
        Err(IntegrationError::unsupported(PLATFORM, Capability::Analytics))
    }

    pub async fn get_profile(&self, target: &DispatchTarget) -> Result<PlatformProfile> {
        let request = self.call(target, Method::GET, "/v2/userinfo");
        let body: Value = self.http.json(PLATFORM, request).await?;

        let account_id = required_id(PLATFORM, &body, "/sub")?;
        let name = text_at(&body, "/name");
        Ok(PlatformProfile {
            platform: PLATFORM,
            handle: name.clone().unwrap_or_else(|| account_id.clone()),
            metrics: ProfileMetrics {
                display_name: name,
                followers_count: None,
                following_count: None,
                profile_image_url: text_at(&body, "/picture"),
                profile_url: None,
            },
            account_id,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn member_ids_become_person_urns() {
        assert_eq!(person_urn("abc123"), "urn:li:person:abc123");
        assert_eq!(person_urn("urn:li:organization:42"), "urn:li:organization:42");
    }
}
