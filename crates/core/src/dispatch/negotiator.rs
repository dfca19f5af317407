//! Capability negotiation
//!
//! Every request is checked against the platform's static capability table
//! before any network call. Missing hard capabilities reject the request;
//! soft features (geotag, hashtag and mention semantics) degrade and are
//! reported back to the caller.

use postbridge_domain::{
    Capability, IntegrationError, MediaCategory, PayloadDimension, Platform, PlatformCapabilities,
    PlatformRequest, PostDraft, Result,
};

/// Outcome of a successful negotiation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Negotiation {
    /// The request is sent as given.
    Direct(PlatformRequest),
    /// The request is sent with the listed features removed or treated as
    /// plain text.
    Degraded { request: PlatformRequest, dropped: Vec<Capability> },
}

impl Negotiation {
    /// Request to dispatch and the capabilities that were dropped.
    pub fn into_parts(self) -> (PlatformRequest, Vec<Capability>) {
        match self {
            Self::Direct(request) => (request, Vec::new()),
            Self::Degraded { request, dropped } => (request, dropped),
        }
    }

    pub fn is_degraded(&self) -> bool {
        matches!(self, Self::Degraded { .. })
    }
}

/// Stateless checker of requests against [`PlatformCapabilities`].
#[derive(Debug, Clone, Copy, Default)]
pub struct CapabilityNegotiator;

impl CapabilityNegotiator {
    pub fn negotiate(platform: Platform, mut request: PlatformRequest) -> Result<Negotiation> {
        let caps = platform.capabilities();
        let operation = request.operation();
        let require = |supported: bool, capability: Capability| {
            if supported {
                Ok(())
            } else {
                Err(IntegrationError::unsupported(platform, capability))
            }
        };

        match &request {
            PlatformRequest::CreatePost { .. } => require(caps.can_post, operation.capability())?,
            PlatformRequest::SchedulePost { .. } => {
                require(caps.can_schedule, operation.capability())?;
            }
            PlatformRequest::DeletePost { post_id } => {
                require(caps.can_delete, operation.capability())?;
                if post_id.trim().is_empty() {
                    return Err(IntegrationError::InvalidRequest("post_id is required".into()));
                }
            }
            PlatformRequest::GetAnalytics { .. } => {
                require(caps.can_fetch_analytics, operation.capability())?;
            }
            PlatformRequest::GetProfile => require(caps.can_fetch_profile, operation.capability())?,
        }

        let dropped = match request.draft_mut() {
            Some(draft) => negotiate_draft(platform, &caps, draft)?,
            None => Vec::new(),
        };

        if dropped.is_empty() {
            Ok(Negotiation::Direct(request))
        } else {
            Ok(Negotiation::Degraded { request, dropped })
        }
    }
}

fn negotiate_draft(
    platform: Platform,
    caps: &PlatformCapabilities,
    draft: &mut PostDraft,
) -> Result<Vec<Capability>> {
    if draft.text.trim().is_empty() && draft.media.is_empty() {
        return Err(IntegrationError::InvalidRequest("post has neither text nor media".into()));
    }

    check_media(platform, caps, draft)?;

    if !draft.thread.is_empty() && !caps.supports_threading {
        return Err(IntegrationError::unsupported(platform, Capability::Threading));
    }
    for part in parts(draft) {
        let actual = part.chars().count();
        if actual > caps.max_text_length {
            return Err(IntegrationError::PayloadTooLarge {
                dimension: PayloadDimension::TextLength,
                limit: caps.max_text_length,
                actual,
            });
        }
    }

    let mut dropped = Vec::new();
    if draft.location.is_some() && !caps.supports_geotagging {
        draft.location = None;
        dropped.push(Capability::Geotagging);
    }

    if !caps.supports_hashtags && parts(draft).any(|text| contains_marker(text, '#')) {
        dropped.push(Capability::Hashtags);
    }
    if !caps.supports_mentions && parts(draft).any(|text| contains_marker(text, '@')) {
        dropped.push(Capability::Mentions);
    }

    Ok(dropped)
}

fn check_media(platform: Platform, caps: &PlatformCapabilities, draft: &PostDraft) -> Result<()> {
    if draft.media.is_empty() {
        return if caps.requires_media {
            Err(IntegrationError::unsupported(platform, Capability::TextOnlyPost))
        } else {
            Ok(())
        };
    }

    if !caps.can_upload_media {
        return Err(IntegrationError::unsupported(platform, Capability::MediaUpload));
    }
    if draft.media.len() > caps.max_media_attachments {
        return Err(IntegrationError::PayloadTooLarge {
            dimension: PayloadDimension::MediaCount,
            limit: caps.max_media_attachments,
            actual: draft.media.len(),
        });
    }

    for media in &draft.media {
        let category = media.category().ok_or_else(|| {
            let mime = &media.mime_type;
            IntegrationError::InvalidRequest(format!("unsupported media type '{mime}'"))
        })?;
        if category == MediaCategory::Video && !caps.can_upload_video {
            return Err(IntegrationError::unsupported(platform, Capability::VideoUpload));
        }
        if !caps.accepts_media(category) {
            return Err(IntegrationError::unsupported(platform, Capability::Media(category)));
        }
    }

    Ok(())
}

fn parts(draft: &PostDraft) -> impl Iterator<Item = &str> {
    std::iter::once(draft.text.as_str()).chain(draft.thread.iter().map(String::as_str))
}

/// `#tag` or `@name`: the marker at a word start followed by a word character.
fn contains_marker(text: &str, marker: char) -> bool {
    text.split_whitespace().any(|word| {
        let mut chars = word.chars();
        chars.next() == Some(marker)
            && chars.next().is_some_and(|c| c.is_alphanumeric() || c == '_')
    })
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use postbridge_domain::MediaAttachment;

    use super::*;

    fn post(draft: PostDraft) -> PlatformRequest {
        PlatformRequest::CreatePost { draft }
    }

    #[test]
    fn schedule_on_linkedin_is_unsupported() {
        let request =
            PlatformRequest::SchedulePost { draft: PostDraft::text("hi"), publish_at: Utc::now() };
        let err = CapabilityNegotiator::negotiate(Platform::LinkedIn, request).unwrap_err();
        assert_eq!(err, IntegrationError::unsupported(Platform::LinkedIn, Capability::Schedule));
    }

    #[test]
    fn text_over_limit_is_too_large() {
        let err =
            CapabilityNegotiator::negotiate(Platform::X, post(PostDraft::text("a".repeat(281))))
                .unwrap_err();
        assert_eq!(
            err,
            IntegrationError::PayloadTooLarge {
                dimension: PayloadDimension::TextLength,
                limit: 280,
                actual: 281
            }
        );
    }

    #[test]
    fn text_length_counts_characters_not_bytes() {
        let text = "é".repeat(280);
        assert!(CapabilityNegotiator::negotiate(Platform::X, post(PostDraft::text(text))).is_ok());
    }

    #[test]
    fn every_thread_part_is_checked() {
        let draft = PostDraft::text("first").with_thread_part("b".repeat(501));
        let err = CapabilityNegotiator::negotiate(Platform::Mastodon, post(draft)).unwrap_err();
        assert!(matches!(err, IntegrationError::PayloadTooLarge { actual: 501, .. }));
    }

    #[test]
    fn threads_are_rejected_where_unsupported() {
        let draft = PostDraft::text("first").with_thread_part("second");
        let err = CapabilityNegotiator::negotiate(Platform::LinkedIn, post(draft)).unwrap_err();
        assert_eq!(err, IntegrationError::unsupported(Platform::LinkedIn, Capability::Threading));
    }

    #[test]
    fn geotag_degrades_and_is_dropped() {
        let draft = PostDraft::text("hello").with_location("place-1");
        let negotiation = CapabilityNegotiator::negotiate(Platform::X, post(draft)).unwrap();
        assert!(negotiation.is_degraded());

        let (request, dropped) = negotiation.into_parts();
        assert_eq!(dropped, vec![Capability::Geotagging]);
        assert_eq!(request.draft().unwrap().location, None);
    }

    #[test]
    fn geotag_kept_where_supported() {
        let draft = PostDraft::text("hello").with_location("place-1");
        let negotiation = CapabilityNegotiator::negotiate(Platform::Facebook, post(draft)).unwrap();
        assert!(matches!(negotiation, Negotiation::Direct(_)));
    }

    #[test]
    fn hashtags_degrade_on_reddit() {
        let draft =
            PostDraft::text("shipping #rustlang today").with_title("News").with_target("rust");
        let (_, dropped) =
            CapabilityNegotiator::negotiate(Platform::Reddit, post(draft)).unwrap().into_parts();
        assert_eq!(dropped, vec![Capability::Hashtags]);
    }

    #[test]
    fn lone_markers_are_not_hashtags() {
        assert!(!contains_marker("price # 5 and @ noon", '#'));
        assert!(contains_marker("hi @friend", '@'));
        assert!(contains_marker("#tag", '#'));
    }

    #[test]
    fn text_only_rejected_on_media_platforms() {
        let err = CapabilityNegotiator::negotiate(Platform::Instagram, post(PostDraft::text("hi")))
            .unwrap_err();
        assert_eq!(
            err,
            IntegrationError::unsupported(Platform::Instagram, Capability::TextOnlyPost)
        );
    }

    #[test]
    fn video_rejected_on_x() {
        let video = MediaAttachment::new("https://cdn/v.mp4", "video/mp4");
        let draft = PostDraft::text("clip").with_media(video);
        let err = CapabilityNegotiator::negotiate(Platform::X, post(draft)).unwrap_err();
        assert_eq!(err, IntegrationError::unsupported(Platform::X, Capability::VideoUpload));
    }

    #[test]
    fn images_rejected_on_tiktok() {
        let image = MediaAttachment::new("https://cdn/p.png", "image/png");
        let draft = PostDraft::text("pic").with_media(image);
        let err = CapabilityNegotiator::negotiate(Platform::TikTok, post(draft)).unwrap_err();
        assert_eq!(
            err,
            IntegrationError::unsupported(Platform::TikTok, Capability::Media(MediaCategory::Image))
        );
    }

    #[test]
    fn too_many_attachments() {
        let mut draft = PostDraft::text("pics");
        for i in 0..5 {
            let image = MediaAttachment::new(format!("https://cdn/{i}.png"), "image/png");
            draft = draft.with_media(image);
        }
        let err = CapabilityNegotiator::negotiate(Platform::X, post(draft)).unwrap_err();
        assert!(matches!(
            err,
            IntegrationError::PayloadTooLarge {
                dimension: PayloadDimension::MediaCount,
                limit: 4,
                actual: 5
            }
        ));
    }

    #[test]
    fn delete_and_analytics_follow_flags() {
        let delete = PlatformRequest::DeletePost { post_id: "1".into() };
        assert!(CapabilityNegotiator::negotiate(Platform::Instagram, delete).is_err());

        let analytics = PlatformRequest::GetAnalytics { post_id: None };
        assert_eq!(
            CapabilityNegotiator::negotiate(Platform::LinkedIn, analytics).unwrap_err(),
            IntegrationError::unsupported(Platform::LinkedIn, Capability::Analytics)
        );
    }
}
