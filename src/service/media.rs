//! Image and video uploads to blob storage.

use crate::{
    persist::paths,
    types::ImageKind,
};

use super::{ServiceResult, Services};

/// One-shot media uploads. Failed uploads are not retried.
#[derive(Clone)]
pub struct MediaUploader {
    services: Services,
}

impl MediaUploader {
    /// Uploader over `services`.
    pub fn new(services: Services) -> Self {
        Self { services }
    }

    /// Uploads JPEG bytes and returns the download URL.
    pub async fn upload_image(&self, kind: &ImageKind, bytes: Vec<u8>) -> ServiceResult<String> {
        let path = match kind {
            ImageKind::Profile(uid) => paths::profile_image(uid),
            ImageKind::PostThumbnail(post_id) => paths::post_image(post_id),
        };
        let url = self
            .services
            .store()
            .upload_blob(&path, bytes, Some(paths::IMAGE_CONTENT_TYPE))
            .await
            .inspect_err(|err| tracing::warn!(%path, %err, "image upload failed"))?;
        Ok(url)
    }

    /// Uploads the video for `post_id` and returns the download URL.
    pub async fn upload_video(&self, post_id: &str, bytes: Vec<u8>) -> ServiceResult<String> {
        let path = paths::post_video(post_id);
        let url = self
            .services
            .store()
            .upload_blob(&path, bytes, Some(paths::VIDEO_CONTENT_TYPE))
            .await
            .inspect_err(|err| tracing::warn!(%path, %err, "video upload failed"))?;
        Ok(url)
    }
}
