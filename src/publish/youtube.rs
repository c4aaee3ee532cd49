//! YouTube Data API v3: refresh-token auth, resumable video upload, custom
//! thumbnail.

use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::header::{CONTENT_LENGTH, CONTENT_TYPE, LOCATION};
use serde::{Deserialize, Serialize};

use crate::config::app::YouTubeConfig;
use crate::model::Published;
use crate::pipeline::{Publisher, UploadRequest};

const TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
const UPLOAD_URL: &str =
    "https://www.googleapis.com/upload/youtube/v3/videos?uploadType=resumable&part=snippet,status";
const THUMBNAIL_URL: &str = "https://www.googleapis.com/upload/youtube/v3/thumbnails/set";

/// YouTube caps titles at 100 characters.
const MAX_TITLE_CHARS: usize = 100;

pub struct YouTubePublisher {
    http: reqwest::Client,
    cfg: YouTubeConfig,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Snippet<'a> {
    title: String,
    description: &'a str,
    tags: Vec<&'a str>,
    category_id: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Status<'a> {
    privacy_status: &'a str,
    self_declared_made_for_kids: bool,
}

#[derive(Serialize)]
struct VideoResource<'a> {
    snippet: Snippet<'a>,
    status: Status<'a>,
}

#[derive(Deserialize)]
struct InsertResponse {
    id: String,
}

pub fn watch_url(video_id: &str) -> String {
    format!("https://www.youtube.com/watch?v={video_id}")
}

impl YouTubePublisher {
    pub fn new(cfg: &YouTubeConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .timeout(Duration::from_secs(600))
            .build()
            .context("building youtube http client")?;
        Ok(Self {
            http,
            cfg: cfg.clone(),
        })
    }

    fn resource<'a>(&'a self, req: &UploadRequest<'a>) -> VideoResource<'a> {
        VideoResource {
            snippet: Snippet {
                title: req.title.chars().take(MAX_TITLE_CHARS).collect(),
                description: req.description,
                // empty tags are rejected by the API
                tags: req
                    .tags
                    .iter()
                    .map(String::as_str)
                    .filter(|t| !t.is_empty())
                    .collect(),
                category_id: &self.cfg.category_id,
            },
            status: Status {
                privacy_status: &self.cfg.privacy_status,
                self_declared_made_for_kids: false,
            },
        }
    }

    async fn access_token(&self) -> Result<String> {
        let form = [
            ("client_id", self.cfg.client_id.as_str()),
            ("client_secret", self.cfg.client_secret.as_str()),
            ("refresh_token", self.cfg.refresh_token.as_str()),
            ("grant_type", "refresh_token"),
        ];
        let tok: TokenResponse = self
            .http
            .post(TOKEN_URL)
            .form(&form)
            .send()
            .await
            .context("oauth token request")?
            .error_for_status()
            .context("oauth token non-2xx")?
            .json()
            .await
            .context("oauth token body")?;
        Ok(tok.access_token)
    }

    async fn set_thumbnail(&self, token: &str, video_id: &str, image: Vec<u8>) -> Result<()> {
        self.http
            .post(THUMBNAIL_URL)
            .query(&[("videoId", video_id)])
            .bearer_auth(token)
            .header(CONTENT_TYPE, "image/jpeg")
            .body(image)
            .send()
            .await
            .context("thumbnail request")?
            .error_for_status()
            .context("thumbnail non-2xx")?;
        Ok(())
    }
}

#[async_trait]
impl Publisher for YouTubePublisher {
    async fn upload(&self, req: UploadRequest<'_>) -> Result<Published> {
        let video = tokio::fs::read(req.video)
            .await
            .with_context(|| format!("video file not found: {}", req.video.display()))?;
        let token = self.access_token().await?;
        tracing::info!(title = %req.title, bytes = video.len(), "uploading video to YouTube");

        // 1) open a resumable session
        let session = self
            .http
            .post(UPLOAD_URL)
            .bearer_auth(&token)
            .header("X-Upload-Content-Type", "video/*")
            .header("X-Upload-Content-Length", video.len())
            .json(&self.resource(&req))
            .send()
            .await
            .context("upload session request")?
            .error_for_status()
            .context("upload session non-2xx")?;
        let location = session
            .headers()
            .get(LOCATION)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| anyhow!("upload session without Location header"))?
            .to_string();

        // 2) send the bytes in one request
        let len = video.len();
        let inserted: InsertResponse = self
            .http
            .put(&location)
            .bearer_auth(&token)
            .header(CONTENT_TYPE, "video/*")
            .header(CONTENT_LENGTH, len)
            .body(video)
            .send()
            .await
            .context("video upload request")?
            .error_for_status()
            .context("video upload non-2xx")?
            .json()
            .await
            .context("video upload body")?;

        let url = watch_url(&inserted.id);
        tracing::info!(video_id = %inserted.id, %url, "video uploaded");

        // 3) thumbnail is best-effort
        if let Some(thumb) = req.thumbnail {
            match tokio::fs::read(thumb).await {
                Ok(image) => {
                    if let Err(e) = self.set_thumbnail(&token, &inserted.id, image).await {
                        tracing::warn!(error = ?e, "thumbnail upload failed");
                    }
                }
                Err(e) => tracing::warn!(error = ?e, path = %thumb.display(), "thumbnail unreadable"),
            }
        }

        Ok(Published {
            id: inserted.id,
            url,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn resource_drops_empty_tags_and_caps_title() {
        let p = YouTubePublisher::new(&YouTubeConfig::default()).unwrap();
        let tags = vec!["a".to_string(), String::new(), "b".to_string()];
        let long_title = "x".repeat(150);
        let req = UploadRequest {
            video: Path::new("v.mp4"),
            title: &long_title,
            description: "d",
            tags: &tags,
            thumbnail: None,
        };
        let v = serde_json::to_value(p.resource(&req)).unwrap();
        assert_eq!(v["snippet"]["tags"], serde_json::json!(["a", "b"]));
        assert_eq!(v["snippet"]["title"].as_str().unwrap().len(), MAX_TITLE_CHARS);
        assert_eq!(v["snippet"]["categoryId"], "25");
        assert_eq!(v["status"]["privacyStatus"], "public");
        assert_eq!(v["status"]["selfDeclaredMadeForKids"], false);
    }

    #[test]
    fn watch_url_format() {
        assert_eq!(watch_url("abc123"), "https://www.youtube.com/watch?v=abc123");
    }

    #[tokio::test]
    async fn missing_video_file_fails_before_network() {
        let p = YouTubePublisher::new(&YouTubeConfig::default()).unwrap();
        let req = UploadRequest {
            video: Path::new("/nonexistent/video.mp4"),
            title: "t",
            description: "",
            tags: &[],
            thumbnail: None,
        };
        let err = p.upload(req).await.unwrap_err();
        assert!(format!("{err:#}").contains("video file not found"));
    }
}
