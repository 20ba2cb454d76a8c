// Backend endpoint layout

use url::Url;

use super::{TimeSpec, VideoId};
use crate::domain::errors::DomainError;

/// URLs of the backend video API, rooted at a configurable base
#[derive(Debug, Clone, PartialEq)]
pub struct BackendEndpoints {
    base: Url,
}

impl BackendEndpoints {
    pub fn new(base_url: &str) -> Result<Self, DomainError> {
        let base = Url::parse(base_url.trim())
            .map_err(|e| DomainError::BadArgs(format!("Invalid backend URL '{}': {}", base_url, e)))?;
        if base.cannot_be_a_base() || !matches!(base.scheme(), "http" | "https") {
            return Err(DomainError::BadArgs(format!(
                "Backend URL must be an http(s) URL: {}",
                base_url
            )));
        }
        Ok(Self { base })
    }

    pub fn base(&self) -> &Url {
        &self.base
    }

    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base.clone();
        url.set_query(None);
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    /// `GET /api/videos/stream/{id}` - byte-range media resource
    pub fn stream(&self, video_id: &VideoId) -> Url {
        self.endpoint(&["api", "videos", "stream", video_id.as_str()])
    }

    /// `POST /api/videos/download`
    pub fn download(&self) -> Url {
        self.endpoint(&["api", "videos", "download"])
    }

    /// `GET /api/videos/download/{id}` - original file
    pub fn original(&self, video_id: &VideoId) -> Url {
        self.endpoint(&["api", "videos", "download", video_id.as_str()])
    }

    /// `POST /api/videos/cut/{id}`
    pub fn cut(&self, video_id: &VideoId) -> Url {
        self.endpoint(&["api", "videos", "cut", video_id.as_str()])
    }

    /// `GET /api/videos/mp3/{id}?startTime=..&endTime=..`
    pub fn mp3(&self, video_id: &VideoId, start: &TimeSpec, end: &TimeSpec) -> Url {
        let mut url = self.endpoint(&["api", "videos", "mp3", video_id.as_str()]);
        url.query_pairs_mut()
            .append_pair("startTime", &start.format_api())
            .append_pair("endTime", &end.format_api());
        url
    }

    /// Turn a server-relative path from a response body into an absolute URL
    pub fn absolute(&self, path: &str) -> Result<Url, DomainError> {
        if path.starts_with("http://") || path.starts_with("https://") {
            return Url::parse(path)
                .map_err(|e| DomainError::InvalidResponse(format!("Bad URL '{}': {}", path, e)));
        }
        let base = self.base.as_str().trim_end_matches('/');
        let joined = if path.starts_with('/') {
            format!("{}{}", base, path)
        } else {
            format!("{}/{}", base, path)
        };
        Url::parse(&joined)
            .map_err(|e| DomainError::InvalidResponse(format!("Bad URL '{}': {}", joined, e)))
    }
}
