// HTTP backend adapter - download, cut and MP3 requests against the video API

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::adapters::http_range::TunnelBypass;
use crate::domain::errors::*;
use crate::domain::model::*;
use crate::domain::rules::*;
use crate::ports::*;

const UNTITLED: &str = "Video without title";

/// Backend API client
#[derive(Clone)]
pub struct HttpBackendClient {
    client: Client,
    endpoints: BackendEndpoints,
    tunnel_bypass: TunnelBypass,
}

impl HttpBackendClient {
    pub fn new(client: Client, endpoints: BackendEndpoints, tunnel_bypass: TunnelBypass) -> Self {
        Self {
            client,
            endpoints,
            tunnel_bypass,
        }
    }

    fn with_bypass(&self, req: RequestBuilder, url: &url::Url) -> RequestBuilder {
        if self.tunnel_bypass.applies_to(url) {
            req.header(crate::adapters::http_range::TUNNEL_BYPASS_HEADER, "true")
        } else {
            req
        }
    }

    /// Read a JSON body, turning non-success statuses into `BackendRejected`
    async fn read_json<T: for<'de> Deserialize<'de>>(
        resp: Response,
        default_error: &str,
    ) -> Result<T, DomainError> {
        let status = resp.status();
        let text = resp
            .text()
            .await
            .map_err(|e| DomainError::TransportFailed(e.to_string()))?;

        if !status.is_success() {
            let body: BackendErrorBody = serde_json::from_str(&text).unwrap_or_default();
            let message = compose_error_message(&body, default_error);
            warn!(status = status.as_u16(), %message, "Backend rejected request");
            return Err(DomainError::BackendRejected {
                status: status.as_u16(),
                message,
            });
        }

        serde_json::from_str(&text).map_err(|e| DomainError::InvalidResponse(e.to_string()))
    }

    async fn send(req: RequestBuilder) -> Result<Response, DomainError> {
        req.send()
            .await
            .map_err(|e| DomainError::TransportFailed(e.to_string()))
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CutRequestBody<'a> {
    cut_options: &'a CutOptions,
}

#[derive(Serialize)]
struct DownloadRequestBody<'a> {
    url: &'a str,
}

#[async_trait]
impl BackendPort for HttpBackendClient {
    async fn submit_download(&self, source_url: &str) -> Result<DownloadedVideo, DomainError> {
        let url = self.endpoints.download();
        info!(source = source_url, "Submitting video download");
        let req = self
            .client
            .post(url.clone())
            .json(&DownloadRequestBody { url: source_url });
        let resp = Self::send(self.with_bypass(req, &url)).await?;
        let body: BackendVideoResponse = Self::read_json(resp, "Failed to download the video").await?;
        adapt_download_response(body)
    }

    async fn request_cut(
        &self,
        video_id: &VideoId,
        options: &CutOptions,
    ) -> Result<CutResult, DomainError> {
        let url = self.endpoints.cut(video_id);
        info!(video_id = %video_id, start = %options.start_time, end = %options.end_time, format = %options.format, "Requesting cut");
        let req = self
            .client
            .post(url.clone())
            .json(&CutRequestBody {
                cut_options: options,
            });
        let resp = Self::send(self.with_bypass(req, &url)).await?;
        let body: DataEnvelope<CutData> = Self::read_json(resp, "Failed to process the video").await?;

        let data = body.data.ok_or_else(|| {
            DomainError::InvalidResponse("missing data.streamUrl".to_string())
        })?;
        let stream_path = clean_backend_path(&data.stream_url);
        let download_path = clean_backend_path(&data.download_url);
        let fallback_name = format!("video_{}.{}", video_id, options.format);

        let result = CutResult {
            stream_url: self.endpoints.absolute(&stream_path)?.to_string(),
            download_url: self.endpoints.absolute(&download_path)?.to_string(),
            file_name: file_name_from_path(&stream_path, &fallback_name),
        };
        debug!(?result, "Cut completed");
        Ok(result)
    }

    async fn request_mp3(
        &self,
        video_id: &VideoId,
        range: &CutRange,
    ) -> Result<Mp3Result, DomainError> {
        let url = self.endpoints.mp3(video_id, &range.start, &range.end);
        info!(video_id = %video_id, start = %range.start, end = %range.end, "Requesting MP3 extraction");
        let req = self.client.get(url.clone());
        let resp = Self::send(self.with_bypass(req, &url)).await?;
        let body: DataEnvelope<Mp3Data> = Self::read_json(resp, "Failed to process the video").await?;

        if body.success == Some(false) {
            return Err(DomainError::InvalidResponse(
                "MP3 extraction reported failure".to_string(),
            ));
        }
        let data = body.data.ok_or_else(|| {
            DomainError::InvalidResponse("missing data.downloadUrl".to_string())
        })?;

        Ok(Mp3Result {
            download_url: self.endpoints.absolute(&data.download_url)?.to_string(),
            file_name: file_name_from_path(
                data.output_path.as_deref().unwrap_or_default(),
                "audio.mp3",
            ),
        })
    }

    fn endpoints(&self) -> &BackendEndpoints {
        &self.endpoints
    }
}

#[derive(Debug, Deserialize)]
struct DataEnvelope<T> {
    #[serde(default)]
    success: Option<bool>,
    data: Option<T>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CutData {
    stream_url: String,
    #[serde(default)]
    download_url: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Mp3Data {
    download_url: String,
    #[serde(default)]
    output_path: Option<String>,
}

/// Download response; the backend has shipped several shapes over time
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackendVideoResponse {
    #[serde(default)]
    pub success: Option<bool>,
    #[serde(default)]
    pub video: Option<BackendVideo>,
    #[serde(default)]
    pub data: Option<BackendVideoData>,
    #[serde(default)]
    pub video_info: Option<RawVideoInfo>,
    #[serde(default)]
    pub file_path: Option<String>,
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub duration: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackendVideo {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default)]
    pub duration: Option<f64>,
    #[serde(default)]
    pub thumbnail_url: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackendVideoData {
    #[serde(default)]
    pub video_id: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub duration: Option<f64>,
    #[serde(default)]
    pub thumbnail: Option<String>,
    #[serde(default)]
    pub formats: Option<Vec<VideoFormat>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawVideoInfo {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub duration: Option<f64>,
    #[serde(default)]
    pub formats: Option<Vec<VideoFormat>>,
    #[serde(default)]
    pub thumbnail_url: Option<String>,
}

fn title_or_default(title: Option<String>) -> String {
    title
        .filter(|t| !t.trim().is_empty())
        .unwrap_or_else(|| UNTITLED.to_string())
}

/// Normalize any known download response shape
pub fn adapt_download_response(resp: BackendVideoResponse) -> Result<DownloadedVideo, DomainError> {
    let (file_path, info) = match resp {
        BackendVideoResponse {
            video_info: Some(info),
            file_path: Some(file_path),
            ..
        } => (
            file_path,
            VideoInfo {
                title: title_or_default(info.title),
                duration: info.duration.unwrap_or(0.0),
                formats: info.formats.unwrap_or_default(),
                thumbnail_url: info.thumbnail_url.unwrap_or_default(),
            },
        ),
        BackendVideoResponse {
            success: Some(true),
            data: Some(data),
            ..
        } => (
            data.video_id.unwrap_or_default(),
            VideoInfo {
                title: title_or_default(data.title),
                duration: data.duration.unwrap_or(0.0),
                formats: data.formats.unwrap_or_default(),
                thumbnail_url: data.thumbnail.unwrap_or_default(),
            },
        ),
        BackendVideoResponse {
            video: Some(video),
            ..
        } => (
            video.path.or(video.id).unwrap_or_default(),
            VideoInfo {
                title: title_or_default(video.title),
                duration: video.duration.unwrap_or(0.0),
                formats: Vec::new(),
                thumbnail_url: video.thumbnail_url.unwrap_or_default(),
            },
        ),
        flat => (
            flat.file_path.or(flat.path).unwrap_or_default(),
            VideoInfo {
                title: title_or_default(flat.title),
                duration: flat.duration.unwrap_or(0.0),
                formats: Vec::new(),
                thumbnail_url: String::new(),
            },
        ),
    };

    let video_id = video_id_from_path(&file_path).ok_or_else(|| {
        DomainError::InvalidResponse("response does not identify the downloaded video".to_string())
    })?;

    Ok(DownloadedVideo {
        video_id,
        file_path,
        info,
    })
}
