use std::sync::Arc;
use std::time::Duration;

use crate::adapters::http_range::build_client;
use crate::adapters::{
    FileMediaBufferAdapter, HttpBackendClient, HttpRangeClient, Settings, TempBlobStoreAdapter,
};
use crate::app::{
    cut_interactor::CutInteractor, fallback::PlaybackFallbackController,
    feeder::ChunkedBufferFeeder, player::PlayerView,
};
use crate::domain::model::BackendEndpoints;
use crate::error::CutStreamResult;
use crate::ports::{
    BackendPort, BlobStorePort, MediaBufferPort, PlayerHooks, RangeFetchPort, StreamObserver,
};

pub trait AppContainer: Send + Sync {
    fn cut_interactor(&self) -> Arc<CutInteractor>;
    fn player(
        &self,
        hooks: Arc<dyn PlayerHooks>,
        observer: Option<Arc<dyn StreamObserver>>,
    ) -> CutStreamResult<PlayerView>;
}

pub struct DefaultAppContainer {
    settings: Settings,
    endpoints: BackendEndpoints,
    range_port: Arc<dyn RangeFetchPort>,
    buffer_port: Arc<dyn MediaBufferPort>,
    blob_port: Arc<dyn BlobStorePort>,
    cut_interactor: Arc<CutInteractor>,
}

impl DefaultAppContainer {
    pub fn new(settings: Settings) -> CutStreamResult<Self> {
        settings.validate()?;
        let endpoints = BackendEndpoints::new(&settings.backend.base_url)?;
        let client = build_client(settings.backend.connect_timeout_secs.map(Duration::from_secs))?;
        let bypass = settings.backend.tunnel_bypass;

        let range_port = Arc::new(HttpRangeClient::new(client.clone(), bypass));
        let backend_port = Arc::new(HttpBackendClient::new(client, endpoints.clone(), bypass));
        let buffer_port = Arc::new(match &settings.streaming.buffer_dir {
            Some(dir) => FileMediaBufferAdapter::new(dir),
            None => FileMediaBufferAdapter::in_temp_dir(),
        });
        let blob_port = Arc::new(match &settings.playback.blob_dir {
            Some(dir) => TempBlobStoreAdapter::new(dir),
            None => TempBlobStoreAdapter::in_temp_dir(),
        });

        let cut_interactor = Arc::new(CutInteractor::new(
            Arc::clone(&backend_port) as Arc<dyn BackendPort>
        ));

        Ok(Self {
            settings,
            endpoints,
            range_port: range_port as Arc<dyn RangeFetchPort>,
            buffer_port: buffer_port as Arc<dyn MediaBufferPort>,
            blob_port: blob_port as Arc<dyn BlobStorePort>,
            cut_interactor,
        })
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }
}

impl AppContainer for DefaultAppContainer {
    fn cut_interactor(&self) -> Arc<CutInteractor> {
        Arc::clone(&self.cut_interactor)
    }

    fn player(
        &self,
        hooks: Arc<dyn PlayerHooks>,
        observer: Option<Arc<dyn StreamObserver>>,
    ) -> CutStreamResult<PlayerView> {
        let feeder = ChunkedBufferFeeder::new(
            Arc::clone(&self.range_port),
            Arc::clone(&self.buffer_port),
            self.settings.chunk_policy()?,
        );
        let fallback = PlaybackFallbackController::new(
            Arc::clone(&self.range_port),
            Arc::clone(&self.blob_port),
            self.settings.retry_policy(),
        );
        Ok(PlayerView::new(
            feeder,
            fallback,
            Arc::clone(&self.blob_port),
            self.endpoints.clone(),
            hooks,
            observer,
        ))
    }
}
