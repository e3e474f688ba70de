use async_trait::async_trait;
use crossbeam_channel::{unbounded, Receiver, Sender};
use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};
use tokio::sync::Semaphore;

use super::texture::{Texture, TextureHandle};
use crate::core::geo::TileCoord;
use crate::prelude::{Arc, Duration};
use crate::rendering::scene::LayerId;
use crate::runtime::{self, AsyncSpawner};
use crate::{MapError, Result};

/// Shared async HTTP client for the default loader configuration. Building
/// the client once avoids TLS and connection pool setup for every layer.
static HTTP_CLIENT: OnceCell<reqwest::Client> = OnceCell::new();

/// Configuration for the tile loader
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TileLoaderConfig {
    /// Maximum concurrent tile downloads
    pub max_concurrent: usize,
    /// Per-request timeout in milliseconds
    pub timeout_ms: u64,
    /// User-Agent sent with every tile request
    pub user_agent: String,
}

impl Default for TileLoaderConfig {
    fn default() -> Self {
        Self {
            max_concurrent: 16,
            timeout_ms: 10_000,
            user_agent: concat!("tilescene/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

/// Unified configuration presets for TileLoaderConfig
impl TileLoaderConfig {
    pub fn low_resource() -> Self {
        Self {
            max_concurrent: 4,
            timeout_ms: 20_000,
            ..Self::default()
        }
    }

    pub fn high_performance() -> Self {
        Self {
            max_concurrent: 64,
            timeout_ms: 5_000,
            ..Self::default()
        }
    }

    pub fn for_testing() -> Self {
        Self {
            max_concurrent: 4,
            timeout_ms: 500,
            ..Self::default()
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Fetches raw tile bytes for a URL.
#[async_trait]
pub trait TileFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>>;
}

/// [`TileFetcher`] backed by `reqwest`.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
    timeout: Duration,
}

impl HttpFetcher {
    pub fn new(config: &TileLoaderConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(config.user_agent.as_str())
            .timeout(config.timeout())
            .build()?;
        Ok(Self {
            client,
            timeout: config.timeout(),
        })
    }

    /// Shared client for the default config, a dedicated one otherwise.
    pub fn for_config(config: &TileLoaderConfig) -> Result<Self> {
        if *config == TileLoaderConfig::default() {
            Self::shared()
        } else {
            Self::new(config)
        }
    }

    /// Fetcher using the process-wide client built from the default config.
    pub fn shared() -> Result<Self> {
        let config = TileLoaderConfig::default();
        let client = HTTP_CLIENT
            .get_or_try_init(|| {
                reqwest::Client::builder()
                    .user_agent(config.user_agent.as_str())
                    .timeout(config.timeout())
                    .build()
            })?
            .clone();
        Ok(Self {
            client,
            timeout: config.timeout(),
        })
    }
}

#[async_trait]
impl TileFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>> {
        let response = self
            .client
            .get(url)
            .timeout(self.timeout)
            .send()
            .await?
            .error_for_status()?;
        Ok(response.bytes().await?.to_vec())
    }
}

/// Completion notice for the host, tagged with the layer that asked for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TileEvent {
    Loaded {
        layer: LayerId,
        coord: TileCoord,
    },
    Failed {
        layer: LayerId,
        coord: TileCoord,
        url: String,
        reason: String,
    },
    /// The tile was released before its load finished.
    Discarded {
        layer: LayerId,
        coord: TileCoord,
    },
}

impl TileEvent {
    pub fn layer(&self) -> LayerId {
        match self {
            TileEvent::Loaded { layer, .. }
            | TileEvent::Failed { layer, .. }
            | TileEvent::Discarded { layer, .. } => *layer,
        }
    }

    pub fn coord(&self) -> TileCoord {
        match self {
            TileEvent::Loaded { coord, .. }
            | TileEvent::Failed { coord, .. }
            | TileEvent::Discarded { coord, .. } => *coord,
        }
    }
}

/// Given a URL, hand back a texture handle right away and resolve it later.
///
/// Implementations must never panic on a failed load; failures end up in the
/// handle's state. `layer` only tags the completion event.
pub trait TextureLoader: Send + Sync {
    fn request(&self, layer: LayerId, coord: TileCoord, url: String) -> TextureHandle;
}

/// Async tile loader with bounded concurrency
pub struct TileLoader {
    fetcher: Arc<dyn TileFetcher>,
    spawner: Arc<dyn AsyncSpawner>,
    permits: Arc<Semaphore>,
    event_tx: Sender<TileEvent>,
    event_rx: Receiver<TileEvent>,
    config: TileLoaderConfig,
}

impl TileLoader {
    pub fn new(
        fetcher: Arc<dyn TileFetcher>,
        spawner: Arc<dyn AsyncSpawner>,
        config: TileLoaderConfig,
    ) -> Self {
        let (event_tx, event_rx) = unbounded();
        let permits = Arc::new(Semaphore::new(config.max_concurrent.max(1)));

        Self {
            fetcher,
            spawner,
            permits,
            event_tx,
            event_rx,
            config,
        }
    }

    /// HTTP loader running on the caller's tokio runtime.
    pub fn http(config: TileLoaderConfig) -> Result<Self> {
        let fetcher = Arc::new(HttpFetcher::for_config(&config)?);
        Ok(Self::new(fetcher, runtime::default_spawner()?, config))
    }

    /// Receiver for load completions, for hosts that poll or block on it.
    pub fn events(&self) -> &Receiver<TileEvent> {
        &self.event_rx
    }

    /// Try to receive completed tile events (non-blocking)
    pub fn try_recv_events(&self) -> Vec<TileEvent> {
        self.event_rx.try_iter().collect()
    }

    /// Get configuration
    pub fn config(&self) -> &TileLoaderConfig {
        &self.config
    }
}

impl TextureLoader for TileLoader {
    fn request(&self, layer: LayerId, coord: TileCoord, url: String) -> TextureHandle {
        let mut handle = TextureHandle::pending();
        let completer = handle.completer();
        let fetcher = self.fetcher.clone();
        let permits = self.permits.clone();
        let event_tx = self.event_tx.clone();

        log::debug!("queue tile {} of {} from {}", coord, layer, url);

        let task = runtime::spawn(self.spawner.as_ref(), async move {
            let result = match permits.acquire_owned().await {
                Ok(_permit) => {
                    if completer.is_released() {
                        let _ = event_tx.send(TileEvent::Discarded { layer, coord });
                        return;
                    }
                    fetcher
                        .fetch(&url)
                        .await
                        .and_then(|bytes| Texture::decode(&bytes))
                }
                Err(e) => Err(MapError::Runtime(e.to_string())),
            };

            let event = match result {
                Ok(texture) => {
                    if completer.complete(Ok(texture)) {
                        log::debug!("tile {} of {} ready", coord, layer);
                        TileEvent::Loaded { layer, coord }
                    } else {
                        TileEvent::Discarded { layer, coord }
                    }
                }
                Err(e) => {
                    let reason = e.to_string();
                    let failure = MapError::TileLoad {
                        coord,
                        reason: reason.clone(),
                    };
                    if completer.complete(Err(failure)) {
                        log::warn!("failed to load tile {} of {}: {}", coord, layer, reason);
                        TileEvent::Failed {
                            layer,
                            coord,
                            url,
                            reason,
                        }
                    } else {
                        log::debug!("dropped failure of released tile {}: {}", coord, reason);
                        TileEvent::Discarded { layer, coord }
                    }
                }
            };
            let _ = event_tx.send(event);
        });

        handle.attach_task(task);
        handle
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::sync::Mutex;

    /// Loader that records requested URLs and leaves every handle pending.
    #[derive(Default)]
    pub(crate) struct RecordingLoader {
        urls: Mutex<Vec<String>>,
    }

    impl RecordingLoader {
        pub(crate) fn urls(&self) -> Vec<String> {
            self.urls.lock().unwrap().clone()
        }
    }

    impl TextureLoader for RecordingLoader {
        fn request(&self, _layer: LayerId, _coord: TileCoord, url: String) -> TextureHandle {
            self.urls.lock().unwrap().push(url);
            TextureHandle::pending()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::spawners::TokioSpawner;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn png() -> Vec<u8> {
        let mut bytes = Vec::new();
        image::RgbaImage::from_pixel(1, 1, image::Rgba([0, 0, 0, 255]))
            .write_to(
                &mut std::io::Cursor::new(&mut bytes),
                image::ImageOutputFormat::Png,
            )
            .unwrap();
        bytes
    }

    struct StaticFetcher {
        payload: Vec<u8>,
        delay: Duration,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl TileFetcher for StaticFetcher {
        async fn fetch(&self, _url: &str) -> Result<Vec<u8>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(self.delay).await;
            Ok(self.payload.clone())
        }
    }

    fn loader(payload: Vec<u8>, delay: Duration) -> (TileLoader, Arc<StaticFetcher>) {
        let fetcher = Arc::new(StaticFetcher {
            payload,
            delay,
            calls: AtomicUsize::new(0),
        });
        let loader = TileLoader::new(
            fetcher.clone(),
            Arc::new(TokioSpawner::current().unwrap()),
            TileLoaderConfig::for_testing(),
        );
        (loader, fetcher)
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_request_resolves_handle() {
        let (loader, fetcher) = loader(png(), Duration::from_millis(1));
        let layer = LayerId::new(7);
        let coord = TileCoord::new(0, 0, 0);
        let handle = loader.request(layer, coord, "mem://tile".into());

        let event = loader.events().recv_timeout(Duration::from_secs(5)).unwrap();
        assert_eq!(event, TileEvent::Loaded { layer, coord });
        assert_eq!(event.layer(), layer);
        assert!(handle.is_ready());
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_undecodable_payload_fails_tile() {
        let (loader, _) = loader(b"garbage".to_vec(), Duration::from_millis(1));
        let coord = TileCoord::new(1, 0, 1);
        let handle = loader.request(LayerId::new(3), coord, "mem://bad".into());

        let event = loader.events().recv_timeout(Duration::from_secs(5)).unwrap();
        assert!(matches!(event, TileEvent::Failed { coord: c, .. } if c == coord));
        assert_eq!(event.layer(), LayerId::new(3));
        assert!(handle.is_failed());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_dropped_handle_never_resolves() {
        let (loader, _) = loader(png(), Duration::from_millis(50));
        let handle = loader.request(LayerId::new(0), TileCoord::new(0, 0, 0), "mem://tile".into());
        let completer = handle.completer();
        drop(handle);

        tokio::time::sleep(Duration::from_millis(150)).await;
        assert!(completer.is_released());
        assert!(loader
            .try_recv_events()
            .iter()
            .all(|event| !matches!(event, TileEvent::Loaded { .. })));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_late_failure_is_discarded_not_reported() {
        let (loader, _) = loader(b"garbage".to_vec(), Duration::from_millis(50));
        let layer = LayerId::new(1);
        let coord = TileCoord::new(0, 0, 0);
        let handle = loader.request(layer, coord, "mem://bad".into());
        assert!(handle
            .completer()
            .complete(Ok(Texture::from_rgba(1, 1, vec![0; 4]))));

        let event = loader.events().recv_timeout(Duration::from_secs(5)).unwrap();
        assert_eq!(event, TileEvent::Discarded { layer, coord });
        assert!(handle.is_ready());
    }

    #[test]
    fn test_config_presets() {
        let default = TileLoaderConfig::default();
        assert!(TileLoaderConfig::low_resource().max_concurrent < default.max_concurrent);
        assert!(TileLoaderConfig::high_performance().max_concurrent > default.max_concurrent);
        assert_eq!(
            TileLoaderConfig::for_testing().timeout(),
            Duration::from_millis(500)
        );
    }

    #[tokio::test]
    async fn test_default_config_uses_shared_client() {
        let fetcher = HttpFetcher::for_config(&TileLoaderConfig::default()).unwrap();
        assert!(HTTP_CLIENT.get().is_some());
        assert_eq!(fetcher.timeout, TileLoaderConfig::default().timeout());

        let custom = HttpFetcher::for_config(&TileLoaderConfig::for_testing()).unwrap();
        assert_eq!(custom.timeout, Duration::from_millis(500));

        let loader = TileLoader::http(TileLoaderConfig::default()).unwrap();
        assert_eq!(loader.config(), &TileLoaderConfig::default());
    }
}
