use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tilescene::{
    runtime::spawners::TokioSpawner, Appearance, LayerId, MapError, SceneConfig, SceneContext,
    TileCoord, TileEvent, TileFetcher, TileLoader, TileLoaderConfig,
};

/// Serves a 1x1 PNG for every URL except those containing `fail_marker`.
struct MemoryFetcher {
    png: Vec<u8>,
    fail_marker: Option<String>,
    delay: Duration,
    calls: AtomicUsize,
}

impl MemoryFetcher {
    fn new(fail_marker: Option<&str>, delay: Duration) -> Self {
        let mut png = Vec::new();
        image::RgbaImage::from_pixel(1, 1, image::Rgba([10, 20, 30, 255]))
            .write_to(
                &mut std::io::Cursor::new(&mut png),
                image::ImageOutputFormat::Png,
            )
            .unwrap();
        Self {
            png,
            fail_marker: fail_marker.map(str::to_string),
            delay,
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl TileFetcher for MemoryFetcher {
    async fn fetch(&self, url: &str) -> tilescene::Result<Vec<u8>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;
        match &self.fail_marker {
            Some(marker) if url.contains(marker.as_str()) => {
                Err(MapError::Runtime(format!("simulated 404 for {}", url)))
            }
            _ => Ok(self.png.clone()),
        }
    }
}

fn context(fetcher: Arc<MemoryFetcher>) -> SceneContext {
    let loader = TileLoader::new(
        fetcher,
        Arc::new(TokioSpawner::current().unwrap()),
        TileLoaderConfig::for_testing(),
    );
    SceneContext::with_tile_loader(SceneConfig::default(), loader).unwrap()
}

async fn wait_until_settled(context: &SceneContext, id: LayerId) {
    for _ in 0..500 {
        if context.layer(id).unwrap().progress().is_settled() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("{} did not settle", id);
}

fn collect_events(context: &SceneContext, count: usize) -> Vec<TileEvent> {
    let events = context.events().unwrap();
    (0..count)
        .map(|_| events.recv_timeout(Duration::from_secs(10)).unwrap())
        .collect()
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_single_failure_does_not_affect_other_tiles() {
    let fetcher = Arc::new(MemoryFetcher::new(Some("x=1&y=2&"), Duration::from_millis(1)));
    let mut context = context(fetcher.clone());

    let id = context.build_tile_layer("KEY123", "img", 2).unwrap();
    let events = collect_events(&context, 16);

    let failed: Vec<_> = events
        .iter()
        .filter(|event| matches!(event, TileEvent::Failed { .. }))
        .map(TileEvent::coord)
        .collect();
    assert_eq!(failed, vec![TileCoord::new(1, 2, 2)]);
    assert!(events.iter().all(|event| event.layer() == id));

    let layer = context.layer(id).unwrap();
    let progress = layer.progress();
    assert_eq!((progress.ready, progress.failed, progress.pending), (15, 1, 0));
    assert!(matches!(
        layer.tile(TileCoord::new(1, 2, 2)).unwrap().appearance(),
        Appearance::Fallback { .. }
    ));
    assert!(matches!(
        layer.tile(TileCoord::new(0, 0, 2)).unwrap().appearance(),
        Appearance::Textured { .. }
    ));
    assert_eq!(fetcher.calls.load(Ordering::SeqCst), 16);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_build_returns_before_textures_load() {
    let fetcher = Arc::new(MemoryFetcher::new(None, Duration::from_millis(200)));
    let mut context = context(fetcher);

    let id = context.build_tile_layer("KEY123", "vec", 1).unwrap();
    let layer = context.layer(id).unwrap();
    assert_eq!(layer.len(), 4);
    assert!(!layer.progress().is_settled());

    collect_events(&context, 4);
    assert!(context.layer(id).unwrap().progress().is_settled());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_removed_layer_ignores_late_completions() {
    let fetcher = Arc::new(MemoryFetcher::new(None, Duration::from_millis(100)));
    let mut context = context(fetcher);

    let id = context.build_tile_layer("KEY123", "vec", 1).unwrap();
    assert!(context.remove_layer(id));

    tokio::time::sleep(Duration::from_millis(300)).await;
    assert!(context
        .poll_events()
        .iter()
        .all(|event| !matches!(event, TileEvent::Loaded { .. })));
    assert!(context.scene().is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_rebuild_after_remove_matches_positions() {
    let fetcher = Arc::new(MemoryFetcher::new(None, Duration::from_millis(1)));
    let mut context = context(fetcher);

    let first = context.build_tile_layer("KEY123", "vec", 3).unwrap();
    let before: Vec<_> = context.layer(first).unwrap().positions();
    context.remove_layer(first);

    let second = context.build_tile_layer("KEY123", "vec", 3).unwrap();
    let after = context.layer(second).unwrap().positions();
    assert_eq!(before, after);

    let distinct: HashSet<_> = context
        .layer(second)
        .unwrap()
        .tiles()
        .iter()
        .map(|tile| tile.coord().grid_offset())
        .collect();
    assert_eq!(distinct.len(), 64);
    context.teardown();
}

#[tokio::test]
async fn test_structural_errors_fail_fast() {
    let fetcher = Arc::new(MemoryFetcher::new(None, Duration::from_millis(1)));
    let mut context = context(fetcher.clone());

    assert!(matches!(
        context.build_tile_layer("KEY123", "terrain", 1),
        Err(MapError::UnknownLayerType(_))
    ));
    assert!(matches!(
        context.build_tile_layer("KEY123", "vec", -1),
        Err(MapError::InvalidZoom { .. })
    ));
    assert!(matches!(
        context.build_tile_layer("KEY123", "vec", 30),
        Err(MapError::InvalidZoom { .. })
    ));

    assert!(context.scene().is_empty());
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_eq!(fetcher.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_replaced_layer_failures_are_not_reported() {
    let fetcher = Arc::new(MemoryFetcher::new(
        Some("x=0&y=0&l=1&tk=old"),
        Duration::from_millis(1),
    ));
    let mut context = context(fetcher);

    let old = context.build_tile_layer("old", "vec", 1).unwrap();
    wait_until_settled(&context, old).await;
    assert_eq!(context.layer(old).unwrap().progress().failed, 1);

    let new = context.replace_layer(old, "new", "vec", 1).unwrap();
    wait_until_settled(&context, new).await;
    assert!(matches!(
        context
            .layer(new)
            .unwrap()
            .tile(TileCoord::new(0, 0, 1))
            .unwrap()
            .appearance(),
        Appearance::Textured { .. }
    ));

    let mut events = Vec::new();
    for _ in 0..500 {
        events.extend(context.poll_events());
        if events.len() >= 4 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(events.len(), 4);
    assert!(events.iter().all(|event| event.layer() == new));
    assert!(events
        .iter()
        .all(|event| matches!(event, TileEvent::Loaded { .. })));
    assert!(context.poll_events().is_empty());
}
