use std::time::{Duration, Instant};

use anyhow::{bail, Context};
use tilescene::{SceneConfig, SceneContext, TileEvent};

/// How long to wait for a layer's textures before giving up.
const SETTLE_TIMEOUT: Duration = Duration::from_secs(120);

/// Headless host: builds the configured layer and reports load progress
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tilescene::init_logging();

    let config = match std::env::args().nth(1) {
        Some(path) => SceneConfig::from_file(&path)
            .with_context(|| format!("failed to read config from {}", path))?,
        None => SceneConfig::default(),
    }
    .with_env()
    .context("invalid TILESCENE_* environment override")?;

    if config.access_key.is_empty() {
        bail!("no access key: set access_key in the config or TILESCENE_ACCESS_KEY");
    }

    let mut context = SceneContext::init(config).context("failed to initialise scene")?;
    let id = context.build_default_layer()?;

    let total = context.layer(id).map(|layer| layer.len()).unwrap_or(0);
    log::info!("requested {} tiles for {}", total, id);

    let started = Instant::now();
    let mut failed = Vec::new();
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                log::warn!("interrupted, tearing down");
                break;
            }
            _ = tokio::time::sleep(Duration::from_millis(100)) => {}
        }

        for event in context.poll_events() {
            if let TileEvent::Failed { coord, url, .. } = event {
                failed.push((coord, url));
            }
        }

        let Some(layer) = context.layer(id) else {
            break;
        };
        let progress = layer.progress();
        log::debug!(
            "{}/{} ready, {} failed",
            progress.ready,
            progress.total(),
            progress.failed
        );
        if progress.is_settled() {
            println!(
                "{}: {} tiles ready, {} without imagery in {:.1}s",
                layer.name(),
                progress.ready,
                progress.failed,
                started.elapsed().as_secs_f32()
            );
            break;
        }
        if started.elapsed() > SETTLE_TIMEOUT {
            log::warn!("{} tiles still pending after {:?}", progress.pending, SETTLE_TIMEOUT);
            break;
        }
    }

    for (coord, url) in &failed {
        println!("  no imagery for {} ({})", coord, url);
    }

    context.teardown();
    Ok(())
}
