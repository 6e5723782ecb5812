//! Basic usage example - persist a settings record and a score counter

use datagate_core::{ByteStore, FileStore, Gateway, Result, SharedRegistry};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Settings {
    volume: f64,
    name: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    FmtSubscriber::builder()
        .with_max_level(Level::DEBUG)
        .with_target(false)
        .compact()
        .init();

    // Get storage root from args or use a local folder
    let root = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "./example-data".to_string());

    println!("Using storage root: {}", root);

    let store: Arc<dyn ByteStore> = Arc::new(FileStore::new(&root).with_backup(true));
    let registry = Arc::new(SharedRegistry::new(store.clone()));

    let settings = registry.get_or_create(
        "settings.json",
        Settings {
            volume: 0.5,
            name: "p1".to_string(),
        },
        true,
    )?;
    settings.modify(|s| s.volume = (s.volume + 0.1).min(1.0))?;
    println!("Settings: {:?}", settings.get()?);

    // Another call site gets the very same instance
    let same = registry.get_or_create(
        "settings.json",
        Settings {
            volume: 0.0,
            name: "ignored".to_string(),
        },
        true,
    )?;
    println!("Shared instance reused: {}", Arc::ptr_eq(&settings, &same));

    let score = Gateway::<u64>::new("stats/score.json", store)?;
    let current = score.load_async().await?.unwrap_or(0);
    score.overwrite_async(current + 1).await?;
    println!("Score is now {} ({})", current + 1, score);

    for handle in registry.list_all() {
        println!("  - {} exists={}", handle.relative_path(), handle.exists());
    }

    Ok(())
}
