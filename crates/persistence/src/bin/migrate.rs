#![deny(warnings)]

//! `migrate [DATABASE_URL] [PROMO_CATALOG.yaml]`
//!
//! Creates or migrates the order database and optionally seeds the promo
//! catalog from YAML.

use anyhow::Context;
use persistence::{default_sqlite_url, Store};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let mut args = std::env::args().skip(1);
    let url = args.next().unwrap_or_else(|| default_sqlite_url().to_string());
    let seed = args.next();

    // Ensure directory exists
    let path = url
        .strip_prefix("sqlite://")
        .or_else(|| url.strip_prefix("sqlite:"));
    if let Some(path) = path.filter(|p| !p.starts_with(":memory:")) {
        if let Some(parent) = std::path::Path::new(path).parent() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let store = Store::connect(&url).await?;

    if let Some(seed) = seed {
        let text = std::fs::read_to_string(&seed).with_context(|| format!("reading {seed}"))?;
        let catalog = order_pricing::promo_catalog_from_yaml(&text)?;
        for promo in &catalog {
            store.upsert_promo(promo).await?;
        }
        println!("Seeded {} promo codes from {}", catalog.len(), seed);
    }
    println!("DB migrated at {}", url);
    Ok(())
}
