//! Ingest training data: the tech credit article into the documentation
//! collection and the labeled examples repository into the code collection.

use anyhow::{Context, Result};
use std::path::Path;

use crate::chunking::{self, MetadataMap};
use crate::config::Config;
use crate::github::filters::java_files;
use crate::github::loader::{RepoLoader, RepoSource};
use crate::search::collection::Collection;
use crate::web::WebScraper;

/// Read the path → metadata mapping. A missing file is not an error.
pub fn load_metadata_map(path: &Path) -> Result<MetadataMap> {
    match std::fs::read_to_string(path) {
        Ok(data) => serde_json::from_str(&data)
            .with_context(|| format!("Failed to parse {}", path.display())),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::warn!(
                "Could not open repo metadata file {}; skipping metadata",
                path.display()
            );
            Ok(MetadataMap::new())
        }
        Err(e) => Err(e).with_context(|| format!("Failed to read {}", path.display())),
    }
}

pub async fn ingest_article(web: &Collection, scraper: &WebScraper, url: &str) -> Result<usize> {
    tracing::info!("Loading tech credit article {url}");
    let chunks = scraper.load_chunks(url).await?;
    web.add_documents(&chunks).await
}

/// Load the examples repository's Java files, split them, tag each chunk
/// with its metadata map entry, and store them.
pub async fn ingest_examples(
    code: &Collection,
    repos: &dyn RepoSource,
    config: &Config,
) -> Result<usize> {
    tracing::info!("Loading tech credit examples from {}", config.examples_repo);
    let mut loader = RepoLoader::new(&config.examples_repo, &config.examples_branch)?;
    let files = loader.load(repos, vec![java_files()]).await?;

    let metadata_map = load_metadata_map(&config.metadata_path)?;
    let chunks = chunking::split_documents(files, &metadata_map);
    code.add_documents(&chunks).await
}

pub async fn train(
    code: &Collection,
    web: &Collection,
    scraper: &WebScraper,
    repos: &dyn RepoSource,
    config: &Config,
) -> Result<()> {
    let articles = ingest_article(web, scraper, &config.article_url).await?;
    let examples = ingest_examples(code, repos, config).await?;
    tracing::info!("Training done: {articles} article chunks, {examples} example chunks");
    Ok(())
}
