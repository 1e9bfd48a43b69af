//! Page sources: where raw HTML for a race page comes from.

use anyhow::{Context, Result};
use async_trait::async_trait;
use std::path::PathBuf;

use super::PageKind;
use crate::race::RaceConfig;

/// Anything that can produce the HTML of one race page.
#[async_trait]
pub trait PageSource: Send + Sync {
    async fn fetch(&self, kind: PageKind, config: &RaceConfig, race_num: u8) -> Result<String>;
}

/// Saved pages laid out as `<root>/<NN>/<page>.html`.
pub struct FileSource {
    root: PathBuf,
}

impl FileSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn page_path(&self, kind: PageKind, race_num: u8) -> PathBuf {
        self.root
            .join(format!("{:02}", race_num))
            .join(format!("{}.html", kind.file_stem()))
    }
}

#[async_trait]
impl PageSource for FileSource {
    async fn fetch(&self, kind: PageKind, _config: &RaceConfig, race_num: u8) -> Result<String> {
        let path = self.page_path(kind, race_num);
        tokio::fs::read_to_string(&path)
            .await
            .with_context(|| format!("reading saved page {}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_file_source() {
        let root = std::env::temp_dir().join(format!("umai-pages-{}", std::process::id()));
        let source = FileSource::new(&root);
        let path = source.page_path(PageKind::Syoin, 3);
        assert!(path.ends_with("03/syoin.html"));

        tokio::fs::create_dir_all(path.parent().unwrap()).await.unwrap();
        tokio::fs::write(&path, "<table class=\"syoin\"></table>").await.unwrap();

        let config = RaceConfig::new("2026", "01", "05", "01").unwrap();
        let html = source.fetch(PageKind::Syoin, &config, 3).await.unwrap();
        assert!(html.contains("syoin"));

        let missing = source.fetch(PageKind::Cpu, &config, 3).await;
        assert!(missing.is_err());

        tokio::fs::remove_dir_all(&root).await.unwrap();
    }
}
