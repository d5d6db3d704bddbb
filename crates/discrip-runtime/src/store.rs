//! File-backed disc store: one pretty-printed JSON document per disc.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use discrip_core::{DiscIdentity, DiscStore, DiscSummary, StoreError};
use serde_json::{Value, json};
use tracing::info;

/// Writes `<out_dir>/<disc_id>.json`.
#[derive(Debug, Clone)]
pub struct JsonDiscStore {
    out_dir: PathBuf,
}

impl JsonDiscStore {
    pub fn new(out_dir: impl Into<PathBuf>) -> Self {
        Self {
            out_dir: out_dir.into(),
        }
    }

    pub fn out_dir(&self) -> &Path {
        &self.out_dir
    }

    pub fn path_for(&self, disc_id: i64) -> PathBuf {
        self.out_dir.join(format!("{disc_id}.json"))
    }

    /// The stored document: the summary mapping plus the identity it was
    /// recorded under.
    fn document(identity: &DiscIdentity, summary: &DiscSummary) -> Value {
        let mut document = summary.to_json();
        if let Value::Object(map) = &mut document {
            map.insert(
                "Disc".to_string(),
                json!({ "id": identity.disc_id, "label": identity.label }),
            );
        }
        document
    }
}

#[async_trait]
impl DiscStore for JsonDiscStore {
    async fn contains(&self, disc_id: i64) -> Result<bool, StoreError> {
        Ok(tokio::fs::try_exists(self.path_for(disc_id)).await?)
    }

    async fn record(&self, identity: &DiscIdentity, summary: &DiscSummary) -> Result<(), StoreError> {
        tokio::fs::create_dir_all(&self.out_dir).await?;
        let path = self.path_for(identity.disc_id);
        let contents = serde_json::to_vec_pretty(&Self::document(identity, summary))?;
        tokio::fs::write(&path, contents).await?;
        info!(path = %path.display(), titles = summary.titles.len(), "Recorded disc");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use discrip_core::{Event, InfoValue, ItemAttribute};

    fn summary() -> DiscSummary {
        DiscSummary::from_history(&[
            Event::DiscInfo {
                attribute: ItemAttribute::Name,
                code: 0,
                value: InfoValue::Text("MOVIE".to_string()),
            },
            Event::TitleInfo {
                title_number: 0,
                attribute: ItemAttribute::ChapterCount,
                code: 0,
                value: InfoValue::Integer(8),
            },
        ])
    }

    #[tokio::test]
    async fn test_record_then_contains() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonDiscStore::new(dir.path().join("out"));
        let identity = DiscIdentity {
            disc_id: -42,
            label: "MOVIE".to_string(),
        };

        assert!(!store.contains(-42).await.unwrap());
        store.record(&identity, &summary()).await.unwrap();
        assert!(store.contains(-42).await.unwrap());

        let written = std::fs::read_to_string(dir.path().join("out/-42.json")).unwrap();
        let value: Value = serde_json::from_str(&written).unwrap();
        assert_eq!(value["Name"], "MOVIE");
        assert_eq!(value["Titles"][0]["ChapterCount"], 8);
        assert_eq!(value["Disc"]["id"], -42);
        assert!(written.contains('\n'), "expected pretty-printed output");
    }

    #[tokio::test]
    async fn test_record_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonDiscStore::new(dir.path());
        let identity = DiscIdentity {
            disc_id: 7,
            label: "A".to_string(),
        };

        store.record(&identity, &DiscSummary::default()).await.unwrap();
        store.record(&identity, &summary()).await.unwrap();

        let value: Value =
            serde_json::from_slice(&std::fs::read(store.path_for(7)).unwrap()).unwrap();
        assert_eq!(value["Name"], "MOVIE");
    }
}
