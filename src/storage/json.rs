//! JSON file storage implementation
//!
//! One file per site, `<data-dir>/<site key>_articles_dataset.json`, holding a
//! four-space indented JSON array of articles.

use crate::storage::traits::{DatasetStore, StorageError, StorageResult};
use crate::storage::Article;
use serde::Serialize;
use serde_json::ser::PrettyFormatter;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};

/// File name of a site's dataset
pub fn dataset_file_name(site_key: &str) -> String {
    format!("{}_articles_dataset.json", site_key)
}

/// Dataset store backed by one JSON file per site
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    data_dir: PathBuf,
}

impl JsonFileStore {
    /// Creates a store rooted at `data_dir`
    ///
    /// The directory is created lazily on the first write.
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Path of the dataset file for a site key
    pub fn dataset_path(&self, site_key: &str) -> PathBuf {
        self.data_dir.join(dataset_file_name(site_key))
    }
}

impl DatasetStore for JsonFileStore {
    fn load(&self, site_key: &str) -> StorageResult<Vec<Article>> {
        let path = self.dataset_path(site_key);

        let file = match File::open(&path) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::info!("No existing dataset found at {}", path.display());
                return Ok(Vec::new());
            }
            Err(source) => return Err(StorageError::Io { path, source }),
        };

        let articles: Vec<Article> = serde_json::from_reader(BufReader::new(file))
            .map_err(|source| StorageError::Json {
                path: path.clone(),
                source,
            })?;

        tracing::info!(
            "Loaded existing dataset from {} ({} articles)",
            path.display(),
            articles.len()
        );
        Ok(articles)
    }

    /// Writes the full dataset to a temporary sibling file, then renames it
    /// over the previous one
    fn write(&self, site_key: &str, articles: &[Article]) -> StorageResult<()> {
        fs::create_dir_all(&self.data_dir).map_err(|source| StorageError::Io {
            path: self.data_dir.clone(),
            source,
        })?;

        let path = self.dataset_path(site_key);
        let tmp_path = path.with_extension("json.tmp");

        let io_err = |source| StorageError::Io {
            path: tmp_path.clone(),
            source,
        };

        let file = File::create(&tmp_path).map_err(io_err)?;
        let mut writer = BufWriter::new(file);
        let mut serializer =
            serde_json::Serializer::with_formatter(&mut writer, PrettyFormatter::with_indent(b"    "));
        articles
            .serialize(&mut serializer)
            .map_err(|source| StorageError::Json {
                path: tmp_path.clone(),
                source,
            })?;
        writer.flush().map_err(io_err)?;
        drop(writer);

        fs::rename(&tmp_path, &path).map_err(|source| StorageError::Io {
            path: path.clone(),
            source,
        })?;

        tracing::debug!("Wrote {} articles to {}", articles.len(), path.display());
        Ok(())
    }
}
