use std::{
    io::ErrorKind,
    path::{Path, PathBuf},
    sync::Arc,
};

use anyhow::anyhow;
use axum::body::Bytes;
use futures_util::future::BoxFuture;

/// Where uploaded media lives. Keys are flat file names.
pub trait ObjectStore: Send + Sync {
    fn put<'a>(&'a self, key: &'a str, bytes: Bytes, content_type: &'a str) -> BoxFuture<'a, anyhow::Result<()>>;
    fn delete<'a>(&'a self, key: &'a str) -> BoxFuture<'a, anyhow::Result<()>>;
    fn url(&self, key: &str) -> String;
}

pub type MediaStore = Arc<dyn ObjectStore>;

/// Objects as files in one directory, served back under `base_url`.
pub struct LocalStore {
    root: PathBuf,
    base_url: String,
}

impl LocalStore {
    pub fn new(root: impl AsRef<Path>, base_url: &str) -> Self {
        LocalStore {
            root: root.as_ref().to_path_buf(),
            base_url: base_url.trim_end_matches('/').to_owned(),
        }
    }

    fn path(&self, key: &str) -> anyhow::Result<PathBuf> {
        let is_flat = !key.is_empty()
            && key != "."
            && key != ".."
            && !key.contains(['/', '\\']);
        if !is_flat {
            return Err(anyhow!("refusing object key {key:?}"));
        }
        Ok(self.root.join(key))
    }
}

impl ObjectStore for LocalStore {
    fn put<'a>(&'a self, key: &'a str, bytes: Bytes, _content_type: &'a str) -> BoxFuture<'a, anyhow::Result<()>> {
        Box::pin(async move {
            let path = self.path(key)?;
            tokio::fs::create_dir_all(&self.root).await?;
            tokio::fs::write(path, &bytes).await?;
            Ok(())
        })
    }

    fn delete<'a>(&'a self, key: &'a str) -> BoxFuture<'a, anyhow::Result<()>> {
        Box::pin(async move {
            match tokio::fs::remove_file(self.path(key)?).await {
                Ok(()) => Ok(()),
                Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
                Err(err) => Err(err.into()),
            }
        })
    }

    fn url(&self, key: &str) -> String {
        format!("{}/{key}", self.base_url)
    }
}
