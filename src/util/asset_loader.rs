use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use minijinja::{Environment, Error, State};
use sha2::{Digest, Sha256};

/// Resolves `asset("style.css")` in templates to a cache-busting URL that
/// carries the SHA-256 of the file contents.
#[derive(Debug, Clone)]
pub struct AssetLoader {
    root: PathBuf,
    cache: Arc<RwLock<HashMap<String, String>>>,
}

impl Default for AssetLoader {
    fn default() -> Self {
        Self::new("static")
    }
}

impl AssetLoader {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            cache: Arc::default(),
        }
    }

    pub fn asset_path(&self, path: &str) -> String {
        if let Ok(cache) = self.cache.read() {
            if let Some(hashed_path) = cache.get(path) {
                return hashed_path.clone();
            }
        }

        let Ok(contents) = fs::read(self.root.join(Path::new(path))) else {
            return format!("/static/{path}");
        };
        let hash = Sha256::digest(contents);
        let hashed_path = format!("/static/{path}?v={hash:x}");
        if let Ok(mut cache) = self.cache.write() {
            cache.insert(path.to_string(), hashed_path.clone());
        }
        hashed_path
    }

    pub fn register(&self, env: &mut Environment<'_>) {
        let loader = self.clone();
        env.add_function(
            "asset",
            move |_state: &State, path: String| -> Result<String, Error> {
                Ok(loader.asset_path(&path))
            },
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_is_served_unversioned() {
        let loader = AssetLoader::new("does-not-exist");
        assert_eq!(loader.asset_path("style.css"), "/static/style.css");
    }

    #[test]
    fn test_existing_file_gets_content_hash() {
        let dir = std::env::temp_dir().join(format!("club-assets-{}", uuid::Uuid::new_v4()));
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("app.css"), "body {}").unwrap();

        let loader = AssetLoader::new(&dir);
        let first = loader.asset_path("app.css");
        assert!(first.starts_with("/static/app.css?v="));
        assert_eq!(loader.asset_path("app.css"), first);

        fs::remove_dir_all(dir).unwrap();
    }
}
