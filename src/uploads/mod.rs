use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::error::AppError;

/// Hard cap on uploaded avatar size.
pub const MAX_AVATAR_BYTES: usize = 5_000_000;

/// Directory-backed store for post avatar images.
///
/// Filenames are generated here and are the only key the rest of the
/// system uses; the store never serves anything outside its root.
pub struct UploadStore {
    root: PathBuf,
}

impl UploadStore {
    pub fn new(root: impl Into<PathBuf>) -> std::io::Result<Self> {
        let root = root.into();
        std::fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Validates and writes an uploaded avatar, returning the stored filename.
    ///
    /// The stored name is the original base name plus a random suffix, so two
    /// uploads sharing an original filename never collide.
    pub fn save(&self, original_name: &str, data: &[u8]) -> Result<String, AppError> {
        if data.is_empty() {
            return Err(AppError::Validation("No image uploaded".into()));
        }
        if data.len() > MAX_AVATAR_BYTES {
            return Err(AppError::Validation(
                "Image size should not exceed 5MB".into(),
            ));
        }

        let filename = unique_filename(original_name)?;
        std::fs::write(self.root.join(&filename), data)?;
        Ok(filename)
    }

    /// Reads a stored avatar. Missing file maps to NotFound.
    pub fn read(&self, filename: &str) -> Result<Vec<u8>, AppError> {
        check_filename(filename)?;
        std::fs::read(self.root.join(filename)).map_err(|e| match e.kind() {
            ErrorKind::NotFound => AppError::NotFound,
            _ => AppError::Storage(e),
        })
    }

    /// Removes a stored avatar.
    ///
    /// A file that is already gone counts as removed; any other failure is
    /// surfaced so the caller can abort (post deletion treats it as
    /// retryable).
    pub fn remove(&self, filename: &str) -> Result<(), AppError> {
        check_filename(filename)?;
        match std::fs::remove_file(self.root.join(filename)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::warn!("Avatar {} already missing on remove", filename);
                Ok(())
            }
            Err(e) => Err(AppError::Storage(e)),
        }
    }

    /// Best-effort removal for avatar replacement: failure is logged, never
    /// propagated.
    pub fn remove_best_effort(&self, filename: &str) {
        if let Err(e) = self.remove(filename) {
            tracing::warn!("Could not remove old avatar {}: {}", filename, e);
        }
    }

    pub fn exists(&self, filename: &str) -> bool {
        check_filename(filename).is_ok() && self.root.join(filename).exists()
    }
}

/// Original base name + random suffix + original extension.
fn unique_filename(original_name: &str) -> Result<String, AppError> {
    check_filename(original_name)?;

    let path = Path::new(original_name);
    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .filter(|s| !s.is_empty())
        .ok_or_else(|| AppError::Validation("Invalid filename".into()))?;
    let suffix = uuid::Uuid::new_v4().simple().to_string();

    Ok(match path.extension().and_then(|e| e.to_str()) {
        Some(ext) => format!("{}-{}.{}", stem, suffix, ext),
        None => format!("{}-{}", stem, suffix),
    })
}

/// Bare filenames only: no separators, no parent-directory components.
fn check_filename(name: &str) -> Result<(), AppError> {
    if name.is_empty()
        || name.contains('/')
        || name.contains('\\')
        || name == "."
        || name == ".."
    {
        return Err(AppError::Validation("Invalid filename".into()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn test_store() -> (UploadStore, TempDir) {
        let tmp = TempDir::new().unwrap();
        let store = UploadStore::new(tmp.path().join("uploads")).unwrap();
        (store, tmp)
    }

    #[test]
    fn save_keeps_stem_and_extension() {
        let (store, _tmp) = test_store();
        let name = store.save("cat.png", b"img").unwrap();
        assert!(name.starts_with("cat-"));
        assert!(name.ends_with(".png"));
        assert!(store.exists(&name));
    }

    #[test]
    fn same_original_name_yields_unique_files() {
        let (store, _tmp) = test_store();
        let a = store.save("photo.jpg", b"one").unwrap();
        let b = store.save("photo.jpg", b"two").unwrap();
        assert_ne!(a, b);
        assert_eq!(store.read(&a).unwrap(), b"one");
        assert_eq!(store.read(&b).unwrap(), b"two");
    }

    #[test]
    fn oversize_upload_is_rejected_and_nothing_written() {
        let (store, _tmp) = test_store();
        let big = vec![0u8; MAX_AVATAR_BYTES + 1];
        let err = store.save("big.png", &big).unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
        assert_eq!(std::fs::read_dir(store.root()).unwrap().count(), 0);
    }

    #[test]
    fn exactly_at_limit_is_accepted() {
        let (store, _tmp) = test_store();
        let data = vec![0u8; MAX_AVATAR_BYTES];
        assert!(store.save("edge.png", &data).is_ok());
    }

    #[test]
    fn empty_upload_is_rejected() {
        let (store, _tmp) = test_store();
        let err = store.save("empty.png", b"").unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[test]
    fn traversal_names_are_rejected() {
        let (store, _tmp) = test_store();
        assert!(store.save("../evil.png", b"x").is_err());
        assert!(store.save("a/b.png", b"x").is_err());
        assert!(store.read("../../etc/passwd").is_err());
        assert!(store.remove("..").is_err());
    }

    #[test]
    fn remove_missing_file_is_ok() {
        let (store, _tmp) = test_store();
        store.remove("never-existed.png").unwrap();
    }

    #[test]
    fn remove_deletes_the_file() {
        let (store, _tmp) = test_store();
        let name = store.save("gone.png", b"data").unwrap();
        store.remove(&name).unwrap();
        assert!(!store.exists(&name));
    }

    #[test]
    fn read_missing_is_not_found() {
        let (store, _tmp) = test_store();
        let err = store.read("nope.png").unwrap_err();
        assert!(matches!(err, AppError::NotFound));
    }

    #[test]
    fn extensionless_name_still_gets_suffix() {
        let (store, _tmp) = test_store();
        let name = store.save("README", b"x").unwrap();
        assert!(name.starts_with("README-"));
        assert!(!name.contains('.'));
    }
}
