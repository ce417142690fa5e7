//! Local filesystem backend.

use std::fs;
use std::io::Write as _;
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;

use crate::backends::{ListIter, ListOptions, LocalPath, StorageBackend};
use crate::error::IoError;

/// Backend for plain filesystem paths, registered under the empty (default)
/// prefix. Writes are atomic: data lands in a sibling temporary file that is
/// renamed over the destination, so readers never observe a half-written
/// file.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalBackend;

impl StorageBackend for LocalBackend {
    fn name(&self) -> &'static str {
        "local"
    }

    fn allow_symlink(&self) -> bool {
        true
    }

    fn get(&self, path: &str) -> Result<Vec<u8>, IoError> {
        fs::read(path).map_err(|e| IoError::io("read", path, e))
    }

    fn get_text(&self, path: &str) -> Result<String, IoError> {
        fs::read_to_string(path).map_err(|e| IoError::io("read", path, e))
    }

    fn put(&self, data: &[u8], path: &str) -> Result<(), IoError> {
        let target = Path::new(path);
        let parent = match target.parent() {
            Some(p) if !p.as_os_str().is_empty() => {
                fs::create_dir_all(p).map_err(|e| IoError::io("create directories", path, e))?;
                p
            }
            _ => Path::new("."),
        };
        let mut file = NamedTempFile::new_in(parent)
            .map_err(|e| IoError::io("create temp file", path, e))?;
        file.write_all(data)
            .map_err(|e| IoError::io("write", path, e))?;
        file.flush().map_err(|e| IoError::io("flush", path, e))?;
        file.persist(target)
            .map_err(|e| IoError::io("rename into place", path, e.error))?;
        Ok(())
    }

    fn exists(&self, path: &str) -> Result<bool, IoError> {
        Ok(Path::new(path).exists())
    }

    fn remove(&self, path: &str) -> Result<(), IoError> {
        let target = Path::new(path);
        if target.is_dir() {
            return Err(IoError::NotAFile {
                path: path.to_owned(),
            });
        }
        fs::remove_file(target).map_err(|e| IoError::io("remove", path, e))
    }

    fn list_dir_or_file(&self, path: &str, options: &ListOptions) -> Result<ListIter, IoError> {
        options.validate()?;
        let root = PathBuf::from(path);
        // Open the root eagerly so a missing directory fails on the call,
        // then stream entries on demand.
        let first = fs::read_dir(&root).map_err(|e| IoError::io("list", &root, e))?;
        Ok(ListIter::new(Walker {
            root,
            options: options.clone(),
            current: Some(first),
            pending: Vec::new(),
        }))
    }

    fn get_local_path(&self, path: &str) -> Result<LocalPath, IoError> {
        let target = Path::new(path);
        if !target.is_file() {
            return Err(IoError::NotFound {
                path: path.to_owned(),
            });
        }
        Ok(LocalPath::Borrowed(target.to_path_buf()))
    }

    fn put_local_path(&self, local_path: &Path, path: &str) -> Result<(), IoError> {
        let data = fs::read(local_path).map_err(|e| IoError::io("read", local_path, e))?;
        self.put(&data, path)
    }
}

/// Lazy directory walker reporting paths relative to `root` with `/`
/// separators regardless of platform. Subdirectories discovered during a
/// recursive walk are opened only once the iterator reaches them.
struct Walker {
    root: PathBuf,
    options: ListOptions,
    current: Option<fs::ReadDir>,
    pending: Vec<PathBuf>,
}

impl Iterator for Walker {
    type Item = Result<String, IoError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let Some(reader) = self.current.as_mut() else {
                let dir = self.pending.pop()?;
                match fs::read_dir(&dir) {
                    Ok(reader) => self.current = Some(reader),
                    Err(e) => return Some(Err(IoError::io("list", &dir, e))),
                }
                continue;
            };
            let Some(entry) = reader.next() else {
                self.current = None;
                continue;
            };
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => return Some(Err(IoError::io("list", &self.root, e))),
            };
            let entry_path = entry.path();
            let file_type = match entry.file_type() {
                Ok(t) => t,
                Err(e) => return Some(Err(IoError::io("stat", &entry_path, e))),
            };
            let relative = relative_name(&self.root, &entry_path);
            if file_type.is_dir() {
                if self.options.recursive {
                    self.pending.push(entry_path);
                }
                if self.options.list_dir() {
                    return Some(Ok(relative));
                }
            } else if self.options.wants_file(&relative) {
                return Some(Ok(relative));
            }
        }
    }
}

fn relative_name(root: &Path, path: &Path) -> String {
    let relative = path.strip_prefix(root).unwrap_or(path);
    let mut name = String::new();
    for component in relative.components() {
        if !name.is_empty() {
            name.push('/');
        }
        name.push_str(&component.as_os_str().to_string_lossy());
    }
    name
}

#[cfg(test)]
mod tests {
    use super::*;

    fn touch(path: &Path) {
        fs::write(path, b"x").unwrap();
    }

    fn sorted(iter: ListIter) -> Vec<String> {
        let mut v: Vec<String> = iter.map(|e| e.unwrap()).collect();
        v.sort();
        v
    }

    #[test]
    fn put_creates_missing_parents() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a/b/c.bin");
        let path = path.to_str().unwrap();
        LocalBackend.put(b"payload", path).unwrap();
        assert_eq!(LocalBackend.get(path).unwrap(), b"payload");
    }

    #[test]
    fn put_replaces_existing_content() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("f.txt");
        let path = path.to_str().unwrap();
        LocalBackend.put_text("old", path).unwrap();
        LocalBackend.put_text("new", path).unwrap();
        assert_eq!(LocalBackend.get_text(path).unwrap(), "new");
    }

    #[test]
    fn missing_file_maps_to_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.json");
        let err = LocalBackend.get(path.to_str().unwrap()).unwrap_err();
        assert!(matches!(err, IoError::NotFound { .. }));
    }

    #[test]
    fn remove_refuses_directories() {
        let dir = tempfile::tempdir().unwrap();
        let err = LocalBackend.remove(dir.path().to_str().unwrap()).unwrap_err();
        assert!(matches!(err, IoError::NotAFile { .. }));
    }

    #[test]
    fn listing_shallow_and_recursive() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("sub")).unwrap();
        touch(&dir.path().join("top.json"));
        touch(&dir.path().join("sub/inner.json"));

        let root = dir.path().to_str().unwrap();
        let shallow = sorted(
            LocalBackend
                .list_dir_or_file(root, &ListOptions::default())
                .unwrap(),
        );
        assert_eq!(shallow, vec!["sub", "top.json"]);

        let deep = sorted(
            LocalBackend
                .list_dir_or_file(
                    root,
                    &ListOptions {
                        recursive: true,
                        ..ListOptions::default()
                    },
                )
                .unwrap(),
        );
        assert_eq!(deep, vec!["sub", "sub/inner.json", "top.json"]);
    }

    #[test]
    fn listing_missing_directory_fails_on_the_call() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("absent");
        let err = LocalBackend
            .list_dir_or_file(missing.to_str().unwrap(), &ListOptions::default())
            .unwrap_err();
        assert!(matches!(err, IoError::NotFound { .. }));
    }

    #[test]
    fn recursive_walk_opens_subdirectories_lazily() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("sub")).unwrap();
        let iter = LocalBackend
            .list_dir_or_file(
                dir.path().to_str().unwrap(),
                &ListOptions {
                    recursive: true,
                    ..ListOptions::default()
                },
            )
            .unwrap();
        // The subdirectory is opened only when iteration reaches it, so a
        // file created after the listing call is still observed.
        touch(&dir.path().join("sub/late.txt"));
        let mut seen: Vec<String> = iter.map(|e| e.unwrap()).collect();
        seen.sort();
        assert_eq!(seen, vec!["sub", "sub/late.txt"]);
    }

    #[test]
    fn suffix_filter_only_yields_matching_files() {
        let dir = tempfile::tempdir().unwrap();
        touch(&dir.path().join("a.json"));
        touch(&dir.path().join("b.yaml"));
        fs::create_dir(dir.path().join("sub")).unwrap();
        touch(&dir.path().join("sub/c.json"));

        let listed = sorted(
            LocalBackend
                .list_dir_or_file(
                    dir.path().to_str().unwrap(),
                    &ListOptions {
                        recursive: true,
                        skip_dirs: true,
                        suffix: Some(".json".into()),
                        ..ListOptions::default()
                    },
                )
                .unwrap(),
        );
        assert_eq!(listed, vec!["a.json", "sub/c.json"]);
    }

    #[test]
    fn local_path_is_borrowed_and_survives_drop() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("keep.txt");
        touch(&path);
        let path_str = path.to_str().unwrap();
        {
            let local = LocalBackend.get_local_path(path_str).unwrap();
            assert_eq!(local.as_path(), path.as_path());
        }
        assert!(path.exists());
    }
}
