use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use photo_lab_application::{ApplicationError, StorageFile};

/// A file on the local filesystem.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FsStorageFile {
    path: PathBuf,
}

impl FsStorageFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl StorageFile for FsStorageFile {
    fn path(&self) -> &Path {
        &self.path
    }

    fn open_readable(&self) -> Result<Box<dyn Read>, ApplicationError> {
        let file = File::open(&self.path).map_err(|error| {
            ApplicationError::SourceUnavailable(format!("{}: {error}", self.path.display()))
        })?;
        Ok(Box::new(BufReader::new(file)))
    }

    fn open_writable(&self) -> Result<Box<dyn Write>, ApplicationError> {
        if let Some(parent) = self.path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|error| {
                ApplicationError::Write(format!("{}: {error}", parent.display()))
            })?;
        }
        let file = File::create(&self.path).map_err(|error| {
            ApplicationError::Write(format!("{}: {error}", self.path.display()))
        })?;
        Ok(Box::new(BufWriter::new(file)))
    }

    /// Resolves symlinks and `.`/`..` segments. Falls back to the path as
    /// given when the file does not exist yet.
    fn canonical_path(&self) -> PathBuf {
        fs::canonicalize(&self.path).unwrap_or_else(|_| self.path.clone())
    }
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    #[test]
    fn written_bytes_can_be_read_back() {
        let dir = TempDir::new().expect("tempdir");
        let file = FsStorageFile::new(dir.path().join("nested").join("out.bin"));

        let mut writer = file.open_writable().expect("writable");
        writer.write_all(b"photo").expect("write");
        writer.flush().expect("flush");
        drop(writer);

        let mut contents = String::new();
        file.open_readable()
            .expect("readable")
            .read_to_string(&mut contents)
            .expect("read");
        assert_eq!(contents, "photo");
    }

    #[test]
    fn differently_spelled_paths_to_one_file_share_a_canonical_path() {
        let dir = TempDir::new().expect("tempdir");
        fs::create_dir(dir.path().join("sub")).expect("subdir");
        fs::write(dir.path().join("a.png"), b"photo").expect("write");
        let direct = FsStorageFile::new(dir.path().join("a.png"));
        let roundabout = FsStorageFile::new(dir.path().join("sub").join("..").join("a.png"));

        assert_ne!(direct.path(), roundabout.path());
        assert_eq!(direct.canonical_path(), roundabout.canonical_path());
    }

    #[test]
    fn missing_files_are_unavailable_sources() {
        let dir = TempDir::new().expect("tempdir");
        let file = FsStorageFile::new(dir.path().join("missing.jpg"));

        let result = file.open_readable();

        assert!(matches!(result, Err(ApplicationError::SourceUnavailable(_))));
    }
}
