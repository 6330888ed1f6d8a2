//! File-based data source.
//!
//! Polls a JSON file holding one payload.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use tracing::debug;

use super::{DataSource, Feed};

/// A data source that reads payloads from a JSON file.
///
/// The source tracks the file's modification time and only returns new
/// data when the file has been updated. Parsing is left to the ingestor,
/// so a file holding invalid JSON is still delivered (and rejected there).
#[derive(Debug)]
pub struct FileSource {
    path: PathBuf,
    description: String,
    last_error: Option<String>,
    last_modified: Option<SystemTime>,
}

impl FileSource {
    /// Create a new file source for the given path.
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref().to_path_buf();
        let description = format!("file: {}", path.display());
        Self {
            path,
            description,
            last_error: None,
            last_modified: None,
        }
    }

    /// Returns the path being monitored.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Get the file's modification time.
    fn get_modified_time(&self) -> Option<SystemTime> {
        fs::metadata(&self.path).ok()?.modified().ok()
    }
}

impl DataSource for FileSource {
    fn poll(&mut self) -> Option<Feed> {
        let current_modified = self.get_modified_time();

        // Check if file has been modified since last read
        let file_changed = match (&self.last_modified, &current_modified) {
            (None, _) => true,        // First poll, or every poll until a read succeeds
            (Some(_), None) => false, // File disappeared, keep showing what we have
            (Some(last), Some(current)) => current > last,
        };

        if !file_changed {
            return None;
        }

        match fs::read(&self.path) {
            Ok(content) => {
                self.last_error = None;
                self.last_modified = current_modified;
                debug!(path = %self.path.display(), bytes = content.len(), "read status file");
                Some(Feed::Payload(content))
            }
            Err(e) => {
                self.last_error = Some(format!("Read error: {}", e));
                None
            }
        }
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn error(&self) -> Option<String> {
        self.last_error.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Seek, Write};
    use tempfile::NamedTempFile;

    fn sample_json() -> &'static str {
        r#"{"applications":{"shop":{"services":{"web":{"instances":{"a":{"up":true}}}}}}}"#
    }

    #[test]
    fn test_file_source_new() {
        let source = FileSource::new("/tmp/status.json");
        assert_eq!(source.path(), Path::new("/tmp/status.json"));
        assert_eq!(source.description(), "file: /tmp/status.json");
        assert!(source.error().is_none());
    }

    #[test]
    fn test_file_source_poll_reads_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "{}", sample_json()).unwrap();

        let mut source = FileSource::new(file.path());

        // First poll should return data
        match source.poll() {
            Some(Feed::Payload(bytes)) => {
                assert!(String::from_utf8(bytes).unwrap().contains("shop"));
            }
            other => panic!("expected payload, got {:?}", other),
        }

        // Second poll without file change should return None
        assert!(source.poll().is_none());
    }

    #[test]
    fn test_file_source_detects_changes() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "{}", sample_json()).unwrap();

        let mut source = FileSource::new(file.path());
        let _ = source.poll();

        // Modify the file (need to wait a bit for mtime to change)
        std::thread::sleep(std::time::Duration::from_millis(10));
        file.rewind().unwrap();
        writeln!(file, r#"{{"applications":{{"blog":{{}}}}}}"#).unwrap();
        file.flush().unwrap();

        // Note: This test may be lenient on filesystems with low mtime resolution
        if let Some(Feed::Payload(bytes)) = source.poll() {
            assert!(String::from_utf8(bytes).unwrap().contains("blog"));
        }
    }

    #[test]
    fn test_file_source_missing_file() {
        let mut source = FileSource::new("/nonexistent/path/status.json");

        assert!(source.poll().is_none());
        let err = source.error().unwrap();
        assert!(err.contains("Read error"));
    }

    #[test]
    fn test_file_source_delivers_invalid_json_for_ingestor() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "not valid json").unwrap();

        let mut source = FileSource::new(file.path());

        assert!(matches!(source.poll(), Some(Feed::Payload(_))));
        assert!(source.error().is_none());
    }
}
