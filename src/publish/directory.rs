use std::io::ErrorKind;
use std::path::PathBuf;

use anyhow::{Context, Result};
use async_trait::async_trait;
use tracing::debug;

use super::CalendarWriter;
use crate::config::TransportMode;

/// Writes calendars to `<root>/<mode>/<file>`, overwriting earlier runs.
pub struct DirectoryWriter {
    root: PathBuf,
}

impl DirectoryWriter {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

#[async_trait]
impl CalendarWriter for DirectoryWriter {
    async fn write(&self, mode: TransportMode, file_name: &str, body: &[u8]) -> Result<()> {
        let dir = self.root.join(mode.as_str());
        tokio::fs::create_dir_all(&dir)
            .await
            .with_context(|| format!("failed to create {}", dir.display()))?;

        let path = dir.join(file_name);
        tokio::fs::write(&path, body)
            .await
            .with_context(|| format!("failed to write {}", path.display()))?;
        debug!(path = %path.display(), bytes = body.len(), "Wrote calendar file");
        Ok(())
    }

    async fn existing(&self, mode: TransportMode, extension: &str) -> Result<Vec<String>> {
        let dir = self.root.join(mode.as_str());
        let mut entries = match tokio::fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(e).with_context(|| format!("failed to list {}", dir.display()));
            }
        };

        let mut names = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if !entry.file_type().await?.is_file()
                || path.extension().and_then(|e| e.to_str()) != Some(extension)
            {
                continue;
            }
            if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
                names.push(name.to_string());
            }
        }
        names.sort();
        Ok(names)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::fs;

    fn temp_root(name: &str) -> PathBuf {
        env::temp_dir().join(name)
    }

    #[tokio::test]
    async fn test_writes_under_mode_directory() {
        let root = temp_root("disruption_calendar_test_dir_writer");
        let _ = fs::remove_dir_all(&root);

        let writer = DirectoryWriter::new(&root);
        writer
            .write(TransportMode::Lightrail, "L1.ics", b"BEGIN:VCALENDAR")
            .await
            .unwrap();

        let content = fs::read_to_string(root.join("lightrail").join("L1.ics")).unwrap();
        assert_eq!(content, "BEGIN:VCALENDAR");

        fs::remove_dir_all(&root).unwrap();
    }

    #[tokio::test]
    async fn test_existing_lists_only_calendar_files() {
        let root = temp_root("disruption_calendar_test_dir_existing");
        let _ = fs::remove_dir_all(&root);
        let writer = DirectoryWriter::new(&root);

        assert!(writer.existing(TransportMode::Ferries, "ics").await.unwrap().is_empty());

        for name in ["F2.ics", "F1.ics", "notes.txt"] {
            writer.write(TransportMode::Ferries, name, b"x").await.unwrap();
        }
        fs::create_dir_all(root.join("ferries").join("archive.ics")).unwrap();

        let names = writer.existing(TransportMode::Ferries, "ics").await.unwrap();
        assert_eq!(names, vec!["F1.ics", "F2.ics"]);

        fs::remove_dir_all(&root).unwrap();
    }

    #[tokio::test]
    async fn test_rewrite_replaces_previous_file() {
        let root = temp_root("disruption_calendar_test_dir_rewrite");
        let _ = fs::remove_dir_all(&root);

        let writer = DirectoryWriter::new(&root);
        writer
            .write(TransportMode::Metro, "M1.ics", b"first run, longer body")
            .await
            .unwrap();
        writer
            .write(TransportMode::Metro, "M1.ics", b"second")
            .await
            .unwrap();

        let content = fs::read_to_string(root.join("metro").join("M1.ics")).unwrap();
        assert_eq!(content, "second");

        fs::remove_dir_all(&root).unwrap();
    }
}
