//! Concat-demuxer manifest files.

use std::path::{Path, PathBuf};

use recap_models::ManifestEntry;
use tokio::fs;
use tracing::warn;

use crate::error::MediaResult;

/// Render the UTF-8 body of a concat manifest.
///
/// One entry per clip:
/// ```text
/// file '<absolute-path-to-clip-media>'
/// duration <integer-seconds>
/// ```
pub fn manifest_body(entries: &[ManifestEntry]) -> String {
    let mut body = String::new();
    for entry in entries {
        let path = absolute(&entry.media_path);
        body.push_str(&format!(
            "file '{}'\nduration {}\n",
            path.display(),
            entry.duration_seconds
        ));
    }
    body
}

/// Write a concat manifest to `path`, creating parent directories.
pub async fn write_manifest(path: &Path, entries: &[ManifestEntry]) -> MediaResult<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).await?;
    }
    fs::write(path, manifest_body(entries)).await?;
    Ok(())
}

/// Remove a transient manifest. Best-effort: failure is logged, never
/// surfaced to the caller.
pub async fn remove_manifest(path: &Path) {
    if let Err(e) = fs::remove_file(path).await {
        if e.kind() != std::io::ErrorKind::NotFound {
            warn!(path = %path.display(), error = %e, "Failed to remove temp manifest");
        }
    }
}

/// Absolutize a media path so the concat demuxer resolves it regardless
/// of ffmpeg's working directory.
fn absolute(path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .map(|cwd| cwd.join(path))
            .unwrap_or_else(|_| path.to_path_buf())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manifest_body_format() {
        let entries = vec![
            ManifestEntry {
                media_path: PathBuf::from("/clips/a.mp4"),
                duration_seconds: 20,
            },
            ManifestEntry {
                media_path: PathBuf::from("/clips/b.mp4"),
                duration_seconds: 20,
            },
        ];

        let body = manifest_body(&entries);
        assert_eq!(
            body,
            "file '/clips/a.mp4'\nduration 20\nfile '/clips/b.mp4'\nduration 20\n"
        );
    }

    #[test]
    fn test_manifest_body_absolutizes_relative_paths() {
        let entries = vec![ManifestEntry {
            media_path: PathBuf::from("clips/a.mp4"),
            duration_seconds: 12,
        }];

        let body = manifest_body(&entries);
        let first_path = body
            .lines()
            .next()
            .unwrap()
            .trim_start_matches("file '")
            .trim_end_matches('\'');
        assert!(Path::new(first_path).is_absolute());
    }

    #[tokio::test]
    async fn test_write_and_remove_manifest() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("temp").join("concat_c1_0min_1.txt");

        let entries = vec![ManifestEntry {
            media_path: PathBuf::from("/clips/a.mp4"),
            duration_seconds: 60,
        }];

        write_manifest(&path, &entries).await.unwrap();
        let written = fs::read_to_string(&path).await.unwrap();
        assert!(written.contains("duration 60"));

        remove_manifest(&path).await;
        assert!(!path.exists());

        // Removing twice must stay silent
        remove_manifest(&path).await;
    }
}
