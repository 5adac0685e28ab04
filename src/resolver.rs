//! Video id to source asset resolution.

use std::path::{Path, PathBuf};

use crate::configuration::PipelineConfig;

/// Locates the source file of a video id inside the source directory.
///
/// Candidates are `{source_dir}/{video_id}.{ext}` for every configured
/// extension, tried in order. Nothing is cached, so the answer always
/// reflects the current state of the filesystem.
///
/// # Example
///
/// ```no_run
/// use clipsampler::{AssetResolver, PipelineConfig};
///
/// let config = PipelineConfig::new().with_source_dir("videos/trainval");
/// let resolver = AssetResolver::new(&config);
/// match resolver.resolve("-5KQ66BBWC4") {
///     Some(path) => println!("found {}", path.display()),
///     None => println!("not downloaded"),
/// }
/// ```
#[derive(Debug, Clone)]
pub struct AssetResolver {
    source_dir: PathBuf,
    extensions: Vec<String>,
}

impl AssetResolver {
    pub fn new(config: &PipelineConfig) -> Self {
        Self {
            source_dir: config.source_dir().to_path_buf(),
            extensions: config.source_extensions().to_vec(),
        }
    }

    /// First existing regular file for `video_id`, or `None`.
    pub fn resolve(&self, video_id: &str) -> Option<PathBuf> {
        self.extensions
            .iter()
            .map(|extension| self.source_dir.join(format!("{video_id}.{extension}")))
            .find(|candidate| candidate.is_file())
    }

    pub fn source_dir(&self) -> &Path {
        &self.source_dir
    }

    /// Whether `path` carries one of the configured source extensions.
    ///
    /// Matching is exact, like [`resolve`](Self::resolve), so every file
    /// accepted here can be resolved back from its stem.
    pub fn is_source_file(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|extension| extension.to_str())
            .is_some_and(|extension| self.extensions.iter().any(|known| known == extension))
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;

    fn resolver_for(dir: &Path) -> AssetResolver {
        AssetResolver::new(&PipelineConfig::new().with_source_dir(dir))
    }

    #[test]
    fn extension_order_decides_between_candidates() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("v1.mkv"), b"mkv").unwrap();
        fs::write(dir.path().join("v1.webm"), b"webm").unwrap();

        let resolved = resolver_for(dir.path()).resolve("v1").unwrap();
        assert_eq!(resolved, dir.path().join("v1.mkv"));

        fs::write(dir.path().join("v1.mp4"), b"mp4").unwrap();
        let resolved = resolver_for(dir.path()).resolve("v1").unwrap();
        assert_eq!(resolved, dir.path().join("v1.mp4"));
    }

    #[test]
    fn directories_are_not_assets() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("v2.mp4")).unwrap();
        assert_eq!(resolver_for(dir.path()).resolve("v2"), None);
    }

    #[test]
    fn every_source_file_resolves_from_its_stem() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("upper.MP4"), b"mp4").unwrap();
        fs::write(dir.path().join("lower.webm"), b"webm").unwrap();
        let resolver = resolver_for(dir.path());

        assert!(!resolver.is_source_file(&dir.path().join("upper.MP4")));
        for entry in fs::read_dir(dir.path()).unwrap() {
            let path = entry.unwrap().path();
            if resolver.is_source_file(&path) {
                let stem = path.file_stem().unwrap().to_str().unwrap();
                assert_eq!(resolver.resolve(stem), Some(path.clone()));
            }
        }
    }

    #[test]
    fn unknown_id_resolves_to_none() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(resolver_for(dir.path()).resolve("nonexistent"), None);
    }

    #[test]
    fn source_file_check_matches_configured_extensions() {
        let resolver = resolver_for(Path::new("videos"));
        assert!(resolver.is_source_file(Path::new("a/B.mkv")));
        assert!(!resolver.is_source_file(Path::new("a/B.MKV")));
        assert!(!resolver.is_source_file(Path::new("a/notes.txt")));
        assert!(!resolver.is_source_file(Path::new("a/noext")));
    }
}
