use std::path::{Path, PathBuf};

use ignore::WalkBuilder;
use slipway_models::SlipwayError;
use tempfile::TempDir;
use tracing::debug;

/// A materialized build context: the application tree copied into a scratch
/// directory with the rendered Dockerfile at its root. Dropped with the
/// directory.
pub struct BuildContext {
    dir: TempDir,
}

impl BuildContext {
    /// Copy `source_root` into a fresh temp directory and place `dockerfile`
    /// at its root. `.dockerignore` entries and `.git` are excluded from the
    /// copy. The dependency manifest must end up at the context root;
    /// a missing manifest fails here, before Docker is ever invoked.
    pub fn assemble(
        source_root: &Path,
        manifest: &str,
        dockerfile: &str,
    ) -> Result<Self, SlipwayError> {
        if !source_root.is_dir() {
            return Err(SlipwayError::SourceCopy {
                path: source_root.display().to_string(),
                detail: "not a directory".to_string(),
            });
        }

        let dir = TempDir::new()?;

        let walker = WalkBuilder::new(source_root)
            .standard_filters(false)
            .add_custom_ignore_filename(".dockerignore")
            .filter_entry(|entry| entry.file_name() != std::ffi::OsStr::new(".git"))
            .build();

        for entry in walker {
            let entry = entry.map_err(|e| SlipwayError::SourceCopy {
                path: source_root.display().to_string(),
                detail: e.to_string(),
            })?;
            let rel = match entry.path().strip_prefix(source_root) {
                Ok(rel) if !rel.as_os_str().is_empty() => rel,
                _ => continue,
            };
            let dest = dir.path().join(rel);
            let copy_err = |e: std::io::Error| SlipwayError::SourceCopy {
                path: entry.path().display().to_string(),
                detail: e.to_string(),
            };
            if entry.file_type().is_some_and(|t| t.is_dir()) {
                std::fs::create_dir_all(&dest).map_err(copy_err)?;
            } else {
                if let Some(parent) = dest.parent() {
                    std::fs::create_dir_all(parent).map_err(copy_err)?;
                }
                std::fs::copy(entry.path(), &dest).map_err(copy_err)?;
            }
        }

        let manifest_path = dir.path().join(manifest);
        if !manifest_path.is_file() {
            return Err(SlipwayError::DependencyResolution {
                detail: format!("manifest {} not found in source tree", manifest),
            });
        }

        std::fs::write(dir.path().join("Dockerfile"), dockerfile)?;
        debug!("Assembled build context at {:?}", dir.path());

        Ok(Self { dir })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn dockerfile_path(&self) -> PathBuf {
        self.dir.path().join("Dockerfile")
    }

    /// Raw manifest bytes, as copied into the context.
    pub fn manifest_bytes(&self, manifest: &str) -> Result<Vec<u8>, SlipwayError> {
        Ok(std::fs::read(self.dir.path().join(manifest))?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn scratch_tree() -> TempDir {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("main.py"), "app = object()\n").unwrap();
        fs::write(dir.path().join("requirements.txt"), "fastapi\n").unwrap();
        fs::create_dir(dir.path().join("routers")).unwrap();
        fs::write(dir.path().join("routers").join("items.py"), "\n").unwrap();
        dir
    }

    #[test]
    fn copies_tree_and_writes_dockerfile() {
        let src = scratch_tree();
        let ctx = BuildContext::assemble(src.path(), "requirements.txt", "FROM scratch\n").unwrap();
        assert!(ctx.path().join("main.py").is_file());
        assert!(ctx.path().join("routers/items.py").is_file());
        assert_eq!(
            fs::read_to_string(ctx.dockerfile_path()).unwrap(),
            "FROM scratch\n"
        );
        assert_eq!(ctx.manifest_bytes("requirements.txt").unwrap(), b"fastapi\n");
    }

    #[test]
    fn missing_manifest_is_a_dependency_error() {
        let src = TempDir::new().unwrap();
        fs::write(src.path().join("main.py"), "\n").unwrap();
        let err = BuildContext::assemble(src.path(), "requirements.txt", "FROM scratch\n")
            .err()
            .unwrap();
        assert_eq!(err.error_type(), "DependencyResolutionError");
    }

    #[test]
    fn missing_source_root_is_a_source_copy_error() {
        let gone = Path::new("/definitely/not/here");
        let err = BuildContext::assemble(gone, "requirements.txt", "FROM scratch\n")
            .err()
            .unwrap();
        assert_eq!(err.error_type(), "SourceCopyError");
    }

    #[test]
    fn dockerignore_entries_are_excluded() {
        let src = scratch_tree();
        fs::write(src.path().join(".dockerignore"), "*.log\n").unwrap();
        fs::write(src.path().join("debug.log"), "noise\n").unwrap();
        let ctx = BuildContext::assemble(src.path(), "requirements.txt", "FROM scratch\n").unwrap();
        assert!(!ctx.path().join("debug.log").exists());
        assert!(ctx.path().join("main.py").is_file());
    }

    #[test]
    fn git_dir_is_never_copied() {
        let src = scratch_tree();
        fs::create_dir(src.path().join(".git")).unwrap();
        fs::write(src.path().join(".git").join("HEAD"), "ref\n").unwrap();
        let ctx = BuildContext::assemble(src.path(), "requirements.txt", "FROM scratch\n").unwrap();
        assert!(!ctx.path().join(".git").exists());
    }
}
