//! Sandbox root for the file tools.
//!
//! Every path a caller supplies is resolved against one canonical base
//! directory. Resolution is purely a check: nothing is created or touched
//! until it has succeeded.

use crate::error::GatewayError;
use crate::tools::error::ToolError;
use std::io;
use std::path::{Component, Path, PathBuf};

/// A path that passed sandbox resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPath {
    absolute: PathBuf,
    relative: String,
}

impl ResolvedPath {
    /// The absolute location on disk.
    #[must_use]
    pub fn absolute(&self) -> &Path {
        &self.absolute
    }

    /// The normalized path relative to the sandbox root, `/`-separated.
    #[must_use]
    pub fn relative(&self) -> &str {
        &self.relative
    }
}

/// The canonical base directory all file operations are confined to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SandboxRoot {
    root: PathBuf,
}

impl SandboxRoot {
    /// Opens a sandbox rooted at `base`, creating the directory first if
    /// `create` is set.
    ///
    /// # Errors
    ///
    /// Returns a configuration error naming `files.base_dir` if the directory
    /// cannot be created, does not exist, or is not a directory.
    pub fn open(base: impl AsRef<Path>, create: bool) -> Result<Self, GatewayError> {
        let base = base.as_ref();
        if base.as_os_str().is_empty() {
            return Err(GatewayError::configuration(
                "files.base_dir",
                "base directory must not be empty",
            ));
        }

        if create {
            std::fs::create_dir_all(base).map_err(|e| {
                GatewayError::configuration(
                    "files.base_dir",
                    format!("cannot create '{}': {}", base.display(), e),
                )
            })?;
        }

        let root = base.canonicalize().map_err(|e| {
            GatewayError::configuration(
                "files.base_dir",
                format!("cannot resolve '{}': {}", base.display(), e),
            )
        })?;

        if !root.is_dir() {
            return Err(GatewayError::configuration(
                "files.base_dir",
                format!("'{}' is not a directory", root.display()),
            ));
        }

        Ok(Self { root })
    }

    /// The canonical root directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolves a caller-supplied relative path inside the sandbox.
    ///
    /// The path is normalized lexically first, so `a/../b.txt` is fine and
    /// `../b.txt` is not. Existing components are then canonicalized to catch
    /// symlinks that point outside the root.
    ///
    /// # Errors
    ///
    /// - `InvalidRequest` for an empty path or one naming the root itself
    /// - `PathEscape` for absolute paths, traversal above the root, or
    ///   symlinks leading out of it
    pub fn resolve(&self, path: &str) -> Result<ResolvedPath, ToolError> {
        if path.trim().is_empty() {
            return Err(ToolError::invalid_request("path must not be empty"));
        }
        if path.contains('\0') {
            return Err(ToolError::invalid_request("path must not contain NUL bytes"));
        }

        let mut parts: Vec<&std::ffi::OsStr> = Vec::new();
        for component in Path::new(path).components() {
            match component {
                Component::Normal(name) => parts.push(name),
                Component::CurDir => {}
                Component::ParentDir => {
                    if parts.pop().is_none() {
                        return Err(ToolError::path_escape(path));
                    }
                }
                Component::RootDir | Component::Prefix(_) => {
                    return Err(ToolError::path_escape(path));
                }
            }
        }

        if parts.is_empty() {
            return Err(ToolError::invalid_request(format!(
                "path '{path}' refers to the base directory itself; name a file inside it"
            )));
        }

        let absolute: PathBuf = parts.iter().fold(self.root.clone(), |acc, p| acc.join(p));
        self.check_existing_ancestor(path, &absolute)?;

        let relative = parts
            .iter()
            .map(|p| p.to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");

        Ok(ResolvedPath { absolute, relative })
    }

    /// Canonicalizes the deepest part of `absolute` that exists and makes sure
    /// it is still under the root.
    fn check_existing_ancestor(&self, original: &str, absolute: &Path) -> Result<(), ToolError> {
        for ancestor in absolute.ancestors() {
            if ancestor == self.root {
                return Ok(());
            }
            match std::fs::symlink_metadata(ancestor) {
                Ok(_) => {
                    // A dangling link fails to canonicalize and is treated as escaping
                    let canonical = ancestor
                        .canonicalize()
                        .map_err(|_| ToolError::path_escape(original))?;
                    return if canonical.starts_with(&self.root) {
                        Ok(())
                    } else {
                        Err(ToolError::path_escape(original))
                    };
                }
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => {
                    return Err(ToolError::execution(
                        "file_io",
                        format!("cannot inspect '{original}': {e}"),
                    ));
                }
            }
        }
        // Every ancestor chain ends at the root, which always exists
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::error::ToolErrorKind;
    use tempfile::TempDir;

    fn sandbox() -> (TempDir, SandboxRoot) {
        let dir = TempDir::new().unwrap();
        let root = SandboxRoot::open(dir.path(), false).unwrap();
        (dir, root)
    }

    fn is_escape(err: &ToolError) -> bool {
        matches!(err.kind(), ToolErrorKind::PathEscape { .. })
    }

    #[test]
    fn open_creates_missing_base() {
        let dir = TempDir::new().unwrap();
        let base = dir.path().join("nested/base");
        let root = SandboxRoot::open(&base, true).unwrap();
        assert!(base.is_dir());
        assert_eq!(root.root(), base.canonicalize().unwrap());
    }

    #[test]
    fn open_without_create_requires_existing_dir() {
        let dir = TempDir::new().unwrap();
        let err = SandboxRoot::open(dir.path().join("missing"), false).unwrap_err();
        assert!(err.is_configuration());
        assert_eq!(err.field(), Some("files.base_dir"));
    }

    #[test]
    fn open_rejects_file_as_base() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("plain.txt");
        std::fs::write(&file, "x").unwrap();
        assert!(SandboxRoot::open(&file, false).is_err());
    }

    #[test]
    fn resolves_nested_relative_paths() {
        let (_dir, root) = sandbox();
        let resolved = root.resolve("notes/a.txt").unwrap();
        assert_eq!(resolved.relative(), "notes/a.txt");
        assert_eq!(resolved.absolute(), root.root().join("notes").join("a.txt"));
    }

    #[test]
    fn normalizes_inner_traversal() {
        let (_dir, root) = sandbox();
        let resolved = root.resolve("./notes/../b.txt").unwrap();
        assert_eq!(resolved.relative(), "b.txt");
    }

    #[test]
    fn rejects_traversal_outside_root() {
        let (_dir, root) = sandbox();
        for path in ["../x.txt", "a/../../x.txt", "../../etc/passwd", "a/b/../../../c"] {
            let err = root.resolve(path).unwrap_err();
            assert!(is_escape(&err), "{path} gave {err}");
        }
    }

    #[test]
    fn rejects_absolute_paths() {
        let (_dir, root) = sandbox();
        assert!(is_escape(&root.resolve("/etc/passwd").unwrap_err()));
    }

    #[test]
    fn rejects_empty_and_root_paths() {
        let (_dir, root) = sandbox();
        for path in ["", "   ", ".", "a/..", "./"] {
            let err = root.resolve(path).unwrap_err();
            assert!(
                matches!(err.kind(), ToolErrorKind::InvalidRequest { .. }),
                "{path:?} gave {err}"
            );
        }
    }

    #[test]
    fn resolution_does_not_touch_filesystem() {
        let (_dir, root) = sandbox();
        root.resolve("deep/tree/file.txt").unwrap();
        assert!(!root.root().join("deep").exists());
    }

    #[cfg(unix)]
    #[test]
    fn rejects_symlink_pointing_outside() {
        let (_dir, root) = sandbox();
        let outside = TempDir::new().unwrap();
        std::os::unix::fs::symlink(outside.path(), root.root().join("link")).unwrap();

        assert!(is_escape(&root.resolve("link/secret.txt").unwrap_err()));
        assert!(is_escape(&root.resolve("link").unwrap_err()));
    }

    #[cfg(unix)]
    #[test]
    fn allows_symlink_within_root() {
        let (_dir, root) = sandbox();
        std::fs::create_dir(root.root().join("real")).unwrap();
        std::os::unix::fs::symlink(root.root().join("real"), root.root().join("alias")).unwrap();

        assert!(root.resolve("alias/file.txt").is_ok());
    }

    #[cfg(unix)]
    #[test]
    fn rejects_dangling_symlink() {
        let (_dir, root) = sandbox();
        std::os::unix::fs::symlink("/nonexistent/target", root.root().join("dangling")).unwrap();
        assert!(is_escape(&root.resolve("dangling").unwrap_err()));
    }
}
