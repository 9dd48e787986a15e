//! Sandboxed file built-in tools.
//!
//! `write_file`, `append_file`, `read_file` and `delete_file` share one
//! [`FileIoTool`], which holds the sandbox root. Every operation resolves its
//! path through [`SandboxRoot::resolve`] before touching the disk, so a
//! rejected path never causes a mutation.

use crate::config::AppendPolicy;
use crate::tools::definition::{ToolDefinition, ToolDescriptor, ToolHandler};
use crate::tools::error::ToolError;
use crate::tools::schema::{ParamType, ParameterSchema, ParameterSpec};
use crate::tools::security::{ResolvedPath, SandboxRoot};
use serde::{Deserialize, Serialize};
use std::io;
use std::sync::Arc;
use tokio::io::AsyncWriteExt;

/// Largest content accepted by write and append, in characters.
pub const MAX_CONTENT_LENGTH: usize = 1_048_576;

/// The four file operations, named as they are registered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileOperation {
    Write,
    Append,
    Read,
    Delete,
}

impl FileOperation {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Write => "write_file",
            Self::Append => "append_file",
            Self::Read => "read_file",
            Self::Delete => "delete_file",
        }
    }
}

/// Arguments for `write_file` and `append_file`.
#[derive(Debug, Deserialize)]
pub struct WriteArgs {
    /// Path relative to the base directory
    pub path: String,
    pub content: String,
}

/// Arguments for `read_file` and `delete_file`.
#[derive(Debug, Deserialize)]
pub struct PathArgs {
    /// Path relative to the base directory
    pub path: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileWriteOutput {
    pub path: String,
    pub bytes_written: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileReadOutput {
    pub path: String,
    pub content: String,
    pub bytes: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileDeleteOutput {
    pub path: String,
    pub deleted: bool,
}

/// File tools confined to one base directory.
#[derive(Debug, Clone)]
pub struct FileIoTool {
    sandbox: Arc<SandboxRoot>,
    append_policy: AppendPolicy,
}

impl FileIoTool {
    /// Creates the file tools over an opened sandbox.
    #[must_use]
    pub fn new(sandbox: SandboxRoot, append_policy: AppendPolicy) -> Self {
        Self {
            sandbox: Arc::new(sandbox),
            append_policy,
        }
    }

    /// The sandbox root all paths resolve against.
    #[must_use]
    pub fn sandbox(&self) -> &SandboxRoot {
        &self.sandbox
    }

    #[must_use]
    pub fn append_policy(&self) -> AppendPolicy {
        self.append_policy
    }

    /// Descriptors for all four file tools.
    #[must_use]
    pub fn descriptors(&self) -> Vec<ToolDescriptor> {
        let path = || {
            ParameterSpec::required(
                "path",
                ParamType::String,
                "File path relative to the base directory, e.g. 'notes/todo.txt'",
            )
        };
        let content = |description: &str| {
            ParameterSpec::required("content", ParamType::String, description)
                .with_max_length(MAX_CONTENT_LENGTH)
        };

        let append_description = match self.append_policy {
            AppendPolicy::CreateMissing => {
                "Append text to the end of a file in the base directory. Creates the file if it does not exist."
            }
            AppendPolicy::RequireExisting => {
                "Append text to the end of an existing file in the base directory."
            }
        };

        let build = |name: &str, description: &str, schema: ParameterSchema, handler| {
            ToolDescriptor::new(
                ToolDefinition::new(name, description, schema.to_json_schema()),
                schema,
                handler,
            )
        };

        vec![
            build(
                FileOperation::Write.as_str(),
                "Write text to a file in the base directory, creating parent directories as needed. Overwrites existing content.",
                ParameterSchema::new()
                    .with(path())
                    .with(content("Text to write")),
                ToolHandler::WriteFile(self.clone()),
            ),
            build(
                FileOperation::Append.as_str(),
                append_description,
                ParameterSchema::new()
                    .with(path())
                    .with(content("Text to append")),
                ToolHandler::AppendFile(self.clone()),
            ),
            build(
                FileOperation::Read.as_str(),
                "Read the full text content of a file in the base directory.",
                ParameterSchema::new().with(path()),
                ToolHandler::ReadFile(self.clone()),
            ),
            build(
                FileOperation::Delete.as_str(),
                "Delete a file in the base directory.",
                ParameterSchema::new().with(path()),
                ToolHandler::DeleteFile(self.clone()),
            ),
        ]
    }

    /// Writes `content` to `path`, replacing any existing content.
    ///
    /// # Errors
    ///
    /// `PathEscape`/`InvalidRequest` from resolution, `InvalidRequest` if the
    /// target is a directory, `Execution` on I/O failure.
    pub async fn write(&self, path: &str, content: &str) -> Result<FileWriteOutput, ToolError> {
        let op = FileOperation::Write;
        let target = self.resolve_file(op, path).await?;
        create_parents(op, &target).await?;

        tokio::fs::write(target.absolute(), content)
            .await
            .map_err(|e| io_error(op, &target, e))?;

        tracing::info!(tool = op.as_str(), path = %target.relative(), bytes = content.len(), "file written");
        Ok(FileWriteOutput {
            path: target.relative().to_string(),
            bytes_written: content.len(),
        })
    }

    /// Appends `content` to `path`.
    ///
    /// Under [`AppendPolicy::CreateMissing`] a missing file (and its parent
    /// directories) is created; under [`AppendPolicy::RequireExisting`] it is
    /// `NotFound`.
    ///
    /// # Errors
    ///
    /// As [`FileIoTool::write`], plus `NotFound` per the append policy.
    pub async fn append(&self, path: &str, content: &str) -> Result<FileWriteOutput, ToolError> {
        let op = FileOperation::Append;
        let target = self.resolve_file(op, path).await?;

        let mut options = tokio::fs::OpenOptions::new();
        options.append(true);
        match self.append_policy {
            AppendPolicy::CreateMissing => {
                create_parents(op, &target).await?;
                options.create(true);
            }
            AppendPolicy::RequireExisting => {}
        }

        let mut file = options
            .open(target.absolute())
            .await
            .map_err(|e| io_error(op, &target, e))?;
        file.write_all(content.as_bytes())
            .await
            .map_err(|e| io_error(op, &target, e))?;
        file.flush().await.map_err(|e| io_error(op, &target, e))?;

        tracing::info!(tool = op.as_str(), path = %target.relative(), bytes = content.len(), "file appended");
        Ok(FileWriteOutput {
            path: target.relative().to_string(),
            bytes_written: content.len(),
        })
    }

    /// Reads the full content of `path` as UTF-8 text.
    ///
    /// # Errors
    ///
    /// `NotFound` if the file does not exist, `InvalidRequest` if it is a
    /// directory or not valid UTF-8.
    pub async fn read(&self, path: &str) -> Result<FileReadOutput, ToolError> {
        let op = FileOperation::Read;
        let target = self.resolve_file(op, path).await?;

        let content = tokio::fs::read_to_string(target.absolute())
            .await
            .map_err(|e| io_error(op, &target, e))?;

        tracing::debug!(tool = op.as_str(), path = %target.relative(), bytes = content.len(), "file read");
        Ok(FileReadOutput {
            path: target.relative().to_string(),
            bytes: content.len(),
            content,
        })
    }

    /// Deletes `path`.
    ///
    /// # Errors
    ///
    /// `NotFound` if the file does not exist, `InvalidRequest` if it is a
    /// directory.
    pub async fn delete(&self, path: &str) -> Result<FileDeleteOutput, ToolError> {
        let op = FileOperation::Delete;
        let target = self.resolve_file(op, path).await?;

        tokio::fs::remove_file(target.absolute())
            .await
            .map_err(|e| io_error(op, &target, e))?;

        tracing::info!(tool = op.as_str(), path = %target.relative(), "file deleted");
        Ok(FileDeleteOutput {
            path: target.relative().to_string(),
            deleted: true,
        })
    }

    /// Resolves `path` and refuses directories.
    async fn resolve_file(&self, op: FileOperation, path: &str) -> Result<ResolvedPath, ToolError> {
        let target = self.sandbox.resolve(path).map_err(|e| {
            tracing::warn!(tool = op.as_str(), path, error = %e, "path rejected");
            e
        })?;

        if let Ok(metadata) = tokio::fs::metadata(target.absolute()).await {
            if metadata.is_dir() {
                return Err(ToolError::invalid_request(format!(
                    "'{}' is a directory; {} works on files only",
                    target.relative(),
                    op.as_str()
                )));
            }
        }
        Ok(target)
    }
}

async fn create_parents(op: FileOperation, target: &ResolvedPath) -> Result<(), ToolError> {
    if let Some(parent) = target.absolute().parent() {
        tokio::fs::create_dir_all(parent).await.map_err(|e| {
            ToolError::execution(
                op.as_str(),
                format!("failed to create parent directories for '{}': {e}", target.relative()),
            )
        })?;
    }
    Ok(())
}

fn io_error(op: FileOperation, target: &ResolvedPath, error: io::Error) -> ToolError {
    match error.kind() {
        io::ErrorKind::NotFound => ToolError::not_found(target.relative()),
        io::ErrorKind::InvalidData => ToolError::invalid_request(format!(
            "'{}' is not valid UTF-8 text",
            target.relative()
        )),
        _ => ToolError::execution(
            op.as_str(),
            format!("'{}': {}", target.relative(), error),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::error::ToolErrorKind;
    use tempfile::TempDir;

    fn tool_with(policy: AppendPolicy) -> (TempDir, FileIoTool) {
        let dir = TempDir::new().unwrap();
        let sandbox = SandboxRoot::open(dir.path(), false).unwrap();
        (dir, FileIoTool::new(sandbox, policy))
    }

    fn tool() -> (TempDir, FileIoTool) {
        tool_with(AppendPolicy::CreateMissing)
    }

    #[tokio::test]
    async fn write_then_read_round_trips() {
        let (_dir, tool) = tool();
        let written = tool.write("notes/a.txt", "hi").await.unwrap();
        assert_eq!(written.path, "notes/a.txt");
        assert_eq!(written.bytes_written, 2);

        let read = tool.read("notes/a.txt").await.unwrap();
        assert_eq!(read.content, "hi");
        assert_eq!(read.bytes, 2);
    }

    #[tokio::test]
    async fn write_preserves_content_exactly() {
        let (_dir, tool) = tool();
        let content = "line one\r\n\ttabbed\n\nunicode: héllo ✓\n";
        tool.write("exact.txt", content).await.unwrap();
        assert_eq!(tool.read("exact.txt").await.unwrap().content, content);
    }

    #[tokio::test]
    async fn write_overwrites() {
        let (_dir, tool) = tool();
        tool.write("a.txt", "first").await.unwrap();
        tool.write("a.txt", "second").await.unwrap();
        assert_eq!(tool.read("a.txt").await.unwrap().content, "second");
    }

    #[tokio::test]
    async fn append_creates_missing_file_by_default() {
        let (_dir, tool) = tool();
        tool.append("log/out.txt", "one\n").await.unwrap();
        tool.append("log/out.txt", "two\n").await.unwrap();
        assert_eq!(tool.read("log/out.txt").await.unwrap().content, "one\ntwo\n");
    }

    #[tokio::test]
    async fn append_require_existing_reports_not_found() {
        let (dir, tool) = tool_with(AppendPolicy::RequireExisting);
        let err = tool.append("missing.txt", "x").await.unwrap_err();
        assert!(err.is_not_found());
        assert!(!dir.path().join("missing.txt").exists());

        tool.write("present.txt", "a").await.unwrap();
        tool.append("present.txt", "b").await.unwrap();
        assert_eq!(tool.read("present.txt").await.unwrap().content, "ab");
    }

    #[tokio::test]
    async fn read_missing_is_not_found() {
        let (_dir, tool) = tool();
        let err = tool.read("nope.txt").await.unwrap_err();
        assert_eq!(
            err.kind(),
            &ToolErrorKind::NotFound {
                path: "nope.txt".to_string()
            }
        );
    }

    #[tokio::test]
    async fn delete_removes_file_then_reports_not_found() {
        let (dir, tool) = tool();
        tool.write("gone.txt", "bye").await.unwrap();

        let deleted = tool.delete("gone.txt").await.unwrap();
        assert!(deleted.deleted);
        assert!(!dir.path().join("gone.txt").exists());

        assert!(tool.delete("gone.txt").await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn escaping_paths_mutate_nothing() {
        let outer = TempDir::new().unwrap();
        let base = outer.path().join("sandbox");
        let sandbox = SandboxRoot::open(&base, true).unwrap();
        let tool = FileIoTool::new(sandbox, AppendPolicy::CreateMissing);
        std::fs::write(outer.path().join("victim.txt"), "keep").unwrap();

        let path = "../victim.txt";
        for err in [
            tool.write(path, "x").await.unwrap_err(),
            tool.append(path, "x").await.unwrap_err(),
            tool.read(path).await.unwrap_err(),
            tool.delete(path).await.unwrap_err(),
        ] {
            assert!(matches!(err.kind(), ToolErrorKind::PathEscape { .. }), "{err}");
        }

        assert_eq!(
            std::fs::read_to_string(outer.path().join("victim.txt")).unwrap(),
            "keep"
        );
        assert!(tool.write("../new/escape.txt", "x").await.is_err());
        assert!(!outer.path().join("new").exists());
    }

    #[tokio::test]
    async fn directories_are_rejected() {
        let (dir, tool) = tool();
        std::fs::create_dir(dir.path().join("folder")).unwrap();

        for err in [
            tool.write("folder", "x").await.unwrap_err(),
            tool.read("folder").await.unwrap_err(),
            tool.delete("folder").await.unwrap_err(),
        ] {
            assert!(matches!(err.kind(), ToolErrorKind::InvalidRequest { .. }), "{err}");
        }
        assert!(dir.path().join("folder").is_dir());
    }

    #[tokio::test]
    async fn read_non_utf8_is_invalid_request() {
        let (dir, tool) = tool();
        std::fs::write(dir.path().join("blob.bin"), [0xff, 0xfe, 0x00]).unwrap();
        let err = tool.read("blob.bin").await.unwrap_err();
        assert!(matches!(err.kind(), ToolErrorKind::InvalidRequest { .. }));
    }

    #[test]
    fn descriptors_cover_all_operations() {
        let (_dir, tool) = tool();
        let names: Vec<String> = tool
            .descriptors()
            .iter()
            .map(|d| d.name().to_string())
            .collect();
        assert_eq!(names, vec!["write_file", "append_file", "read_file", "delete_file"]);
    }
}
