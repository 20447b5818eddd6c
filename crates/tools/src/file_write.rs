//! Mutating filesystem tools. Only reachable in active mode.

use std::path::Path;

use qogito_core::error::ToolError;
use tracing::debug;

pub async fn create_directory(path: &Path) -> Result<String, ToolError> {
    tokio::fs::create_dir_all(path).await?;
    Ok("Directory created.".into())
}

pub async fn move_file(source: &Path, destination: &Path) -> Result<String, ToolError> {
    tokio::fs::rename(source, destination).await?;
    Ok("Moved.".into())
}

pub async fn delete_file(path: &Path) -> Result<String, ToolError> {
    tokio::fs::remove_file(path).await?;
    Ok("Deleted.".into())
}

pub async fn write_file(path: &Path, content: &str) -> Result<String, ToolError> {
    tokio::fs::write(path, content).await?;
    debug!(path = %path.display(), bytes = content.len(), "File written");
    Ok("File written.".into())
}

/// Replace the single occurrence of `old_str` with `new_str`.
///
/// The file is left untouched unless `old_str` occurs exactly once.
pub async fn str_replace(path: &Path, old_str: &str, new_str: &str) -> Result<String, ToolError> {
    if old_str.is_empty() {
        return Err(ToolError::InvalidArgument("old_str must not be empty".into()));
    }

    let content = tokio::fs::read_to_string(path).await?;
    match content.matches(old_str).count() {
        0 => Err(ToolError::NotFound("old_str not found in file".into())),
        1 => {
            let updated = content.replacen(old_str, new_str, 1);
            tokio::fs::write(path, updated).await?;
            Ok("Edit applied.".into())
        }
        occurrences => Err(ToolError::NotUnique { occurrences }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn replaces_unique_match() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.rs");
        std::fs::write(&path, "fn main() {\n    old();\n}\n").unwrap();

        let out = str_replace(&path, "old()", "new()").await.unwrap();
        assert_eq!(out, "Edit applied.");
        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            "fn main() {\n    new();\n}\n"
        );
    }

    #[tokio::test]
    async fn missing_match_leaves_file_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.txt");
        std::fs::write(&path, "alpha").unwrap();

        let err = str_replace(&path, "beta", "gamma").await.unwrap_err();
        assert_eq!(err.to_string(), "old_str not found in file");
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "alpha");
    }

    #[tokio::test]
    async fn ambiguous_match_leaves_file_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.txt");
        std::fs::write(&path, "x = 1; x = 1;").unwrap();

        let err = str_replace(&path, "x = 1", "x = 2").await.unwrap_err();
        assert_eq!(err, ToolError::NotUnique { occurrences: 2 });
        assert_eq!(err.to_string(), "old_str matches 2 times — it must be unique");
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "x = 1; x = 1;");
    }

    #[tokio::test]
    async fn write_move_delete_cycle() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("a/b");
        assert_eq!(create_directory(&nested).await.unwrap(), "Directory created.");

        let file = nested.join("f.txt");
        assert_eq!(write_file(&file, "hi").await.unwrap(), "File written.");

        let moved = dir.path().join("g.txt");
        assert_eq!(move_file(&file, &moved).await.unwrap(), "Moved.");
        assert!(!file.exists());
        assert_eq!(std::fs::read_to_string(&moved).unwrap(), "hi");

        assert_eq!(delete_file(&moved).await.unwrap(), "Deleted.");
        assert!(!moved.exists());
    }

    #[tokio::test]
    async fn delete_missing_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = delete_file(&dir.path().join("ghost")).await.unwrap_err();
        assert!(matches!(err, ToolError::Io(_)));
    }
}
