//! Input discovery: find the documents in a folder and pre-flight each one.
//!
//! Enumeration is non-recursive and sorted by file name so repeated runs
//! over the same folder process (and report) documents in the same order.
//! Each document is checked for the `%PDF` magic bytes before upload so a
//! misnamed file fails locally instead of costing an API call.

use crate::error::{ClassifierError, DocumentError};
use std::path::{Path, PathBuf};
use tracing::debug;

/// A document found in the input folder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputDocument {
    pub path: PathBuf,
    /// File name without directory, as shown in reports.
    pub filename: String,
}

/// List the files in `folder` whose extension equals `extension`
/// (ASCII case-insensitive), sorted by file name.
pub fn list_documents(folder: &Path, extension: &str) -> Result<Vec<InputDocument>, ClassifierError> {
    if !folder.exists() {
        return Err(ClassifierError::FolderNotFound {
            path: folder.to_path_buf(),
        });
    }
    if !folder.is_dir() {
        return Err(ClassifierError::NotADirectory {
            path: folder.to_path_buf(),
        });
    }

    let read_failed = |source| ClassifierError::FolderReadFailed {
        path: folder.to_path_buf(),
        source,
    };

    let mut documents = Vec::new();
    for entry in std::fs::read_dir(folder).map_err(read_failed)? {
        let path = entry.map_err(read_failed)?.path();
        if !path.is_file() || !has_extension(&path, extension) {
            continue;
        }
        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        documents.push(InputDocument { path, filename });
    }

    documents.sort_by(|a, b| a.filename.cmp(&b.filename));
    debug!(
        "Found {} '.{}' documents in {}",
        documents.len(),
        extension,
        folder.display()
    );
    Ok(documents)
}

fn has_extension(path: &Path, extension: &str) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case(extension))
}

/// Confirm the document is readable and starts with `%PDF`.
pub fn validate_document(path: &Path) -> Result<(), DocumentError> {
    use std::io::Read;

    let mut file = std::fs::File::open(path).map_err(|e| DocumentError::ReadFailed {
        detail: format!("{}: {}", path.display(), e),
    })?;

    let mut magic = Vec::with_capacity(4);
    file.by_ref()
        .take(4)
        .read_to_end(&mut magic)
        .map_err(|e| DocumentError::ReadFailed {
            detail: format!("{}: {}", path.display(), e),
        })?;

    if magic.as_slice() != b"%PDF" {
        return Err(DocumentError::NotAPdf { magic });
    }
    Ok(())
}
