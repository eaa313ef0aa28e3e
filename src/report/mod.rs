//! Run outputs.
//!
//! * [`json`]: the per-run results file, overwritten every run
//! * [`stats`]: the cumulative statistics table, appended to every run
//! * [`html`]: renders that table
//!
//! Both files are written atomically: a temp file in the target directory,
//! then a rename over the destination.

pub mod html;
pub mod json;
pub mod stats;

use crate::error::ClassifierError;
use std::io::Write;
use std::path::Path;

pub(crate) fn write_atomic(path: &Path, contents: &[u8]) -> Result<(), ClassifierError> {
    let write_failed = |source| ClassifierError::OutputWriteFailed {
        path: path.to_path_buf(),
        source,
    };

    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(parent).map_err(write_failed)?;

    let mut tmp = tempfile::NamedTempFile::new_in(parent).map_err(write_failed)?;
    tmp.write_all(contents).map_err(write_failed)?;
    tmp.flush().map_err(write_failed)?;
    tmp.persist(path).map_err(|e| write_failed(e.error))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn creates_parent_dirs_and_replaces_content() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("nested/out/report.txt");
        write_atomic(&path, b"first").unwrap();
        write_atomic(&path, b"second").unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "second");
        let leftovers = std::fs::read_dir(path.parent().unwrap()).unwrap().count();
        assert_eq!(leftovers, 1);
    }
}
