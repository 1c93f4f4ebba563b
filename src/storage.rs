//! File system access for the pipeline, with errors naming the path involved.

use std::path::{Path, PathBuf};

use crate::error::ContextError;

pub fn exists(path: &Path) -> bool {
    path.exists()
}

/// Reads the whole content of a file.
pub fn read_all(path: &Path) -> Result<Vec<u8>, ContextError> {
    if !path.exists() {
        return Err(ContextError::with_context(format!(
            "Input file not found: {}",
            path.display()
        )));
    }

    std::fs::read(path).map_err(|error| {
        ContextError::with_error(format!("Failed to read the file {}", path.display()), &error)
    })
}

/// Writes the bytes to a file, replacing it if it already exists.
pub fn write_all(path: &Path, bytes: &[u8]) -> Result<(), ContextError> {
    std::fs::write(path, bytes).map_err(|error| {
        ContextError::with_error(format!("Failed to write the file {}", path.display()), &error)
    })
}

/// Lists the regular files of a directory whose names end with the given suffix, compared
/// without regard to ASCII case. The paths are sorted by file name.
pub fn list_files(directory: &Path, suffix: &str) -> Result<Vec<PathBuf>, ContextError> {
    let entries = std::fs::read_dir(directory).map_err(|error| {
        ContextError::with_error(
            format!("Failed to list the directory {}", directory.display()),
            &error,
        )
    })?;

    let suffix = suffix.to_ascii_lowercase();
    let mut files = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|error| {
            ContextError::with_error(
                format!("Failed to list the directory {}", directory.display()),
                &error,
            )
        })?;
        let path = entry.path();
        let matches_suffix = path
            .file_name()
            .and_then(|file_name| file_name.to_str())
            .is_some_and(|file_name| file_name.to_ascii_lowercase().ends_with(&suffix));
        if matches_suffix && path.is_file() {
            files.push(path);
        }
    }
    files.sort_by(|first, second| first.file_name().cmp(&second.file_name()));

    Ok(files)
}

/// Creates a directory together with its missing parents.
pub fn ensure_directory(path: &Path) -> Result<(), ContextError> {
    std::fs::create_dir_all(path).map_err(|error| {
        ContextError::with_error(
            format!("Failed to create the directory {}", path.display()),
            &error,
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pdf_files_are_listed_sorted_and_case_insensitively() {
        let directory = tempfile::tempdir().unwrap();
        for file_name in ["b.pdf", "A.PDF", "notes.txt", "c.Pdf"] {
            write_all(&directory.path().join(file_name), b"%PDF").unwrap();
        }
        std::fs::create_dir(directory.path().join("nested.pdf")).unwrap();

        let file_names: Vec<String> = list_files(directory.path(), ".pdf")
            .unwrap()
            .iter()
            .map(|path| path.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(file_names, vec!["A.PDF", "b.pdf", "c.Pdf"]);
    }

    #[test]
    fn missing_files_are_reported_with_their_path() {
        let directory = tempfile::tempdir().unwrap();
        let path = directory.path().join("missing.pdf");

        assert!(!exists(&path));
        let error = read_all(&path).unwrap_err();
        assert!(error.to_string().contains("missing.pdf"));
    }

    #[test]
    fn directories_are_created_with_their_parents() {
        let directory = tempfile::tempdir().unwrap();
        let nested = directory.path().join("out").join("filled");

        ensure_directory(&nested).unwrap();
        ensure_directory(&nested).unwrap();
        write_all(&nested.join("form.pdf"), b"%PDF").unwrap();
        assert_eq!(read_all(&nested.join("form.pdf")).unwrap(), b"%PDF");
    }
}
