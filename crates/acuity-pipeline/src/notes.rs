//! Note-file loading.

use std::path::{Path, PathBuf};

use tracing::warn;

use crate::error::PipelineError;

/// All files directly inside `notes_dir`, sorted by file name.
pub fn iter_note_files(notes_dir: &Path) -> Result<Vec<PathBuf>, PipelineError> {
    if !notes_dir.is_dir() {
        return Err(PipelineError::NotesDirNotFound(notes_dir.to_path_buf()));
    }

    let mut files = Vec::new();
    for entry in std::fs::read_dir(notes_dir)? {
        let path = entry?.path();
        if path.is_file() {
            files.push(path);
        }
    }
    files.sort_by_key(|path| path.file_name().map(|name| name.to_os_string()));
    Ok(files)
}

/// Read a note as UTF-8, falling back to Latin-1 when the bytes don't
/// decode. Decoding never fails.
pub fn load_note_text(note_path: &Path) -> Result<String, PipelineError> {
    let bytes = std::fs::read(note_path)?;
    match String::from_utf8(bytes) {
        Ok(text) => Ok(text),
        Err(err) => {
            warn!(path = %note_path.display(), "falling back to Latin-1");
            let text = err
                .into_bytes()
                .into_iter()
                .map(|byte| byte as char)
                .collect();
            Ok(text)
        }
    }
}
