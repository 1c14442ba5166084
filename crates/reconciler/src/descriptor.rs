//! Stream file loading.
//!
//! A stream file is `<id>.stream`; each non-blank line is one source address.
//! The directory is read fresh on every call so removed files drop out of the
//! desired state on the next cycle.

use std::path::{Path, PathBuf};

use streamsync_core::{Error, Result, ResultExt, StreamId};
use tracing::debug;

/// File extension marking a stream descriptor.
pub const STREAM_EXTENSION: &str = "stream";

/// One source address read from a stream file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Descriptor {
    /// Identity taken from the filename.
    pub id: StreamId,
    /// Source address, trimmed.
    pub source: String,
    /// File the entry was read from.
    pub path: PathBuf,
}

/// Read every stream file in `dir`, in filename order.
///
/// Files named without an extension, or with a stem that is not a valid
/// stream id, are skipped with a warning. Dotfiles, other extensions and
/// sub-directories (including links to directories) are ignored.
///
/// # Errors
///
/// Returns `Error::DirectoryReadFailed` when the directory cannot be listed
/// and `Error::FileReadFailed` when a stream file cannot be read. Either way
/// the caller should abandon the cycle rather than treat streams as removed.
pub async fn load_descriptors(dir: &Path) -> Result<Vec<Descriptor>> {
    let mut entries = tokio::fs::read_dir(dir)
        .await
        .map_err(|e| Error::directory_read_failed(dir, e.to_string()))?;

    let mut files = Vec::new();
    while let Some(entry) = entries
        .next_entry()
        .await
        .map_err(|e| Error::directory_read_failed(dir, e.to_string()))?
    {
        let path = entry.path();
        let metadata = tokio::fs::metadata(&path)
            .await
            .map_err(|e| Error::file_read_failed(&path, e.to_string()))?;
        if !metadata.is_dir() {
            files.push(path);
        }
    }
    files.sort();

    let mut descriptors = Vec::new();
    for path in files {
        let Some(id) = stream_id_for(&path).into_option_logged().flatten() else {
            continue;
        };

        let content = tokio::fs::read_to_string(&path)
            .await
            .map_err(|e| Error::file_read_failed(&path, e.to_string()))?;

        let before = descriptors.len();
        descriptors.extend(parse_sources(&content).map(|source| Descriptor {
            id: id.clone(),
            source: source.to_string(),
            path: path.clone(),
        }));
        if descriptors.len() == before {
            debug!(path = %path.display(), "Stream file has no source address");
        }
    }

    debug!(dir = %dir.display(), count = descriptors.len(), "Loaded stream files");
    Ok(descriptors)
}

/// Derive the stream id from a path.
///
/// `Ok(None)` means the file is not a stream descriptor at all.
///
/// # Errors
///
/// Returns `Error::InvalidStreamId` for a name without an extension or with
/// an unusable stem.
pub fn stream_id_for(path: &Path) -> Result<Option<StreamId>> {
    let Some(name) = path.file_name().map(|n| n.to_string_lossy()) else {
        return Ok(None);
    };
    if name.strip_prefix('.') == Some(STREAM_EXTENSION) {
        return Err(Error::invalid_stream_id(name, "stream file name has an empty stem"));
    }
    if name.starts_with('.') {
        return Ok(None);
    }

    match path.extension().and_then(|e| e.to_str()) {
        None => Err(Error::invalid_stream_id(
            name,
            "stream file name has no extension",
        )),
        Some(ext) if ext != STREAM_EXTENSION => Ok(None),
        Some(_) => {
            let stem = path
                .file_stem()
                .and_then(|s| s.to_str())
                .ok_or_else(|| Error::invalid_stream_id(name.as_ref(), "name is not valid UTF-8"))?;
            StreamId::new(stem).map(Some)
        }
    }
}

/// Non-blank, trimmed lines of a stream file.
pub fn parse_sources(content: &str) -> impl Iterator<Item = &str> {
    content.lines().map(str::trim).filter(|line| !line.is_empty())
}
