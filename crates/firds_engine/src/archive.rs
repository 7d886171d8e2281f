use std::io::{Cursor, Read};

use thiserror::Error;

/// The first member of the downloaded archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveEntry {
    pub name: String,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("archive contains no entries")]
    Empty,
    #[error("failed to read archive: {0}")]
    Zip(#[from] zip::result::ZipError),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Open `bytes` as a ZIP archive and read its first entry in full.
///
/// The entry is selected by index, never by name or extension: the feed
/// publishes single-file archives whose member name varies per
/// publication.
pub fn unpack_first_entry(bytes: &[u8]) -> Result<ArchiveEntry, ArchiveError> {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes))?;
    if archive.len() == 0 {
        return Err(ArchiveError::Empty);
    }
    let mut entry = archive.by_index(0)?;
    let name = entry.name().to_string();
    let mut content = Vec::with_capacity(entry.size() as usize);
    entry.read_to_end(&mut content)?;
    Ok(ArchiveEntry {
        name,
        bytes: content,
    })
}
