use std::io::{Cursor, Write};

use tracing::debug;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::error::AssetError;

/// One named file destined for the archive
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveEntry {
    pub name: String,
    pub bytes: Vec<u8>,
}

/// Packs named files into a single downloadable blob
pub trait ArchivePackager: Send + Sync {
    fn package(&self, entries: &[ArchiveEntry]) -> Result<Vec<u8>, AssetError>;
}

/// Deflate-compressed zip archives
#[derive(Debug, Clone, Copy, Default)]
pub struct ZipPackager;

impl ArchivePackager for ZipPackager {
    fn package(&self, entries: &[ArchiveEntry]) -> Result<Vec<u8>, AssetError> {
        let archive_failed = |reason: String| AssetError::ArchiveFailed { reason };
        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        for entry in entries {
            writer
                .start_file(entry.name.as_str(), options)
                .map_err(|e| archive_failed(format!("{}: {}", entry.name, e)))?;
            writer
                .write_all(&entry.bytes)
                .map_err(|e| archive_failed(format!("{}: {}", entry.name, e)))?;
        }

        let bytes = writer
            .finish()
            .map_err(|e| archive_failed(e.to_string()))?
            .into_inner();
        debug!("Packaged {} entries into {} bytes", entries.len(), bytes.len());
        Ok(bytes)
    }
}
