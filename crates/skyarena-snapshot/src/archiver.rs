//! The archiving seam: how a world directory becomes one file and back.
//!
//! [`SnapshotService`](crate::SnapshotService) never touches archive formats
//! itself. It hands paths to an [`Archiver`] on a blocking worker thread.
//! [`ZipArchiver`] is the default; tests substitute their own.

use std::fs::{self, File};
use std::io;
use std::path::Path;

use zip::write::FileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use crate::SnapshotError;

/// Packs a directory tree into an archive file and unpacks it again.
///
/// Both methods are synchronous and may take seconds on a large world;
/// they are only ever called from a blocking worker thread.
pub trait Archiver: Send + Sync + 'static {
    /// Write the contents of `source_dir` into a new archive at `archive`.
    fn pack(&self, source_dir: &Path, archive: &Path) -> Result<(), SnapshotError>;

    /// Extract `archive` into `dest_dir`, which exists and is empty.
    fn unpack(&self, archive: &Path, dest_dir: &Path) -> Result<(), SnapshotError>;
}

/// Zip-backed [`Archiver`].
///
/// Writes to `<archive>.part` and renames on success, so a crash mid-pack
/// never leaves a truncated archive that would later be taken for a valid
/// snapshot.
#[derive(Debug, Clone, Copy)]
pub struct ZipArchiver {
    method: CompressionMethod,
}

impl Default for ZipArchiver {
    fn default() -> Self {
        Self {
            method: CompressionMethod::Deflated,
        }
    }
}

impl ZipArchiver {
    /// Archiver that stores entries uncompressed. Faster, larger files.
    pub fn stored() -> Self {
        Self {
            method: CompressionMethod::Stored,
        }
    }
}

impl Archiver for ZipArchiver {
    fn pack(&self, source_dir: &Path, archive: &Path) -> Result<(), SnapshotError> {
        let part = archive.with_extension("zip.part");
        let file = File::create(&part).map_err(SnapshotError::io(&part))?;
        let mut writer = ZipWriter::new(file);
        let options = FileOptions::default().compression_method(self.method);

        let written = append_dir(&mut writer, source_dir, source_dir, options)
            .and_then(|()| writer.finish().map(drop).map_err(SnapshotError::from));
        if let Err(e) = written {
            let _ = fs::remove_file(&part);
            return Err(e);
        }

        fs::rename(&part, archive).map_err(SnapshotError::io(archive))
    }

    fn unpack(&self, archive: &Path, dest_dir: &Path) -> Result<(), SnapshotError> {
        let file = File::open(archive).map_err(SnapshotError::io(archive))?;
        let mut zip = ZipArchive::new(file)?;
        zip.extract(dest_dir)?;
        Ok(())
    }
}

fn append_dir(
    writer: &mut ZipWriter<File>,
    root: &Path,
    dir: &Path,
    options: FileOptions,
) -> Result<(), SnapshotError> {
    let mut entries = fs::read_dir(dir)
        .and_then(|rd| rd.collect::<io::Result<Vec<_>>>())
        .map_err(SnapshotError::io(dir))?;
    // Stable entry order keeps archives reproducible.
    entries.sort_by_key(|e| e.file_name());

    for entry in entries {
        let path = entry.path();
        let name = entry_name(root, &path);
        let file_type = entry.file_type().map_err(SnapshotError::io(&path))?;

        if file_type.is_dir() {
            writer.add_directory(name, options)?;
            append_dir(writer, root, &path, options)?;
        } else if file_type.is_file() {
            writer.start_file(name, options)?;
            let mut source = File::open(&path).map_err(SnapshotError::io(&path))?;
            io::copy(&mut source, writer).map_err(SnapshotError::io(&path))?;
        }
        // Symlinks and special files are not part of a world.
    }
    Ok(())
}

/// Archive entry name: path relative to `root`, `/`-separated.
fn entry_name(root: &Path, path: &Path) -> String {
    path.strip_prefix(root)
        .unwrap_or(path)
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}
