use crate::error::{ProcessingError, Result};
use std::fs::File;
use std::io::Read;
use std::path::Path;
use zip::ZipArchive;

/// Read access to the per-state `{state}Data.zip` holding the yearly crop
/// point CSVs.
pub struct ArchiveExtractor;

impl ArchiveExtractor {
    /// Read one member fully into memory without touching disk
    pub fn read_member(zip_path: &Path, member: &str) -> Result<Vec<u8>> {
        let file = File::open(zip_path)?;
        let mut archive = ZipArchive::new(file)?;
        let name = find_member(&mut archive, member).ok_or_else(|| {
            ProcessingError::MissingData(format!(
                "File '{}' not found in archive '{}'",
                member,
                zip_path.display()
            ))
        })?;

        let mut zip_file = archive.by_name(&name)?;
        let mut bytes = Vec::with_capacity(zip_file.size() as usize);
        zip_file.read_to_end(&mut bytes)?;
        Ok(bytes)
    }

    pub fn list_members(zip_path: &Path) -> Result<Vec<String>> {
        let file = File::open(zip_path)?;
        let archive = ZipArchive::new(file)?;
        Ok(archive.file_names().map(|n| n.to_string()).collect())
    }
}

fn find_member<R: Read + std::io::Seek>(archive: &mut ZipArchive<R>, member: &str) -> Option<String> {
    let suffix = format!("/{}", member);
    archive
        .file_names()
        .find(|name| *name == member || name.ends_with(&suffix))
        .map(|name| name.to_string())
}
