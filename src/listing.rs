use std::fs;
use std::io;
use std::path::Path;
use std::time::SystemTime;

/// One row of a directory snapshot. Rows are produced fresh on every
/// snapshot and never mutated in place.
#[derive(Debug, Clone, PartialEq)]
pub struct DirEntryRow {
    /// File name, with a trailing `/` appended iff the entry is a directory.
    pub name: String,
    pub mode: u32,
    pub size_bytes: u64,
    pub modified: SystemTime,
    pub is_dir: bool,
}

impl DirEntryRow {
    /// Name without the directory marker.
    pub fn bare_name(&self) -> &str {
        self.name.strip_suffix('/').unwrap_or(&self.name)
    }
}

/// Read `path` into an immutable listing.
///
/// `.` and `..` are always excluded; other dot-prefixed names are excluded
/// unless `show_hidden`. Entries that fail to stat are skipped: enumerating
/// and statting are separate syscalls and the file can vanish in between.
pub fn snapshot(path: &Path, show_hidden: bool) -> io::Result<Vec<DirEntryRow>> {
    let mut rows = Vec::new();

    for entry in fs::read_dir(path)? {
        let Ok(entry) = entry else { continue };
        let name = entry.file_name().to_string_lossy().into_owned();
        if !included(&name, show_hidden) {
            continue;
        }
        let Ok(metadata) = fs::metadata(entry.path()) else {
            continue;
        };
        let Ok(modified) = metadata.modified() else {
            continue;
        };

        let is_dir = metadata.is_dir();
        rows.push(DirEntryRow {
            name: if is_dir { format!("{name}/") } else { name },
            mode: mode_bits(&metadata),
            size_bytes: metadata.len(),
            modified,
            is_dir,
        });
    }

    Ok(rows)
}

pub fn dir_mtime(path: &Path) -> io::Result<SystemTime> {
    fs::metadata(path)?.modified()
}

fn included(name: &str, show_hidden: bool) -> bool {
    if name == "." || name == ".." {
        return false;
    }
    show_hidden || !name.starts_with('.')
}

#[cfg(unix)]
fn mode_bits(metadata: &fs::Metadata) -> u32 {
    use std::os::unix::fs::MetadataExt;
    metadata.mode()
}

#[cfg(not(unix))]
fn mode_bits(_metadata: &fs::Metadata) -> u32 {
    0
}
