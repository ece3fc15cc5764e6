// ABOUTME: Packs a source directory into a tar build context.
// ABOUTME: Walks the tree with relative paths, skipping VCS metadata.

use std::io;
use std::path::Path;

const SKIPPED_DIRS: &[&str] = &[".git"];

/// Tar every regular file under `dir`, with paths relative to `dir`.
pub fn pack_directory(dir: &Path) -> io::Result<Vec<u8>> {
    let mut ar = tar::Builder::new(Vec::new());
    append_dir(&mut ar, dir, Path::new(""))?;
    ar.into_inner()
}

fn append_dir(ar: &mut tar::Builder<Vec<u8>>, root: &Path, relative: &Path) -> io::Result<()> {
    let mut entries = std::fs::read_dir(root.join(relative))?.collect::<io::Result<Vec<_>>>()?;
    entries.sort_by_key(|e| e.file_name());

    for entry in entries {
        let name = entry.file_name();
        let path = relative.join(&name);
        let file_type = entry.file_type()?;

        if file_type.is_dir() {
            if SKIPPED_DIRS.iter().any(|skip| name == *skip) {
                continue;
            }
            append_dir(ar, root, &path)?;
        } else if file_type.is_file() {
            let content = std::fs::read(entry.path())?;
            let mode = file_mode(&entry.metadata()?);
            let mut header = tar::Header::new_gnu();
            header.set_path(&path)?;
            header.set_size(content.len() as u64);
            header.set_mode(mode);
            header.set_cksum();
            ar.append(&header, content.as_slice())?;
        }
    }
    Ok(())
}

#[cfg(unix)]
fn file_mode(metadata: &std::fs::Metadata) -> u32 {
    use std::os::unix::fs::PermissionsExt;
    metadata.permissions().mode() & 0o777
}

#[cfg(not(unix))]
fn file_mode(_metadata: &std::fs::Metadata) -> u32 {
    0o644
}
