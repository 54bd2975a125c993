use std::io::{Read, Write};
use std::path::Path;

fn parent_dir(path: &Path) -> &Path {
    path.parent()
        .filter(|parent| !parent.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."))
}

/// Write `bytes` to a sibling temporary file and rename it over `path`.
///
/// A reader of `path` sees either the previous contents or the complete new
/// contents, never a partial write.
pub(crate) fn write_atomic(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let mut temp = tempfile::Builder::new()
        .prefix(".hatch-")
        .suffix(".tmp")
        .tempfile_in(parent_dir(path))?;
    temp.write_all(bytes)?;
    temp.as_file().sync_all()?;
    temp.persist(path).map_err(|error| error.error)?;
    Ok(())
}

/// Same as [`write_atomic`] but streams from a reader.
pub(crate) fn copy_atomic(reader: &mut dyn Read, path: &Path) -> std::io::Result<u64> {
    let mut temp = tempfile::Builder::new()
        .prefix(".hatch-")
        .suffix(".tmp")
        .tempfile_in(parent_dir(path))?;
    let copied = std::io::copy(reader, &mut temp)?;
    temp.as_file().sync_all()?;
    temp.persist(path).map_err(|error| error.error)?;
    Ok(copied)
}

/// Give the owner execute permission.
#[cfg(unix)]
pub(crate) fn mark_executable(path: &Path) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;

    let mut permissions = std::fs::metadata(path)?.permissions();
    permissions.set_mode(permissions.mode() | 0o700);
    std::fs::set_permissions(path, permissions)
}

#[cfg(not(unix))]
pub(crate) fn mark_executable(_path: &Path) -> std::io::Result<()> {
    Ok(())
}
