//! Filesystem infrastructure: implements the `HostFs` port on the local disk.

use std::path::Path;

use anyhow::{Context, Result};

use crate::application::ports::HostFs;

/// Production filesystem implementation of `HostFs`.
#[derive(Debug, Default, Clone, Copy)]
pub struct LocalFs;

impl HostFs for LocalFs {
    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn create_dir_all(&self, path: &Path) -> Result<()> {
        std::fs::create_dir_all(path)
            .with_context(|| format!("creating directory {}", path.display()))
    }

    fn write_file(&self, path: &Path, content: &str, mode: u32) -> Result<()> {
        std::fs::write(path, content).with_context(|| format!("writing file {}", path.display()))?;
        set_permissions(path, mode)
    }

    fn read_to_string(&self, path: &Path) -> Result<String> {
        std::fs::read_to_string(path).with_context(|| format!("reading file {}", path.display()))
    }

    fn symlink(&self, target: &Path, link: &Path) -> Result<()> {
        if link.symlink_metadata().is_ok() {
            std::fs::remove_file(link)
                .with_context(|| format!("removing {}", link.display()))?;
        }
        create_symlink(target, link)
            .with_context(|| format!("linking {} to {}", link.display(), target.display()))
    }
}

#[cfg(unix)]
fn create_symlink(target: &Path, link: &Path) -> std::io::Result<()> {
    std::os::unix::fs::symlink(target, link)
}

#[cfg(not(unix))]
fn create_symlink(_target: &Path, _link: &Path) -> std::io::Result<()> {
    Err(std::io::Error::new(
        std::io::ErrorKind::Unsupported,
        "symlinks are only supported on unix",
    ))
}

/// Set the permission bits of `path`. A no-op off unix.
///
/// # Errors
///
/// Returns an error if chmod fails.
pub fn set_permissions(path: &Path, _mode: u32) -> Result<()> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(path, std::fs::Permissions::from_mode(_mode))
            .with_context(|| format!("setting permissions on {}", path.display()))?;
    }
    Ok(())
}
