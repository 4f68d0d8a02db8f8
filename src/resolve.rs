//! Path resolution with parent-climb fallback.

use std::env;
use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};

use thiserror::Error;
use tracing::warn;

#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("no readable directory on the ancestor chain of {}", .0.display())]
    Unresolvable(PathBuf),
}

/// Resolve `candidate` to an absolute, symlink-free directory path.
///
/// Relative candidates resolve against `base` when given, otherwise against
/// the process working directory. When the requested directory cannot be
/// opened, resolution retries against successively shorter ancestor prefixes
/// of the request until a readable directory is found. Root is never
/// stripped; an unopenable root yields `ResolveError::Unresolvable`.
pub fn resolve(candidate: &str, base: Option<&Path>) -> Result<PathBuf, ResolveError> {
    let mut requested = normalize(Path::new(candidate), base);

    loop {
        match open_probe(&requested) {
            Ok(resolved) => return Ok(resolved),
            Err(err) => {
                warn!(
                    path = %requested.display(),
                    error = %err,
                    "directory not openable, climbing to parent"
                );
                if !requested.pop() {
                    return Err(ResolveError::Unresolvable(PathBuf::from(candidate)));
                }
            }
        }
    }
}

/// Absolute path with `.`/`..` segments applied lexically. Symlinks are left
/// alone here; `open_probe` canonicalizes the survivor.
fn normalize(candidate: &Path, base: Option<&Path>) -> PathBuf {
    let joined = if candidate.is_absolute() {
        candidate.to_path_buf()
    } else {
        let base = base
            .map(Path::to_path_buf)
            .unwrap_or_else(|| env::current_dir().unwrap_or_else(|_| PathBuf::from("/")));
        base.join(candidate)
    };

    let mut out = PathBuf::new();
    for component in joined.components() {
        match component {
            Component::RootDir => out.push(component.as_os_str()),
            Component::Prefix(prefix) => out.push(prefix.as_os_str()),
            Component::CurDir => {}
            // pop() refuses to strip a bare root, which is exactly the
            // behavior wanted for a leading-slash-only result
            Component::ParentDir => {
                out.pop();
            }
            Component::Normal(name) => out.push(name),
        }
    }

    if out.as_os_str().is_empty() {
        out.push("/");
    }
    out
}

fn open_probe(path: &Path) -> io::Result<PathBuf> {
    let resolved = fs::canonicalize(path)?;
    if !fs::metadata(&resolved)?.is_dir() {
        return Err(io::Error::new(
            io::ErrorKind::NotADirectory,
            "not a directory",
        ));
    }
    fs::read_dir(&resolved)?;
    Ok(resolved)
}
