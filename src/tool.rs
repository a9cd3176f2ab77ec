//! Resolution and invocation of the external ipset binary.
//!
//! The binary is looked up on `PATH` once per process, version-gated, and
//! cached in a [`OnceLock`] so concurrent first callers cannot race the
//! resolution. Every set operation is one synchronous invocation; the
//! combined stdout+stderr is captured verbatim for error payloads.

use std::env;
use std::fmt;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::OnceLock;

use tracing::warn;

use crate::parse;
use crate::types::Error;

const DEFAULT_BINARY: &str = "ipset";

/// Oldest tool version the command vectors in this crate are known to work
/// against.
const MIN_VERSION: Version = Version {
    major: 6,
    minor: 0,
    patch: 0,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub(crate) struct Version {
    major: u32,
    minor: u32,
    patch: u32,
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

/// A resolved, version-checked ipset binary.
#[derive(Debug)]
pub(crate) struct Tool {
    path: PathBuf,
}

static TOOL: OnceLock<Tool> = OnceLock::new();

/// Resolve (or fetch the cached) process-wide tool. An empty hint means the
/// default binary name. The first successful resolution wins; later hints
/// are ignored.
pub(crate) fn tool(hint: &str) -> Result<&'static Tool, Error> {
    if let Some(tool) = TOOL.get() {
        return Ok(tool);
    }
    let resolved = Tool::resolve(hint)?;
    Ok(TOOL.get_or_init(|| resolved))
}

impl Tool {
    fn resolve(hint: &str) -> Result<Tool, Error> {
        let name = if hint.is_empty() { DEFAULT_BINARY } else { hint };
        let path = lookup(name).ok_or(Error::NotFound)?;
        let tool = Tool { path };
        tool.check_version()?;
        Ok(tool)
    }

    /// Version gate: below-minimum fails, unknown passes. The tool refusing
    /// to report a parsable version is treated as "recent enough" so an
    /// unexpected banner format never blocks normal use.
    fn check_version(&self) -> Result<(), Error> {
        let banner = match self.run(&["--version"]) {
            Ok(out) => out,
            Err(output) => {
                warn!("error checking ipset version, assuming at least {MIN_VERSION}: {output}");
                return Ok(());
            }
        };
        let Some((major, minor)) = parse::version_token(&banner) else {
            warn!(
                "no ipset version found in {:?}, assuming at least {MIN_VERSION}",
                banner.trim()
            );
            return Ok(());
        };
        // The banner only carries major.minor; compare as major.minor.0.
        let version = Version {
            major,
            minor,
            patch: 0,
        };
        if version < MIN_VERSION {
            return Err(Error::UnsupportedVersion {
                version: version.to_string(),
            });
        }
        Ok(())
    }

    /// Run the binary with `args`, capturing stdout and stderr combined.
    /// A non-zero exit (or a spawn failure) yields the captured text,
    /// prefixed with the exit status, as the error payload.
    pub(crate) fn run(&self, args: &[&str]) -> Result<String, String> {
        let output = match Command::new(&self.path).args(args).output() {
            Ok(output) => output,
            Err(err) => return Err(err.to_string()),
        };
        let mut combined = String::from_utf8_lossy(&output.stdout).into_owned();
        combined.push_str(&String::from_utf8_lossy(&output.stderr));
        if output.status.success() {
            Ok(combined)
        } else {
            Err(format!("{} ({})", output.status, combined.trim()))
        }
    }
}

/// Standard executable search: a name containing a path separator is used
/// as-is, anything else is tried against every `PATH` entry.
fn lookup(name: &str) -> Option<PathBuf> {
    if name.contains(std::path::MAIN_SEPARATOR) {
        let path = PathBuf::from(name);
        return is_executable(&path).then_some(path);
    }
    let dirs = env::var_os("PATH")?;
    env::split_paths(&dirs)
        .map(|dir| dir.join(name))
        .find(|path| is_executable(path))
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;

    path.metadata()
        .map(|meta| meta.is_file() && meta.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn version(major: u32, minor: u32) -> Version {
        Version {
            major,
            minor,
            patch: 0,
        }
    }

    #[test]
    fn minimum_version_ordering() {
        assert!(version(5, 9) < MIN_VERSION);
        assert!(version(6, 0) >= MIN_VERSION);
        assert!(version(7, 2) >= MIN_VERSION);
    }

    #[test]
    fn version_display_is_dotted_tri() {
        assert_eq!(version(7, 15).to_string(), "7.15.0");
    }

    #[test]
    fn lookup_rejects_missing_direct_path() {
        assert!(lookup("/nonexistent/dir/ipset").is_none());
    }
}
