//! Public types shared by every set operation: the error taxonomy, the
//! creation parameters and the records produced by parsing tool output.

use std::error::Error as StdError;

use derive_more::Display;

/// Prefix sentinel accepted by [`crate::destroy_all`] meaning every set.
pub const ALL_SETS: &str = "";

/// Optional parameters for creating a new set. Zero or empty fields fall
/// back to the ipset utility defaults: hashsize 1024, maxelem 65536,
/// family "inet". A timeout of 0 means entries never expire.
#[derive(Debug, Default, Clone)]
pub struct Params {
    pub hash_family: String,
    pub hash_size: u32,
    pub max_elem: u32,
    pub timeout: u32,
}

/// Per-set statistics as reported by a terse listing.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Stats {
    pub kind: String,
    pub size_in_memory: u64,
    pub references: u64,
    pub entries: u64,
}

/// Policy for per-entry add failures during [`crate::IpSet::refresh_with`].
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum RefreshMode {
    /// Log the failure, skip the entry and keep going.
    #[default]
    BestEffort,
    /// Abort on the first entry the tool rejects.
    Strict,
}

/// Outcome of a best-effort refresh: how many entries made it into the
/// swapped-in set and which ones the tool rejected.
#[derive(Debug, Default, Clone)]
pub struct RefreshReport {
    pub added: usize,
    /// Rejected entries paired with the tool output explaining why.
    pub skipped: Vec<(String, String)>,
}

/// Errors defined in this crate. Variants produced by a tool invocation
/// embed the combined stdout+stderr captured from the ipset utility.
#[derive(Debug, Display)]
pub enum Error {
    #[display("ipset utility not found")]
    NotFound,
    #[display("ipset utility version {version} is not supported, requiring version >= 6.0")]
    UnsupportedVersion { version: String },
    #[display("invalid set name: {_0:?}")]
    InvalidName(String),
    #[display("not a hash type: {_0}")]
    InvalidKind(String),
    #[display("error creating set {name} with type {kind}: {output}")]
    Create {
        name: String,
        kind: String,
        output: String,
    },
    #[display("error adding entry {entry} to set {name}: {output}")]
    Add {
        name: String,
        entry: String,
        output: String,
    },
    #[display("error deleting entry {entry} from set {name}: {output}")]
    Delete {
        name: String,
        entry: String,
        output: String,
    },
    #[display("error testing entry {entry} in set {name}: {output}")]
    Test {
        name: String,
        entry: String,
        output: String,
    },
    #[display("error flushing set {name}: {output}")]
    Flush { name: String, output: String },
    #[display("error listing set {name}: {output}")]
    List { name: String, output: String },
    #[display("error destroying set {name}: {output}")]
    Destroy { name: String, output: String },
    #[display("error swapping set {from} with {to}: {output}")]
    Swap {
        from: String,
        to: String,
        output: String,
    },
    #[display("error parsing {field} from terse output: {value:?}")]
    Parse {
        field: &'static str,
        value: String,
    },
    #[display("error destroying {scope} sets: {detail}")]
    Aggregate { scope: String, detail: String },
}

impl StdError for Error {}

impl Error {
    /// Captured tool output for invocation errors, if any.
    pub fn output(&self) -> Option<&str> {
        match self {
            Error::Create { output, .. }
            | Error::Add { output, .. }
            | Error::Delete { output, .. }
            | Error::Test { output, .. }
            | Error::Flush { output, .. }
            | Error::List { output, .. }
            | Error::Destroy { output, .. }
            | Error::Swap { output, .. } => Some(output),
            _ => None,
        }
    }
}
