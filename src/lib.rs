//! A library wrapper for the `ipset` userspace utility.
//! Every operation is one synchronous invocation of the external binary;
//! the kernel is never talked to directly. Supported set commands:
//! * create (implicit in [`IpSet::new`])
//! * add / del / test
//! * list / terse list / statistics
//! * flush / destroy
//! * swap, and a hot-swap refresh built on it
//! * bulk destroy by name prefix
//!
//! The binary is resolved from `PATH` on first use (or via [`init`] to pick
//! a non-default name) and its version is checked against the oldest
//! supported release, 6.0.
//!
//! # Example
//! ```no_run
//! use ipset_cmd::{IpSet, Params};
//!
//! fn main() -> Result<(), ipset_cmd::Error> {
//!     let set = IpSet::new("blocklist", "hash:ip", Params::default())?;
//!
//!     set.add("10.0.0.1", 0)?;
//!     assert!(set.test("10.0.0.1")?);
//!
//!     let report = set.refresh(["10.0.0.2", "10.0.0.3"])?;
//!     assert!(report.skipped.is_empty());
//!
//!     for entry in set.list()? {
//!         println!("{entry}");
//!     }
//!
//!     set.destroy()
//! }
//! ```

pub use set::{destroy_all, list_all_names, swap, IpSet};
pub use types::{Error, Params, RefreshMode, RefreshReport, Stats, ALL_SETS};

mod parse;
mod set;
mod tool;
mod types;

/// Resolve and version-check the ipset binary up front, under a non-default
/// name if `name` is non-empty. Optional: every operation performs the same
/// (cached, race-safe) resolution lazily with the default name.
pub fn init(name: &str) -> Result<(), Error> {
    tool::tool(name).map(drop)
}
