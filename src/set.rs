//! Set handles and the operations on them, plus the package-level
//! operations that are not tied to a single set (swap, bulk destroy, name
//! enumeration).

use tracing::error;

use crate::parse;
use crate::tool::{tool, Tool};
use crate::types::{Error, Params, RefreshMode, RefreshReport, Stats, ALL_SETS};

/// A named kernel set under management.
///
/// Creating a handle issues an existence-tolerant `create`, so constructing
/// two handles with the same name and shape is not an error. The external
/// tool stays the sole source of truth for existence and membership; the
/// handle only remembers the shape it was created with.
#[derive(Debug, Clone)]
pub struct IpSet {
    name: String,
    kind: String,
    hash_family: String,
    hash_size: u32,
    max_elem: u32,
    timeout: u32,
}

impl IpSet {
    /// Create a new set and return a handle to it.
    ///
    /// Zero-valued params fall back to the tool defaults (hashsize 1024,
    /// maxelem 65536, family "inet"). Only hash kinds are supported; `kind`
    /// must start with `"hash:"`.
    ///
    /// # Example
    /// ```no_run
    /// use ipset_cmd::{IpSet, Params};
    ///
    /// let set = IpSet::new("blocklist", "hash:ip", Params::default())?;
    /// # Ok::<(), ipset_cmd::Error>(())
    /// ```
    pub fn new(name: &str, kind: &str, params: Params) -> Result<IpSet, Error> {
        if name.is_empty() {
            return Err(Error::InvalidName(name.to_string()));
        }
        if !kind.starts_with("hash:") {
            return Err(Error::InvalidKind(kind.to_string()));
        }
        let set = IpSet {
            name: name.to_string(),
            kind: kind.to_string(),
            hash_family: if params.hash_family.is_empty() {
                "inet".to_string()
            } else {
                params.hash_family
            },
            hash_size: if params.hash_size == 0 {
                1024
            } else {
                params.hash_size
            },
            max_elem: if params.max_elem == 0 {
                65536
            } else {
                params.max_elem
            },
            timeout: params.timeout,
        };
        set.create_named(tool("")?, name)?;
        Ok(set)
    }

    /// Name the handle was constructed with.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Hash kind the set was created with, e.g. `hash:ip`.
    pub fn kind(&self) -> &str {
        &self.kind
    }

    /// `create NAME KIND family F hashsize N maxelem N timeout T -exist`
    fn create_named(&self, tool: &Tool, name: &str) -> Result<(), Error> {
        tool.run(&[
            "create",
            name,
            &self.kind,
            "family",
            &self.hash_family,
            "hashsize",
            &self.hash_size.to_string(),
            "maxelem",
            &self.max_elem.to_string(),
            "timeout",
            &self.timeout.to_string(),
            "-exist",
        ])
        .map(drop)
        .map_err(|output| Error::Create {
            name: name.to_string(),
            kind: self.kind.clone(),
            output,
        })
    }

    /// Add `entry` to the set. A timeout of 0 stores the entry permanently;
    /// re-adding an existing entry is not an error.
    pub fn add(&self, entry: &str, timeout: u32) -> Result<(), Error> {
        self.add_args(tool("")?, &self.name, entry, None, timeout)
    }

    /// Like [`add`](IpSet::add) with an extra positional modifier between
    /// the entry and the timeout clause, e.g. a port specifier for
    /// `hash:ip,port` sets.
    pub fn add_option(&self, entry: &str, option: &str, timeout: u32) -> Result<(), Error> {
        self.add_args(tool("")?, &self.name, entry, Some(option), timeout)
    }

    fn add_args(
        &self,
        tool: &Tool,
        name: &str,
        entry: &str,
        option: Option<&str>,
        timeout: u32,
    ) -> Result<(), Error> {
        let timeout = timeout.to_string();
        let mut args = vec!["add", name, entry];
        if let Some(option) = option {
            args.push(option);
        }
        args.extend(["timeout", &timeout, "-exist"]);
        tool.run(&args).map(drop).map_err(|output| Error::Add {
            name: name.to_string(),
            entry: entry.to_string(),
            output,
        })
    }

    /// Delete `entry` from the set. Deleting an entry that is not present
    /// is not an error (`-exist`), but deleting from a missing set is.
    pub fn del(&self, entry: &str) -> Result<(), Error> {
        tool("")?
            .run(&["del", &self.name, entry, "-exist"])
            .map(drop)
            .map_err(|output| Error::Delete {
                name: self.name.clone(),
                entry: entry.to_string(),
                output,
            })
    }

    /// Test whether `entry` is in the set.
    ///
    /// A zero exit whose output carries the tool's "NOT" marker means
    /// absent; any other zero-exit output means present. A non-zero exit is
    /// an error, never a negative result.
    pub fn test(&self, entry: &str) -> Result<bool, Error> {
        tool("")?
            .run(&["test", &self.name, entry])
            .map(|out| !parse::is_absent(&out))
            .map_err(|output| Error::Test {
                name: self.name.clone(),
                entry: entry.to_string(),
                output,
            })
    }

    /// Remove every entry from the set.
    pub fn flush(&self) -> Result<(), Error> {
        tool("")?
            .run(&["flush", &self.name])
            .map(drop)
            .map_err(|output| Error::Flush {
                name: self.name.clone(),
                output,
            })
    }

    /// List the set's entries, in the tool's emission order (hash order,
    /// not sorted).
    pub fn list(&self) -> Result<Vec<String>, Error> {
        self.list_args(&["list", &self.name])
    }

    /// List the set's metadata only (terse view), tokenized the same way
    /// as [`list`](IpSet::list).
    pub fn list_terse(&self) -> Result<Vec<String>, Error> {
        self.list_args(&["list", "-t", &self.name])
    }

    fn list_args(&self, args: &[&str]) -> Result<Vec<String>, Error> {
        self.list_raw(args).map(|out| parse::members(&out))
    }

    fn list_raw(&self, args: &[&str]) -> Result<String, Error> {
        tool("")?.run(args).map_err(|output| Error::List {
            name: self.name.clone(),
            output,
        })
    }

    /// Kind, memory size, reference count and entry count of the set, from
    /// a terse listing.
    pub fn statistics(&self) -> Result<Stats, Error> {
        let out = self.list_raw(&["list", "-t", &self.name])?;
        parse::stats(&out)
    }

    /// Destroy the set. Destroying a set that is in use by the kernel
    /// fails, with the tool's output reported verbatim.
    pub fn destroy(&self) -> Result<(), Error> {
        tool("")?
            .run(&["destroy", &self.name])
            .map(drop)
            .map_err(|output| Error::Destroy {
                name: self.name.clone(),
                output,
            })
    }

    /// Replace the set's live content with exactly `entries`, best-effort:
    /// entries the tool rejects are logged, skipped and reported.
    ///
    /// See [`refresh_with`](IpSet::refresh_with) for the mechanism.
    pub fn refresh<I, S>(&self, entries: I) -> Result<RefreshReport, Error>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.refresh_with(entries, RefreshMode::BestEffort)
    }

    /// Replace the set's live content with exactly `entries` by hot swap.
    ///
    /// The entries are loaded into a temporary `<name>-temp` set of the
    /// same shape, which is then atomically exchanged with this set and
    /// destroyed. Consumers of the set name never observe an empty or
    /// partially loaded set; the swap is the single point where visible
    /// membership changes. Each add spells out the handle's default
    /// timeout rather than leaving it implicit; the temporary set is
    /// created with that same default, so both forms expire identically.
    ///
    /// In [`RefreshMode::BestEffort`] a rejected entry does not abort the
    /// load; it is recorded in the report's `skipped` list. In
    /// [`RefreshMode::Strict`] the first rejected entry aborts the refresh
    /// and the temporary set is torn down.
    pub fn refresh_with<I, S>(&self, entries: I, mode: RefreshMode) -> Result<RefreshReport, Error>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let tool = tool("")?;
        let temp = format!("{}-temp", self.name);
        self.create_named(tool, &temp)?;

        let mut report = RefreshReport::default();
        for entry in entries {
            let entry = entry.as_ref();
            match self.add_args(tool, &temp, entry, None, self.timeout) {
                Ok(()) => report.added += 1,
                Err(err) if mode == RefreshMode::Strict => {
                    if let Err(cleanup) = destroy_quiet(tool, &temp) {
                        error!("error destroying temporary set {temp}: {cleanup}");
                    }
                    return Err(err);
                }
                Err(err) => {
                    let output = err.output().unwrap_or_default().to_string();
                    error!("error adding entry {entry} to set {temp}: {output}");
                    report.skipped.push((entry.to_string(), output));
                }
            }
        }

        swap(&temp, &self.name)?;
        destroy_quiet(tool, &temp)?;
        Ok(report)
    }
}

/// Atomically exchange the content of two existing sets of the same type.
pub fn swap(from: &str, to: &str) -> Result<(), Error> {
    tool("")?
        .run(&["swap", from, to])
        .map(drop)
        .map_err(|output| Error::Swap {
            from: from.to_string(),
            to: to.to_string(),
            output,
        })
}

/// Destroy tolerating a set that is already gone: a concurrent external
/// deletion is not a failure of this crate.
fn destroy_quiet(tool: &Tool, name: &str) -> Result<(), Error> {
    match tool.run(&["destroy", name]) {
        Ok(_) => Ok(()),
        Err(output) if parse::is_missing_set(&output) => Ok(()),
        Err(output) => Err(Error::Destroy {
            name: name.to_string(),
            output,
        }),
    }
}

/// Destroy every set whose name starts with `prefix`.
///
/// The empty prefix ([`ALL_SETS`]) destroys every set in a single tool
/// invocation. Otherwise the names are enumerated and destroyed one by one;
/// a set that vanished in the meantime is skipped silently, and every other
/// failure is collected so each eligible set still gets an attempt. The
/// collected failures come back as one [`Error::Aggregate`].
pub fn destroy_all(prefix: &str) -> Result<(), Error> {
    let tool = tool("")?;

    if prefix == ALL_SETS {
        return tool.run(&["destroy"]).map(drop).map_err(|output| Error::Destroy {
            name: "*".to_string(),
            output,
        });
    }

    let mut failures = String::new();
    for name in list_all_names()? {
        if !name.starts_with(prefix) {
            continue;
        }
        if let Err(err) = destroy_quiet(tool, &name) {
            failures.push_str(&format!("ipset({name}): {err}\n"));
        }
    }

    if failures.is_empty() {
        Ok(())
    } else {
        Err(Error::Aggregate {
            scope: format!("prefix {prefix}"),
            detail: failures,
        })
    }
}

/// Names of every set known to the tool, in its emission order.
pub fn list_all_names() -> Result<Vec<String>, Error> {
    tool("")?
        .run(&["list", "-n"])
        .map(|out| parse::tokens(&out))
        .map_err(|output| Error::List {
            name: "*".to_string(),
            output,
        })
}
