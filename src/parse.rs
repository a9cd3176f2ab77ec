//! Parsing of the ipset utility's human-oriented output.
//!
//! The output grammar is unversioned and best-effort: the tool prints for
//! people, not programs. Everything that pattern-matches on it lives here so
//! the heuristics stay in one place, pinned by fixture tests against
//! captured outputs.

use crate::types::{Error, Stats};

/// Split tool output on whitespace and newlines, dropping empty tokens.
pub(crate) fn tokens(text: &str) -> Vec<String> {
    text.split_whitespace().map(str::to_string).collect()
}

/// Extract the member entries from a `list` output block.
///
/// Strips everything up through and including the last line reading
/// `Members:` (header and metadata lines), then tokenizes the remainder.
/// Output without a `Members:` line (a terse listing, a name listing) is
/// tokenized whole.
pub(crate) fn members(text: &str) -> Vec<String> {
    let lines: Vec<&str> = text.lines().collect();
    match lines.iter().rposition(|line| line.trim_end() == "Members:") {
        Some(idx) => tokens(&lines[idx + 1..].join("\n")),
        None => tokens(text),
    }
}

/// The membership test prints e.g. "10.0.0.1 is NOT in set foo." when the
/// entry is absent. The bare token is the only stable marker across
/// versions.
pub(crate) fn is_absent(text: &str) -> bool {
    text.contains("NOT")
}

/// Destroy of a missing set reports this substring; callers that tolerate
/// concurrent external deletion match on it.
pub(crate) fn is_missing_set(text: &str) -> bool {
    text.contains("does not exist")
}

/// Parse a terse (`list -t`) output block into a statistics record.
///
/// Each line is a `Label: value` pair; recognized labels are mapped into
/// the record, unrecognized ones are ignored. A recognized numeric field
/// that fails to parse is an error.
pub(crate) fn stats(text: &str) -> Result<Stats, Error> {
    let mut stats = Stats::default();
    for line in text.lines() {
        let Some((label, value)) = line.split_once(':') else {
            continue;
        };
        let value = value.trim();
        match label.trim() {
            "Type" => stats.kind = value.to_string(),
            "Size in memory" => stats.size_in_memory = number(value, "Size in memory")?,
            "References" => stats.references = number(value, "References")?,
            "Number of entries" => stats.entries = number(value, "Number of entries")?,
            _ => {}
        }
    }
    Ok(stats)
}

fn number(value: &str, field: &'static str) -> Result<u64, Error> {
    value.parse().map_err(|_| Error::Parse {
        field,
        value: value.to_string(),
    })
}

/// Find the `vMAJOR.MINOR` token the tool reports in its `--version`
/// banner, e.g. "ipset v7.15, protocol version: 7".
pub(crate) fn version_token(text: &str) -> Option<(u32, u32)> {
    for (idx, _) in text.match_indices('v') {
        let rest = &text[idx + 1..];
        let major_len = rest.chars().take_while(char::is_ascii_digit).count();
        if major_len == 0 || !rest[major_len..].starts_with('.') {
            continue;
        }
        let tail = &rest[major_len + 1..];
        let minor_len = tail.chars().take_while(char::is_ascii_digit).count();
        if minor_len == 0 {
            continue;
        }
        let major = rest[..major_len].parse().ok()?;
        let minor = tail[..minor_len].parse().ok()?;
        return Some((major, minor));
    }
    None
}
