#![allow(dead_code)]

//! Shared harness: stages a stateful stand-in for the ipset utility in a
//! temp directory and points the crate at it. Every test binary gets its
//! own process, so each gets its own fake and its own state.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use tempfile::TempDir;

/// POSIX-sh stand-in for the ipset utility. Sets live as files next to the
/// script; entries containing "bogus" are rejected the way the real tool
/// rejects unparsable addresses. Two name markers stage destroy failures:
/// sets containing "busy" refuse destruction like a kernel-referenced set,
/// and sets containing "ghost" are enumerable but report "does not exist"
/// on destroy, as if they vanished between enumeration and destruction.
const SCRIPT: &str = r#"#!/bin/sh
STATE="$(dirname "$0")/state"
mkdir -p "$STATE"

die() { echo "ipset v7.15: $1" >&2; exit 1; }

case "$1" in
--version)
    echo "__BANNER__"
    ;;
create)
    name=$2; kind=$3
    shift 3
    exist=0
    for a in "$@"; do [ "$a" = "-exist" ] && exist=1; done
    if [ -e "$STATE/$name.kind" ]; then
        [ $exist -eq 1 ] || die "Set cannot be created: set with the same name already exists"
    else
        printf '%s\n' "$kind" > "$STATE/$name.kind"
        : > "$STATE/$name.entries"
    fi
    ;;
add)
    name=$2; entry=$3
    [ -e "$STATE/$name.kind" ] || die "The set with the given name does not exist"
    case "$entry" in
    *bogus*) die "Syntax error: cannot parse $entry: resolving to IPv4 address failed" ;;
    esac
    grep -qxF "$entry" "$STATE/$name.entries" || printf '%s\n' "$entry" >> "$STATE/$name.entries"
    ;;
del)
    name=$2; entry=$3
    [ -e "$STATE/$name.kind" ] || die "The set with the given name does not exist"
    grep -vxF "$entry" "$STATE/$name.entries" > "$STATE/$name.entries.tmp" || true
    mv "$STATE/$name.entries.tmp" "$STATE/$name.entries"
    ;;
test)
    name=$2; entry=$3
    [ -e "$STATE/$name.kind" ] || die "The set with the given name does not exist"
    if grep -qxF "$entry" "$STATE/$name.entries"; then
        echo "$entry is in set $name."
    else
        echo "$entry is NOT in set $name."
    fi
    ;;
flush)
    name=$2
    [ -e "$STATE/$name.kind" ] || die "The set with the given name does not exist"
    : > "$STATE/$name.entries"
    ;;
list)
    if [ "$2" = "-n" ]; then
        for f in "$STATE"/*.kind; do
            [ -e "$f" ] || continue
            basename "$f" .kind
        done
        exit 0
    fi
    terse=0
    name=$2
    if [ "$2" = "-t" ]; then terse=1; name=$3; fi
    [ -e "$STATE/$name.kind" ] || die "The set with the given name does not exist"
    kind=$(cat "$STATE/$name.kind")
    count=$(wc -l < "$STATE/$name.entries" | tr -d ' ')
    echo "Name: $name"
    echo "Type: $kind"
    echo "Revision: 5"
    echo "Header: family inet hashsize 1024 maxelem 65536 timeout 0"
    echo "Size in memory: $((216 + count * 40))"
    echo "References: 0"
    echo "Number of entries: $count"
    if [ $terse -eq 0 ]; then
        echo "Members:"
        cat "$STATE/$name.entries"
    fi
    ;;
swap)
    a=$2; b=$3
    [ -e "$STATE/$a.kind" ] || die "The set with the given name does not exist"
    [ -e "$STATE/$b.kind" ] || die "The second set with the given name does not exist"
    mv "$STATE/$a.entries" "$STATE/swap.tmp"
    mv "$STATE/$b.entries" "$STATE/$a.entries"
    mv "$STATE/swap.tmp" "$STATE/$b.entries"
    ;;
destroy)
    name=$2
    if [ -z "$name" ]; then
        rm -f "$STATE"/*.kind "$STATE"/*.entries
        exit 0
    fi
    [ -e "$STATE/$name.kind" ] || die "The set with the given name does not exist"
    case "$name" in
    *ghost*) die "The set with the given name does not exist" ;;
    *busy*) die "Set cannot be destroyed: it is in use" ;;
    esac
    rm -f "$STATE/$name.kind" "$STATE/$name.entries"
    ;;
*)
    die "No command specified"
    ;;
esac
"#;

static FAKE: OnceLock<TempDir> = OnceLock::new();

/// Write a fake ipset with the given `--version` banner and return its path.
pub fn write_fake(dir: &Path, name: &str, banner: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, SCRIPT.replace("__BANNER__", banner)).expect("write fake ipset");
    let mut perms = fs::metadata(&path).expect("metadata").permissions();
    {
        use std::os::unix::fs::PermissionsExt;
        perms.set_mode(0o755);
    }
    fs::set_permissions(&path, perms).expect("chmod fake ipset");
    path
}

/// Stage the standard (v7.15) fake once per process and initialize the
/// crate against it.
pub fn setup() {
    let dir = FAKE.get_or_init(|| {
        let dir = tempfile::tempdir().expect("tempdir");
        write_fake(dir.path(), "ipset", "ipset v7.15, protocol version: 7");
        dir
    });
    let path = dir.path().join("ipset");
    ipset_cmd::init(path.to_str().expect("utf8 path")).expect("init against fake ipset");
}
