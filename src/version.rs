// src/version.rs

//! Debian version ordering
//!
//! Implements dpkg's comparison for `[epoch:]upstream[-revision]` version
//! strings: `~` sorts before everything including the end of the string,
//! and digit runs compare numerically while everything else compares by
//! character class. Used to pick the candidate version out of the known
//! version set; semver would mis-order common Debian versions such as
//! `1.10` vs `1.9`.

use std::cmp::Ordering;
use std::fmt;

/// A parsed Debian version with epoch, upstream, and revision components
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DebVersion {
    pub epoch: u64,
    pub upstream: String,
    pub revision: Option<String>,
}

impl DebVersion {
    /// Parse a Debian version string
    ///
    /// Format: [epoch:]upstream[-revision]
    /// Examples:
    /// - "1.2.3" → epoch=0, upstream="1.2.3", revision=None
    /// - "2:9.3p1-1" → epoch=2, upstream="9.3p1", revision=Some("1")
    /// - "1.0-2-3" → epoch=0, upstream="1.0-2", revision=Some("3")
    ///
    /// The revision starts at the last hyphen. A non-numeric epoch field is
    /// kept as part of the upstream version rather than rejected.
    pub fn parse(s: &str) -> Self {
        let (epoch, rest) = match s.split_once(':') {
            Some((e, r)) => match e.parse::<u64>() {
                Ok(epoch) => (epoch, r),
                Err(_) => (0, s),
            },
            None => (0, s),
        };
        let (upstream, revision) = match rest.rsplit_once('-') {
            Some((u, r)) => (u.to_string(), Some(r.to_string())),
            None => (rest.to_string(), None),
        };
        Self {
            epoch,
            upstream,
            revision,
        }
    }

    /// Compare two Debian versions: epoch first, then upstream, then
    /// revision. A missing revision compares as "0", as dpkg does.
    pub fn compare(&self, other: &DebVersion) -> Ordering {
        match self.epoch.cmp(&other.epoch) {
            Ordering::Equal => {}
            ord => return ord,
        }
        match verrevcmp(&self.upstream, &other.upstream) {
            Ordering::Equal => {}
            ord => return ord,
        }
        verrevcmp(
            self.revision.as_deref().unwrap_or("0"),
            other.revision.as_deref().unwrap_or("0"),
        )
    }
}

impl fmt::Display for DebVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.epoch > 0 {
            write!(f, "{}:", self.epoch)?;
        }
        write!(f, "{}", self.upstream)?;
        if let Some(ref revision) = self.revision {
            write!(f, "-{}", revision)?;
        }
        Ok(())
    }
}

impl Ord for DebVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        self.compare(other)
    }
}

impl PartialOrd for DebVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Weight of one character in a non-digit run. The end of the string
/// weighs 0 so that `~` (weight -1) sorts before it.
fn char_order(c: Option<u8>) -> i32 {
    match c {
        None => 0,
        Some(b'~') => -1,
        Some(c) if c.is_ascii_digit() => 0,
        Some(c) if c.is_ascii_alphabetic() => i32::from(c),
        Some(c) => i32::from(c) + 256,
    }
}

/// dpkg's component comparison: alternating non-digit and digit runs
fn verrevcmp(a: &str, b: &str) -> Ordering {
    let a = a.as_bytes();
    let b = b.as_bytes();
    let (mut i, mut j) = (0, 0);
    while i < a.len() || j < b.len() {
        // Non-digit run
        while (i < a.len() && !a[i].is_ascii_digit()) || (j < b.len() && !b[j].is_ascii_digit()) {
            let oa = char_order(a.get(i).copied());
            let ob = char_order(b.get(j).copied());
            if oa != ob {
                return oa.cmp(&ob);
            }
            i += 1;
            j += 1;
        }
        // Digit run: leading zeros are insignificant, longer run wins,
        // otherwise the first differing digit decides
        while a.get(i) == Some(&b'0') {
            i += 1;
        }
        while b.get(j) == Some(&b'0') {
            j += 1;
        }
        let mut first_diff = Ordering::Equal;
        while i < a.len() && j < b.len() && a[i].is_ascii_digit() && b[j].is_ascii_digit() {
            if first_diff == Ordering::Equal {
                first_diff = a[i].cmp(&b[j]);
            }
            i += 1;
            j += 1;
        }
        if i < a.len() && a[i].is_ascii_digit() {
            return Ordering::Greater;
        }
        if j < b.len() && b[j].is_ascii_digit() {
            return Ordering::Less;
        }
        if first_diff != Ordering::Equal {
            return first_diff;
        }
    }
    Ordering::Equal
}
