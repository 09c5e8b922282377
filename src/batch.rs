// src/batch.rs

//! Command-line batching for the ownership query tool
//!
//! The queried paths travel as command arguments, so a large file set must
//! be split into groups that fit the kernel's argument-length limit.

use tracing::debug;

/// Fallback when the argument-size limit cannot be probed
const DEFAULT_MAX_CMDLINE: usize = 2048;

/// Conservative command-line budget: half of `sysconf(_SC_ARG_MAX)`,
/// since the limit also covers the environment.
pub fn max_cmdline() -> usize {
    // sysconf takes no pointers and cannot fail memory-unsafely
    let arg_max = unsafe { libc::sysconf(libc::_SC_ARG_MAX) };
    if arg_max > 0 {
        arg_max as usize / 2
    } else {
        DEFAULT_MAX_CMDLINE
    }
}

/// Split `paths` into consecutive groups whose rendered argument list fits
/// `max_cmd_len`, with `fixed_overhead` bytes reserved for the command
/// itself. Every group holds at least one path even when a single path
/// exceeds the budget, and concatenating the groups in order reproduces
/// `paths` exactly.
pub fn batch_paths<'a>(
    paths: &'a [String],
    max_cmd_len: usize,
    fixed_overhead: usize,
) -> Vec<&'a [String]> {
    if paths.is_empty() {
        return Vec::new();
    }
    // Budget per path: the longest path plus its separating space
    let per_file = paths.iter().map(String::len).max().unwrap_or(0) + 1;
    let batch_size = (max_cmd_len.saturating_sub(fixed_overhead) / per_file).max(1);
    debug!(
        "Batching {} paths into groups of at most {}",
        paths.len(),
        batch_size
    );
    paths.chunks(batch_size).collect()
}
