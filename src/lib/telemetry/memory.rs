//! Memory usage from `/proc/meminfo`.
//!
//! Only two labeled fields are needed: `MemTotal` and `MemAvailable`, both in
//! kB. Used percent is `(total - available) / total`.

use std::path::Path;

use crate::helper::format;

/// Default counter source.
pub const PROC_MEMINFO_PATH: &str = "/proc/meminfo";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MemCounters {
    pub total_kb: u64,
    pub available_kb: u64,
}

impl MemCounters {
    pub fn used_kb(&self) -> u64 {
        self.total_kb.saturating_sub(self.available_kb)
    }

    /// Used fraction in `[0, 1]`, or `None` when the total is unreadable —
    /// the caller keeps its previous values in that case.
    pub fn used_fraction(&self) -> Option<f64> {
        if self.total_kb == 0 {
            return None;
        }
        Some(self.used_kb() as f64 / self.total_kb as f64)
    }

    /// `"used / total GB"` pair for display.
    pub fn detail_string(&self) -> String {
        format::usage_gb_string(self.used_kb(), self.total_kb)
    }
}

pub fn read(path: &Path) -> Option<MemCounters> {
    let content = std::fs::read_to_string(path).ok()?;
    Some(parse_meminfo(&content))
}

/// Scan the labeled lines for the two needed fields. Unknown lines are
/// ignored; a missing field leaves its counter at zero.
pub fn parse_meminfo(content: &str) -> MemCounters {
    let mut counters = MemCounters::default();

    for line in content.lines() {
        if let Some(rest) = line.strip_prefix("MemTotal:") {
            counters.total_kb = parse_kb_value(rest);
        } else if let Some(rest) = line.strip_prefix("MemAvailable:") {
            counters.available_kb = parse_kb_value(rest);
        }
    }

    counters
}

fn parse_kb_value(rest: &str) -> u64 {
    rest.split_whitespace()
        .next()
        .and_then(|value| value.parse().ok())
        .unwrap_or(0)
}
