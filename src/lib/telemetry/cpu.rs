//! CPU usage from `/proc/stat` cumulative tick counters.
//!
//! Each `cpu*` line carries cumulative ticks since boot:
//! ```text
//! cpu  user nice system idle iowait irq softirq ...
//! cpu0 user nice system idle ...
//! ```
//! Usage over an interval is derived from the delta of two consecutive reads:
//! `(diff_total - diff_idle) / diff_total`. The first line is the aggregate;
//! one line per logical core follows.

use std::path::Path;

/// Default counter source.
pub const PROC_STAT_PATH: &str = "/proc/stat";

/// Cumulative tick counters for one slot (aggregate or a single core).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CpuTicks {
    pub total: u64,
    pub idle: u64,
}

/// Busy fraction in `[0, 1]` between two consecutive counter samples.
///
/// A non-positive total delta (first sample against a zeroed baseline that
/// happens to match, or a counter reset) yields `0.0` — the caller treats
/// that as "no signal this tick".
pub fn rate(prev_total: u64, prev_idle: u64, cur_total: u64, cur_idle: u64) -> f64 {
    let diff_total = cur_total as i64 - prev_total as i64;
    let diff_idle = cur_idle as i64 - prev_idle as i64;

    if diff_total > 0 {
        (diff_total - diff_idle) as f64 / diff_total as f64
    } else {
        0.0
    }
}

/// Parse one `cpu*` line into its tick counters.
///
/// Total is the sum of the first four numeric fields (user, nice, system,
/// idle); idle is the fourth. Lines with fewer than five fields are rejected.
pub fn parse_stat_line(line: &str) -> Option<CpuTicks> {
    if !line.starts_with("cpu") {
        return None;
    }

    let fields: Vec<&str> = line.split_whitespace().collect();
    if fields.len() < 5 {
        return None;
    }

    let user: u64 = fields[1].parse().ok()?;
    let nice: u64 = fields[2].parse().ok()?;
    let system: u64 = fields[3].parse().ok()?;
    let idle: u64 = fields[4].parse().ok()?;

    Some(CpuTicks {
        total: user + nice + system + idle,
        idle,
    })
}

/// Read up to `max_slots` samples (aggregate first, then per-core) from a
/// `/proc/stat`-shaped file. Malformed lines are skipped; a missing file
/// yields an empty vector.
pub fn read_samples(path: &Path, max_slots: usize) -> Vec<CpuTicks> {
    let Ok(content) = std::fs::read_to_string(path) else {
        return vec![];
    };
    parse_samples(&content, max_slots)
}

fn parse_samples(content: &str, max_slots: usize) -> Vec<CpuTicks> {
    content
        .lines()
        .filter_map(parse_stat_line)
        .take(max_slots)
        .collect()
}

/// Logical core count detected once at process start. Never less than 1.
pub fn detect_core_count() -> usize {
    std::thread::available_parallelism()
        .map(|cores| cores.get())
        .unwrap_or(1)
        .max(1)
}

/// Per-slot delta state and latest rates. Slot 0 is always the aggregate;
/// the slot count is fixed for the lifetime of the tracker.
#[derive(Debug)]
pub struct CpuTracker {
    prev: Vec<CpuTicks>,
    rates: Vec<f64>,
}

impl CpuTracker {
    pub fn new(core_count: usize) -> Self {
        let slots = core_count + 1;
        Self {
            prev: vec![CpuTicks::default(); slots],
            rates: vec![0.0; slots],
        }
    }

    /// Fold one read into the tracker.
    ///
    /// Baselines are overwritten unconditionally for every sampled slot, so a
    /// single glitched read cannot desynchronize future deltas. If fewer
    /// samples arrive than there are slots, the remaining slots keep their
    /// last rate.
    pub fn apply(&mut self, samples: &[CpuTicks]) {
        for (slot, sample) in samples.iter().enumerate().take(self.prev.len()) {
            let prev = self.prev[slot];
            self.rates[slot] = rate(prev.total, prev.idle, sample.total, sample.idle);
            self.prev[slot] = *sample;
        }
    }

    /// Fixed slot count: the aggregate plus one per detected core.
    pub fn slot_count(&self) -> usize {
        self.prev.len()
    }

    /// Aggregate busy fraction.
    pub fn total(&self) -> f64 {
        self.rates[0]
    }

    /// Per-core busy fractions, aggregate excluded.
    pub fn cores(&self) -> &[f64] {
        &self.rates[1..]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rate_guards_zero_total_delta() {
        assert_eq!(rate(100, 0, 100, 0), 0.0);
        assert_eq!(rate(500, 200, 500, 200), 0.0);
        // Counter reset: total went backwards
        assert_eq!(rate(1000, 400, 100, 40), 0.0);
    }

    #[test]
    fn rate_half_busy() {
        // 100 new ticks, 50 idle -> 50% busy
        assert!((rate(100, 50, 200, 100) - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn rate_eighty_percent_busy() {
        // diffTotal=200, diffIdle=40 -> 0.8
        assert!((rate(1000, 400, 1200, 440) - 0.8).abs() < f64::EPSILON);
    }

    #[test]
    fn parse_aggregate_line() {
        let ticks = parse_stat_line("cpu  4705 150 1120 16250 520 0 100 0 0 0").unwrap();
        assert_eq!(ticks.total, 4705 + 150 + 1120 + 16250);
        assert_eq!(ticks.idle, 16250);
    }

    #[test]
    fn parse_rejects_short_and_foreign_lines() {
        assert_eq!(parse_stat_line("cpu0 10 20 30"), None);
        assert_eq!(parse_stat_line("intr 819205 44"), None);
        assert_eq!(parse_stat_line("cpu0 10 banana 30 40"), None);
    }

    #[test]
    fn parse_samples_takes_aggregate_then_cores() {
        let content = "\
cpu  100 0 100 800 10 0 0 0
cpu0 50 0 50 400 5 0 0 0
cpu1 50 0 50 400 5 0 0 0
intr 12345
ctxt 6789
";
        let samples = parse_samples(content, 3);
        assert_eq!(samples.len(), 3);
        assert_eq!(samples[0].idle, 800);
        assert_eq!(samples[1].idle, 400);
    }

    #[test]
    fn tracker_keeps_slot_count_and_last_rates() {
        let mut tracker = CpuTracker::new(2);

        tracker.apply(&[
            CpuTicks { total: 1000, idle: 400 },
            CpuTicks { total: 500, idle: 200 },
            CpuTicks { total: 500, idle: 200 },
        ]);
        tracker.apply(&[
            CpuTicks { total: 1200, idle: 440 },
            CpuTicks { total: 700, idle: 300 },
        ]);

        assert!((tracker.total() - 0.8).abs() < f64::EPSILON);
        // Core 0 was sampled: 200 new ticks, 100 idle
        assert!((tracker.cores()[0] - 0.5).abs() < f64::EPSILON);
        // Core 1 missing from the second read: keeps its previous rate
        assert_eq!(tracker.cores()[1], 0.0);
    }

    #[test]
    fn tracker_first_pass_is_baseline_only() {
        let mut tracker = CpuTracker::new(1);
        tracker.apply(&[CpuTicks { total: 123456, idle: 100000 }]);
        // Against a zeroed baseline the formula reports the boot-long
        // average, which is a valid rate; what matters is the baseline
        // is in place for the next delta.
        tracker.apply(&[CpuTicks { total: 123456, idle: 100000 }]);
        assert_eq!(tracker.total(), 0.0);
    }
}
