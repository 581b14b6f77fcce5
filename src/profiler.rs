//! Lightweight timing of tick phases.
//!
//! `SimWorld` times each of its phases (`refresh_sections`, `structures`,
//! `units`, `players`) when `SimConfig::profile` is set, which is the
//! default under the `profile` feature:
//! ```bash
//! cargo test --release --features profile
//! ```

use std::collections::HashMap;
use std::time::{Duration, Instant};
use tracing::info;

/// Collects timing data for named sections and provides aggregated
/// statistics.
#[derive(Debug, Default)]
pub struct Profiler {
    sections: HashMap<&'static str, SectionStats>,
    /// Sections in first-seen order, for stable summaries.
    order: Vec<&'static str>,
    current_section: Option<(&'static str, Instant)>,
    tick_count: u64,
}

/// Statistics for a profiled section
#[derive(Debug, Default, Clone)]
pub struct SectionStats {
    pub total_time: Duration,
    pub call_count: u64,
    pub min_time: Option<Duration>,
    pub max_time: Option<Duration>,
}

impl SectionStats {
    pub fn avg_time(&self) -> Duration {
        if self.call_count == 0 {
            Duration::ZERO
        } else {
            self.total_time / self.call_count as u32
        }
    }

    fn record(&mut self, elapsed: Duration) {
        self.total_time += elapsed;
        self.call_count += 1;
        self.min_time = Some(self.min_time.map_or(elapsed, |m| m.min(elapsed)));
        self.max_time = Some(self.max_time.map_or(elapsed, |m| m.max(elapsed)));
    }
}

impl Profiler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start timing a named section.
    /// Call `end_section` to stop timing.
    pub fn begin_section(&mut self, name: &'static str) {
        self.current_section = Some((name, Instant::now()));
    }

    /// End the current section and record its duration.
    pub fn end_section(&mut self) {
        if let Some((name, start)) = self.current_section.take() {
            let elapsed = start.elapsed();
            if !self.sections.contains_key(name) {
                self.order.push(name);
            }
            self.sections.entry(name).or_default().record(elapsed);
        }
    }

    /// Time a section using a closure.
    pub fn time_section<F, R>(&mut self, name: &'static str, f: F) -> R
    where
        F: FnOnce() -> R,
    {
        self.begin_section(name);
        let result = f();
        self.end_section();
        result
    }

    pub fn tick(&mut self) {
        self.tick_count += 1;
    }

    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    pub fn get_section(&self, name: &str) -> Option<&SectionStats> {
        self.sections.get(name)
    }

    /// Section names in the order they were first timed.
    pub fn section_names(&self) -> &[&'static str] {
        &self.order
    }

    /// Emit one `info` event per section plus a total.
    pub fn log_summary(&self) {
        let total: Duration = self.sections.values().map(|s| s.total_time).sum();
        for name in &self.order {
            let Some(stats) = self.sections.get(name) else {
                continue;
            };
            let share = if total.is_zero() {
                0.0
            } else {
                stats.total_time.as_secs_f64() / total.as_secs_f64() * 100.0
            };
            info!(
                section = *name,
                calls = stats.call_count,
                avg_us = stats.avg_time().as_micros() as u64,
                min_us = stats.min_time.unwrap_or_default().as_micros() as u64,
                max_us = stats.max_time.unwrap_or_default().as_micros() as u64,
                share = format_args!("{share:.1}%"),
                "phase timing"
            );
        }
        if self.tick_count > 0 {
            let avg_tick = total / self.tick_count as u32;
            info!(
                ticks = self.tick_count,
                avg_tick_us = avg_tick.as_micros() as u64,
                "profile total"
            );
        }
    }

    /// Reset all profiling data.
    pub fn reset(&mut self) {
        self.sections.clear();
        self.order.clear();
        self.current_section = None;
        self.tick_count = 0;
    }
}
