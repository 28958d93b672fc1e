//! Summary statistics over snapshot headers and resource logs.
//!
//! Both reductions use an accumulator with `accept`/`combine`, so rayon can
//! fold on separate workers and merge partial results in any order.

use crate::parser::resource_log::{LogRecord, ResourceDelta};
use crate::parser::schema::SnapShotHeader;
use crate::utils::config::BYTES_PER_MIB;
use crate::utils::error::AnalysisError;
use log::debug;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// One labelled line of a summary table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummaryEntry {
    pub category: String,
    pub value: String,
}

impl SummaryEntry {
    fn new(category: &str, value: String) -> Self {
        Self {
            category: category.to_string(),
            value,
        }
    }
}

/// Order-independent accumulator over snapshot headers
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct HeaderStatistics {
    pub count: u64,
    pub max_gc_time: u64,
    pub max_snapshot_size: u64,
    pub max_entry_count: u64,
    heap_sum: u128,
    instance_sum: u128,
}

impl HeaderStatistics {
    pub fn accept(&mut self, header: &SnapShotHeader) {
        self.count += 1;
        self.max_gc_time = self.max_gc_time.max(header.gc_time);
        self.max_snapshot_size = self.max_snapshot_size.max(header.snapshot_size);
        self.max_entry_count = self.max_entry_count.max(header.num_entries);
        self.heap_sum += u128::from(header.heap_usage());
        self.instance_sum += u128::from(header.num_instances);
    }

    pub fn combine(mut self, other: HeaderStatistics) -> Self {
        self.count += other.count;
        self.max_gc_time = self.max_gc_time.max(other.max_gc_time);
        self.max_snapshot_size = self.max_snapshot_size.max(other.max_snapshot_size);
        self.max_entry_count = self.max_entry_count.max(other.max_entry_count);
        self.heap_sum += other.heap_sum;
        self.instance_sum += other.instance_sum;
        self
    }

    pub fn average_heap_usage(&self) -> f64 {
        average(self.heap_sum as f64, self.count)
    }

    pub fn average_instances(&self) -> f64 {
        average(self.instance_sum as f64, self.count)
    }
}

/// Statistics over a range of snapshot headers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeaderSummary {
    pub count: u64,
    /// Full GCs between the first and last snapshot
    pub full_gc_count: i64,
    /// Young GCs between the first and last snapshot
    pub young_gc_count: i64,
    pub latest_heap_usage: u64,
    pub latest_metaspace_usage: u64,
    pub max_gc_time: u64,
    pub max_snapshot_size: u64,
    pub max_entry_count: u64,
    pub average_heap_usage: f64,
    pub average_instances: f64,
}

impl HeaderSummary {
    /// Human-readable rows
    pub fn entries(&self) -> Vec<SummaryEntry> {
        vec![
            SummaryEntry::new("SnapShot Count", self.count.to_string()),
            SummaryEntry::new(
                "GC Count",
                format!(
                    "{} (Full: {}, Young: {})",
                    self.full_gc_count + self.young_gc_count,
                    self.full_gc_count,
                    self.young_gc_count
                ),
            ),
            SummaryEntry::new("Latest Java heap usage", mib(self.latest_heap_usage as f64)),
            SummaryEntry::new("Latest Metaspace usage", mib(self.latest_metaspace_usage as f64)),
            SummaryEntry::new("Average Java heap usage", mib(self.average_heap_usage)),
            SummaryEntry::new("Average instances", format!("{:.1}", self.average_instances)),
            SummaryEntry::new("Max GCTime", format!("{} ms", self.max_gc_time)),
            SummaryEntry::new(
                "Max SnapShot size",
                format!("{:.1} KB", self.max_snapshot_size as f64 / 1024.0),
            ),
            SummaryEntry::new("Max entry count", self.max_entry_count.to_string()),
        ]
    }
}

/// Summarize a time-ordered header range
///
/// **Public** - main entry point for snapshot summaries
///
/// # Errors
/// Returns `AnalysisError::NoSnapshots` for an empty range
pub fn summarize_headers(headers: &[SnapShotHeader]) -> Result<HeaderSummary, AnalysisError> {
    let (Some(first), Some(last)) = (headers.first(), headers.last()) else {
        return Err(AnalysisError::NoSnapshots);
    };

    let stats = headers
        .par_iter()
        .fold(HeaderStatistics::default, |mut stats, header| {
            stats.accept(header);
            stats
        })
        .reduce(HeaderStatistics::default, HeaderStatistics::combine);

    debug!("Summarized {} snapshot headers", stats.count);

    Ok(HeaderSummary {
        count: stats.count,
        full_gc_count: signed_delta(first.full_count, last.full_count),
        young_gc_count: signed_delta(first.yng_count, last.yng_count),
        latest_heap_usage: last.heap_usage(),
        latest_metaspace_usage: last.metaspace_usage,
        max_gc_time: stats.max_gc_time,
        max_snapshot_size: stats.max_snapshot_size,
        max_entry_count: stats.max_entry_count,
        average_heap_usage: stats.average_heap_usage(),
        average_instances: stats.average_instances(),
    })
}

/// Order-independent accumulator over log records
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct LogStatistics {
    pub count: u64,
    pub max_vsz: u64,
    pub max_rss: u64,
    pub max_live_threads: i64,
    vsz_sum: u128,
    rss_sum: u128,
    thread_sum: i128,
}

impl LogStatistics {
    pub fn accept(&mut self, record: &LogRecord) {
        self.count += 1;
        self.max_vsz = self.max_vsz.max(record.java_vsz);
        self.max_rss = self.max_rss.max(record.java_rss);
        self.max_live_threads = self.max_live_threads.max(record.jvm_live_threads);
        self.vsz_sum += u128::from(record.java_vsz);
        self.rss_sum += u128::from(record.java_rss);
        self.thread_sum += i128::from(record.jvm_live_threads);
    }

    pub fn combine(mut self, other: LogStatistics) -> Self {
        self.count += other.count;
        self.max_vsz = self.max_vsz.max(other.max_vsz);
        self.max_rss = self.max_rss.max(other.max_rss);
        self.max_live_threads = self.max_live_threads.max(other.max_live_threads);
        self.vsz_sum += other.vsz_sum;
        self.rss_sum += other.rss_sum;
        self.thread_sum += other.thread_sum;
        self
    }
}

/// Statistics over a resource log range
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogSummary {
    /// Average host CPU busy percentage over non-suspect deltas
    pub average_cpu_usage: f64,
    pub max_cpu_usage: f64,
    pub average_vsz_mib: f64,
    pub max_vsz_mib: f64,
    pub average_rss_mib: f64,
    pub max_rss_mib: f64,
    pub average_live_threads: f64,
    pub max_live_threads: i64,
    /// Times of deltas where a counter went backwards (likely reboots)
    pub suspect_points: Vec<i64>,
}

impl LogSummary {
    pub fn entries(&self) -> Vec<SummaryEntry> {
        vec![
            SummaryEntry::new("Average CPU usage", format!("{:.1} %", self.average_cpu_usage)),
            SummaryEntry::new("Peak CPU usage", format!("{:.1} %", self.max_cpu_usage)),
            SummaryEntry::new("Average VSZ", format!("{:.1} MB", self.average_vsz_mib)),
            SummaryEntry::new("Peak VSZ", format!("{:.1} MB", self.max_vsz_mib)),
            SummaryEntry::new("Average RSS", format!("{:.1} MB", self.average_rss_mib)),
            SummaryEntry::new("Peak RSS", format!("{:.1} MB", self.max_rss_mib)),
            SummaryEntry::new("Average live threads", format!("{:.1}", self.average_live_threads)),
            SummaryEntry::new("Peak live threads", self.max_live_threads.to_string()),
            SummaryEntry::new("Suspected reboots", self.suspect_points.len().to_string()),
        ]
    }
}

/// Summarize log records and the deltas between them
///
/// Suspect deltas are excluded from the CPU average and maximum. An empty
/// range summarizes to zeros.
pub fn summarize_log(records: &[LogRecord], deltas: &[ResourceDelta]) -> LogSummary {
    let stats = records
        .par_iter()
        .fold(LogStatistics::default, |mut stats, record| {
            stats.accept(record);
            stats
        })
        .reduce(LogStatistics::default, LogStatistics::combine);

    let (mut cpu_sum, mut cpu_max, mut cpu_count) = (0.0f64, 0.0f64, 0u64);
    let mut suspect_points = Vec::new();
    for delta in deltas {
        if delta.suspect {
            suspect_points.push(delta.timestamp);
            continue;
        }
        let usage = delta.cpu.total();
        cpu_sum += usage;
        cpu_max = cpu_max.max(usage);
        cpu_count += 1;
    }

    debug!(
        "Summarized {} log records, {} deltas ({} suspect)",
        stats.count,
        deltas.len(),
        suspect_points.len()
    );

    LogSummary {
        average_cpu_usage: average(cpu_sum, cpu_count),
        max_cpu_usage: cpu_max,
        average_vsz_mib: average(stats.vsz_sum as f64, stats.count) / BYTES_PER_MIB,
        max_vsz_mib: stats.max_vsz as f64 / BYTES_PER_MIB,
        average_rss_mib: average(stats.rss_sum as f64, stats.count) / BYTES_PER_MIB,
        max_rss_mib: stats.max_rss as f64 / BYTES_PER_MIB,
        average_live_threads: average(stats.thread_sum as f64, stats.count),
        max_live_threads: stats.max_live_threads,
        suspect_points,
    }
}

fn average(sum: f64, count: u64) -> f64 {
    if count == 0 {
        0.0
    } else {
        sum / count as f64
    }
}

fn signed_delta(start: u64, end: u64) -> i64 {
    (i128::from(end) - i128::from(start)) as i64
}

fn mib(bytes: f64) -> String {
    format!("{:.1} MB", bytes / BYTES_PER_MIB)
}
