//! Resource log (CSV) parsing.
//!
//! Each line is one sample of process and host counters:
//!
//! ```text
//! time,cause,java_user,java_sys,vsz,rss,user,nice,sys,idle,iowait,irq,softirq,steal,guest,
//! sync_park,safepoint_time,safepoints,live_threads[,archive]
//! ```
//!
//! Counters are cumulative, so usage is only meaningful between two
//! consecutive samples; see [`ResourceDelta`].

use crate::utils::config::{LOG_FIELDS, LOG_FIELDS_WITH_ARCHIVE};
use crate::utils::error::LogParseError;
use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Why the agent wrote a log line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LogCause {
    /// Resource exhaustion
    Exhausted,
    Signal,
    Interval,
    Deadlock,
    Illegal,
}

impl From<i32> for LogCause {
    fn from(code: i32) -> Self {
        match code {
            1 => LogCause::Exhausted,
            2 => LogCause::Signal,
            3 => LogCause::Interval,
            4 => LogCause::Deadlock,
            _ => LogCause::Illegal,
        }
    }
}

/// Cumulative host CPU time per category, in clock ticks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CpuTimes {
    pub user: u64,
    pub nice: u64,
    pub sys: u64,
    pub idle: u64,
    pub iowait: u64,
    pub irq: u64,
    pub softirq: u64,
    pub steal: u64,
    pub guest: u64,
}

impl CpuTimes {
    fn as_array(&self) -> [u64; 9] {
        [
            self.user,
            self.nice,
            self.sys,
            self.idle,
            self.iowait,
            self.irq,
            self.softirq,
            self.steal,
            self.guest,
        ]
    }
}

/// One parsed resource log line
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogRecord {
    /// Sample time in epoch milliseconds
    pub timestamp: i64,
    pub cause: LogCause,
    pub java_user_time: u64,
    pub java_sys_time: u64,
    /// Virtual memory size in bytes
    pub java_vsz: u64,
    /// Resident set size in bytes
    pub java_rss: u64,
    pub system: CpuTimes,
    pub jvm_sync_park: i64,
    pub jvm_safepoint_time: i64,
    pub jvm_safepoints: i64,
    pub jvm_live_threads: i64,
    /// Snapshot archive written with this sample, relative paths resolved
    /// against the log's directory
    #[serde(skip_serializing_if = "Option::is_none")]
    pub archive_path: Option<PathBuf>,
}

impl LogRecord {
    /// Parse one CSV line
    ///
    /// # Errors
    /// * `LogParseError::FieldCount` - Not 19 or 20 fields
    /// * `LogParseError::InvalidNumber` - A numeric field does not parse
    pub fn parse_csv(line: &str, logdir: &Path) -> Result<Self, LogParseError> {
        let fields: Vec<&str> = line.trim_end().split(',').collect();
        if fields.len() != LOG_FIELDS && fields.len() != LOG_FIELDS_WITH_ARCHIVE {
            return Err(LogParseError::FieldCount(fields.len()));
        }

        let system = CpuTimes {
            user: field(&fields, 6)?,
            nice: field(&fields, 7)?,
            sys: field(&fields, 8)?,
            idle: field(&fields, 9)?,
            iowait: field(&fields, 10)?,
            irq: field(&fields, 11)?,
            softirq: field(&fields, 12)?,
            steal: field(&fields, 13)?,
            guest: field(&fields, 14)?,
        };

        Ok(Self {
            timestamp: field(&fields, 0)?,
            cause: field::<i32>(&fields, 1)?.into(),
            java_user_time: field(&fields, 2)?,
            java_sys_time: field(&fields, 3)?,
            java_vsz: field(&fields, 4)?,
            java_rss: field(&fields, 5)?,
            system,
            jvm_sync_park: field(&fields, 15)?,
            jvm_safepoint_time: field(&fields, 16)?,
            jvm_safepoints: field(&fields, 17)?,
            jvm_live_threads: field(&fields, 18)?,
            archive_path: fields.get(19).map(|archive| logdir.join(archive.trim())),
        })
    }

    pub fn date_time(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp_millis(self.timestamp)
    }
}

fn field<T: FromStr>(fields: &[&str], index: usize) -> Result<T, LogParseError> {
    let value = fields[index].trim();
    value.parse().map_err(|_| LogParseError::InvalidNumber {
        index,
        value: value.to_string(),
    })
}

/// Parse every well-formed line of one log file
///
/// Malformed lines are logged and skipped.
///
/// # Errors
/// Returns `LogParseError::Io` if the file cannot be read
pub fn read_log_file(path: &Path) -> Result<Vec<LogRecord>, LogParseError> {
    let content = fs::read_to_string(path)?;
    let logdir = path.parent().unwrap_or_else(|| Path::new(""));

    let mut records = Vec::new();
    for (number, line) in content.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        match LogRecord::parse_csv(line, logdir) {
            Ok(record) => records.push(record),
            // Log but don't fail - a partially written line must not hide the rest
            Err(e) => warn!("{}:{}: skipping malformed line: {}", path.display(), number + 1, e),
        }
    }

    debug!("{}: {} log records", path.display(), records.len());
    Ok(records)
}

/// Parse several log files into one time-ordered sequence
pub fn read_log_files<P: AsRef<Path>>(paths: &[P]) -> Result<Vec<LogRecord>, LogParseError> {
    let mut records = Vec::new();
    for path in paths {
        records.extend(read_log_file(path.as_ref())?);
    }

    records.sort_by_key(|r| r.timestamp);

    info!("Read {} log records from {} files", records.len(), paths.len());
    Ok(records)
}

/// Host CPU usage per category, in percent of all host CPU time
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct CpuUsage {
    pub user: f64,
    pub nice: f64,
    pub sys: f64,
    pub idle: f64,
    pub iowait: f64,
    pub irq: f64,
    pub softirq: f64,
    pub steal: f64,
    pub guest: f64,
}

impl CpuUsage {
    /// Busy percentage: every category except idle
    pub fn total(&self) -> f64 {
        self.user + self.nice + self.sys + self.iowait + self.irq + self.softirq + self.steal + self.guest
    }
}

/// Usage between two consecutive log records
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceDelta {
    /// Time of the later record
    pub timestamp: i64,
    /// Share of the process's CPU time spent in user mode
    pub java_user_usage: f64,
    pub java_sys_usage: f64,
    pub cpu: CpuUsage,
    pub jvm_sync_park: i64,
    pub jvm_safepoint_time: i64,
    pub jvm_safepoints: i64,
    /// A counter went backwards or no host time elapsed; every usage value
    /// above is zeroed
    pub suspect: bool,
}

impl ResourceDelta {
    /// Compute usage between `prev` and `cur`
    pub fn between(prev: &LogRecord, cur: &LogRecord) -> Self {
        let java_user = counter_delta(prev.java_user_time, cur.java_user_time);
        let java_sys = counter_delta(prev.java_sys_time, cur.java_sys_time);
        let java_total = java_user + java_sys;

        let prev_sys = prev.system.as_array();
        let cur_sys = cur.system.as_array();
        let mut sys = [0i128; 9];
        for (i, d) in sys.iter_mut().enumerate() {
            *d = counter_delta(prev_sys[i], cur_sys[i]);
        }
        let sys_total: i128 = sys.iter().sum();

        let jvm_sync_park = cur.jvm_sync_park.wrapping_sub(prev.jvm_sync_park);
        let jvm_safepoint_time = cur.jvm_safepoint_time.wrapping_sub(prev.jvm_safepoint_time);
        let jvm_safepoints = cur.jvm_safepoints.wrapping_sub(prev.jvm_safepoints);

        let went_backwards = java_user < 0
            || java_sys < 0
            || sys.iter().any(|&d| d < 0)
            || jvm_sync_park < 0
            || jvm_safepoint_time < 0
            || jvm_safepoints < 0;
        let suspect = went_backwards || sys_total == 0;

        if suspect {
            debug!("Suspect resource sample at {} (counter reset or no elapsed time)", cur.timestamp);
            return Self {
                timestamp: cur.timestamp,
                java_user_usage: 0.0,
                java_sys_usage: 0.0,
                cpu: CpuUsage::default(),
                jvm_sync_park: 0,
                jvm_safepoint_time: 0,
                jvm_safepoints: 0,
                suspect: true,
            };
        }

        let pct = |d: i128| percentage(d, sys_total);
        Self {
            timestamp: cur.timestamp,
            java_user_usage: percentage(java_user, java_total),
            java_sys_usage: percentage(java_sys, java_total),
            cpu: CpuUsage {
                user: pct(sys[0]),
                nice: pct(sys[1]),
                sys: pct(sys[2]),
                idle: pct(sys[3]),
                iowait: pct(sys[4]),
                irq: pct(sys[5]),
                softirq: pct(sys[6]),
                steal: pct(sys[7]),
                guest: pct(sys[8]),
            },
            jvm_sync_park,
            jvm_safepoint_time,
            jvm_safepoints,
            suspect: false,
        }
    }
}

fn counter_delta(prev: u64, cur: u64) -> i128 {
    i128::from(cur) - i128::from(prev)
}

/// `part / total * 100`, or 0 when nothing elapsed
fn percentage(part: i128, total: i128) -> f64 {
    if total == 0 {
        return 0.0;
    }
    part as f64 / total as f64 * 100.0
}

/// Deltas for every consecutive pair of (time-ordered) records
pub fn resource_deltas(records: &[LogRecord]) -> Vec<ResourceDelta> {
    records
        .windows(2)
        .map(|pair| ResourceDelta::between(&pair[0], &pair[1]))
        .collect()
}
