//! Parsers for the two device log formats
//!
//! Both parsers follow the same two-stage contract: `split_messages` cuts a
//! raw chunk into groups at timestamp boundaries, `parse_messages` decodes
//! each group and coalesces continuation lines into multi-line entries.
//! Neither stage keeps state across chunks, so a logical record split across
//! two chunk reads stays split (matches the behavior of the tools we tail).

use chrono::{DateTime, Datelike, Local, NaiveDate, NaiveDateTime, TimeZone, Timelike};
use regex::Regex;

use devtail_types::{AndroidPriority, Entry, IosPriority, Platform, PriorityLevel};

use crate::error::ParseError;

/// Turns raw text chunks into an ordered sequence of structured entries.
pub trait EntryParser {
    type Priority: PriorityLevel;

    fn platform(&self) -> Platform;

    /// Cut a chunk into message groups, one per timestamp occurrence. Each
    /// group spans from its timestamp up to (not including) the next one.
    /// A chunk with no timestamp anywhere yields no groups.
    fn split_messages(&self, raw: &str) -> Vec<String>;

    /// Decode message groups into entries, coalescing continuation lines
    /// that repeat the previous group's header.
    fn parse_messages(&self, groups: &[String]) -> Result<Vec<Entry<Self::Priority>>, ParseError>;

    /// Split and parse one chunk. An empty chunk is a recoverable error;
    /// a non-empty chunk without any timestamp yields zero entries.
    fn parse_chunk(&self, raw: &str) -> Result<Vec<Entry<Self::Priority>>, ParseError> {
        if raw.is_empty() {
            return Err(ParseError::EmptyChunk);
        }
        let groups = self.split_messages(raw);
        if groups.is_empty() {
            tracing::debug!(platform = %self.platform(), "chunk without timestamp dropped");
            return Ok(Vec::new());
        }
        self.parse_messages(&groups)
    }
}

/// Cut `raw` at every match of `time`, keeping each timestamp header with
/// everything up to the next one.
fn split_at_timestamps(time: &Regex, raw: &str) -> Vec<String> {
    let starts: Vec<usize> = time.find_iter(raw).map(|m| m.start()).collect();
    starts
        .iter()
        .enumerate()
        .map(|(i, &start)| {
            let end = starts.get(i + 1).copied().unwrap_or(raw.len());
            raw[start..end].to_string()
        })
        .collect()
}

/// Resolve a wall-clock timestamp, falling back to now for impossible dates.
fn local_timestamp(year: i32, month: u32, day: u32, hour: u32, min: u32, sec: u32) -> DateTime<Local> {
    NaiveDate::from_ymd_opt(year, month, day)
        .and_then(|d| d.and_hms_opt(hour, min, sec))
        .and_then(|dt| Local.from_local_datetime(&dt).earliest())
        .unwrap_or_else(Local::now)
}

fn snippet(group: &str) -> String {
    group.chars().take(80).collect()
}

// ============================================================================
// Android (logcat `-v time,process,tag`)
// ============================================================================

/// Parser for logcat's terse time format:
/// `04-08 00:58:53.967 E/storaged(  934): getDiskStats failed`.
pub struct AndroidParser {
    time: Regex,
    header: Regex,
}

impl AndroidParser {
    pub fn new() -> Self {
        Self {
            // No year in the source format; anchored to the current year at
            // parse time. Millisecond part is matched but not retained.
            time: Regex::new(r"(\d{2})-(\d{2}) (\d{2}):(\d{2}):(\d{2})\.\d{3}")
                .expect("static regex"),
            header: Regex::new(r"^\s*(\w)/(.+)\(([\s\d]+)\):")
                .expect("static regex"),
        }
    }
}

impl Default for AndroidParser {
    fn default() -> Self {
        Self::new()
    }
}

impl EntryParser for AndroidParser {
    type Priority = AndroidPriority;

    fn platform(&self) -> Platform {
        Platform::Android
    }

    fn split_messages(&self, raw: &str) -> Vec<String> {
        split_at_timestamps(&self.time, raw)
    }

    fn parse_messages(&self, groups: &[String]) -> Result<Vec<Entry<AndroidPriority>>, ParseError> {
        let mut entries: Vec<Entry<AndroidPriority>> = Vec::new();

        for group in groups {
            let caps = self
                .time
                .captures(group)
                .ok_or_else(|| ParseError::MissingTimestamp(snippet(group)))?;
            let time_end = caps.get(0).map_or(0, |m| m.end());

            let timestamp = local_timestamp(
                Local::now().year(),
                caps[1].parse().unwrap_or(1),
                caps[2].parse().unwrap_or(1),
                caps[3].parse().unwrap_or(0),
                caps[4].parse().unwrap_or(0),
                caps[5].parse().unwrap_or(0),
            );

            let rest = &group[time_end..];
            let (priority, tag, pid, header_end) = match self.header.captures(rest) {
                Some(h) => (
                    AndroidPriority::from_letter(h[1].chars().next().unwrap_or('U')),
                    h[2].trim().to_string(),
                    h[3].trim().parse().unwrap_or(0),
                    h.get(0).map_or(0, |m| m.end()),
                ),
                None => {
                    // Malformed header; keep the line visible with defaults.
                    tracing::debug!(group = %snippet(group), "header fallback");
                    (AndroidPriority::Unknown, String::new(), 0, 0)
                }
            };
            let tag = if tag.is_empty() {
                "unknown".to_string()
            } else {
                tag
            };
            let body = rest[header_end..].trim().to_string();

            match entries.last_mut() {
                Some(prev)
                    if prev.timestamp == timestamp
                        && prev.tag.as_deref() == Some(tag.as_str())
                        && prev.pid == pid
                        && prev.priority == priority =>
                {
                    prev.messages.push(body);
                }
                _ => entries.push(Entry {
                    timestamp,
                    pid,
                    priority,
                    tag: Some(tag),
                    app_id: None,
                    messages: vec![body],
                    platform: Platform::Android,
                }),
            }
        }

        Ok(entries)
    }
}

// ============================================================================
// iOS (simulator `log stream --type log`)
// ============================================================================

/// Parser for the simulator unified log line format:
/// `2019-04-09 16:37:15.464004+0200 0xf3e23 Default 0x0 52389 0 testApp: ...`.
pub struct IosParser {
    time: Regex,
    header: Regex,
}

impl IosParser {
    pub fn new() -> Self {
        Self {
            // Offset is optional: some tool versions omit it. Sub-seconds
            // are matched in full and zeroed after parsing.
            time: Regex::new(r"\d{4}-\d{2}-\d{2}\s\d{2}:\d{2}:\d{2}\.\d+(?:[+-]\d{4})?")
                .expect("static regex"),
            // thread id, level name, activity id, pid, ttl, then the
            // app/subsystem token up to the first colon.
            header: Regex::new(r"^\s+[a-z0-9]+\s+(\w+)\s+[a-z0-9]+\s+(\d+)\s+\d+\s+([^:]+):")
                .expect("static regex"),
        }
    }

    /// Parse the matched timestamp text, discarding sub-second precision.
    fn parse_timestamp(text: &str) -> DateTime<Local> {
        let parsed = DateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S%.f%z")
            .map(|dt| dt.with_timezone(&Local))
            .or_else(|_| {
                NaiveDateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S%.f")
                    .map(|dt| Local.from_local_datetime(&dt).earliest().unwrap_or_else(Local::now))
            })
            .unwrap_or_else(|_| Local::now());
        parsed.with_nanosecond(0).unwrap_or(parsed)
    }
}

impl Default for IosParser {
    fn default() -> Self {
        Self::new()
    }
}

impl EntryParser for IosParser {
    type Priority = IosPriority;

    fn platform(&self) -> Platform {
        Platform::Ios
    }

    fn split_messages(&self, raw: &str) -> Vec<String> {
        split_at_timestamps(&self.time, raw)
    }

    fn parse_messages(&self, groups: &[String]) -> Result<Vec<Entry<IosPriority>>, ParseError> {
        let mut entries: Vec<Entry<IosPriority>> = Vec::new();

        for group in groups {
            let time_match = self
                .time
                .find(group)
                .ok_or_else(|| ParseError::MissingTimestamp(snippet(group)))?;
            let timestamp = Self::parse_timestamp(time_match.as_str());

            let rest = &group[time_match.end()..];
            let (priority, pid, tag, header_end) = match self.header.captures(rest) {
                Some(h) => (
                    IosPriority::from_name(&h[1]),
                    h[2].trim().parse().unwrap_or(0),
                    h[3].to_string(),
                    h.get(0).map_or(0, |m| m.end()),
                ),
                None => {
                    tracing::debug!(group = %snippet(group), "header fallback");
                    (IosPriority::Default, 0, "unknown".to_string(), 0)
                }
            };
            let body = rest[header_end..].trim().to_string();

            // The unified log never carries a separate app id, so the
            // coalescing key degenerates to timestamp/pid/priority here.
            match entries.last_mut() {
                Some(prev)
                    if prev.timestamp == timestamp
                        && prev.app_id.is_none()
                        && prev.pid == pid
                        && prev.priority == priority =>
                {
                    prev.messages.push(body);
                }
                _ => entries.push(Entry {
                    timestamp,
                    pid,
                    priority,
                    tag: Some(tag),
                    app_id: None,
                    messages: vec![body],
                    platform: Platform::Ios,
                }),
            }
        }

        Ok(entries)
    }
}
