//! Entry filters
//!
//! A filter is built once from user input, owned by the pipeline for the
//! stream's lifetime, and evaluated as a pure predicate per entry. Each
//! platform has its own filter type: the process and custom variants only
//! exist for Android, so requesting them for the simulator is a construction
//! error in the calling layer rather than something a predicate can reach.

use std::collections::HashMap;

use regex::Regex;

use devtail_types::{AndroidPriority, Entry, IosPriority, PriorityLevel};

use crate::error::FilterError;

/// Predicate over a structured entry. Pure: no side effects, no mutation.
pub trait EntryFilter {
    type Priority: PriorityLevel;

    fn should_include(&self, entry: &Entry<Self::Priority>) -> bool;
}

/// Parse one `tag:priority` custom pattern, strict on the severity token.
fn parse_custom_pattern(pattern: &str) -> Result<(String, AndroidPriority), FilterError> {
    let invalid = |reason: &str| FilterError::InvalidPattern {
        pattern: pattern.to_string(),
        reason: reason.to_string(),
    };

    let (tag, level) = pattern
        .split_once(':')
        .ok_or_else(|| invalid("expected <tag>:<priority>"))?;
    if tag.is_empty() {
        return Err(invalid("empty tag"));
    }

    let mut chars = level.chars();
    let priority = match (chars.next(), chars.next()) {
        (Some(letter), None) => AndroidPriority::try_from_letter(letter),
        (Some(_), Some(_)) => AndroidPriority::try_from_name(level),
        (None, _) => None,
    }
    .ok_or_else(|| invalid(&format!("unknown priority '{level}'")))?;

    Ok((tag.to_string(), priority))
}

// ============================================================================
// Android
// ============================================================================

/// Filter over logcat entries.
#[derive(Clone, Debug)]
pub enum AndroidFilter {
    /// Everything at or above the threshold.
    All { min: AndroidPriority },

    /// Threshold plus an exact-tag allowlist.
    ByTag {
        min: AndroidPriority,
        tags: Vec<String>,
    },

    /// Threshold plus a process id equality check. The pid comes from an
    /// external app-id lookup performed before construction.
    ByProcess { min: AndroidPriority, pid: i32 },

    /// Threshold plus at least one regex hit on the primary message line.
    ByMatch {
        min: AndroidPriority,
        regexes: Vec<Regex>,
    },

    /// Per-tag thresholds with a `*` wildcard. A `SILENT` threshold
    /// suppresses its tag entirely since no real entry reaches it.
    Custom {
        thresholds: HashMap<String, AndroidPriority>,
    },
}

impl AndroidFilter {
    pub fn all(min: AndroidPriority) -> Self {
        Self::All { min }
    }

    pub fn by_tag(min: AndroidPriority, tags: Vec<String>) -> Self {
        Self::ByTag { min, tags }
    }

    pub fn by_process(min: AndroidPriority, pid: i32) -> Self {
        Self::ByProcess { min, pid }
    }

    /// Compile the match patterns; a bad pattern fails construction.
    pub fn by_match(min: AndroidPriority, patterns: &[String]) -> Result<Self, FilterError> {
        let regexes = patterns
            .iter()
            .map(|p| Regex::new(p))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::ByMatch { min, regexes })
    }

    /// Build the per-tag threshold map from `tag:priority` patterns.
    pub fn custom(patterns: &[String]) -> Result<Self, FilterError> {
        let mut thresholds = HashMap::new();
        for pattern in patterns {
            let (tag, priority) = parse_custom_pattern(pattern)?;
            thresholds.insert(tag, priority);
        }
        Ok(Self::Custom { thresholds })
    }
}

impl EntryFilter for AndroidFilter {
    type Priority = AndroidPriority;

    fn should_include(&self, entry: &Entry<AndroidPriority>) -> bool {
        match self {
            Self::All { min } => entry.priority >= *min,
            Self::ByTag { min, tags } => {
                entry.priority >= *min
                    && entry
                        .tag
                        .as_deref()
                        .is_some_and(|tag| tags.iter().any(|t| t == tag))
            }
            Self::ByProcess { min, pid } => entry.priority >= *min && entry.pid == *pid,
            Self::ByMatch { min, regexes } => {
                entry.priority >= *min && regexes.iter().any(|r| r.is_match(entry.message()))
            }
            Self::Custom { thresholds } => {
                // The tag-specific and wildcard checks are ORed, not
                // cascaded; with neither listed, everything passes.
                let for_tag = entry.tag.as_deref().and_then(|t| thresholds.get(t));
                let wildcard = thresholds.get("*");
                match (for_tag, wildcard) {
                    (None, None) => true,
                    (for_tag, wildcard) => {
                        for_tag.is_some_and(|t| entry.priority >= *t)
                            || wildcard.is_some_and(|t| entry.priority >= *t)
                    }
                }
            }
        }
    }
}

// ============================================================================
// iOS
// ============================================================================

/// Filter over simulator entries. No process or custom variants here: the
/// pid lookup and the tag-threshold syntax are logcat facilities.
#[derive(Clone, Debug)]
pub enum IosFilter {
    All { min: IosPriority },
    ByTag { min: IosPriority, tags: Vec<String> },
    /// At least one regex must hit one of the coalesced message lines.
    ByMatch { min: IosPriority, regexes: Vec<Regex> },
}

impl IosFilter {
    pub fn all(min: IosPriority) -> Self {
        Self::All { min }
    }

    pub fn by_tag(min: IosPriority, tags: Vec<String>) -> Self {
        Self::ByTag { min, tags }
    }

    pub fn by_match(min: IosPriority, patterns: &[String]) -> Result<Self, FilterError> {
        let regexes = patterns
            .iter()
            .map(|p| Regex::new(p))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::ByMatch { min, regexes })
    }
}

impl EntryFilter for IosFilter {
    type Priority = IosPriority;

    fn should_include(&self, entry: &Entry<IosPriority>) -> bool {
        match self {
            Self::All { min } => entry.priority >= *min,
            Self::ByTag { min, tags } => {
                entry.priority >= *min
                    && entry
                        .tag
                        .as_deref()
                        .is_some_and(|tag| tags.iter().any(|t| t == tag))
            }
            Self::ByMatch { min, regexes } => {
                entry.priority >= *min
                    && regexes
                        .iter()
                        .any(|r| entry.messages.iter().any(|m| r.is_match(m)))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::{AndroidParser, EntryParser};

    fn fixture_entries() -> Vec<Entry<AndroidPriority>> {
        let chunk = "\
04-08 00:58:53.967 E/storaged(  934): getDiskStats failed with result NOT_SUPPORTED and size 0
04-08 01:10:54.261 I/chatty  ( 1383): uid=1000(system) ActivityManager expire 10 lines
04-08 01:10:54.990 V/chatty  ( 1383): uid=1000 system_server expire 3 lines
04-08 01:32:25.371 W/wificond(  935): No pno scan started
04-08 01:32:25.371 D/wificond(  935): Scheduled scan is not running!";
        AndroidParser::new().parse_chunk(chunk).expect("fixtures parse")
    }

    #[test]
    fn test_all_filter_applies_threshold() {
        let filter = AndroidFilter::all(AndroidPriority::Info);
        let included: Vec<_> = fixture_entries()
            .into_iter()
            .filter(|e| filter.should_include(e))
            .collect();
        // E, I, W survive; V and D fall below INFO.
        assert_eq!(included.len(), 3);
    }

    #[test]
    fn test_tag_filter_scenario() {
        let filter = AndroidFilter::by_tag(
            AndroidPriority::Verbose,
            vec!["storaged".to_string(), "wificond".to_string()],
        );
        let entries = fixture_entries();
        assert!(filter.should_include(&entries[0]));
        assert!(filter.should_include(&entries[3]));
        assert!(filter.should_include(&entries[4]));
        // chatty entries excluded regardless of priority.
        assert!(!filter.should_include(&entries[1]));
        assert!(!filter.should_include(&entries[2]));
    }

    #[test]
    fn test_process_filter_matches_pid() {
        let filter = AndroidFilter::by_process(AndroidPriority::Unknown, 1383);
        let included: Vec<_> = fixture_entries()
            .into_iter()
            .filter(|e| filter.should_include(e))
            .collect();
        assert_eq!(included.len(), 2);
        assert!(included.iter().all(|e| e.pid == 1383));
    }

    #[test]
    fn test_match_filter_scenario() {
        let filter =
            AndroidFilter::by_match(AndroidPriority::Verbose, &["scan".to_string()])
                .expect("valid regex");
        let included: Vec<_> = fixture_entries()
            .into_iter()
            .filter(|e| filter.should_include(e))
            .collect();
        assert_eq!(included.len(), 2);
        assert!(included.iter().all(|e| e.tag.as_deref() == Some("wificond")));
    }

    #[test]
    fn test_custom_filter_scenario() {
        // Silence everything, then re-open storaged at INFO.
        let filter =
            AndroidFilter::custom(&["*:S".to_string(), "storaged:I".to_string()])
                .expect("valid patterns");
        let included: Vec<_> = fixture_entries()
            .into_iter()
            .filter(|e| filter.should_include(e))
            .collect();
        assert_eq!(included.len(), 1);
        assert_eq!(included[0].tag.as_deref(), Some("storaged"));
        assert_eq!(included[0].priority, AndroidPriority::Error);
    }

    #[test]
    fn test_custom_filter_without_wildcard_passes_unlisted_tags() {
        let filter = AndroidFilter::custom(&["storaged:F".to_string()]).expect("valid");
        let entries = fixture_entries();
        // storaged ERROR is below the FATAL threshold.
        assert!(!filter.should_include(&entries[0]));
        // wificond has no listing and no wildcard applies.
        assert!(filter.should_include(&entries[3]));
    }

    #[test]
    fn test_custom_filter_wildcard_overrides_stricter_tag_threshold() {
        // storaged is listed at FATAL, but the permissive wildcard still
        // lets its ERROR entry through: the tag-specific and wildcard
        // checks are ORed, the tag listing does not take precedence.
        let filter = AndroidFilter::custom(&["*:V".to_string(), "storaged:F".to_string()])
            .expect("valid patterns");
        let entries = fixture_entries();
        assert_eq!(entries[0].priority, AndroidPriority::Error);
        assert!(filter.should_include(&entries[0]));
    }

    #[test]
    fn test_custom_filter_accepts_level_names() {
        let filter = AndroidFilter::custom(&["storaged:error".to_string()]).expect("valid");
        let entries = fixture_entries();
        assert!(filter.should_include(&entries[0]));
    }

    #[test]
    fn test_custom_filter_rejects_unknown_priority() {
        let err = AndroidFilter::custom(&["storaged:X".to_string()]).expect_err("invalid");
        assert!(matches!(err, FilterError::InvalidPattern { .. }));
    }

    #[test]
    fn test_custom_filter_rejects_malformed_pattern() {
        assert!(AndroidFilter::custom(&["storaged".to_string()]).is_err());
        assert!(AndroidFilter::custom(&[":I".to_string()]).is_err());
    }

    #[test]
    fn test_match_filter_rejects_bad_regex() {
        let err = AndroidFilter::by_match(AndroidPriority::Unknown, &["(".to_string()])
            .expect_err("invalid regex");
        assert!(matches!(err, FilterError::Regex(_)));
    }

    #[test]
    fn test_should_include_is_idempotent() {
        let filter = AndroidFilter::by_tag(AndroidPriority::Verbose, vec!["storaged".to_string()]);
        let entries = fixture_entries();
        let first = filter.should_include(&entries[0]);
        let second = filter.should_include(&entries[0]);
        assert_eq!(first, second);
        assert!(first);
    }

    #[test]
    fn test_ios_match_filter_checks_every_line() {
        use devtail_types::Platform;
        let entry = Entry {
            timestamp: chrono::Local::now(),
            pid: 52389,
            priority: IosPriority::Default,
            tag: Some("testApp".to_string()),
            app_id: None,
            messages: vec!["first line".to_string(), "needle here".to_string()],
            platform: Platform::Ios,
        };
        let filter = IosFilter::by_match(IosPriority::Debug, &["needle".to_string()])
            .expect("valid regex");
        assert!(filter.should_include(&entry));
    }

    #[test]
    fn test_ios_tag_filter_requires_tag() {
        use devtail_types::Platform;
        let mut entry = Entry {
            timestamp: chrono::Local::now(),
            pid: 1,
            priority: IosPriority::Error,
            tag: None,
            app_id: Some("com.example".to_string()),
            messages: vec!["m".to_string()],
            platform: Platform::Ios,
        };
        let filter = IosFilter::by_tag(IosPriority::Debug, vec!["com.example".to_string()]);
        assert!(!filter.should_include(&entry));
        entry.tag = Some("com.example".to_string());
        assert!(filter.should_include(&entry));
    }
}
