//! Shared types for devtail
//!
//! This crate contains the data structures used across the devtail crates:
//! the per-platform priority models, the structured log entry, and the
//! platform tag that ties a parser/filter pair together.

use std::fmt;
use std::hash::Hash;

use chrono::{DateTime, Local};

// ============================================================================
// Platform
// ============================================================================

/// Which device-logging tool an entry came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Platform {
    Android,
    Ios,
}

impl Platform {
    /// Stderr text that indicates the log source cannot stream at all.
    ///
    /// The simulator log tool prints this when no simulator is running;
    /// logcat has no equivalent single-line marker.
    pub fn fatal_stderr_marker(self) -> Option<&'static str> {
        match self {
            Self::Android => None,
            Self::Ios => Some("No devices are booted."),
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Android => "android",
            Self::Ios => "ios",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

// ============================================================================
// Priority models
// ============================================================================

/// Rendering hint derived from a priority level.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Emphasis {
    Plain,
    Dim,
    Warning,
    Error,
}

/// One platform's ordinal severity scale.
///
/// The two implementations are deliberately distinct types: an ordinal from
/// one platform has no meaning under the other's scale, and keeping them
/// apart makes a cross-platform comparison a compile error.
pub trait PriorityLevel:
    Copy + Clone + PartialEq + Eq + PartialOrd + Ord + Hash + fmt::Debug + Send + Sync + 'static
{
    /// Level used when a severity token cannot be decoded.
    const DEFAULT: Self;

    /// Least severe level; the default filter threshold.
    const LOWEST: Self;

    /// Strict single-letter lookup: the first level whose canonical name
    /// starts with the letter, case-insensitive. `None` on no match.
    fn try_from_letter(letter: char) -> Option<Self>;

    /// Strict case-insensitive exact-name lookup.
    fn try_from_name(name: &str) -> Option<Self>;

    /// Canonical upper-case name.
    fn name(self) -> &'static str;

    fn emphasis(self) -> Emphasis;

    /// Lenient letter lookup, falling back to [`PriorityLevel::DEFAULT`].
    fn from_letter(letter: char) -> Self {
        Self::try_from_letter(letter).unwrap_or(Self::DEFAULT)
    }

    /// Lenient name lookup, falling back to [`PriorityLevel::DEFAULT`].
    fn from_name(name: &str) -> Self {
        Self::try_from_name(name).unwrap_or(Self::DEFAULT)
    }

    /// First letter of the canonical name.
    fn letter(self) -> char {
        // Names are static upper-case ASCII, so next() always yields.
        self.name().chars().next().unwrap_or('?')
    }
}

/// Android logcat severity scale, least to most severe.
///
/// `Silent` sits one above the top real severity and only ever appears as a
/// custom-filter threshold; no parsed entry carries it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum AndroidPriority {
    Unknown,
    Verbose,
    Debug,
    Info,
    Warn,
    Error,
    Fatal,
    Silent,
}

impl AndroidPriority {
    const ALL: [Self; 8] = [
        Self::Unknown,
        Self::Verbose,
        Self::Debug,
        Self::Info,
        Self::Warn,
        Self::Error,
        Self::Fatal,
        Self::Silent,
    ];
}

impl PriorityLevel for AndroidPriority {
    const DEFAULT: Self = Self::Unknown;
    const LOWEST: Self = Self::Unknown;

    fn try_from_letter(letter: char) -> Option<Self> {
        let letter = letter.to_ascii_uppercase();
        Self::ALL.into_iter().find(|p| p.letter() == letter)
    }

    fn try_from_name(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|p| p.name().eq_ignore_ascii_case(name))
    }

    fn name(self) -> &'static str {
        match self {
            Self::Unknown => "UNKNOWN",
            Self::Verbose => "VERBOSE",
            Self::Debug => "DEBUG",
            Self::Info => "INFO",
            Self::Warn => "WARN",
            Self::Error => "ERROR",
            Self::Fatal => "FATAL",
            Self::Silent => "SILENT",
        }
    }

    fn emphasis(self) -> Emphasis {
        match self {
            Self::Error | Self::Fatal => Emphasis::Error,
            Self::Warn => Emphasis::Warning,
            Self::Verbose => Emphasis::Dim,
            _ => Emphasis::Plain,
        }
    }
}

/// Simulator unified-log severity scale, least to most severe.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum IosPriority {
    Debug,
    Default,
    Info,
    Error,
}

impl IosPriority {
    const ALL: [Self; 4] = [Self::Debug, Self::Default, Self::Info, Self::Error];
}

impl PriorityLevel for IosPriority {
    const DEFAULT: Self = Self::Default;
    const LOWEST: Self = Self::Debug;

    fn try_from_letter(letter: char) -> Option<Self> {
        let letter = letter.to_ascii_uppercase();
        // Debug and Default share a first letter; declaration order wins.
        Self::ALL.into_iter().find(|p| p.letter() == letter)
    }

    fn try_from_name(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|p| p.name().eq_ignore_ascii_case(name))
    }

    fn name(self) -> &'static str {
        match self {
            Self::Debug => "DEBUG",
            Self::Default => "DEFAULT",
            Self::Info => "INFO",
            Self::Error => "ERROR",
        }
    }

    fn emphasis(self) -> Emphasis {
        match self {
            Self::Error => Emphasis::Error,
            Self::Debug => Emphasis::Dim,
            _ => Emphasis::Plain,
        }
    }
}

// ============================================================================
// Log entry
// ============================================================================

/// One reconstructed, possibly multi-line, log record.
#[derive(Clone, Debug, PartialEq)]
pub struct Entry<P> {
    /// Entry time; second resolution is what the rest of the system keys on.
    pub timestamp: DateTime<Local>,

    /// Originating process id; 0 when unresolvable.
    pub pid: i32,

    /// Severity on the producing platform's scale.
    pub priority: P,

    /// Short classifier; absent only for simulator entries.
    pub tag: Option<String>,

    /// Application identifier, display fallback when `tag` is absent.
    pub app_id: Option<String>,

    /// Message lines in insertion order; never empty. The first line is the
    /// primary message, the rest are coalesced continuations.
    pub messages: Vec<String>,

    /// Which parser produced this entry.
    pub platform: Platform,
}

impl<P> Entry<P> {
    /// Tag to show, falling back to the app id.
    pub fn display_tag(&self) -> &str {
        self.tag
            .as_deref()
            .or(self.app_id.as_deref())
            .unwrap_or("")
    }

    /// Primary message line.
    pub fn message(&self) -> &str {
        self.messages.first().map(String::as_str).unwrap_or("")
    }
}
