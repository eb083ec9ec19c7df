//! Byte rendering for device output.
//!
//! Every mode except [`DisplayMode::Raw`] renders one group per byte, groups
//! separated by a single space, at most `width` groups per line, each line
//! terminated by `\n`.

use crate::domain::config::{DisplayMode, TimestampStyle};
use std::fmt::Write;
use std::time::Instant;

impl DisplayMode {
    /// Characters one byte occupies in this mode.
    pub fn group_width(&self) -> usize {
        match self {
            DisplayMode::Raw => 1,
            DisplayMode::Hex => 2,
            DisplayMode::Binary => 8,
            DisplayMode::Decimal => 3,
        }
    }

    fn push_group(&self, out: &mut String, byte: u8) {
        // Writing into a String cannot fail.
        let _ = match self {
            DisplayMode::Raw => write!(out, "{}", byte as char),
            DisplayMode::Hex => write!(out, "{:02x}", byte),
            DisplayMode::Binary => write!(out, "{:08b}", byte),
            DisplayMode::Decimal => write!(out, "{:>3}", byte),
        };
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DisplayMode::Raw => "raw",
            DisplayMode::Hex => "hex",
            DisplayMode::Binary => "binary",
            DisplayMode::Decimal => "decimal",
        }
    }
}

impl std::fmt::Display for DisplayMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Formatter selected once per session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteFormatter {
    mode: DisplayMode,
    width: usize,
}

impl ByteFormatter {
    /// A `width` of 0 disables wrapping.
    pub fn new(mode: DisplayMode, width: usize) -> Self {
        Self { mode, width }
    }

    pub fn mode(&self) -> DisplayMode {
        self.mode
    }

    pub fn format(&self, data: &[u8]) -> String {
        if data.is_empty() {
            return String::new();
        }

        if self.mode == DisplayMode::Raw {
            return String::from_utf8_lossy(data).into_owned();
        }

        let per_line = if self.width == 0 { data.len() } else { self.width };
        let mut out = String::with_capacity(data.len() * (self.mode.group_width() + 1));

        for line in data.chunks(per_line) {
            for (i, &byte) in line.iter().enumerate() {
                if i > 0 {
                    out.push(' ');
                }
                self.mode.push_group(&mut out, byte);
            }
            out.push('\n');
        }

        out
    }
}

/// Prepend `prefix` to every line of `text`. A final line without a newline
/// still gets the prefix.
pub fn prefix_lines(text: &str, prefix: &str) -> String {
    if prefix.is_empty() {
        return text.to_string();
    }

    let mut out = String::with_capacity(text.len() + prefix.len());
    for line in text.split_inclusive('\n') {
        out.push_str(prefix);
        out.push_str(line);
    }
    out
}

impl TimestampStyle {
    /// Line prefix for this style, `None` when timestamps are off.
    pub fn stamp(&self, started: Instant) -> Option<String> {
        match self {
            TimestampStyle::None => None,
            TimestampStyle::Unix => Some(format!("{} ", chrono::Utc::now().timestamp())),
            TimestampStyle::Date => Some(format!(
                "{} ",
                chrono::Local::now().format("%Y/%m/%d %H:%M:%S")
            )),
            TimestampStyle::Elapsed => {
                Some(format!("{:.2} ", started.elapsed().as_secs_f64()))
            }
        }
    }
}

/// Combined line prefix for `styles`: unix, then date, then elapsed, each
/// style at most once. `None` when no style produces a prefix.
pub fn stamp_prefix(styles: &[TimestampStyle], started: Instant) -> Option<String> {
    let mut styles = styles.to_vec();
    styles.sort();
    styles.dedup();

    let prefix: String = styles.iter().filter_map(|style| style.stamp(started)).collect();
    if prefix.is_empty() {
        None
    } else {
        Some(prefix)
    }
}
