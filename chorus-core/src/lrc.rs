//! LRC timeline parsing and active-line resolution.
//!
//! The wire format is line-oriented: each line carries zero or more leading
//! `[mm:ss]` / `[mm:ss.xx]` / `[mm:ss.xxx]` tags followed by the lyric text.

use serde::{Deserialize, Serialize};

/// A single line of lyrics with its timestamp.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LyricLine {
    /// Seconds from track start.
    pub time: f64,
    /// The lyric text (never blank).
    pub text: String,
}

/// Parsed synchronized lyrics, sorted ascending by time.
///
/// Serializes as a plain array of lines, matching the relay JSON the client
/// consumes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timeline {
    lines: Vec<LyricLine>,
}

impl Timeline {
    /// Parse raw LRC text into a timeline.
    ///
    /// Lines without a recognizable leading tag are skipped, as are lines
    /// whose text is blank after stripping tags. A line with multiple leading
    /// tags is emitted once per tag. Never fails: malformed input just
    /// contributes nothing.
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        let mut lines = Vec::new();

        for line in raw.lines() {
            let mut rest = line;
            let mut times = Vec::new();

            // Consume every leading [mm:ss(.xx|.xxx)] tag
            while let Some(after_open) = rest.strip_prefix('[') {
                let Some(end) = after_open.find(']') else {
                    break;
                };
                let Some(time) = parse_timestamp(&after_open[..end]) else {
                    break;
                };
                times.push(time);
                rest = &after_open[end + 1..];
            }

            if times.is_empty() {
                continue;
            }

            let text = rest.trim();
            if text.is_empty() {
                continue;
            }

            for time in times {
                lines.push(LyricLine {
                    time,
                    text: text.to_string(),
                });
            }
        }

        // Stable sort: equal timestamps keep input order
        lines.sort_by(|a, b| a.time.total_cmp(&b.time));

        Self { lines }
    }

    /// Build a timeline from already-parsed lines, re-establishing the sort
    /// and non-blank invariants.
    #[must_use]
    pub fn from_lines(mut lines: Vec<LyricLine>) -> Self {
        lines.retain(|line| !line.text.trim().is_empty());
        lines.sort_by(|a, b| a.time.total_cmp(&b.time));
        Self { lines }
    }

    /// The index of the active line at `position` seconds: the largest `i`
    /// with `lines[i].time <= position`, or `None` when the clock is before
    /// the first line (or the timeline is empty).
    #[must_use]
    pub fn active_index(&self, position: f64) -> Option<usize> {
        // Binary search keeps every clock tick O(log n); a NaN position
        // compares false against every line and resolves to None.
        let upcoming = self.lines.partition_point(|line| line.time <= position);
        upcoming.checked_sub(1)
    }

    /// The active line itself, if any.
    #[must_use]
    pub fn active_line(&self, position: f64) -> Option<&LyricLine> {
        self.active_index(position).and_then(|i| self.lines.get(i))
    }

    #[must_use]
    pub fn lines(&self) -> &[LyricLine] {
        &self.lines
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

/// Display classification of a line relative to the active index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinePhase {
    /// Already sung; styled dimmed.
    Passed,
    /// Currently being sung.
    Active,
    /// Not yet reached.
    Upcoming,
}

impl LinePhase {
    /// Classify line `index` against the resolved `active` index. With no
    /// active line every line is upcoming.
    #[must_use]
    pub fn classify(index: usize, active: Option<usize>) -> Self {
        match active {
            Some(a) if index < a => Self::Passed,
            Some(a) if index == a => Self::Active,
            _ => Self::Upcoming,
        }
    }
}

/// Parse a tag body like `01:23`, `01:23.45`, or `01:23.456` into seconds.
///
/// Minutes and seconds are exactly two digits; the fraction is 2-3 digits,
/// with a 2-digit fraction right-padded to milliseconds (`.45` == `.450`).
fn parse_timestamp(tag: &str) -> Option<f64> {
    let (minutes, rest) = tag.split_once(':')?;
    if !is_two_digits(minutes) {
        return None;
    }

    let (seconds, fraction) = match rest.split_once('.') {
        Some((sec, frac)) => (sec, Some(frac)),
        None => (rest, None),
    };
    if !is_two_digits(seconds) {
        return None;
    }

    let millis: u32 = match fraction {
        None => 0,
        Some(frac) => {
            if !(2..=3).contains(&frac.len()) || !frac.bytes().all(|b| b.is_ascii_digit()) {
                return None;
            }
            format!("{frac:0<3}").parse().ok()?
        }
    };

    let minutes: u32 = minutes.parse().ok()?;
    let seconds: u32 = seconds.parse().ok()?;

    Some(f64::from(minutes) * 60.0 + f64::from(seconds) + f64::from(millis) / 1000.0)
}

fn is_two_digits(s: &str) -> bool {
    s.len() == 2 && s.bytes().all(|b| b.is_ascii_digit())
}
