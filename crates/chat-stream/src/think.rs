//! Separation of inline `<think>...</think>` reasoning from display text.
//!
//! Both implementations follow the same rule: split the cumulative content
//! on the literal markers, walk the pieces with an "inside" flag that
//! `<think>` sets and `</think>` clears, drop the markers, and send every
//! other piece to reasoning while inside and to display otherwise.

pub const OPEN_MARKER: &str = "<think>";
pub const CLOSE_MARKER: &str = "</think>";

/// Display and reasoning text derived from the raw content stream.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Channels {
    pub display: String,
    pub reasoning: String,
}

/// Splits a complete text in one pass over the whole string.
///
/// This is the cumulative form; `ThinkSplitter` produces the same result
/// incrementally.
pub fn split_markers(raw: &str) -> Channels {
    let mut channels = Channels::default();
    let mut inside = false;
    let mut rest = raw;
    while let Some((idx, marker)) = next_marker(rest) {
        push_to(&mut channels, inside, &rest[..idx]);
        inside = marker == OPEN_MARKER;
        rest = &rest[idx + marker.len()..];
    }
    push_to(&mut channels, inside, rest);
    channels
}

fn push_to(channels: &mut Channels, inside: bool, text: &str) {
    if inside {
        channels.reasoning.push_str(text);
    } else {
        channels.display.push_str(text);
    }
}

/// Leftmost marker in `text`. The two markers cannot both start at the
/// same byte, so the earliest position decides.
fn next_marker(text: &str) -> Option<(usize, &'static str)> {
    let open = text.find(OPEN_MARKER).map(|i| (i, OPEN_MARKER));
    let close = text.find(CLOSE_MARKER).map(|i| (i, CLOSE_MARKER));
    match (open, close) {
        (Some(a), Some(b)) => Some(if a.0 < b.0 { a } else { b }),
        (a, b) => a.or(b),
    }
}

/// Length of the longest suffix of `text` that is a proper prefix of a
/// marker and could still grow into one.
///
/// The suffix is always ASCII, so `text.len() - n` is a char boundary.
pub fn partial_marker_len(text: &str) -> usize {
    let bytes = text.as_bytes();
    let longest = CLOSE_MARKER.len() - 1;
    (1..=longest.min(bytes.len()))
        .rev()
        .find(|&k| {
            let tail = &bytes[bytes.len() - k..];
            [OPEN_MARKER, CLOSE_MARKER]
                .iter()
                .any(|m| k < m.len() && m.as_bytes().starts_with(tail))
        })
        .unwrap_or(0)
}

/// Incremental marker scanner.
///
/// Text is committed to a channel as soon as it can no longer be part of a
/// marker; a trailing partial marker (for example `<thi`) is held as
/// pending. Snapshots attribute the pending tail to the current channel, so
/// every snapshot equals `split_markers` of the content pushed so far while
/// each fragment is scanned only once.
#[derive(Clone, Debug, Default)]
pub struct ThinkSplitter {
    committed: Channels,
    inside: bool,
    pending: String,
}

impl ThinkSplitter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds the next raw fragment.
    pub fn push(&mut self, fragment: &str) {
        self.pending.push_str(fragment);
        while let Some((idx, marker)) = next_marker(&self.pending) {
            push_to(&mut self.committed, self.inside, &self.pending[..idx]);
            self.inside = marker == OPEN_MARKER;
            self.pending.drain(..idx + marker.len());
        }
        let keep = partial_marker_len(&self.pending);
        let commit_to = self.pending.len() - keep;
        push_to(&mut self.committed, self.inside, &self.pending[..commit_to]);
        self.pending.drain(..commit_to);
    }

    /// Whether the scanner is currently inside an unterminated `<think>`.
    pub fn inside_reasoning(&self) -> bool {
        self.inside
    }

    /// Current display text.
    pub fn display(&self) -> String {
        self.view(false, &self.committed.display)
    }

    /// Current reasoning text.
    pub fn reasoning(&self) -> String {
        self.view(true, &self.committed.reasoning)
    }

    /// Both channels at once.
    pub fn channels(&self) -> Channels {
        Channels {
            display: self.display(),
            reasoning: self.reasoning(),
        }
    }

    fn view(&self, reasoning_channel: bool, committed: &str) -> String {
        let mut out = String::with_capacity(committed.len() + self.pending.len());
        out.push_str(committed);
        if self.inside == reasoning_channel {
            out.push_str(&self.pending);
        }
        out
    }
}
