use std::io::Write;

use chat_stream::partial_marker_len;
use chat_stream::prelude::*;

const THINKING_LABEL: &str = "\x1b[2m[thinking]\x1b[0m ";

/// Cumulative text of one channel and the part of it already on screen.
///
/// Output is append-only: stdout and stderr usually share one terminal, so
/// erasing on one stream would eat whatever the other printed meanwhile.
#[derive(Default)]
struct Streamed {
    printed: String,
    latest: String,
}

impl Streamed {
    /// Records `text` and returns what can be appended, holding back the
    /// last `hold` bytes.
    fn update(&mut self, text: &str, hold: usize) -> String {
        self.latest.clear();
        self.latest.push_str(text);
        self.reveal(text.len() - hold)
    }

    /// Returns whatever is still held back.
    fn flush(&mut self) -> String {
        self.reveal(self.latest.len())
    }

    fn reveal(&mut self, upto: usize) -> String {
        match self.latest[..upto].strip_prefix(self.printed.as_str()) {
            Some(rest) if !rest.is_empty() => {
                let rest = rest.to_string();
                self.printed.push_str(&rest);
                rest
            }
            _ => String::new(),
        }
    }
}

/// Render port that streams the answer to a terminal.
///
/// The display channel goes to `out` as it grows. Reasoning, sources and
/// errors go to `err`, reasoning only when enabled. A trailing partial
/// `<think>` marker is not printed until it either completes (and is
/// dropped) or turns out to be plain text.
pub struct TerminalRenderer<O: Write, E: Write> {
    out: O,
    err: E,
    show_reasoning: bool,
    display: Streamed,
    inline: Streamed,
    out_of_band: Streamed,
}

impl TerminalRenderer<std::io::Stdout, std::io::Stderr> {
    pub fn stdio(show_reasoning: bool) -> Self {
        Self::new(std::io::stdout(), std::io::stderr(), show_reasoning)
    }
}

impl<O: Write, E: Write> TerminalRenderer<O, E> {
    pub fn new(out: O, err: E, show_reasoning: bool) -> Self {
        Self {
            out,
            err,
            show_reasoning,
            display: Streamed::default(),
            inline: Streamed::default(),
            out_of_band: Streamed::default(),
        }
    }

    /// Prints text held back behind a partial marker; the turn is over, so
    /// it will not grow into one.
    fn flush_held(&mut self) {
        let display = self.display.flush();
        log_io(append(&mut self.out, &display));
        if self.show_reasoning {
            let first = self.inline.printed.is_empty();
            let inline = self.inline.flush();
            log_io(append_reasoning(&mut self.err, first, &inline));
        }
    }

    #[cfg(test)]
    fn into_parts(self) -> (O, E) {
        (self.out, self.err)
    }
}

fn append(w: &mut impl Write, text: &str) -> std::io::Result<()> {
    if text.is_empty() {
        return Ok(());
    }
    w.write_all(text.as_bytes())?;
    w.flush()
}

fn append_reasoning(w: &mut impl Write, first: bool, text: &str) -> std::io::Result<()> {
    if first && !text.is_empty() {
        w.write_all(THINKING_LABEL.as_bytes())?;
    }
    append(w, text)
}

fn log_io(result: std::io::Result<()>) {
    if let Err(err) = result {
        tracing::warn!(error = %err, "terminal write failed");
    }
}

impl<O: Write, E: Write> RenderPort for TerminalRenderer<O, E> {
    fn display_updated(&mut self, text: &str) {
        let delta = self.display.update(text, partial_marker_len(text));
        log_io(append(&mut self.out, &delta));
    }

    fn reasoning_updated(&mut self, source: ReasoningSource, text: &str) {
        if !self.show_reasoning {
            return;
        }
        let (channel, hold) = match source {
            ReasoningSource::Inline => (&mut self.inline, partial_marker_len(text)),
            ReasoningSource::OutOfBand => (&mut self.out_of_band, 0),
        };
        let first = channel.printed.is_empty();
        let delta = channel.update(text, hold);
        log_io(append_reasoning(&mut self.err, first, &delta));
    }

    fn sources_received(&mut self, sources: &[Source]) {
        let mut block = String::from("\nSources:\n");
        for source in sources {
            let title = if source.title.is_empty() {
                &source.url
            } else {
                &source.title
            };
            block.push_str(&format!("  - {title} <{}>\n", source.url));
        }
        log_io(self.err.write_all(block.as_bytes()));
    }

    fn display_annotated(&mut self, note: &str) {
        self.flush_held();
        log_io(write!(self.out, "\n\x1b[3m{note}\x1b[0m\n").and_then(|_| self.out.flush()));
    }

    fn error_turn(&mut self, message: &str) {
        self.flush_held();
        log_io(writeln!(self.err, "{message}"));
    }

    fn turn_completed(&mut self, _response: &AccumulatedResponse) {
        self.flush_held();
        log_io(writeln!(self.out).and_then(|_| self.out.flush()));
    }

    fn turn_finished(&mut self, _outcome: &TurnOutcome) {
        self.flush_held();
        if self.show_reasoning
            && !(self.inline.printed.is_empty() && self.out_of_band.printed.is_empty())
        {
            log_io(writeln!(self.err));
        }
        log_io(self.out.flush().and_then(|_| self.err.flush()));
    }
}

/// Sidebar stand-in: announces new conversations on stderr.
pub struct TerminalSidebar<E: Write> {
    err: E,
}

impl TerminalSidebar<std::io::Stderr> {
    pub fn stderr() -> Self {
        Self {
            err: std::io::stderr(),
        }
    }
}

impl<E: Write> SidebarRegistry for TerminalSidebar<E> {
    fn conversation_started(&mut self, id: &ConversationId, title: &str) {
        log_io(writeln!(self.err, "\x1b[2m[{title}] {}\x1b[0m", id.route()));
    }
}
