//! Incremental SSE line parser for chat-completion streams.
//!
//! Text goes in through [`SseParser::push`] in whatever pieces the network
//! delivered; complete lines are classified and turned into [`SseEvent`]s.
//! The event sequence depends only on the concatenated input, never on how
//! it was split.

use chatrelay_contracts::{CompletionChunk, DATA_PREFIX, DONE_SENTINEL};
use tracing::{debug, trace};

/// Output of the parser
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SseEvent {
    /// A non-empty `choices[0].delta.content` fragment
    Delta(String),
    /// The `[DONE]` sentinel was seen; no further events follow
    Done,
}

/// Where the parser is in its line cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParserState {
    /// Buffered text holds no complete line
    AwaitingLine,
    /// A complete line is being classified
    HaveLine,
    /// End of input; the residual buffer has been flushed
    FlushFinal,
}

#[derive(Debug)]
pub struct SseParser {
    buffer: String,
    /// Payload of a `data:` line whose JSON ended early
    incomplete: Option<String>,
    state: ParserState,
    done: bool,
}

impl Default for SseParser {
    fn default() -> Self {
        Self::new()
    }
}

impl SseParser {
    pub fn new() -> Self {
        Self {
            buffer: String::new(),
            incomplete: None,
            state: ParserState::AwaitingLine,
            done: false,
        }
    }

    pub fn state(&self) -> ParserState {
        self.state
    }

    /// True once `[DONE]` has been seen.
    pub fn is_done(&self) -> bool {
        self.done
    }

    /// Feed decoded text and return the events completed by it.
    pub fn push(&mut self, text: &str) -> Vec<SseEvent> {
        let mut events = Vec::new();
        if self.done || self.state == ParserState::FlushFinal {
            return events;
        }

        self.buffer.push_str(text);
        while !self.done {
            let Some(newline) = self.buffer.find('\n') else {
                break;
            };
            self.state = ParserState::HaveLine;
            let mut line: String = self.buffer.drain(..=newline).collect();
            line.pop();
            if line.ends_with('\r') {
                line.pop();
            }
            self.classify(&line, &mut events);
        }

        if self.done {
            self.buffer.clear();
        } else {
            self.state = ParserState::AwaitingLine;
        }
        events
    }

    /// Flush the residual buffer at end of input.
    ///
    /// A last line without a trailing newline is classified like any other.
    /// A frame that is still incomplete afterwards is dropped.
    pub fn finish(&mut self) -> Vec<SseEvent> {
        let mut events = Vec::new();
        if self.state == ParserState::FlushFinal {
            return events;
        }
        self.state = ParserState::FlushFinal;
        if self.done {
            return events;
        }

        let residual = std::mem::take(&mut self.buffer);
        let line = residual.strip_suffix('\r').unwrap_or(&residual);
        if !line.is_empty() {
            self.classify(line, &mut events);
        }

        if let Some(fragment) = self.incomplete.take() {
            debug!(bytes = fragment.len(), "Dropping incomplete frame at end of stream");
        }
        events
    }

    fn classify(&mut self, line: &str, events: &mut Vec<SseEvent>) {
        if let Some(fragment) = self.incomplete.take() {
            if is_continuation(line) {
                let joined = format!("{fragment}\n{line}");
                self.parse_payload(joined, events);
                return;
            }
            debug!(bytes = fragment.len(), "Dropping incomplete frame");
        }

        if line.is_empty() || line.starts_with(':') {
            return;
        }
        let Some(payload) = line.strip_prefix(DATA_PREFIX) else {
            trace!(line, "Ignoring non-data line");
            return;
        };

        let payload = payload.trim();
        if payload == DONE_SENTINEL {
            self.done = true;
            events.push(SseEvent::Done);
            return;
        }
        self.parse_payload(payload.to_string(), events);
    }

    fn parse_payload(&mut self, payload: String, events: &mut Vec<SseEvent>) {
        match serde_json::from_str::<CompletionChunk>(&payload) {
            Ok(chunk) => {
                if let Some(content) = chunk.first_content() {
                    events.push(SseEvent::Delta(content.to_string()));
                }
            }
            Err(err) if err.is_eof() => {
                trace!(bytes = payload.len(), "Holding incomplete frame");
                self.incomplete = Some(payload);
            }
            Err(err) => {
                trace!(error = %err, "Skipping malformed frame");
            }
        }
    }
}

const SSE_FIELDS: [&str; 4] = ["data", "event", "id", "retry"];

/// A line that can only be the rest of a held frame, not a frame of its own.
fn is_continuation(line: &str) -> bool {
    !line.is_empty() && !line.starts_with(':') && !is_field_line(line)
}

fn is_field_line(line: &str) -> bool {
    let name = line.split_once(':').map_or(line, |(name, _)| name);
    SSE_FIELDS.contains(&name)
}
