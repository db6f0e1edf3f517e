//! Scanner-versus-human input classification for one lookup field.
//!
//! Barcode scanners type a whole label in a few milliseconds; people do not.
//! The classifier watches key timing on a single field and decides when a
//! code is final. It is a plain state machine: callers pass the arrival time
//! of every event and call [`ScanClassifier::on_timer`] once
//! [`ScanClassifier::next_deadline`] has passed.
//!
//! Detectors, highest precedence first:
//!
//! 1. paste: a pasted payload with an `id` finalizes immediately
//! 2. burst: qualifying keys closer than the burst gap form one burst,
//!    evaluated only once the gap elapses
//! 3. debounce: a value that still holds a raw payload once input has been
//!    quiet for the debounce period is reduced to its id
//!
//! Keys of an open burst are held back from the visible field until the
//! burst closes, so a scanned payload only ever shows up as its id.

use courier_core::{extract_id, CodeNamespace, ScannerConfig};
use serde::Serialize;
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

/// Timing thresholds and routing for a [`ScanClassifier`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassifierConfig {
    pub burst_gap: Duration,
    pub debounce: Duration,
    pub dedupe_window: Duration,
    pub alternate_prefix: String,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self::from(&ScannerConfig::default())
    }
}

impl From<&ScannerConfig> for ClassifierConfig {
    fn from(config: &ScannerConfig) -> Self {
        Self {
            burst_gap: Duration::from_millis(config.burst_gap_ms),
            debounce: Duration::from_millis(config.debounce_ms),
            dedupe_window: Duration::from_millis(config.dedupe_window_ms),
            alternate_prefix: config.alternate_prefix.clone(),
        }
    }
}

/// A key as reported by the input surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanKey {
    /// A single printable character
    Char(char),
    Enter,
    Backspace,
    /// Any other named key (Shift, Tab, arrows...); ignored
    Other,
}

/// Something that happened on the lookup field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanInput {
    Key(ScanKey),
    Paste(String),
    /// Field value replaced by means other than keys
    SetValue(String),
    /// Explicit submit action
    Submit,
    Clear,
}

/// An input with its arrival time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanEvent {
    pub input: ScanInput,
    pub at: Instant,
}

impl ScanEvent {
    pub fn new(input: ScanInput, at: Instant) -> Self {
        Self { input, at }
    }
}

/// Where the finalized code came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ScanSource {
    /// Extracted from a structured label payload
    StructuredPayload,
    /// The field text as typed
    Raw,
}

/// What finalized the code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ScanTrigger {
    Automatic,
    Manual,
}

/// A finalized code ready for lookup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScanDecision {
    pub code: String,
    pub namespace: CodeNamespace,
    pub source: ScanSource,
    pub trigger: ScanTrigger,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum State {
    Idle,
    Accumulating {
        buffer: String,
        deadline: Instant,
        submit_pending: bool,
    },
}

/// Per-field classifier state.
#[derive(Debug, Clone)]
pub struct ScanClassifier {
    config: ClassifierConfig,
    field: String,
    state: State,
    debounce_at: Option<Instant>,
    last_automatic: Option<(String, Instant)>,
}

impl ScanClassifier {
    pub fn new(config: ClassifierConfig) -> Self {
        Self {
            config,
            field: String::new(),
            state: State::Idle,
            debounce_at: None,
            last_automatic: None,
        }
    }

    /// Current visible field value.
    pub fn field(&self) -> &str {
        &self.field
    }

    /// Whether a burst is open.
    pub fn is_accumulating(&self) -> bool {
        matches!(self.state, State::Accumulating { .. })
    }

    /// Earliest instant at which [`Self::on_timer`] has work to do.
    pub fn next_deadline(&self) -> Option<Instant> {
        let burst = match &self.state {
            State::Accumulating { deadline, .. } => Some(*deadline),
            State::Idle => None,
        };
        match (burst, self.debounce_at) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    /// Feed one input event.
    ///
    /// A burst whose gap already elapsed is closed first. If closing it
    /// yields a lookup, that lookup wins over one the event would trigger.
    pub fn handle(&mut self, event: ScanEvent) -> Option<ScanDecision> {
        let now = event.at;
        let closed = self.close_expired_burst(now);
        let triggered = self.apply(event.input, now);
        match (closed, triggered) {
            (Some(closed), Some(dropped)) => {
                debug!("Dropping lookup of {} behind burst lookup", dropped.code);
                Some(closed)
            }
            (closed, triggered) => closed.or(triggered),
        }
    }

    fn apply(&mut self, input: ScanInput, now: Instant) -> Option<ScanDecision> {
        match input {
            ScanInput::Key(ScanKey::Char(c)) => {
                self.extend_burst(Some(c), now);
                self.debounce_at = Some(now + self.config.debounce);
                None
            }
            ScanInput::Key(ScanKey::Enter) => {
                if self.is_accumulating() {
                    self.extend_burst(None, now);
                    None
                } else {
                    self.manual_submit()
                }
            }
            ScanInput::Key(ScanKey::Backspace) => {
                let popped = match &mut self.state {
                    State::Accumulating { buffer, .. } => buffer.pop(),
                    State::Idle => None,
                };
                if popped.is_none() {
                    self.field.pop();
                }
                self.debounce_at = Some(now + self.config.debounce);
                None
            }
            ScanInput::Key(ScanKey::Other) => None,
            ScanInput::Paste(text) => {
                self.state = State::Idle;
                self.debounce_at = None;
                match extract_id(&text).map(str::to_string) {
                    Some(id) => {
                        debug!("Paste carried id {}", id);
                        self.field.clone_from(&id);
                        self.automatic(id, now)
                    }
                    None => {
                        self.field = text;
                        None
                    }
                }
            }
            ScanInput::SetValue(value) => {
                self.state = State::Idle;
                self.field = value;
                self.debounce_at = Some(now + self.config.debounce);
                None
            }
            ScanInput::Submit => {
                if self.is_accumulating() {
                    self.defer_submit();
                    None
                } else {
                    self.manual_submit()
                }
            }
            ScanInput::Clear => {
                self.field.clear();
                self.state = State::Idle;
                self.debounce_at = None;
                None
            }
        }
    }

    /// Resolve every deadline that has passed at `now`.
    pub fn on_timer(&mut self, now: Instant) -> Vec<ScanDecision> {
        let mut decisions = Vec::new();

        let burst_due =
            matches!(&self.state, State::Accumulating { deadline, .. } if *deadline <= now);
        if burst_due {
            decisions.extend(self.close_burst(now));
        }

        if self.debounce_at.is_some_and(|at| at <= now) {
            self.debounce_at = None;
            if !self.is_accumulating() {
                if let Some(id) = extract_id(&self.field).map(str::to_string) {
                    debug!("Debounced value carried id {}", id);
                    self.field.clone_from(&id);
                    decisions.extend(self.automatic(id, now));
                }
            }
        }

        decisions
    }

    fn close_expired_burst(&mut self, now: Instant) -> Option<ScanDecision> {
        match &self.state {
            State::Accumulating { deadline, .. } if *deadline <= now => self.close_burst(now),
            _ => None,
        }
    }

    /// Append `c` to the open burst (or open one); `None` is Enter.
    fn extend_burst(&mut self, c: Option<char>, now: Instant) {
        let deadline = now + self.config.burst_gap;
        if let State::Accumulating {
            buffer,
            deadline: current,
            submit_pending,
        } = &mut self.state
        {
            match c {
                Some(c) => buffer.push(c),
                None => *submit_pending = true,
            }
            *current = deadline;
            return;
        }

        self.state = State::Accumulating {
            buffer: c.map(String::from).unwrap_or_default(),
            deadline,
            submit_pending: c.is_none(),
        };
    }

    fn defer_submit(&mut self) {
        if let State::Accumulating { submit_pending, .. } = &mut self.state {
            *submit_pending = true;
        }
    }

    fn close_burst(&mut self, now: Instant) -> Option<ScanDecision> {
        let State::Accumulating {
            buffer,
            submit_pending,
            ..
        } = std::mem::replace(&mut self.state, State::Idle)
        else {
            return None;
        };

        if let Some(id) = extract_id(&buffer) {
            debug!("Burst of {} chars carried id {}", buffer.chars().count(), id);
            let id = id.to_string();
            self.field.clone_from(&id);
            return self.automatic(id, now);
        }

        self.field.push_str(&buffer);
        if submit_pending {
            return self.manual_submit();
        }
        None
    }

    fn automatic(&mut self, code: String, now: Instant) -> Option<ScanDecision> {
        if let Some((last, at)) = &self.last_automatic {
            if *last == code && now.saturating_duration_since(*at) < self.config.dedupe_window {
                debug!("Suppressing repeated automatic lookup of {}", code);
                return None;
            }
        }
        self.last_automatic = Some((code.clone(), now));
        Some(self.decision(code, ScanSource::StructuredPayload, ScanTrigger::Automatic))
    }

    fn manual_submit(&mut self) -> Option<ScanDecision> {
        let value = self.field.trim();
        if value.is_empty() {
            return None;
        }

        let (code, source) = match extract_id(value) {
            Some(id) => (id.to_string(), ScanSource::StructuredPayload),
            None => (value.to_string(), ScanSource::Raw),
        };
        if source == ScanSource::StructuredPayload {
            self.field.clone_from(&code);
        }
        Some(self.decision(code, source, ScanTrigger::Manual))
    }

    fn decision(&self, code: String, source: ScanSource, trigger: ScanTrigger) -> ScanDecision {
        let namespace = CodeNamespace::for_code_with_prefix(&code, &self.config.alternate_prefix);
        ScanDecision {
            code,
            namespace,
            source,
            trigger,
        }
    }
}

impl Default for ScanClassifier {
    fn default() -> Self {
        Self::new(ClassifierConfig::default())
    }
}
