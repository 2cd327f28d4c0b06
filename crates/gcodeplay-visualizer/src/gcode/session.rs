//! Resumable parse session
//!
//! The host feeds text in chunks and calls [`ParseSession::step`] from its own
//! loop. Each step interprets up to a budget of instructions (or a time slice)
//! and returns, so a long program never blocks the host.

use gcodeplay_core::constants::{METADATA_SCAN_LINES, SLICER_SNIFF_LINES};
use gcodeplay_core::{CancelToken, InterpretError, ProgressCallback, ToolRegistry};
use gcodeplay_settings::Config;
use std::fmt;
use std::time::{Duration, Instant};
use tracing::{debug, info};

use super::features::{MachineMetadata, SlicerStyle};
use super::interpreter::{MotionStateMachine, ParseDiagnostics};
use crate::visualizer::segment_store::SegmentStore;

/// Instructions between clock reads when a time budget is set
const CLOCK_CHECK_INTERVAL: usize = 256;

/// Work allowed in one call to [`ParseSession::step`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepBudget {
    pub max_instructions: usize,
    pub max_duration: Option<Duration>,
}

impl StepBudget {
    pub fn instructions(max_instructions: usize) -> Self {
        Self {
            max_instructions,
            max_duration: None,
        }
    }

    pub fn duration(max_duration: Duration) -> Self {
        Self {
            max_instructions: usize::MAX,
            max_duration: Some(max_duration),
        }
    }

    pub fn unlimited() -> Self {
        Self::instructions(usize::MAX)
    }
}

impl Default for StepBudget {
    fn default() -> Self {
        Self {
            max_instructions: 50_000,
            max_duration: Some(Duration::from_millis(16)),
        }
    }
}

/// Outcome of one step
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StepStatus {
    /// More work remains; `progress` is the fraction of received bytes consumed
    Pending { progress: f32 },
    Complete,
}

impl StepStatus {
    pub fn is_complete(&self) -> bool {
        matches!(self, Self::Complete)
    }
}

/// Everything a finished session produced
#[derive(Debug, Clone)]
pub struct ParseOutput {
    pub store: SegmentStore,
    pub registry: ToolRegistry,
    pub diagnostics: ParseDiagnostics,
    pub slicer: SlicerStyle,
}

/// Chunked, budgeted interpretation of one program
pub struct ParseSession {
    config: Config,
    cancel: CancelToken,
    progress: Option<ProgressCallback>,
    machine: Option<MotionStateMachine>,
    store: SegmentStore,
    buffer: String,
    /// Byte index of the first unread byte in `buffer`
    cursor: usize,
    /// Stream offset of `buffer[0]`
    base_offset: u64,
    received: u64,
    expected_len: Option<u64>,
    line_number: u32,
    saw_content: bool,
    input_finished: bool,
    complete: bool,
    /// Candidate metadata lines with their line numbers
    metadata_lines: Vec<(u32, String)>,
    slicer: SlicerStyle,
}

impl fmt::Debug for ParseSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ParseSession")
            .field("received", &self.received)
            .field("consumed", &self.consumed())
            .field("line_number", &self.line_number)
            .field("segments", &self.store.len())
            .field("slicer", &self.slicer)
            .field("complete", &self.complete)
            .finish()
    }
}

impl ParseSession {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            cancel: CancelToken::new(),
            progress: None,
            machine: None,
            store: SegmentStore::new(),
            buffer: String::new(),
            cursor: 0,
            base_offset: 0,
            received: 0,
            expected_len: None,
            line_number: 0,
            saw_content: false,
            input_finished: false,
            complete: false,
            metadata_lines: Vec::new(),
            slicer: SlicerStyle::Generic,
        }
    }

    /// Share a cancellation flag with the host.
    pub fn with_cancel_token(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn with_progress(mut self, callback: ProgressCallback) -> Self {
        self.progress = Some(callback);
        self
    }

    /// Total input size, when known, so progress is meaningful before the
    /// last chunk arrives.
    pub fn with_expected_len(mut self, len: u64) -> Self {
        self.expected_len = Some(len);
        self
    }

    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    pub fn push_chunk(&mut self, chunk: &str) {
        self.received += chunk.len() as u64;
        self.buffer.push_str(chunk);
    }

    /// No more chunks will arrive.
    pub fn finish_input(&mut self) {
        self.input_finished = true;
    }

    pub fn store(&self) -> &SegmentStore {
        &self.store
    }

    pub fn slicer(&self) -> SlicerStyle {
        self.slicer
    }

    pub fn line_number(&self) -> u32 {
        self.line_number
    }

    pub fn is_complete(&self) -> bool {
        self.complete
    }

    /// Bytes interpreted so far
    pub fn consumed(&self) -> u64 {
        self.base_offset + self.cursor as u64
    }

    pub fn progress(&self) -> f32 {
        let total = self.expected_len.unwrap_or(self.received).max(self.received);
        if total == 0 {
            return 0.0;
        }
        (self.consumed() as f64 / total as f64).min(1.0) as f32
    }

    /// Interpret up to `budget` instructions.
    ///
    /// Returns `Pending` when the budget ran out or more input is needed.
    /// Segments already in the store stay valid after `Cancelled`.
    pub fn step(&mut self, budget: StepBudget) -> Result<StepStatus, InterpretError> {
        if self.complete {
            return Ok(StepStatus::Complete);
        }
        if self.cancel.is_cancelled() {
            return Err(InterpretError::Cancelled);
        }
        if self.machine.is_none() && !self.start()? {
            return Ok(StepStatus::Pending {
                progress: self.progress(),
            });
        }

        let started = Instant::now();
        let mut processed = 0usize;

        while processed < budget.max_instructions {
            if self.cancel.is_cancelled() {
                info!(line = self.line_number, "Parse cancelled");
                self.compact();
                return Err(InterpretError::Cancelled);
            }
            if !self.interpret_next_line() {
                break;
            }
            processed += 1;

            if processed % CLOCK_CHECK_INTERVAL == 0
                && budget.max_duration.is_some_and(|limit| started.elapsed() >= limit)
            {
                break;
            }
        }
        self.compact();

        if self.input_finished && self.cursor == self.buffer.len() {
            return self.complete_session();
        }

        let progress = self.progress();
        self.report(progress, "Loading File...");
        Ok(StepStatus::Pending { progress })
    }

    /// Step until finished. Calls [`finish_input`](Self::finish_input) first.
    pub fn run_to_completion(&mut self) -> Result<(), InterpretError> {
        self.finish_input();
        while !self.step(StepBudget::unlimited())?.is_complete() {}
        Ok(())
    }

    pub fn into_output(self) -> ParseOutput {
        let (registry, diagnostics) = match self.machine {
            Some(machine) => machine.into_parts(),
            None => (self.config.tool_registry(), ParseDiagnostics::default()),
        };
        ParseOutput {
            store: self.store,
            registry,
            diagnostics,
            slicer: self.slicer,
        }
    }

    /// Sniff the producer and build the interpreter once enough text is here.
    fn start(&mut self) -> Result<bool, InterpretError> {
        let head_end = self
            .buffer
            .match_indices('\n')
            .nth(SLICER_SNIFF_LINES - 1)
            .map(|(idx, _)| idx);
        let head = match head_end {
            Some(end) => &self.buffer[..end],
            None if self.input_finished => self.buffer.as_str(),
            None => return Ok(false),
        };

        if self.input_finished && head.trim().is_empty() && head_end.is_none() {
            return Err(InterpretError::EmptyInput);
        }

        self.slicer = SlicerStyle::detect(head);
        self.machine = Some(MotionStateMachine::new(&self.config, self.slicer)?);
        info!(slicer = %self.slicer, "Parse started");
        self.report(0.0, "Loading File...");
        Ok(true)
    }

    /// Interpret one buffered line. Returns false when none is complete yet.
    fn interpret_next_line(&mut self) -> bool {
        let rest = &self.buffer[self.cursor..];
        let (line_len, consumed) = match rest.find('\n') {
            Some(idx) => (idx, idx + 1),
            None if self.input_finished && !rest.is_empty() => (rest.len(), rest.len()),
            None => return false,
        };

        let start = self.cursor;
        self.cursor += consumed;
        self.line_number += 1;
        let offset = self.consumed();
        let line = &self.buffer[start..start + line_len];

        if !line.trim().is_empty() {
            self.saw_content = true;
        }
        if line.contains("nozzle_diameter") {
            self.metadata_lines.push((self.line_number, line.to_string()));
        }

        if let Some(machine) = self.machine.as_mut() {
            machine.interpret(line, self.line_number, offset, &mut self.store);
        }
        true
    }

    /// Drop consumed text from the buffer.
    fn compact(&mut self) {
        if self.cursor == 0 {
            return;
        }
        self.base_offset += self.cursor as u64;
        self.buffer.drain(..self.cursor);
        self.cursor = 0;
    }

    fn complete_session(&mut self) -> Result<StepStatus, InterpretError> {
        if !self.saw_content {
            return Err(InterpretError::EmptyInput);
        }

        self.apply_metadata();
        self.complete = true;

        if let Some(machine) = self.machine.as_ref() {
            let diagnostics = machine.diagnostics();
            debug!(
                recoverable = diagnostics.recoverable,
                degenerate_arcs = diagnostics.degenerate_arcs,
                config_warnings = diagnostics.config_warnings,
                "Parse diagnostics"
            );
        }
        info!(
            lines = self.line_number,
            segments = self.store.len(),
            layers = self.store.layers().len(),
            "Parse complete"
        );
        self.report(1.0, "Complete");
        Ok(StepStatus::Complete)
    }

    /// Apply `nozzle_diameter` comments found in the trailing lines.
    fn apply_metadata(&mut self) {
        let window_start = self
            .line_number
            .saturating_sub(METADATA_SCAN_LINES as u32);
        let metadata = MachineMetadata::scan(
            self.metadata_lines
                .iter()
                .filter(|(line, _)| *line > window_start)
                .map(|(_, text)| text.as_str()),
        );
        self.metadata_lines.clear();

        if let Some(machine) = self.machine.as_mut() {
            let registry = machine.registry_mut();
            for (index, diameter) in metadata.nozzle_diameters.iter().enumerate() {
                registry.set_diameter(index, *diameter);
            }
            if !metadata.nozzle_diameters.is_empty() {
                debug!(diameters = ?metadata.nozzle_diameters, "Applied nozzle diameters");
            }
        }
    }

    fn report(&mut self, fraction: f32, status: &str) {
        if let Some(callback) = self.progress.as_mut() {
            callback(fraction, status);
        }
    }
}

/// Interpret a whole program in one call.
pub fn parse_str(text: &str, config: &Config) -> Result<ParseOutput, InterpretError> {
    let mut session = ParseSession::new(config.clone()).with_expected_len(text.len() as u64);
    session.push_chunk(text);
    session.run_to_completion()?;
    Ok(session.into_output())
}
