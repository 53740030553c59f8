//! The pending-operation stack that drives one exchange to completion.
//!
//! Each request pushes a small pile of resumable steps; every call to
//! `poll` advances only the topmost one, and a step that finds its
//! precondition unmet simply stays on top to be retried. Because steps
//! live on a stack, a freshly pushed step always resolves fully before
//! the one beneath it resumes, which is how the finalization step is
//! guaranteed to run after the decode steps, never interleaved with them.
//!
//! Steps are an explicit tagged enum rather than captured closures, so the
//! whole engine state is inspectable and the stack depth is bounded at
//! compile time.

use heapless::{String, Vec};

use crate::client::{HOST, MAX_BODY_LEN, TIMEOUT_MS};
use crate::response::{ResponseBuffer, Scan};
use crate::status::Status;
use crate::transport::{Clock, Transport};

/// More than the deepest observed nesting (finalize + one await step).
const STACK_DEPTH: usize = 8;

/// Post-processing tag of the operation that started the exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Op {
    /// Channel update; the body echoes the new entry id.
    Write,
    /// Body is the result text.
    ReadText,
    /// Body converts to an `i64`.
    ReadLong,
    /// Body converts to an `i32`.
    ReadInt,
    /// Body converts to an `f32`.
    ReadFloat,
    /// Body is feed JSON; extract the `status` value.
    ReadStatusField,
    /// Body is feed JSON; extract the `created_at` value.
    ReadCreatedAt,
    /// Body is feed JSON; parse the whole record.
    ReadFeed,
}

/// One resumable unit of work on the pending stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Step {
    AwaitStatusLine,
    AwaitContentLength,
    AwaitHeaderEnd,
    AwaitBody { remaining: usize },
    Finalize(Op),
}

/// What an exchange resolved to, before operation-specific conversion.
#[derive(Debug)]
pub(crate) struct Outcome {
    pub(crate) op: Op,
    pub(crate) status: Status,
    pub(crate) body: String<MAX_BODY_LEN>,
}

/// Owns the transport for the duration of an exchange and sequences the
/// decode steps over it.
#[derive(Debug)]
pub(crate) struct Engine<T: Transport, C: Clock> {
    transport: T,
    clock: C,
    stack: Vec<Step, STACK_DEPTH>,
    rx: ResponseBuffer,
    body: String<MAX_BODY_LEN>,
    content_length: usize,
    status: Status,
    /// Start of the current awaiting phase; re-armed between headers and body.
    deadline_start: u64,
}

impl<T: Transport, C: Clock> Engine<T, C> {
    pub(crate) fn new(transport: T, clock: C) -> Self {
        Self {
            transport,
            clock,
            stack: Vec::new(),
            rx: ResponseBuffer::default(),
            body: String::new(),
            content_length: 0,
            status: Status::Ok,
            deadline_start: 0,
        }
    }

    /// `true` while a request is outstanding.
    pub(crate) fn is_busy(&self) -> bool {
        !self.stack.is_empty()
    }

    /// Status of the most recently finished request.
    pub(crate) fn last_status(&self) -> Status {
        self.status
    }

    /// Record a failure detected before any network activity so it is
    /// visible through `last_status` like every other outcome.
    pub(crate) fn record_status(&mut self, status: Status) {
        self.status = status;
    }

    /// Open the connection to the server; `ConnectFailed` is recorded as
    /// the last status so it is visible after the synchronous error too.
    pub(crate) fn connect(&mut self, port: u16) -> Result<(), Status> {
        if self.transport.connect(HOST, port).is_err() {
            self.status = Status::ConnectFailed;
            return Err(Status::ConnectFailed);
        }
        Ok(())
    }

    /// Abort helper shared by every encode/decode failure path: drain any
    /// bytes the transport still holds so the next request cannot misread
    /// stale data, close the connection, and record the chosen status.
    pub(crate) fn abort(&mut self, status: Status) -> Status {
        self.drain();
        self.transport.close();
        self.status = status;
        status
    }

    /// Arm the decoder for the response of a request that is now on the
    /// wire. The stack must be empty.
    pub(crate) fn begin_exchange(&mut self, op: Op) {
        debug_assert!(self.stack.is_empty());
        self.rx.clear();
        self.body.clear();
        self.content_length = 0;
        self.deadline_start = self.clock.now_ms();
        self.stack.push(Step::Finalize(op)).unwrap();
        self.stack.push(Step::AwaitStatusLine).unwrap();
    }

    /// Advance the topmost pending step by one increment.
    ///
    /// Returns the outcome when this poll finished the exchange; `None`
    /// while idle or still waiting.
    pub(crate) fn poll(&mut self) -> Option<Outcome> {
        match *self.stack.last()? {
            Step::AwaitStatusLine => self.poll_status_line(),
            Step::AwaitContentLength => self.poll_content_length(),
            Step::AwaitHeaderEnd => self.poll_header_end(),
            Step::AwaitBody { remaining } => self.poll_body(remaining),
            Step::Finalize(op) => return Some(self.finalize(op)),
        }
        None
    }

    pub(crate) fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    fn poll_status_line(&mut self) {
        self.rx.fill(&mut self.transport);
        match self.rx.take_status_code() {
            Scan::Ready(code) => {
                self.status = Status::from_code(code);
                self.replace_top(if self.status.is_ok() {
                    // Anything but 200 skips the rest of the parse and
                    // unwinds straight to finalization.
                    Some(Step::AwaitContentLength)
                } else {
                    None
                });
            }
            Scan::Incomplete => self.check_deadline(),
            Scan::Malformed => self.fail(Status::BadResponse),
        }
    }

    fn poll_content_length(&mut self) {
        self.rx.fill(&mut self.transport);
        match self.rx.take_content_length() {
            Scan::Ready(length) if length <= MAX_BODY_LEN => {
                self.content_length = length;
                self.replace_top(Some(Step::AwaitHeaderEnd));
            }
            Scan::Ready(_) => self.fail(Status::BadResponse),
            Scan::Incomplete => self.check_deadline(),
            Scan::Malformed => self.fail(Status::BadResponse),
        }
    }

    fn poll_header_end(&mut self) {
        self.rx.fill(&mut self.transport);
        match self.rx.take_header_end() {
            Scan::Ready(()) => {
                // A slow server gets a fresh waiting window for the body.
                self.deadline_start = self.clock.now_ms();
                self.replace_top(Some(Step::AwaitBody {
                    remaining: self.content_length,
                }));
            }
            Scan::Incomplete => self.check_deadline(),
            Scan::Malformed => self.fail(Status::BadResponse),
        }
    }

    fn poll_body(&mut self, remaining: usize) {
        self.rx.fill(&mut self.transport);
        match self.rx.take_body(remaining, &mut self.body) {
            Scan::Ready(()) => self.replace_top(None),
            Scan::Incomplete => self.check_deadline(),
            Scan::Malformed => self.fail(Status::BadResponse),
        }
    }

    /// Pop the completed step and optionally push its successor.
    fn replace_top(&mut self, next: Option<Step>) {
        self.stack.pop();
        if let Some(step) = next {
            self.stack.push(step).unwrap();
        }
    }

    /// Fail the awaiting step: record the error and unwind it. The
    /// finalization step beneath checks the status before trusting any
    /// decoded data.
    fn fail(&mut self, status: Status) {
        self.status = status;
        self.stack.pop();
    }

    fn check_deadline(&mut self) {
        // Wrapping: the clock contract allows a tick counter that rolls over.
        if self.clock.now_ms().wrapping_sub(self.deadline_start) > TIMEOUT_MS {
            self.fail(Status::Timeout);
        }
    }

    /// The follow-up frame of every operation. Runs whether the decode
    /// steps completed or failed, and explicitly checks that they
    /// succeeded before handing the body on.
    fn finalize(&mut self, op: Op) -> Outcome {
        self.stack.pop();
        self.drain();
        self.transport.close();
        if !self.status.is_ok() {
            self.body.clear();
        }
        Outcome {
            op,
            status: self.status,
            body: core::mem::take(&mut self.body),
        }
    }

    fn drain(&mut self) {
        while self.transport.available() > 0 {
            if self.transport.read().is_none() {
                break;
            }
        }
    }
}
