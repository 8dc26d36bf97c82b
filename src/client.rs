use core::cell::RefCell;
use core::mem;
use core::sync::atomic::{AtomicBool, Ordering};

use alloc::boxed::Box;
use alloc::string::{String, ToString};

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::blocking_mutex::Mutex;
use embassy_sync::signal::Signal;
use embassy_time::{Duration, Instant};

use crate::command::{self, CmdKind};
use crate::config::Config;
use crate::digest::{self, Classification};
use crate::error::Error;
use crate::rx_buffer::LineAccumulator;
use crate::traits::{AtCommand, AtUart, UrcMessage};
use crate::tx_buffer::TxStreamer;
use crate::urc::{HandlerResult, Registry};

/// How the follow-on blob of a prompted write is terminated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PromptEndPolicy {
    /// Terminate with the CTRL-Z character (e.g. SMS bodies).
    CtrlZ,
    /// Terminate with a plain CRLF.
    Crlf,
}

/// The terminal outcome of one session, routed back to the waiting caller.
struct SessionResult<C> {
    command: C,
    outcome: Classification,
    payload: String,
}

/// Armed by `send_prompted`, consumed when the `>` prompt is observed.
struct PromptContinuation {
    policy: PromptEndPolicy,
    message: String,
}

/// Session state plus the handler registry, guarded together: the RX task
/// holds the lock for the whole handling of one line, registrations take it
/// too.
struct ProtocolState<C: AtCommand, M: UrcMessage> {
    /// The command whose response is being reassembled. `None` when idle.
    in_flight: Option<C>,
    /// Payload lines accumulated for the current session.
    payload: String,
    registry: Registry<C, M>,
}

impl<C: AtCommand, M: UrcMessage> ProtocolState<C, M> {
    /// Close the session with a terminal outcome, moving the accumulated
    /// payload out.
    fn finish(&mut self, outcome: Classification) -> Option<SessionResult<C>> {
        self.in_flight.take().map(|command| SessionResult {
            command,
            outcome,
            payload: mem::take(&mut self.payload),
        })
    }
}

/// What `handle_line` decided while the protocol state was locked; acted on
/// after the lock is released.
enum Action<C> {
    None,
    Deliver(SessionResult<C>),
    Prompt,
}

/// Serializes whole request/response cycles across caller tasks. Spins on
/// contention; the hold time of a session is bounded by its timeout.
struct SessionLock(AtomicBool);

impl SessionLock {
    const fn new() -> Self {
        Self(AtomicBool::new(false))
    }

    fn lock(&self) -> SessionGuard<'_> {
        while self
            .0
            .compare_exchange_weak(false, true, Ordering::Acquire, Ordering::Relaxed)
            .is_err()
        {
            core::hint::spin_loop();
        }
        SessionGuard(self)
    }
}

/// Releases the session on every exit path, early returns and panics alike.
struct SessionGuard<'a>(&'a SessionLock);

impl Drop for SessionGuard<'_> {
    fn drop(&mut self) {
        self.0 .0.store(false, Ordering::Release);
    }
}

/// The AT link driver: session coordination, protocol parsing and the two
/// ISR entry points, all behind `&self`.
///
/// A single instance is shared by reference between caller tasks, the
/// dedicated RX task and the UART interrupt handlers; see the crate docs for
/// the wiring.
///
/// `RX_CAPACITY` is the receive ring capacity in bytes, `LINE_DEPTH` the
/// maximum number of complete-but-undrained lines; both must be powers of
/// two. `RX_CAPACITY` must exceed the largest burst the peripheral can
/// deliver between two RX task wake-ups — overflow is not detected.
pub struct AtClient<U, C, M, const RX_CAPACITY: usize, const LINE_DEPTH: usize = 16>
where
    U: AtUart,
    C: AtCommand,
    M: UrcMessage,
{
    uart: U,
    rx: LineAccumulator<RX_CAPACITY, LINE_DEPTH>,
    tx: Mutex<CriticalSectionRawMutex, RefCell<TxStreamer>>,
    state: Mutex<CriticalSectionRawMutex, RefCell<ProtocolState<C, M>>>,
    session: SessionLock,
    /// Tells the RX task which command the next session awaits. Overwritten
    /// by each new caller; read without blocking.
    command_slot: Signal<CriticalSectionRawMutex, C>,
    /// Carries one `(command, outcome, payload)` triple back to the waiter.
    result_slot: Signal<CriticalSectionRawMutex, SessionResult<C>>,
    pending_prompt: Signal<CriticalSectionRawMutex, PromptContinuation>,
}

impl<U, C, M, const RX_CAPACITY: usize, const LINE_DEPTH: usize>
    AtClient<U, C, M, RX_CAPACITY, LINE_DEPTH>
where
    U: AtUart,
    C: AtCommand,
    M: UrcMessage,
{
    pub fn new(uart: U, config: Config) -> Self {
        Self {
            uart,
            rx: LineAccumulator::new(config.prompt_chars),
            tx: Mutex::new(RefCell::new(TxStreamer::new())),
            state: Mutex::new(RefCell::new(ProtocolState {
                in_flight: None,
                payload: String::new(),
                registry: Registry::new(),
            })),
            session: SessionLock::new(),
            command_slot: Signal::new(),
            result_slot: Signal::new(),
            pending_prompt: Signal::new(),
        }
    }

    /// The UART handed in at construction.
    pub fn uart(&self) -> &U {
        &self.uart
    }

    /// Unmask the receive interrupt. Call once from the RX task before it
    /// enters its wait loop.
    pub fn enable_receiver(&self) {
        self.uart.enable_rx_irq();
    }

    /// Send an EXEC, READ or TEST command and block for its response
    /// payload.
    ///
    /// `CmdKind::Write` composes a bare `=` header with no payload; use
    /// [`send_write`] for write commands.
    ///
    /// [`send_write`]: AtClient::send_write
    pub fn send(&self, command: C, kind: CmdKind, timeout: Duration) -> Result<String, Error> {
        let _session = self.session.lock();
        let header = command::compose(command, kind);
        self.begin_session(command, header, None);
        self.wait_result(command, timeout)
    }

    /// Send a WRITE command (`AT+X=<payload>`) and block for its response
    /// payload.
    pub fn send_write(&self, command: C, payload: &str, timeout: Duration) -> Result<String, Error> {
        let _session = self.session.lock();
        let header = command::compose(command, CmdKind::Write);
        self.begin_session(command, header, Some(payload));
        self.wait_result(command, timeout)
    }

    /// Send a WRITE command whose peripheral answers with the `>` prompt,
    /// then expects `prompt_message` terminated per `policy`.
    pub fn send_prompted(
        &self,
        command: C,
        payload: &str,
        prompt_message: &str,
        policy: PromptEndPolicy,
        timeout: Duration,
    ) -> Result<(), Error> {
        let _session = self.session.lock();
        self.pending_prompt.signal(PromptContinuation {
            policy,
            message: prompt_message.to_string(),
        });
        let header = command::compose(command, CmdKind::Write);
        self.begin_session(command, header, Some(payload));
        self.wait_result(command, timeout).map(|_| ())
    }

    /// Register a handler for an unsolicited command (`+<name>: ...` lines
    /// arriving outside a matching session). The handler receives the
    /// stripped payload and must not block or register further handlers.
    pub fn register_urc(
        &self,
        command: C,
        handler: impl FnMut(String) -> HandlerResult + Send + 'static,
    ) {
        self.state.lock(|state| {
            state
                .borrow_mut()
                .registry
                .register_cmd(command, Box::new(handler))
        });
    }

    /// Register a handler for an unsolicited message (a bare line such as
    /// `RING`). The handler must not block or register further handlers.
    pub fn register_urc_message(
        &self,
        message: M,
        handler: impl FnMut() -> HandlerResult + Send + 'static,
    ) {
        self.state.lock(|state| {
            state
                .borrow_mut()
                .registry
                .register_msg(message, Box::new(handler))
        });
    }

    /// RX ISR entry point: ingest one received byte. Returns `true` when a
    /// complete line landed and the RX task should be notified.
    pub fn on_rx_byte(&self, byte: u8) -> bool {
        self.rx.push_byte(byte)
    }

    /// TX ISR entry point: emit the next queued byte, or mask the TX
    /// interrupt when the streamer has run dry.
    pub fn on_tx_ready(&self) {
        let next = self.tx.lock(|tx| tx.borrow_mut().pop_byte());
        match next {
            Some(byte) => self.uart.send_byte(byte),
            None => self.uart.disable_tx_irq(),
        }
    }

    /// RX task body: drain and handle every complete received line. Call
    /// each time the RX task is woken after [`on_rx_byte`] returned `true`.
    ///
    /// [`on_rx_byte`]: AtClient::on_rx_byte
    pub fn process(&self) {
        while let Some(line) = self.rx.pop_line() {
            self.handle_line(&line);
        }
    }

    fn begin_session(&self, command: C, header: String, write_payload: Option<&str>) {
        debug!("Sending command: {}", header.as_str());
        self.command_slot.signal(command);
        self.tx.lock(|tx| {
            let mut tx = tx.borrow_mut();
            // Frees what previous sessions already transmitted; an aborted
            // session's unsent tail still goes out first.
            tx.clean();
            match write_payload {
                None => {
                    let mut header = header;
                    header.push_str("\r\n");
                    tx.push(header);
                }
                Some(payload) => {
                    tx.push(header);
                    tx.push(payload.to_string());
                    tx.push("\r\n".to_string());
                }
            }
        });
        self.uart.enable_tx_irq();
    }

    fn wait_result(&self, command: C, timeout: Duration) -> Result<String, Error> {
        let deadline = Instant::now() + timeout;
        loop {
            if let Some(result) = self.result_slot.try_take() {
                if result.command != command {
                    // A response for a session that already timed out.
                    debug!("Discarding stale result");
                    continue;
                }
                return match result.outcome {
                    Classification::Ok => Ok(result.payload),
                    Classification::Error => Err(Error::Error),
                    Classification::CmeError => Err(Error::CmeError(result.payload)),
                    // Only terminal classifications are ever signaled.
                    _ => unreachable!(),
                };
            }
            if Instant::now() >= deadline {
                return Err(Error::Timeout);
            }
        }
    }

    fn handle_line(&self, line: &str) {
        trace!("Received line: {}", line);

        let action = self.state.lock(|state| {
            let mut state = state.borrow_mut();

            if let Some(command) = self.command_slot.try_take() {
                // A caller opened a new session; whatever the previous one
                // left half-built is discarded.
                state.payload.clear();
                state.in_flight = Some(command);
            }

            let awaited = state.in_flight;
            match digest::classify(line, awaited) {
                Classification::Ok => state.finish(Classification::Ok),
                Classification::Error => state.finish(Classification::Error),
                Classification::CmeError => {
                    let detail = digest::strip_cme_prefix(line);
                    digest::append_payload(&mut state.payload, detail);
                    state.finish(Classification::CmeError)
                }
                Classification::HandlingCmd => {
                    let name = awaited.map(|c| c.name()).unwrap_or_default();
                    let chunk = if digest::matches_extended(line, name) {
                        digest::strip_cmd_prefix(line, name)
                    } else {
                        line
                    };
                    digest::append_payload(&mut state.payload, chunk);
                    None
                }
                Classification::PromptRequest => return Action::Prompt,
                Classification::Unknown => {
                    state.registry.dispatch(line);
                    None
                }
            }
            .map_or(Action::None, Action::Deliver)
        });

        // The slots are only touched once the protocol state is unlocked.
        match action {
            Action::None => {}
            Action::Deliver(result) => {
                debug!("Session finished: {:?}", result.outcome);
                self.result_slot.signal(result);
            }
            Action::Prompt => self.continue_prompt(),
        }
    }

    /// Transmit the armed continuation in answer to the `>` prompt. The
    /// session stays open; the peripheral still owes its terminal response.
    fn continue_prompt(&self) {
        let Some(PromptContinuation { policy, message }) = self.pending_prompt.try_take() else {
            warn!("Prompt received with no continuation armed");
            return;
        };

        let terminator = match policy {
            PromptEndPolicy::CtrlZ => "\x1a\r\n",
            PromptEndPolicy::Crlf => "\r\n",
        };

        self.tx.lock(|tx| {
            let mut tx = tx.borrow_mut();
            tx.push(message);
            tx.push(terminator.to_string());
        });
        self.uart.enable_tx_irq();
    }
}
