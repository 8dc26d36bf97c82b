//! Registry of unsolicited-line handlers and the dispatch walk over it.

use alloc::boxed::Box;
use alloc::string::{String, ToString};
use alloc::vec::Vec;

use crate::digest;
use crate::traits::{AtCommand, UrcMessage};

/// Whether a handler stays registered after an invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum HandlerResult {
    /// Keep the handler; it runs again on the next matching line.
    Keep,
    /// Drop the handler; it is never invoked again.
    Remove,
}

pub(crate) type UrcHandler = Box<dyn FnMut(String) -> HandlerResult + Send>;
pub(crate) type UrcMessageHandler = Box<dyn FnMut() -> HandlerResult + Send>;

/// Ordered handler lists. Registration order is preserved and the first
/// matching handler consumes the line.
pub(crate) struct Registry<C, M> {
    cmd_handlers: Vec<(C, UrcHandler)>,
    msg_handlers: Vec<(M, UrcMessageHandler)>,
}

impl<C: AtCommand, M: UrcMessage> Registry<C, M> {
    pub fn new() -> Self {
        Self {
            cmd_handlers: Vec::new(),
            msg_handlers: Vec::new(),
        }
    }

    pub fn register_cmd(&mut self, command: C, handler: UrcHandler) {
        self.cmd_handlers.push((command, handler));
    }

    pub fn register_msg(&mut self, message: M, handler: UrcMessageHandler) {
        self.msg_handlers.push((message, handler));
    }

    /// Route an unsolicited line. Command handlers are consulted first, then
    /// message handlers; an unmatched line is dropped.
    pub fn dispatch(&mut self, line: &str) {
        // Local echo never reaches handlers, no matter what is registered.
        if digest::is_echo(line) {
            return;
        }

        for i in 0..self.cmd_handlers.len() {
            let name = self.cmd_handlers[i].0.name();
            if digest::matches_extended(line, name) {
                let payload = digest::strip_cmd_prefix(line, name).to_string();
                if (self.cmd_handlers[i].1)(payload) == HandlerResult::Remove {
                    self.cmd_handlers.remove(i);
                }
                return;
            }
        }

        for i in 0..self.msg_handlers.len() {
            if line.starts_with(self.msg_handlers[i].0.token()) {
                if (self.msg_handlers[i].1)() == HandlerResult::Remove {
                    self.msg_handlers.remove(i);
                }
                return;
            }
        }

        trace!("Dropping unmatched unsolicited line: {}", line);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    crate::at_commands! {
        enum Cmd {
            Third = extended "THIRD",
            Fourth = extended "FOURTH",
        }
    }

    crate::at_urc_messages! {
        enum Msg {
            Ring = "RING",
            NoCarrier = "NO CARRIER",
            // A namespace unwisely clashing with the echo prefix.
            Ready = "ATREADY",
        }
    }

    fn counter() -> (Arc<AtomicUsize>, Arc<AtomicUsize>) {
        let c = Arc::new(AtomicUsize::new(0));
        (c.clone(), c)
    }

    #[test]
    fn one_shot_handler_runs_once() {
        let mut registry = Registry::<Cmd, Msg>::new();
        let (calls, seen) = counter();
        registry.register_cmd(
            Cmd::Third,
            Box::new(move |_| {
                calls.fetch_add(1, Ordering::Relaxed);
                HandlerResult::Remove
            }),
        );

        registry.dispatch("+THIRD: payload1");
        registry.dispatch("+THIRD: payload2");
        assert_eq!(1, seen.load(Ordering::Relaxed));
    }

    #[test]
    fn keep_handler_runs_on_every_matching_line() {
        let mut registry = Registry::<Cmd, Msg>::new();
        let (calls, seen) = counter();
        registry.register_cmd(
            Cmd::Third,
            Box::new(move |_| {
                if calls.fetch_add(1, Ordering::Relaxed) == 2 {
                    HandlerResult::Remove
                } else {
                    HandlerResult::Keep
                }
            }),
        );

        for _ in 0..5 {
            registry.dispatch("+THIRD: payload");
        }
        assert_eq!(3, seen.load(Ordering::Relaxed));
    }

    #[test]
    fn first_registered_handler_wins() {
        let mut registry = Registry::<Cmd, Msg>::new();
        let (first_calls, first_seen) = counter();
        let (second_calls, second_seen) = counter();
        registry.register_cmd(
            Cmd::Third,
            Box::new(move |_| {
                first_calls.fetch_add(1, Ordering::Relaxed);
                HandlerResult::Remove
            }),
        );
        registry.register_cmd(
            Cmd::Third,
            Box::new(move |_| {
                second_calls.fetch_add(1, Ordering::Relaxed);
                HandlerResult::Keep
            }),
        );

        registry.dispatch("+THIRD: a");
        assert_eq!((1, 0), (
            first_seen.load(Ordering::Relaxed),
            second_seen.load(Ordering::Relaxed),
        ));

        // The one-shot handler is gone; the next line reaches the second.
        registry.dispatch("+THIRD: b");
        assert_eq!((1, 1), (
            first_seen.load(Ordering::Relaxed),
            second_seen.load(Ordering::Relaxed),
        ));
    }

    #[test]
    fn handler_receives_the_stripped_payload() {
        let mut registry = Registry::<Cmd, Msg>::new();
        let payloads = Arc::new(std::sync::Mutex::new(std::vec::Vec::new()));
        let sink = payloads.clone();
        registry.register_cmd(
            Cmd::Fourth,
            Box::new(move |payload| {
                sink.lock().unwrap().push(payload);
                HandlerResult::Keep
            }),
        );

        registry.dispatch("+FOURTH: ARGENTINA");
        registry.dispatch("+FOURTH:CHILE");
        assert_eq!(&["ARGENTINA", "CHILE"], payloads.lock().unwrap().as_slice());
    }

    #[test]
    fn message_handlers_match_on_their_token() {
        let mut registry = Registry::<Cmd, Msg>::new();
        let (calls, seen) = counter();
        registry.register_msg(
            Msg::Ring,
            Box::new(move || {
                calls.fetch_add(1, Ordering::Relaxed);
                HandlerResult::Remove
            }),
        );

        registry.dispatch("NO CARRIER");
        registry.dispatch("RING");
        registry.dispatch("RING");
        assert_eq!(1, seen.load(Ordering::Relaxed));
    }

    #[test]
    fn echo_never_reaches_handlers() {
        let mut registry = Registry::<Cmd, Msg>::new();
        let (calls, seen) = counter();
        registry.register_msg(
            Msg::Ready,
            Box::new(move || {
                calls.fetch_add(1, Ordering::Relaxed);
                HandlerResult::Keep
            }),
        );

        // Would match the token, but anything starting with "AT" is treated
        // as local echo and dropped before the walk.
        registry.dispatch("ATREADY");
        assert_eq!(0, seen.load(Ordering::Relaxed));
    }
}
