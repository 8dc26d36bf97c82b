//! Interrupt-driven AT command (Hayes) driver for embedded serial links.
//!
//! A caller task composes a command such as `AT+CREG?`, hands it to the
//! driver and blocks until the peripheral's `OK`/`ERROR`/`+CME ERROR`
//! arrives or a timeout expires, while the byte-level I/O runs entirely in
//! the UART interrupts. Unsolicited lines (`RING`, `+CREG: ...` outside a
//! session) are routed to registered handlers. The `>` prompt exchange of
//! commands like `AT+CMGS` is handled through [`AtClient::send_prompted`].
//!
//! The command and unsolicited-message namespaces are declared by the user
//! with the [`at_commands!`] and [`at_urc_messages!`] macros.
//!
//! # Wiring
//!
//! One [`AtClient`] value is created during system init and shared by
//! reference with the two UART interrupt handlers and a dedicated RX task.
//! The driver does not create tasks and does not own a notification
//! primitive: [`AtClient::on_rx_byte`] returns `true` whenever the RX task
//! should be woken, and the RX task answers each wake-up with a call to
//! [`AtClient::process`].
//!
//! ```ignore
//! use atlink::{at_commands, at_urc_messages, AtClient, CmdKind, Config};
//! use embassy_time::Duration;
//! use static_cell::StaticCell;
//!
//! at_commands! {
//!     pub enum Cmd {
//!         Base = bare "",
//!         Echo = bare "E",
//!         Creg = extended "CREG",
//!         Cmgs = extended "CMGS",
//!     }
//! }
//!
//! at_urc_messages! {
//!     pub enum Msg {
//!         Ring = "RING",
//!         NoCarrier = "NO CARRIER",
//!     }
//! }
//!
//! static CLIENT: StaticCell<AtClient<Uart, Cmd, Msg, 256>> = StaticCell::new();
//! let client = &*CLIENT.init(AtClient::new(uart, Config::new()));
//!
//! // UART RX interrupt:
//! if client.on_rx_byte(byte) {
//!     notify_rx_task_from_isr();
//! }
//!
//! // UART TX interrupt:
//! client.on_tx_ready();
//!
//! // Dedicated RX task:
//! client.enable_receiver();
//! loop {
//!     wait_for_notification();
//!     client.process();
//! }
//!
//! // Any caller task:
//! let registration = client.send(Cmd::Creg, CmdKind::Read, Duration::from_secs(5))?;
//! ```
//!
//! # Requirements on the integrator
//!
//! - a global allocator (payload strings are owned heap buffers),
//! - a [`critical-section`](https://crates.io/crates/critical-section)
//!   implementation,
//! - an [`embassy-time`](https://crates.io/crates/embassy-time) driver for
//!   the timeout clock.
//!
//! # Optional Cargo features
//!
//! - **`defmt`** - log statements via `defmt`.
//! - **`log`** - log statements via `log`. Mutually exclusive with `defmt`.

#![cfg_attr(not(test), no_std)]
#![deny(rust_2018_compatibility)]
#![deny(rust_2018_idioms)]

extern crate alloc;

// This mod MUST go first, so that the others see its macros.
mod fmt;

mod client;
mod command;
mod config;
mod digest;
mod error;
mod macros;
mod ring;
mod rx_buffer;
mod tx_buffer;
mod traits;
mod urc;


pub use client::{AtClient, PromptEndPolicy};
pub use command::CmdKind;
pub use config::Config;
pub use error::Error;
pub use traits::{AtCommand, AtUart, UrcMessage};
pub use urc::HandlerResult;
