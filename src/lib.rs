//! # libthingspeak - non-blocking ThingSpeak client
//!
//! A Rust client for [ThingSpeak](https://www.thingspeak.com), the open IoT
//! data platform, designed for embedded systems and `no_std` environments.
//! The whole HTTP exchange is poll-driven: no operation ever blocks the
//! caller, no OS threads are used, and every buffer is fixed-capacity.
//!
//! ## Features
//!
//! - **Channel writes**: single-field, staged multi-field (with location,
//!   status message and timestamp) and raw updates
//! - **Channel reads**: latest field value as text or number, status
//!   message, creation timestamp, or the whole feed record in one request
//! - **Transport agnostic**: bring any duplex byte connection by
//!   implementing [`transport::Transport`]; TLS is the transport's concern
//! - **Cooperative**: one `poll()` call advances the in-flight request by
//!   one small increment; a 5 second response timeout keeps a silent
//!   server from wedging the device
//!
//! ## Usage
//!
//! Add this to your `Cargo.toml`:
//!
//! ```toml
//! [dependencies]
//! libthingspeak = "0.1.0"
//! ```
//!
//! Then drive a [`client::Client`] from the application loop:
//!
//! ```rust,no_run
//! use libthingspeak::client::{Client, Completion};
//! # use libthingspeak::transport::{Clock, Transport};
//! # struct Tcp;
//! # impl Transport for Tcp {
//! #     type Error = ();
//! #     fn connect(&mut self, _: &str, _: u16) -> Result<(), ()> { Ok(()) }
//! #     fn write(&mut self, _: &[u8]) -> Result<(), ()> { Ok(()) }
//! #     fn available(&mut self) -> usize { 0 }
//! #     fn read(&mut self) -> Option<u8> { None }
//! #     fn flush(&mut self) {}
//! #     fn close(&mut self) {}
//! # }
//! # struct Ticker;
//! # impl Clock for Ticker { fn now_ms(&self) -> u64 { 0 } }
//!
//! let mut client = Client::new(Tcp, Ticker);
//! client.read_field_float(1417, 3, None)?;
//!
//! loop {
//!     // ... sensor work, display updates, whatever the loop does ...
//!     if let Some(Completion::Float { status, value }) = client.poll() {
//!         // status.is_ok() => `value` is the latest reading
//!         break;
//!     }
//! }
//! # Ok::<(), libthingspeak::status::Status>(())
//! ```
//!
//! ## Platform Support
//!
//! This library is designed to work on:
//! - Embedded microcontrollers (ARM Cortex-M, RISC-V, etc.)
//! - Linux-based IoT devices (Raspberry Pi, etc.)
//! - Any platform supporting Rust's `core` library
//!
//! ## Optional Features
//!
//! - `std`: Enable standard library support (default: disabled)
//! - `defmt`: Enable defmt formatting of status codes for embedded debugging

#![cfg_attr(not(feature = "std"), no_std)]
#![deny(missing_docs)]
#![warn(missing_debug_implementations)]

#[cfg(test)]
extern crate std;

/// The poll-driven client and its operations.
pub mod client;

/// The channel feed record returned by whole-entry reads.
pub mod feed;

/// Caller-facing result codes.
pub mod status;

/// Transport and clock abstractions the client is built over.
pub mod transport;

/// Field values and their wire formatting.
pub mod value;

mod engine;
mod request;
mod response;
