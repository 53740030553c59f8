//! Byte-stream transport and time source abstractions.
//!
//! The client is transport agnostic: anything that can open a duplex byte
//! connection to the ThingSpeak server can drive it, whether that is an
//! on-chip TCP/IP stack, a cellular modem behind AT commands, or a plain
//! `std::net::TcpStream` on a Linux gateway. The same goes for time: the
//! engine only ever compares monotonic millisecond timestamps, so any free
//! running tick counter is a valid [`Clock`].

/// A duplex byte-stream connection to the server.
///
/// The contract is deliberately small so it can be satisfied by constrained
/// network stacks that only expose "how many bytes are waiting" and
/// "give me one byte" primitives.
///
/// Implementations must be non-blocking: [`Transport::available`] and
/// [`Transport::read`] report what has already arrived and never wait for
/// more data.
pub trait Transport {
    /// Associated error type for connect and write failures.
    type Error: core::fmt::Debug;

    /// Open a connection to `host:port`.
    fn connect(&mut self, host: &str, port: u16) -> Result<(), Self::Error>;

    /// Write the whole buffer to the connection.
    ///
    /// An error means the connection is broken; the engine aborts the
    /// in-flight request when this happens.
    fn write(&mut self, buf: &[u8]) -> Result<(), Self::Error>;

    /// Number of received bytes that can be read without waiting.
    fn available(&mut self) -> usize;

    /// Take one received byte, or `None` when nothing is buffered.
    fn read(&mut self) -> Option<u8>;

    /// Push any locally buffered outgoing bytes onto the wire.
    fn flush(&mut self);

    /// Close the connection. Closing an already closed connection is a no-op.
    fn close(&mut self);
}

/// A monotonic millisecond time source.
///
/// Only differences between two readings are ever used, so the epoch is
/// irrelevant; wrapping is acceptable as long as the counter is monotonic
/// over the lifetime of a single request (a few seconds).
pub trait Clock {
    /// Milliseconds elapsed since some fixed, arbitrary point.
    fn now_ms(&self) -> u64;
}
