//! Incremental scanning of a buffered HTTP response.
//!
//! The engine never blocks on the transport: each poll moves whatever bytes
//! have arrived into a fixed accumulation buffer and then asks this module
//! whether the next protocol element can be extracted yet. Extraction is
//! all-or-nothing; a partial element leaves the buffer untouched so the
//! same question can be asked again on the next poll.

use heapless::{String, Vec};

use crate::transport::Transport;

/// Capacity of the accumulation buffer, which also bounds the body size.
pub(crate) const RX_CAPACITY: usize = 2048;

/// Literal expected at the start of every response.
const STATUS_MARKER: &[u8] = b"HTTP/1.1";

/// The one header the client consults.
const CONTENT_LENGTH: &[u8] = b"Content-Length:";

/// End-of-headers terminator.
const HEADER_END: &[u8] = b"\r\n\r\n";

/// Fewest bytes a status line can occupy (`HTTP/1.1 200 OK\r\n`); with this
/// many buffered and no marker found, the response cannot be well-formed.
const STATUS_LINE_MIN: usize = 17;

/// Result of asking for the next protocol element.
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum Scan<T> {
    /// The element was extracted and consumed from the buffer.
    Ready(T),
    /// Not enough bytes buffered yet; ask again after the next fill.
    Incomplete,
    /// The buffered bytes cannot form the expected element.
    Malformed,
}

/// Accumulates received bytes and hands out decoded protocol elements.
#[derive(Debug, Default)]
pub(crate) struct ResponseBuffer {
    buf: Vec<u8, RX_CAPACITY>,
}

impl ResponseBuffer {
    /// Drop everything buffered; called before each new request.
    pub(crate) fn clear(&mut self) {
        self.buf.clear();
    }

    /// Move every byte the transport has ready into the buffer, up to
    /// capacity. Anything beyond capacity stays with the transport and is
    /// drained when the connection closes.
    pub(crate) fn fill<T: Transport>(&mut self, transport: &mut T) {
        while !self.buf.is_full() && transport.available() > 0 {
            match transport.read() {
                Some(byte) => {
                    // Capacity was just checked.
                    let _ = self.buf.push(byte);
                }
                None => break,
            }
        }
    }

    /// Extract the status code from the status line.
    ///
    /// Ready once the literal `HTTP/1.1` marker and a complete digit run
    /// after it are buffered. Malformed when enough bytes for a status line
    /// are present without the marker.
    pub(crate) fn take_status_code(&mut self) -> Scan<i16> {
        let Some(at) = find(&self.buf, STATUS_MARKER) else {
            if self.buf.len() >= STATUS_LINE_MIN || self.buf.is_full() {
                return Scan::Malformed;
            }
            return Scan::Incomplete;
        };
        match self.scan_integer(at + STATUS_MARKER.len()) {
            Scan::Ready((value, end)) => {
                self.consume(end);
                match i16::try_from(value) {
                    Ok(code) => Scan::Ready(code),
                    Err(_) => Scan::Malformed,
                }
            }
            Scan::Incomplete => Scan::Incomplete,
            Scan::Malformed => Scan::Malformed,
        }
    }

    /// Extract the `Content-Length` value from the header block.
    ///
    /// Malformed when the end of the headers arrives without the header, or
    /// its value is not a decimal integer.
    pub(crate) fn take_content_length(&mut self) -> Scan<usize> {
        let Some(at) = find(&self.buf, CONTENT_LENGTH) else {
            if find(&self.buf, HEADER_END).is_some() || self.buf.is_full() {
                return Scan::Malformed;
            }
            return Scan::Incomplete;
        };
        match self.scan_integer(at + CONTENT_LENGTH.len()) {
            Scan::Ready((value, end)) => {
                self.consume(end);
                Scan::Ready(value as usize)
            }
            Scan::Incomplete => Scan::Incomplete,
            Scan::Malformed => Scan::Malformed,
        }
    }

    /// Consume through the blank line that terminates the header block.
    pub(crate) fn take_header_end(&mut self) -> Scan<()> {
        match find(&self.buf, HEADER_END) {
            Some(at) => {
                self.consume(at + HEADER_END.len());
                Scan::Ready(())
            }
            None if self.buf.is_full() => Scan::Malformed,
            None => Scan::Incomplete,
        }
    }

    /// Take exactly `length` body bytes as text.
    ///
    /// The body is precisely the declared `Content-Length`, never
    /// "whatever has arrived".
    pub(crate) fn take_body<const N: usize>(
        &mut self,
        length: usize,
        out: &mut String<N>,
    ) -> Scan<()> {
        if self.buf.len() < length {
            return Scan::Incomplete;
        }
        out.clear();
        match core::str::from_utf8(&self.buf[..length]) {
            Ok(text) if out.push_str(text).is_ok() => {
                self.consume(length);
                Scan::Ready(())
            }
            _ => Scan::Malformed,
        }
    }

    /// Scan a decimal integer starting at `from`, skipping leading spaces.
    ///
    /// Ready only when a byte after the digit run proves the run is over;
    /// digits flush against the end of the buffer may still be growing.
    fn scan_integer(&self, from: usize) -> Scan<(u32, usize)> {
        let mut pos = from;
        while self.buf.get(pos) == Some(&b' ') {
            pos += 1;
        }
        let start = pos;
        let mut value: u32 = 0;
        while let Some(&byte) = self.buf.get(pos) {
            if !byte.is_ascii_digit() {
                break;
            }
            match value
                .checked_mul(10)
                .and_then(|v| v.checked_add(u32::from(byte - b'0')))
            {
                Some(v) => value = v,
                None => return Scan::Malformed,
            }
            pos += 1;
        }
        if pos == self.buf.len() && !self.buf.is_full() {
            // The run may continue with the next delivery.
            return Scan::Incomplete;
        }
        if pos == start {
            return Scan::Malformed;
        }
        Scan::Ready((value, pos))
    }

    /// Discard the first `n` buffered bytes.
    fn consume(&mut self, n: usize) {
        let remaining = self.buf.len() - n;
        self.buf.copy_within(n.., 0);
        self.buf.truncate(remaining);
    }
}

/// First position of `needle` in `haystack`.
fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn buffer_with(bytes: &[u8]) -> ResponseBuffer {
        let mut rx = ResponseBuffer::default();
        rx.buf.extend_from_slice(bytes).unwrap();
        rx
    }

    #[test]
    fn status_code_needs_a_terminated_digit_run() {
        let mut rx = buffer_with(b"HTTP/1.1 20");
        assert_eq!(rx.take_status_code(), Scan::Incomplete);

        let mut rx = buffer_with(b"HTTP/1.1 200 OK\r\n");
        assert_eq!(rx.take_status_code(), Scan::Ready(200));
        // The rest of the line is still buffered.
        assert_eq!(&rx.buf[..], b" OK\r\n");
    }

    #[test]
    fn status_line_without_marker_is_malformed() {
        let mut rx = buffer_with(b"ICY 200 OK\r\nSome: h");
        assert_eq!(rx.take_status_code(), Scan::Malformed);
    }

    #[test]
    fn short_garbage_is_still_incomplete() {
        let mut rx = buffer_with(b"HT");
        assert_eq!(rx.take_status_code(), Scan::Incomplete);
    }

    #[test]
    fn content_length_is_scanned_anywhere_in_the_headers() {
        let mut rx = buffer_with(b"Date: now\r\nContent-Length: 42\r\nX: y\r\n");
        assert_eq!(rx.take_content_length(), Scan::Ready(42));
    }

    #[test]
    fn header_end_without_content_length_is_malformed() {
        let mut rx = buffer_with(b"Date: now\r\n\r\n");
        assert_eq!(rx.take_content_length(), Scan::Malformed);
    }

    #[test]
    fn header_end_consumes_the_terminator() {
        let mut rx = buffer_with(b" 42\r\n\r\n12.5");
        assert_eq!(rx.take_header_end(), Scan::Ready(()));
        assert_eq!(&rx.buf[..], b"12.5");
    }

    #[test]
    fn body_is_byte_exact() {
        let mut rx = buffer_with(b"12.5extra");
        let mut body: String<16> = String::new();
        assert_eq!(rx.take_body(4, &mut body), Scan::Ready(()));
        assert_eq!(body.as_str(), "12.5");
        assert_eq!(&rx.buf[..], b"extra");
    }

    #[test]
    fn partial_body_waits() {
        let mut rx = buffer_with(b"12");
        let mut body: String<16> = String::new();
        assert_eq!(rx.take_body(4, &mut body), Scan::Incomplete);
        rx.buf.extend_from_slice(b".5").unwrap();
        assert_eq!(rx.take_body(4, &mut body), Scan::Ready(()));
        assert_eq!(body.as_str(), "12.5");
    }

    #[test]
    fn invalid_utf8_body_is_malformed() {
        let mut rx = buffer_with(&[0xFF, 0xFE, 0x00, 0x01]);
        let mut body: String<16> = String::new();
        assert_eq!(rx.take_body(4, &mut body), Scan::Malformed);
    }

    #[test]
    fn fill_respects_capacity() {
        struct Canned(heapless::Deque<u8, 8>);
        impl Transport for Canned {
            type Error = ();
            fn connect(&mut self, _: &str, _: u16) -> Result<(), ()> {
                Ok(())
            }
            fn write(&mut self, _: &[u8]) -> Result<(), ()> {
                Ok(())
            }
            fn available(&mut self) -> usize {
                self.0.len()
            }
            fn read(&mut self) -> Option<u8> {
                self.0.pop_front()
            }
            fn flush(&mut self) {}
            fn close(&mut self) {}
        }

        let mut canned = Canned(heapless::Deque::new());
        for byte in b"abcd" {
            canned.0.push_back(*byte).unwrap();
        }
        let mut rx = ResponseBuffer::default();
        rx.fill(&mut canned);
        assert_eq!(&rx.buf[..], b"abcd");
        assert_eq!(canned.available(), 0);
    }
}
