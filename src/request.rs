//! Request encoding straight onto the transport.
//!
//! Requests are written piecewise in wire order. Every write is checked so
//! a broken pipe aborts the request immediately instead of sending a
//! truncated header block.

use core::fmt::Write as _;

use heapless::String;

use crate::client::{HOST, USER_AGENT};
use crate::transport::Transport;

/// Send a complete GET request for `path`.
pub(crate) fn send_get<T: Transport>(
    transport: &mut T,
    path: &str,
    api_key: Option<&str>,
) -> Result<(), T::Error> {
    transport.write(b"GET ")?;
    transport.write(path.as_bytes())?;
    transport.write(b" HTTP/1.1\r\n")?;
    write_common_headers(transport, api_key)?;
    transport.write(b"\r\n")?;
    transport.flush();
    Ok(())
}

/// Send a complete POST request with a url-encoded `body`.
///
/// `Content-Length` is the exact byte count of `body`.
pub(crate) fn send_post<T: Transport>(
    transport: &mut T,
    path: &str,
    body: &str,
    api_key: Option<&str>,
) -> Result<(), T::Error> {
    transport.write(b"POST ")?;
    transport.write(path.as_bytes())?;
    transport.write(b" HTTP/1.1\r\n")?;
    write_common_headers(transport, api_key)?;
    transport.write(b"Content-Type: application/x-www-form-urlencoded\r\n")?;
    let mut length: String<36> = String::new();
    // 36 bytes fit the header name plus any usize.
    let _ = write!(length, "Content-Length: {}\r\n", body.len());
    transport.write(length.as_bytes())?;
    transport.write(b"\r\n")?;
    transport.write(body.as_bytes())?;
    transport.flush();
    Ok(())
}

fn write_common_headers<T: Transport>(
    transport: &mut T,
    api_key: Option<&str>,
) -> Result<(), T::Error> {
    transport.write(b"Host: ")?;
    transport.write(HOST.as_bytes())?;
    transport.write(b"\r\n")?;
    transport.write(b"User-Agent: ")?;
    transport.write(USER_AGENT.as_bytes())?;
    transport.write(b"\r\n")?;
    if let Some(key) = api_key {
        transport.write(b"X-THINGSPEAKAPIKEY: ")?;
        transport.write(key.as_bytes())?;
        transport.write(b"\r\n")?;
    }
    Ok(())
}
