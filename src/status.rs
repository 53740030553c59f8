//! Caller-facing result codes.
//!
//! The taxonomy mirrors the codes documented by the ThingSpeak service:
//! plain HTTP statuses are passed through (200, 400, 404, ...), while
//! negative codes are generated locally by the library itself.

/// Outcome of a ThingSpeak request.
///
/// Positive values are HTTP status codes reported by the server; negative
/// values are produced by the library before or during the exchange and
/// never touch the network.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Status {
    /// 200 - request succeeded.
    Ok,
    /// 400 - incorrect API key (or invalid server address).
    BadApiKey,
    /// 404 - incorrect API key (or invalid server address).
    BadUrl,
    /// Any other HTTP status code reported by the server.
    Http(i16),
    /// -101 - value is out of range or string is too long (> 255 bytes).
    OutOfRange,
    /// -201 - invalid field number specified.
    InvalidFieldNumber,
    /// -210 - no field was staged before `write_fields`.
    SetFieldNotCalled,
    /// -301 - failed to connect to the server.
    ConnectFailed,
    /// -302 - unexpected transport failure while sending the request.
    UnexpectedFail,
    /// -303 - unable to parse the server response.
    BadResponse,
    /// -304 - timeout waiting for the server to respond.
    Timeout,
    /// -401 - the point was not inserted (most likely the per-channel
    /// rate limit of one update every 15 seconds).
    NotInserted,
}

impl Status {
    /// The numeric code for this status.
    pub fn code(self) -> i16 {
        match self {
            Status::Ok => 200,
            Status::BadApiKey => 400,
            Status::BadUrl => 404,
            Status::Http(code) => code,
            Status::OutOfRange => -101,
            Status::InvalidFieldNumber => -201,
            Status::SetFieldNotCalled => -210,
            Status::ConnectFailed => -301,
            Status::UnexpectedFail => -302,
            Status::BadResponse => -303,
            Status::Timeout => -304,
            Status::NotInserted => -401,
        }
    }

    /// Map a numeric code back onto the taxonomy.
    ///
    /// Unknown codes (for example a 503 from the server) become
    /// [`Status::Http`].
    pub fn from_code(code: i16) -> Self {
        match code {
            200 => Status::Ok,
            400 => Status::BadApiKey,
            404 => Status::BadUrl,
            -101 => Status::OutOfRange,
            -201 => Status::InvalidFieldNumber,
            -210 => Status::SetFieldNotCalled,
            -301 => Status::ConnectFailed,
            -302 => Status::UnexpectedFail,
            -303 => Status::BadResponse,
            -304 => Status::Timeout,
            -401 => Status::NotInserted,
            other => Status::Http(other),
        }
    }

    /// `true` for [`Status::Ok`].
    pub fn is_ok(self) -> bool {
        self == Status::Ok
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for Status {
    fn format(&self, f: defmt::Formatter) {
        match self {
            Status::Http(code) => defmt::write!(f, "Http({})", code),
            other => defmt::write!(f, "Status({})", other.code()),
        }
    }
}
