//! The non-blocking ThingSpeak client.
//!
//! One request is in flight at a time. An operation method validates its
//! input, connects, and puts the request on the wire; everything after
//! that happens one small increment per [`Client::poll`] call, so the
//! caller's loop keeps running while the server thinks. When the exchange
//! resolves, `poll` hands back a [`Completion`] with the typed result.
//!
//! ```rust,no_run
//! use libthingspeak::client::{Client, Completion};
//! use libthingspeak::value::Value;
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
//!
//! // Stage a multi-field update and send it.
//! client.set_field(1, Value::Float(23.5))?;
//! client.set_field(2, Value::Int(61))?;
//! client.write_fields("XYZAB012CDEF3456")?;
//!
//! // Keep doing other work; poll once per loop iteration.
//! loop {
//!     if let Some(Completion::Write { status }) = client.poll() {
//!         // status.is_ok() => the point was inserted
//!         break;
//!     }
//! }
//! # Ok::<(), libthingspeak::status::Status>(())
//! ```

use core::fmt::Write as _;

use heapless::String;

use crate::engine::{Engine, Op, Outcome};
use crate::feed::Feed;
use crate::request;
use crate::status::Status;
use crate::transport::{Clock, Transport};
use crate::value::{FIELD_LENGTH_MAX, Value};

/// The ThingSpeak API host.
pub const HOST: &str = "api.thingspeak.com";

/// Default port for plain HTTP transports.
pub const HTTP_PORT: u16 = 80;

/// Port for transports that provide TLS themselves.
pub const HTTPS_PORT: u16 = 443;

/// `User-Agent` sent with every request.
pub const USER_AGENT: &str = concat!("tslib-rust/", env!("CARGO_PKG_VERSION"));

/// How long an awaiting step waits for the server before failing with
/// [`Status::Timeout`]. Headers and body get independent windows.
pub const TIMEOUT_MS: u64 = 5000;

/// Largest response body the client can hold.
pub const MAX_BODY_LEN: usize = 2048;

/// Lowest valid field number.
pub const FIELD_NUM_MIN: u8 = 1;

/// Highest valid field number.
pub const FIELD_NUM_MAX: u8 = 8;

/// Room for eight maximum-length fields plus location, status and
/// timestamp parameters.
const POST_BODY_LEN: usize = 3072;

/// Appended to every update so the server replies with the bare entry id.
const NO_HEADERS_SUFFIX: &str = "&headers=false";

/// The resolved result of an operation, returned by [`Client::poll`] on
/// the call that finishes the exchange.
#[derive(Debug, Clone, PartialEq)]
pub enum Completion {
    /// A `write_field` / `write_fields` / `write_raw` finished.
    Write {
        /// [`Status::Ok`] means the point was inserted; [`Status::NotInserted`]
        /// usually means the 15-second rate limit.
        status: Status,
    },
    /// A text read (`read_field`, `read_raw`, `read_status`,
    /// `read_created_at`) finished.
    Text {
        /// Outcome of the exchange.
        status: Status,
        /// The result text; empty unless `status` is [`Status::Ok`].
        value: String<MAX_BODY_LEN>,
    },
    /// A `read_field_long` finished.
    Long {
        /// Outcome of the exchange.
        status: Status,
        /// Converted value; `0` on failure or non-numeric text.
        value: i64,
    },
    /// A `read_field_int` finished.
    Int {
        /// Outcome of the exchange.
        status: Status,
        /// Converted value; `0` on failure or non-numeric text.
        value: i32,
    },
    /// A `read_field_float` finished.
    Float {
        /// Outcome of the exchange.
        status: Status,
        /// Converted value; `0.0` on failure or non-numeric text.
        value: f32,
    },
    /// A `read_feed` finished; the record is available via [`Client::feed`].
    Feed {
        /// Outcome of the exchange.
        status: Status,
    },
}

impl Completion {
    /// The status of the exchange, regardless of the operation kind.
    pub fn status(&self) -> Status {
        match *self {
            Completion::Write { status }
            | Completion::Text { status, .. }
            | Completion::Long { status, .. }
            | Completion::Int { status, .. }
            | Completion::Float { status, .. }
            | Completion::Feed { status } => status,
        }
    }
}

/// A poll-driven ThingSpeak client over any [`Transport`] and [`Clock`].
///
/// Operations must not be started while another is in flight; check
/// [`Client::is_busy`] first. The client never queues requests.
#[derive(Debug)]
pub struct Client<T: Transport, C: Clock> {
    engine: Engine<T, C>,
    port: u16,
    next_fields: [String<FIELD_LENGTH_MAX>; 8],
    next_latitude: Option<f32>,
    next_longitude: Option<f32>,
    next_elevation: Option<f32>,
    next_status: String<FIELD_LENGTH_MAX>,
    next_created_at: String<FIELD_LENGTH_MAX>,
    feed: Feed,
}

impl<T: Transport, C: Clock> Client<T, C> {
    /// Create a client over an unconnected transport, talking to
    /// [`HOST`] on [`HTTP_PORT`].
    pub fn new(transport: T, clock: C) -> Self {
        Self {
            engine: Engine::new(transport, clock),
            port: HTTP_PORT,
            next_fields: Default::default(),
            next_latitude: None,
            next_longitude: None,
            next_elevation: None,
            next_status: String::new(),
            next_created_at: String::new(),
            feed: Feed::default(),
        }
    }

    /// Use a different server port, typically [`HTTPS_PORT`] when the
    /// transport performs TLS.
    pub fn set_port(&mut self, port: u16) {
        self.port = port;
    }

    /// `true` while a request is outstanding and [`Client::poll`] still
    /// has work to do.
    pub fn is_busy(&self) -> bool {
        self.engine.is_busy()
    }

    /// Status of the most recently finished request.
    ///
    /// Meaningful only while no request is in flight.
    pub fn last_status(&self) -> Status {
        self.engine.last_status()
    }

    /// The record fetched by the last successful `read_feed`.
    pub fn feed(&self) -> &Feed {
        &self.feed
    }

    /// Advance the in-flight request by one increment of work.
    ///
    /// Call this from the application loop. Returns `Some` exactly once
    /// per request, on the poll that resolves it; `None` while idle or
    /// still waiting.
    pub fn poll(&mut self) -> Option<Completion> {
        let Outcome { op, status, body } = self.engine.poll()?;
        Some(match op {
            Op::Write => {
                let status = if status.is_ok() && crate::value::parse_long(&body) == 0 {
                    // The server echoes entry id 0 when the point was
                    // rejected, most likely by the rate limit.
                    Status::NotInserted
                } else {
                    status
                };
                Completion::Write { status }
            }
            Op::ReadText => Completion::Text {
                status,
                value: body,
            },
            Op::ReadLong => Completion::Long {
                status,
                value: crate::value::parse_long(&body),
            },
            Op::ReadInt => Completion::Int {
                status,
                value: crate::value::parse_long(&body) as i32,
            },
            Op::ReadFloat => Completion::Float {
                status,
                value: crate::value::parse_float(&body),
            },
            Op::ReadStatusField => {
                let feed = Feed::from_json(&body);
                let mut value = String::new();
                let _ = value.push_str(feed.status());
                Completion::Text { status, value }
            }
            Op::ReadCreatedAt => {
                let feed = Feed::from_json(&body);
                let mut value = String::new();
                let _ = value.push_str(feed.created_at());
                Completion::Text { status, value }
            }
            Op::ReadFeed => {
                self.feed = if status.is_ok() {
                    Feed::from_json(&body)
                } else {
                    Feed::default()
                };
                Completion::Feed { status }
            }
        })
    }

    // --- staging a multi-field update -------------------------------------

    /// Stage the value of one field (1-8) for the next `write_fields`.
    pub fn set_field(&mut self, field: u8, value: Value<'_>) -> Result<(), Status> {
        check_field(field)?;
        self.next_fields[usize::from(field - 1)] = value.render()?;
        Ok(())
    }

    /// Stage the latitude of the next update (degrees N, negative for S).
    pub fn set_latitude(&mut self, latitude: f32) {
        self.next_latitude = Some(latitude);
    }

    /// Stage the longitude of the next update (degrees E, negative for W).
    pub fn set_longitude(&mut self, longitude: f32) {
        self.next_longitude = Some(longitude);
    }

    /// Stage the elevation of the next update (meters above sea level).
    pub fn set_elevation(&mut self, elevation: f32) {
        self.next_elevation = Some(elevation);
    }

    /// Stage the status message of the next update (up to 255 bytes).
    pub fn set_status(&mut self, status: &str) -> Result<(), Status> {
        self.next_status = text_field(status)?;
        Ok(())
    }

    /// Stage the creation timestamp of the next update.
    ///
    /// ISO 8601, e.g. `"2024-01-12 13:22:54-05"`; UTC is assumed when no
    /// offset is given. The format is not validated locally, the API
    /// reports a problem instead.
    pub fn set_created_at(&mut self, created_at: &str) -> Result<(), Status> {
        self.next_created_at = text_field(created_at)?;
        Ok(())
    }

    // --- writes ------------------------------------------------------------

    /// Send every staged field and parameter as one channel update.
    ///
    /// `api_key` is the channel's write API key. Fails synchronously with
    /// [`Status::SetFieldNotCalled`] when nothing was staged; the final
    /// outcome arrives as [`Completion::Write`].
    pub fn write_fields(&mut self, api_key: &str) -> Result<(), Status> {
        let mut body: String<POST_BODY_LEN> = String::new();
        for (index, field) in self.next_fields.iter().enumerate() {
            if field.is_empty() {
                continue;
            }
            separate(&mut body);
            write!(body, "field{}={}", index + 1, field).unwrap();
        }
        if let Some(latitude) = self.next_latitude {
            separate(&mut body);
            write!(body, "lat={:.5}", latitude).unwrap();
        }
        if let Some(longitude) = self.next_longitude {
            separate(&mut body);
            write!(body, "long={:.5}", longitude).unwrap();
        }
        if let Some(elevation) = self.next_elevation {
            separate(&mut body);
            write!(body, "elevation={:.5}", elevation).unwrap();
        }
        if !self.next_status.is_empty() {
            separate(&mut body);
            write!(body, "status={}", self.next_status).unwrap();
        }
        if !self.next_created_at.is_empty() {
            separate(&mut body);
            write!(body, "created_at={}", self.next_created_at).unwrap();
        }
        if body.is_empty() {
            return Err(self.sync_fail(Status::SetFieldNotCalled));
        }
        body.push_str(NO_HEADERS_SUFFIX).unwrap();
        self.start_write(&body, api_key)
    }

    /// Write a single value to one field (1-8) of the channel.
    pub fn write_field(&mut self, field: u8, value: Value<'_>, api_key: &str) -> Result<(), Status> {
        check_field(field).map_err(|e| self.sync_fail(e))?;
        let rendered = value.render().map_err(|e| self.sync_fail(e))?;
        let mut body: String<POST_BODY_LEN> = String::new();
        write!(body, "field{}={}{}", field, rendered, NO_HEADERS_SUFFIX).unwrap();
        self.start_write(&body, api_key)
    }

    /// Write a caller-built url-encoded update body.
    ///
    /// Low level; see the channel update documentation for the accepted
    /// parameters.
    pub fn write_raw(&mut self, body: &str, api_key: &str) -> Result<(), Status> {
        let mut full: String<POST_BODY_LEN> = String::new();
        full.push_str(body)
            .and_then(|_| full.push_str(NO_HEADERS_SUFFIX))
            .map_err(|_| self.sync_fail(Status::OutOfRange))?;
        self.start_write(&full, api_key)
    }

    // --- reads ---------------------------------------------------------

    /// Read the latest value of a field (1-8) as text.
    ///
    /// `api_key` is the channel's read key, `None` for a public channel.
    /// The outcome arrives as [`Completion::Text`].
    pub fn read_field(
        &mut self,
        channel: u32,
        field: u8,
        api_key: Option<&str>,
    ) -> Result<(), Status> {
        self.start_field_read(channel, field, api_key, Op::ReadText)
    }

    /// Read the latest value of a field as an `i64` ([`Completion::Long`]).
    pub fn read_field_long(
        &mut self,
        channel: u32,
        field: u8,
        api_key: Option<&str>,
    ) -> Result<(), Status> {
        self.start_field_read(channel, field, api_key, Op::ReadLong)
    }

    /// Read the latest value of a field as an `i32` ([`Completion::Int`]).
    pub fn read_field_int(
        &mut self,
        channel: u32,
        field: u8,
        api_key: Option<&str>,
    ) -> Result<(), Status> {
        self.start_field_read(channel, field, api_key, Op::ReadInt)
    }

    /// Read the latest value of a field as an `f32` ([`Completion::Float`]).
    pub fn read_field_float(
        &mut self,
        channel: u32,
        field: u8,
        api_key: Option<&str>,
    ) -> Result<(), Status> {
        self.start_field_read(channel, field, api_key, Op::ReadFloat)
    }

    /// Read the status message of the channel's latest entry
    /// ([`Completion::Text`]).
    pub fn read_status(&mut self, channel: u32, api_key: Option<&str>) -> Result<(), Status> {
        self.start_read(channel, "/feeds/last.txt?status=true", api_key, Op::ReadStatusField)
    }

    /// Read the creation timestamp of the channel's latest entry
    /// ([`Completion::Text`]).
    pub fn read_created_at(&mut self, channel: u32, api_key: Option<&str>) -> Result<(), Status> {
        self.start_read(channel, "/feeds/last.txt", api_key, Op::ReadCreatedAt)
    }

    /// Read the channel's latest entry with every field, its location and
    /// status in one request. On [`Completion::Feed`] the record is
    /// available from [`Client::feed`].
    pub fn read_feed(&mut self, channel: u32, api_key: Option<&str>) -> Result<(), Status> {
        self.start_read(
            channel,
            "/feeds/last.txt?status=true&location=true",
            api_key,
            Op::ReadFeed,
        )
    }

    /// Issue a raw GET under `/channels/<channel>`; `suffix` must start
    /// with `/`. Low level; the outcome arrives as [`Completion::Text`]
    /// with the unparsed body.
    pub fn read_raw(
        &mut self,
        channel: u32,
        suffix: &str,
        api_key: Option<&str>,
    ) -> Result<(), Status> {
        self.start_read(channel, suffix, api_key, Op::ReadText)
    }

    // --- shared start paths ------------------------------------------------

    fn start_field_read(
        &mut self,
        channel: u32,
        field: u8,
        api_key: Option<&str>,
        op: Op,
    ) -> Result<(), Status> {
        check_field(field).map_err(|e| self.sync_fail(e))?;
        let mut suffix: String<32> = String::new();
        write!(suffix, "/fields/{}/last", field).unwrap();
        self.start_read(channel, &suffix, api_key, op)
    }

    fn start_read(
        &mut self,
        channel: u32,
        suffix: &str,
        api_key: Option<&str>,
        op: Op,
    ) -> Result<(), Status> {
        debug_assert!(!self.is_busy());
        let mut path: String<256> = String::new();
        write!(path, "/channels/{}", channel)
            .map_err(|_| Status::OutOfRange)
            .and_then(|_| path.push_str(suffix).map_err(|_| Status::OutOfRange))
            .map_err(|e| self.sync_fail(e))?;
        self.engine.connect(self.port)?;
        if request::send_get(self.engine.transport_mut(), &path, api_key).is_err() {
            return Err(self.engine.abort(Status::UnexpectedFail));
        }
        self.engine.begin_exchange(op);
        Ok(())
    }

    fn start_write(&mut self, body: &str, api_key: &str) -> Result<(), Status> {
        debug_assert!(!self.is_busy());
        self.engine.connect(self.port)?;
        if request::send_post(self.engine.transport_mut(), "/update", body, Some(api_key)).is_err()
        {
            self.reset_write_fields();
            return Err(self.engine.abort(Status::UnexpectedFail));
        }
        self.reset_write_fields();
        self.engine.begin_exchange(Op::Write);
        Ok(())
    }

    fn sync_fail(&mut self, status: Status) -> Status {
        self.engine.record_status(status);
        status
    }

    fn reset_write_fields(&mut self) {
        for field in &mut self.next_fields {
            field.clear();
        }
        self.next_latitude = None;
        self.next_longitude = None;
        self.next_elevation = None;
        self.next_status.clear();
        self.next_created_at.clear();
    }
}

fn check_field(field: u8) -> Result<(), Status> {
    if !(FIELD_NUM_MIN..=FIELD_NUM_MAX).contains(&field) {
        return Err(Status::InvalidFieldNumber);
    }
    Ok(())
}

fn text_field(text: &str) -> Result<String<FIELD_LENGTH_MAX>, Status> {
    String::try_from(text).map_err(|_| Status::OutOfRange)
}

fn separate<const N: usize>(body: &mut String<N>) {
    if !body.is_empty() {
        let _ = body.push('&');
    }
}
