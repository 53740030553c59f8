//! Live tests against the real ThingSpeak API over TCP.
//!
//! The read test targets the public CheerLights channel by default and can
//! be pointed elsewhere with `TEST_THINGSPEAK_CHANNEL`. The write test only
//! runs when `TEST_THINGSPEAK_WRITE_KEY` is set (in the environment or a
//! `.env` file), since updates need a channel of their own.

use std::collections::VecDeque;
use std::env;
use std::io::{ErrorKind, Read as StdRead, Write as StdWrite};
use std::net::TcpStream;
use std::time::{Duration, Instant};

use dotenvy::dotenv;
use libthingspeak::client::{Client, Completion};
use libthingspeak::status::Status;
use libthingspeak::transport::{Clock, Transport};
use libthingspeak::value::Value;

#[derive(Default)]
struct NetTransport {
    stream: Option<TcpStream>,
    rx: VecDeque<u8>,
}

impl NetTransport {
    /// Pull whatever the socket has ready without blocking.
    fn pump(&mut self) {
        let Some(stream) = &mut self.stream else {
            return;
        };
        let mut chunk = [0u8; 256];
        loop {
            match stream.read(&mut chunk) {
                Ok(0) => break,
                Ok(n) => self.rx.extend(&chunk[..n]),
                Err(e) if e.kind() == ErrorKind::WouldBlock => break,
                Err(_) => break,
            }
        }
    }
}

impl Transport for NetTransport {
    type Error = std::io::Error;

    fn connect(&mut self, host: &str, port: u16) -> Result<(), Self::Error> {
        let stream = TcpStream::connect((host, port))?;
        stream.set_nonblocking(true)?;
        self.stream = Some(stream);
        self.rx.clear();
        Ok(())
    }

    fn write(&mut self, mut buf: &[u8]) -> Result<(), Self::Error> {
        let stream = self
            .stream
            .as_mut()
            .ok_or_else(|| std::io::Error::new(ErrorKind::NotConnected, "not connected"))?;
        while !buf.is_empty() {
            match stream.write(buf) {
                Ok(n) => buf = &buf[n..],
                Err(e) if e.kind() == ErrorKind::WouldBlock => continue,
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }

    fn available(&mut self) -> usize {
        self.pump();
        self.rx.len()
    }

    fn read(&mut self) -> Option<u8> {
        if self.rx.is_empty() {
            self.pump();
        }
        self.rx.pop_front()
    }

    fn flush(&mut self) {
        if let Some(stream) = &mut self.stream {
            let _ = stream.flush();
        }
    }

    fn close(&mut self) {
        if let Some(stream) = self.stream.take() {
            let _ = stream.shutdown(std::net::Shutdown::Both);
        }
    }
}

struct WallClock(Instant);

impl Clock for WallClock {
    fn now_ms(&self) -> u64 {
        self.0.elapsed().as_millis() as u64
    }
}

fn drive(client: &mut Client<NetTransport, WallClock>) -> Completion {
    let deadline = Instant::now() + Duration::from_secs(30);
    loop {
        if let Some(completion) = client.poll() {
            return completion;
        }
        assert!(Instant::now() < deadline, "no completion within 30 s");
        std::thread::sleep(Duration::from_millis(10));
    }
}

#[test]
fn live_read_public_channel_field() {
    dotenv().ok();
    let channel = env::var("TEST_THINGSPEAK_CHANNEL")
        .map(|v| v.parse().expect("TEST_THINGSPEAK_CHANNEL must be a number"))
        .unwrap_or(1417);

    let mut client = Client::new(NetTransport::default(), WallClock(Instant::now()));
    client
        .read_field(channel, 1, None)
        .expect("failed to start the read");

    match drive(&mut client) {
        Completion::Text { status, value } => {
            assert!(status.is_ok(), "read failed: {:?}", status);
            assert!(!value.is_empty());
        }
        other => panic!("unexpected completion: {:?}", other),
    }
}

#[test]
fn live_write_field() {
    dotenv().ok();
    let Ok(key) = env::var("TEST_THINGSPEAK_WRITE_KEY") else {
        eprintln!("TEST_THINGSPEAK_WRITE_KEY not set, skipping");
        return;
    };

    let mut client = Client::new(NetTransport::default(), WallClock(Instant::now()));
    client.set_field(1, Value::Float(23.5)).unwrap();
    client.set_status("live test").unwrap();
    client.write_fields(&key).expect("failed to start the write");

    match drive(&mut client) {
        // NotInserted is the rate limit, not a client defect.
        Completion::Write { status } => assert!(
            status == Status::Ok || status == Status::NotInserted,
            "write failed: {:?}",
            status
        ),
        other => panic!("unexpected completion: {:?}", other),
    }
}
