//! The caller-facing session type.

mod auth;
mod conn;

use std::io::{Read, Write};
use std::thread;

use conn::Connection;
pub use conn::{ConnectionState, Transport};

use crate::config::Config;
use crate::error::{Error, Result};
use crate::protocol::reply::ParsedReply;

/// A logged-in API session over a blocking transport.
///
/// Strictly request/response: one sentence goes out, one reply comes
/// back, and sending again while a reply is pending is a contract
/// violation (`Error::Misuse`). Command failures (`!trap`) come back as
/// ordinary replies so the trailer can be inspected; a `!fatal` reply is
/// also returned, after which the connection is gone.
pub struct Client<S: Read + Write> {
    conn: Connection<S>,
    config: Config,
}

impl<S: Read + Write> std::fmt::Debug for Client<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("conn", &self.conn)
            .field("config", &self.config)
            .finish()
    }
}

impl Client<Transport> {
    /// Dials the configured router and logs in, cycling through up to
    /// `attempts` open-and-login rounds with `delay` of sleep between
    /// failed ones.
    pub fn connect(config: Config) -> Result<Client<Transport>> {
        Client::connect_with(config, conn::open_transport)
    }
}

impl<S: Read + Write> Client<S> {
    /// Logs in over an already-connected transport. The transport is
    /// consumed; on any failure it is dropped, which closes it.
    pub fn handshake(config: Config, stream: S) -> Result<Client<S>> {
        let mut conn = Connection::attach(stream);
        conn.logging_in();
        auth::login(&mut conn, &config)?;
        conn.ready();
        Ok(Client { conn, config })
    }

    fn connect_with<F>(config: Config, mut open: F) -> Result<Client<S>>
    where
        F: FnMut(&Config) -> Result<S>,
    {
        let attempts = config.attempts;
        let mut last = None;
        for attempt in 1..=attempts {
            if attempt > 1 {
                thread::sleep(config.delay);
            }
            let result =
                open(&config).and_then(|stream| Client::handshake(config.clone(), stream));
            match result {
                Ok(client) => return Ok(client),
                Err(error) => {
                    tracing::warn!(attempt, attempts, %error, "connection attempt failed");
                    last = Some(error);
                }
            }
        }
        Err(Error::ConnectionFailed {
            attempts,
            source: Box::new(last.unwrap_or(Error::NotConnected)),
        })
    }

    /// Sends one request sentence and reads its reply.
    ///
    /// The first word must be a command word (starting with `/`); the
    /// rest are preformed attribute, API or `.tag` words.
    pub fn request<I, W>(&mut self, words: I) -> Result<ParsedReply>
    where
        I: IntoIterator<Item = W>,
        W: AsRef<[u8]>,
    {
        self.send(words)?;
        self.read_reply()
    }

    /// Sends a request sentence without reading the reply. Sending
    /// again before [`read_reply`](Client::read_reply) fails with
    /// `Error::Misuse`.
    pub fn send<I, W>(&mut self, words: I) -> Result<()>
    where
        I: IntoIterator<Item = W>,
        W: AsRef<[u8]>,
    {
        self.conn.send_sentence(words)
    }

    /// Reads the reply to the last request sent.
    pub fn read_reply(&mut self) -> Result<ParsedReply> {
        self.conn.read_reply()
    }

    /// Runs a command given as its path plus preformed attribute words.
    pub fn command(&mut self, path: &str, attrs: &[&str]) -> Result<ParsedReply> {
        self.request(std::iter::once(path).chain(attrs.iter().copied()))
    }

    pub fn state(&self) -> ConnectionState {
        self.conn.state()
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Shuts the transport down. Idempotent; requests made afterwards
    /// fail with `NotConnected`.
    pub fn close(&mut self) {
        self.conn.close();
    }
}
