//! The transport a session runs on and the state wrapped around it.

use std::io::{self, Read, Write};
use std::net::{TcpStream, ToSocketAddrs};

use crate::config::Config;
use crate::error::{Error, Result};
use crate::protocol::frame::WriteWord;
use crate::protocol::reply::{self, ParsedReply, Terminator};

/// Lifecycle of a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Opening,
    LoggingIn,
    Ready,
    Closing,
}

/// One transport plus the request/response bookkeeping on top of it.
///
/// The transport is owned exclusively; any I/O or protocol failure tears
/// it down, and every operation afterwards fails with `NotConnected`.
pub(crate) struct Connection<S> {
    stream: Option<S>,
    state: ConnectionState,
    reply_pending: bool,
}

impl<S> std::fmt::Debug for Connection<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("state", &self.state)
            .field("reply_pending", &self.reply_pending)
            .finish()
    }
}

impl<S: Read + Write> Connection<S> {
    pub(crate) fn attach(stream: S) -> Connection<S> {
        Connection {
            stream: Some(stream),
            state: ConnectionState::Opening,
            reply_pending: false,
        }
    }

    pub(crate) fn state(&self) -> ConnectionState {
        self.state
    }

    pub(crate) fn logging_in(&mut self) {
        self.state = ConnectionState::LoggingIn;
    }

    pub(crate) fn ready(&mut self) {
        tracing::debug!("connection ready");
        self.state = ConnectionState::Ready;
    }

    pub(crate) fn send_sentence<I, W>(&mut self, words: I) -> Result<()>
    where
        I: IntoIterator<Item = W>,
        W: AsRef<[u8]>,
    {
        if self.reply_pending {
            return Err(Error::Misuse(
                "a reply is pending; read it before sending the next request",
            ));
        }
        let stream = self.stream.as_mut().ok_or(Error::NotConnected)?;
        match stream.write_sentence(words) {
            Ok(()) => {
                self.reply_pending = true;
                Ok(())
            }
            Err(err @ Error::Misuse(_)) => Err(err),
            Err(err) => {
                self.teardown();
                Err(err)
            }
        }
    }

    /// Reads the reply to the last request. A `!fatal` reply is returned
    /// to the caller, with its reason, and then the transport is torn
    /// down; transport and framing errors tear it down too.
    pub(crate) fn read_reply(&mut self) -> Result<ParsedReply> {
        let stream = self.stream.as_mut().ok_or(Error::NotConnected)?;
        let result = reply::read_reply(stream);
        self.reply_pending = false;
        match result {
            Ok(reply) if reply.terminator == Terminator::Fatal => {
                tracing::warn!(
                    reason = reply.message().unwrap_or("none given"),
                    "router sent !fatal, tearing the connection down"
                );
                self.teardown();
                Ok(reply)
            }
            Ok(reply) => Ok(reply),
            Err(err) => {
                self.teardown();
                Err(err)
            }
        }
    }

    /// Idempotent shutdown. Dropping the transport closes the socket.
    pub(crate) fn close(&mut self) {
        if self.stream.is_some() {
            self.state = ConnectionState::Closing;
            tracing::debug!("closing connection");
        }
        self.teardown();
    }

    fn teardown(&mut self) {
        self.stream = None;
        self.reply_pending = false;
        self.state = ConnectionState::Disconnected;
    }
}

/// What [`Client::connect`](crate::Client::connect) dials: plain TCP, or
/// TLS over it when the config says so.
#[derive(Debug)]
pub enum Transport {
    Tcp(TcpStream),
    #[cfg(feature = "tls")]
    Tls(native_tls::TlsStream<TcpStream>),
}

impl Read for Transport {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            Transport::Tcp(stream) => stream.read(buf),
            #[cfg(feature = "tls")]
            Transport::Tls(stream) => stream.read(buf),
        }
    }
}

impl Write for Transport {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            Transport::Tcp(stream) => stream.write(buf),
            #[cfg(feature = "tls")]
            Transport::Tls(stream) => stream.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            Transport::Tcp(stream) => stream.flush(),
            #[cfg(feature = "tls")]
            Transport::Tls(stream) => stream.flush(),
        }
    }
}

pub(crate) fn open_transport(config: &Config) -> Result<Transport> {
    let host = config.host.as_str();
    let port = config.effective_port();
    tracing::debug!(host, port, tls = config.ssl, "opening transport");

    let tcp = connect_tcp(host, port, config)?;
    tcp.set_nodelay(true)?;
    tcp.set_read_timeout(Some(config.timeout))?;
    tcp.set_write_timeout(Some(config.timeout))?;

    if !config.ssl {
        return Ok(Transport::Tcp(tcp));
    }

    #[cfg(feature = "tls")]
    {
        let connector = native_tls::TlsConnector::builder()
            .danger_accept_invalid_certs(config.accept_invalid_certs)
            .danger_accept_invalid_hostnames(config.accept_invalid_hostnames)
            .build()?;
        let stream = connector.connect(host, tcp).map_err(|err| match err {
            native_tls::HandshakeError::Failure(err) => Error::Tls(err),
            // the socket is blocking, the handshake cannot yield
            native_tls::HandshakeError::WouldBlock(_) => {
                Error::Transport(io::Error::from(io::ErrorKind::WouldBlock))
            }
        })?;
        Ok(Transport::Tls(stream))
    }
    #[cfg(not(feature = "tls"))]
    {
        Err(Error::Config(
            "ssl requested, but this build has no `tls` feature".into(),
        ))
    }
}

fn connect_tcp(host: &str, port: u16, config: &Config) -> Result<TcpStream> {
    let mut last = None;
    for addr in (host, port).to_socket_addrs()? {
        match TcpStream::connect_timeout(&addr, config.timeout) {
            Ok(stream) => return Ok(stream),
            Err(err) => {
                tracing::debug!(%addr, error = %err, "address not reachable");
                last = Some(err);
            }
        }
    }
    Err(Error::Transport(last.unwrap_or_else(|| {
        io::Error::new(
            io::ErrorKind::NotFound,
            format!("{host} did not resolve to any address"),
        )
    })))
}
