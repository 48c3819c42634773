use std::fmt;
use std::time::Duration;

use crate::error::{Error, Result};

/// Connection parameters for one router.
///
/// Built through [`Config::builder`]; validation happens in
/// [`ConfigBuilder::build`], so a `Config` in hand is always usable.
#[derive(Clone)]
pub struct Config {
    pub(crate) host: String,
    pub(crate) user: String,
    pub(crate) pass: String,
    pub(crate) port: Option<u16>,
    pub(crate) ssl: bool,
    pub(crate) legacy: bool,
    pub(crate) timeout: Duration,
    pub(crate) attempts: u32,
    pub(crate) delay: Duration,
    pub(crate) accept_invalid_certs: bool,
    pub(crate) accept_invalid_hostnames: bool,
}

impl Config {
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::new()
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn user(&self) -> &str {
        &self.user
    }

    /// The port requests go to: the configured one, or 8729 under TLS
    /// and 8728 otherwise.
    pub fn effective_port(&self) -> u16 {
        self.port.unwrap_or(if self.ssl { 8729 } else { 8728 })
    }

    pub fn ssl(&self) -> bool {
        self.ssl
    }

    pub fn legacy(&self) -> bool {
        self.legacy
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("host", &self.host)
            .field("user", &self.user)
            .field("pass", &"<redacted>")
            .field("port", &self.effective_port())
            .field("ssl", &self.ssl)
            .field("legacy", &self.legacy)
            .field("timeout", &self.timeout)
            .field("attempts", &self.attempts)
            .field("delay", &self.delay)
            .finish()
    }
}

/// Builder for [`Config`].
pub struct ConfigBuilder {
    host: Option<String>,
    user: Option<String>,
    pass: String,
    port: Option<u16>,
    ssl: bool,
    legacy: bool,
    timeout: Duration,
    attempts: u32,
    delay: Duration,
    accept_invalid_certs: bool,
    accept_invalid_hostnames: bool,
}

impl ConfigBuilder {
    fn new() -> ConfigBuilder {
        ConfigBuilder {
            host: None,
            user: None,
            pass: String::new(),
            port: None,
            ssl: false,
            legacy: false,
            timeout: Duration::from_secs(10),
            attempts: 10,
            delay: Duration::from_secs(1),
            accept_invalid_certs: false,
            accept_invalid_hostnames: false,
        }
    }

    /// Address of the router. Required.
    pub fn host<H: Into<String>>(mut self, host: H) -> ConfigBuilder {
        self.host = Some(host.into());
        self
    }

    /// Login name. Required.
    pub fn user<U: Into<String>>(mut self, user: U) -> ConfigBuilder {
        self.user = Some(user.into());
        self
    }

    /// Login password. Defaults to empty, which RouterOS accepts for
    /// freshly provisioned devices.
    pub fn pass<P: Into<String>>(mut self, pass: P) -> ConfigBuilder {
        self.pass = pass.into();
        self
    }

    /// Overrides the default port (8728, or 8729 under TLS).
    pub fn port(mut self, port: u16) -> ConfigBuilder {
        self.port = Some(port);
        self
    }

    /// Wrap the connection in TLS.
    pub fn ssl(mut self, ssl: bool) -> ConfigBuilder {
        self.ssl = ssl;
        self
    }

    /// Force the pre-6.43 MD5 challenge/response login.
    pub fn legacy(mut self, legacy: bool) -> ConfigBuilder {
        self.legacy = legacy;
        self
    }

    /// Connect deadline, also applied as read/write timeout on the
    /// socket. Defaults to 10 seconds.
    pub fn timeout(mut self, timeout: Duration) -> ConfigBuilder {
        self.timeout = timeout;
        self
    }

    /// Number of connection attempts before giving up. Defaults to 10.
    pub fn attempts(mut self, attempts: u32) -> ConfigBuilder {
        self.attempts = attempts;
        self
    }

    /// Sleep between failed attempts. Defaults to 1 second.
    pub fn delay(mut self, delay: Duration) -> ConfigBuilder {
        self.delay = delay;
        self
    }

    /// Accept certificates that do not chain to a trusted root, such as
    /// the self-signed ones routers ship with. Off by default; turning
    /// it on gives up man-in-the-middle protection.
    pub fn accept_invalid_certs(mut self, accept: bool) -> ConfigBuilder {
        self.accept_invalid_certs = accept;
        self
    }

    /// Skip hostname verification of the peer certificate. Off by
    /// default.
    pub fn accept_invalid_hostnames(mut self, accept: bool) -> ConfigBuilder {
        self.accept_invalid_hostnames = accept;
        self
    }

    pub fn build(self) -> Result<Config> {
        let host = self
            .host
            .filter(|h| !h.is_empty())
            .ok_or_else(|| Error::Config("host is required".into()))?;
        let user = self
            .user
            .filter(|u| !u.is_empty())
            .ok_or_else(|| Error::Config("user is required".into()))?;
        if self.attempts == 0 {
            return Err(Error::Config("attempts must be at least 1".into()));
        }
        if self.timeout.is_zero() {
            return Err(Error::Config("timeout must be non-zero".into()));
        }
        #[cfg(not(feature = "tls"))]
        if self.ssl {
            return Err(Error::Config(
                "ssl requested, but this build has no `tls` feature".into(),
            ));
        }
        Ok(Config {
            host,
            user,
            pass: self.pass,
            port: self.port,
            ssl: self.ssl,
            legacy: self.legacy,
            timeout: self.timeout,
            attempts: self.attempts,
            delay: self.delay,
            accept_invalid_certs: self.accept_invalid_certs,
            accept_invalid_hostnames: self.accept_invalid_hostnames,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_ports_follow_the_ssl_flag() {
        let plain = Config::builder().host("r").user("admin").build().unwrap();
        assert_eq!(plain.effective_port(), 8728);

        let tls = Config::builder()
            .host("r")
            .user("admin")
            .ssl(true)
            .build()
            .unwrap();
        assert_eq!(tls.effective_port(), 8729);

        let explicit = Config::builder()
            .host("r")
            .user("admin")
            .ssl(true)
            .port(8080)
            .build()
            .unwrap();
        assert_eq!(explicit.effective_port(), 8080);
    }

    #[test]
    fn missing_host_is_rejected() {
        let err = Config::builder().user("admin").build().unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn missing_user_is_rejected() {
        let err = Config::builder().host("r").build().unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn zero_attempts_are_rejected() {
        let err = Config::builder()
            .host("r")
            .user("admin")
            .attempts(0)
            .build()
            .unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn debug_output_hides_the_password() {
        let config = Config::builder()
            .host("r")
            .user("admin")
            .pass("hunter2")
            .build()
            .unwrap();
        let debug = format!("{config:?}");
        assert!(!debug.contains("hunter2"));
        assert!(debug.contains("<redacted>"));
    }
}
