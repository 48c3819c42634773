//! The `/login` exchange, plain and challenge/response.

use std::io::{Read, Write};

use md5::{Digest, Md5};

use super::conn::Connection;
use crate::config::Config;
use crate::error::{Error, Result};
use crate::protocol::reply::{ParsedReply, Terminator};

pub(crate) fn login<S: Read + Write>(conn: &mut Connection<S>, config: &Config) -> Result<()> {
    if config.legacy {
        legacy_login(conn, config)
    } else {
        plain_login(conn, config)
    }
}

/// One round trip for RouterOS 6.43 and newer: the credentials go in the
/// first sentence. Older routers ignore the password and answer with a
/// `ret` challenge instead; when that happens the challenge is answered
/// in a second round trip, so plain mode still logs in everywhere.
fn plain_login<S: Read + Write>(conn: &mut Connection<S>, config: &Config) -> Result<()> {
    tracing::debug!(user = %config.user, "logging in");
    conn.send_sentence([
        "/login".to_owned(),
        format!("=name={}", config.user),
        format!("=password={}", config.pass),
    ])?;
    let reply = read_login_reply(conn)?;
    match reply.trailer.get("ret") {
        Some(challenge) => answer_challenge(conn, config, challenge),
        None => Ok(()),
    }
}

/// Two round trips, password never on the wire: a bare `/login` fetches
/// the challenge, the second sentence carries the MD5 response.
fn legacy_login<S: Read + Write>(conn: &mut Connection<S>, config: &Config) -> Result<()> {
    tracing::debug!(user = %config.user, "requesting login challenge");
    conn.send_sentence(["/login"])?;
    let reply = read_login_reply(conn)?;
    let challenge = reply
        .trailer
        .get("ret")
        .ok_or_else(|| Error::Protocol("login reply carries no challenge".into()))?;
    answer_challenge(conn, config, challenge)
}

fn answer_challenge<S: Read + Write>(
    conn: &mut Connection<S>,
    config: &Config,
    challenge: &str,
) -> Result<()> {
    let response = challenge_response(&config.pass, challenge)?;
    conn.send_sentence([
        "/login".to_owned(),
        format!("=name={}", config.user),
        format!("=response={}", response),
    ])?;
    read_login_reply(conn)?;
    Ok(())
}

/// Reads one reply, turning `!trap` and `!fatal` into an auth failure.
fn read_login_reply<S: Read + Write>(conn: &mut Connection<S>) -> Result<ParsedReply> {
    let reply = conn.read_reply()?;
    match reply.terminator {
        Terminator::Done => Ok(reply),
        Terminator::Trap | Terminator::Fatal => {
            let reason = reply.message().unwrap_or("no reason given").to_owned();
            tracing::warn!(%reason, "router rejected the login");
            Err(Error::AuthDenied(reason))
        }
    }
}

/// The legacy response word payload: `00` followed by the lowercase hex
/// of `MD5(0x00 || password || challenge)`. The challenge arrives as 32
/// hex characters in the `ret` trailer attribute.
fn challenge_response(pass: &str, challenge: &str) -> Result<String> {
    let challenge = hex::decode(challenge)
        .map_err(|_| Error::Protocol(format!("challenge {challenge:?} is not valid hex")))?;
    if challenge.len() != 16 {
        return Err(Error::Protocol(format!(
            "challenge is {} bytes long, expected 16",
            challenge.len()
        )));
    }
    let mut md5 = Md5::new();
    md5.update([0u8]);
    md5.update(pass.as_bytes());
    md5.update(&challenge);
    Ok(format!("00{}", hex::encode(md5.finalize())))
}
