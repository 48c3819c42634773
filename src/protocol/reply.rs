//! Grouping reply words into sentences, and sentences into one reply.

use std::collections::HashMap;
use std::io::Read;

use bytes::Bytes;

use super::frame::ReadWord;
use crate::error::Result;

/// The first word of a reply sentence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ReplyTag {
    Re,
    Done,
    Trap,
    Fatal,
}

impl ReplyTag {
    fn classify(word: &[u8]) -> Option<ReplyTag> {
        match word {
            b"!re" => Some(ReplyTag::Re),
            b"!done" => Some(ReplyTag::Done),
            b"!trap" => Some(ReplyTag::Trap),
            b"!fatal" => Some(ReplyTag::Fatal),
            _ => None,
        }
    }
}

/// How a reply ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Terminator {
    /// `!done`: the request completed.
    Done,
    /// `!trap`: the command failed, the connection is still usable.
    Trap,
    /// `!fatal`: the router is shutting the connection down.
    Fatal,
}

/// One fully parsed reply.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedReply {
    /// One attribute map per `!re` sentence, in arrival order.
    pub rows: Vec<HashMap<String, String>>,
    /// Attributes of the trap and terminator sentences, flattened into
    /// one map. Later duplicates overwrite earlier values.
    pub trailer: HashMap<String, String>,
    /// How the reply ended.
    pub terminator: Terminator,
}

impl ParsedReply {
    pub fn is_trap(&self) -> bool {
        self.terminator == Terminator::Trap
    }

    /// The `message` trailer attribute, the router's human-readable
    /// failure reason.
    pub fn message(&self) -> Option<&str> {
        self.trailer.get("message").map(String::as_str)
    }
}

/// Reads sentences until the reply is complete.
///
/// A `!trap` marks the reply as failed but does not end it; the reader
/// keeps consuming sentences until the `!done` (or `!fatal`) that
/// actually terminates the reply, so the stream stays aligned for the
/// next request.
pub(crate) fn read_reply<R: Read>(stream: &mut R) -> Result<ParsedReply> {
    let mut rows = Vec::new();
    let mut trailer = HashMap::new();
    let mut trapped = false;

    loop {
        let sentence = read_sentence(stream)?;
        let Some((tag, attrs)) = sentence.split_first() else {
            continue;
        };
        match ReplyTag::classify(tag) {
            Some(ReplyTag::Re) => {
                let mut row = HashMap::new();
                collect_attributes(attrs, &mut row, false);
                rows.push(row);
            }
            Some(ReplyTag::Trap) => {
                collect_attributes(attrs, &mut trailer, false);
                trapped = true;
            }
            Some(ReplyTag::Done) => {
                collect_attributes(attrs, &mut trailer, false);
                let terminator = if trapped { Terminator::Trap } else { Terminator::Done };
                return Ok(ParsedReply { rows, trailer, terminator });
            }
            Some(ReplyTag::Fatal) => {
                collect_attributes(attrs, &mut trailer, true);
                return Ok(ParsedReply { rows, trailer, terminator: Terminator::Fatal });
            }
            None => {
                tracing::debug!(
                    tag = %String::from_utf8_lossy(tag),
                    "ignoring sentence with unknown reply tag"
                );
            }
        }
    }
}

fn read_sentence<R: Read>(stream: &mut R) -> Result<Vec<Bytes>> {
    let mut words = Vec::new();
    loop {
        let word = stream.read_word()?;
        if word.is_empty() {
            return Ok(words);
        }
        words.push(word);
    }
}

/// Folds attribute words into a map, last value winning. Words that do
/// not parse are dropped, except that in a `!fatal` sentence a bare word
/// is the shutdown reason and lands under `message`.
fn collect_attributes(words: &[Bytes], into: &mut HashMap<String, String>, bare_is_reason: bool) {
    for word in words {
        match parse_attribute(word) {
            Some((name, value)) => {
                into.insert(name, value);
            }
            None if bare_is_reason => {
                into.insert(
                    "message".to_owned(),
                    String::from_utf8_lossy(word).into_owned(),
                );
            }
            None => {
                tracing::warn!(
                    word = %String::from_utf8_lossy(word),
                    "discarding malformed attribute word"
                );
            }
        }
    }
}

/// Splits `=name=value` on the first `=` after the leading one; the
/// value may contain anything, including further `=` and newlines.
/// `.tag=value` words pass through under the literal `.tag` name.
fn parse_attribute(word: &[u8]) -> Option<(String, String)> {
    if let Some(value) = word.strip_prefix(b".tag=") {
        return Some((".tag".to_owned(), String::from_utf8_lossy(value).into_owned()));
    }
    let rest = word.strip_prefix(b"=")?;
    let split = rest.iter().position(|&b| b == b'=')?;
    if split == 0 {
        return None;
    }
    Some((
        String::from_utf8_lossy(&rest[..split]).into_owned(),
        String::from_utf8_lossy(&rest[split + 1..]).into_owned(),
    ))
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;
    use crate::protocol::frame::WriteWord;

    fn wire(sentences: &[&[&str]]) -> Cursor<Vec<u8>> {
        let mut buf = Vec::new();
        for sentence in sentences {
            buf.write_sentence(sentence.iter().map(|w| w.as_bytes())).unwrap();
        }
        Cursor::new(buf)
    }

    #[test]
    fn done_with_no_rows() {
        let mut stream = wire(&[&["!done", "=ret=ebddf753"]]);
        let reply = read_reply(&mut stream).unwrap();
        assert!(reply.rows.is_empty());
        assert_eq!(reply.terminator, Terminator::Done);
        assert_eq!(reply.trailer["ret"], "ebddf753");
    }

    #[test]
    fn rows_arrive_in_order_with_their_attributes() {
        let mut stream = wire(&[
            &["!re", "=.id=*1", "=name=ether1"],
            &["!re", "=name=ether2"],
            &["!done"],
        ]);
        let reply = read_reply(&mut stream).unwrap();
        assert_eq!(reply.rows.len(), 2);
        assert_eq!(reply.rows[0][".id"], "*1");
        assert_eq!(reply.rows[0]["name"], "ether1");
        assert_eq!(reply.rows[1]["name"], "ether2");
        assert!(reply.trailer.is_empty());
        assert_eq!(reply.terminator, Terminator::Done);
    }

    #[test]
    fn trap_marks_the_reply_but_reading_continues_to_done() {
        let mut stream = wire(&[
            &["!trap", "=category=0", "=message=no such item"],
            &["!done"],
        ]);
        let reply = read_reply(&mut stream).unwrap();
        assert_eq!(reply.terminator, Terminator::Trap);
        assert_eq!(reply.trailer["category"], "0");
        assert_eq!(reply.message(), Some("no such item"));
        // the terminating !done was consumed as well
        assert_eq!(stream.position(), stream.get_ref().len() as u64);
    }

    #[test]
    fn fatal_reason_is_a_bare_word() {
        let mut stream = wire(&[&["!fatal", "session terminated"]]);
        let reply = read_reply(&mut stream).unwrap();
        assert_eq!(reply.terminator, Terminator::Fatal);
        assert_eq!(reply.message(), Some("session terminated"));
    }

    #[test]
    fn values_may_contain_equals_signs_and_newlines() {
        let mut stream = wire(&[
            &["!re", "=comment=a=b=c", "=script=:put 1\n:put 2"],
            &["!done"],
        ]);
        let reply = read_reply(&mut stream).unwrap();
        assert_eq!(reply.rows[0]["comment"], "a=b=c");
        assert_eq!(reply.rows[0]["script"], ":put 1\n:put 2");
    }

    #[test]
    fn duplicate_attributes_keep_the_last_value() {
        let mut stream = wire(&[&["!re", "=name=first", "=name=second"], &["!done"]]);
        let reply = read_reply(&mut stream).unwrap();
        assert_eq!(reply.rows[0]["name"], "second");
    }

    #[test]
    fn malformed_attribute_words_are_dropped() {
        let mut stream = wire(&[&["!re", "=broken", "==x", "=name=ok"], &["!done"]]);
        let reply = read_reply(&mut stream).unwrap();
        assert_eq!(reply.rows[0].len(), 1);
        assert_eq!(reply.rows[0]["name"], "ok");
    }

    #[test]
    fn tag_words_are_surfaced_verbatim() {
        let mut stream = wire(&[&["!re", "=name=ether1", ".tag=17"], &["!done", ".tag=17"]]);
        let reply = read_reply(&mut stream).unwrap();
        assert_eq!(reply.rows[0][".tag"], "17");
        assert_eq!(reply.trailer[".tag"], "17");
    }

    #[test]
    fn unknown_reply_tags_are_skipped() {
        let mut stream = wire(&[&["!status", "=x=y"], &["!done", "=ok=1"]]);
        let reply = read_reply(&mut stream).unwrap();
        assert!(reply.rows.is_empty());
        assert_eq!(reply.trailer["ok"], "1");
    }

    #[test]
    fn truncated_reply_is_a_transport_error() {
        let mut buf = Vec::new();
        buf.write_word(b"!re").unwrap();
        let mut stream = Cursor::new(buf);
        let err = read_reply(&mut stream).unwrap_err();
        assert!(matches!(err, crate::Error::Transport(_)));
    }
}
