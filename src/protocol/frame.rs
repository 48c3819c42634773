//! Word framing over a blocking transport.

use std::io::{Read, Write};

use bytes::Bytes;
use pretty_hex::simple_hex;

use super::codec::{ReadLength, WriteLength};
use crate::error::{Error, Result};

pub(crate) trait WriteWord {
    fn write_word(&mut self, word: &[u8]) -> Result<()>;

    /// Writes every word of a sentence followed by the zero-length
    /// terminator, then flushes.
    fn write_sentence<I, W>(&mut self, words: I) -> Result<()>
    where
        I: IntoIterator<Item = W>,
        W: AsRef<[u8]>;
}

impl<T: Write> WriteWord for T {
    fn write_word(&mut self, word: &[u8]) -> Result<()> {
        self.write_length(word.len() as u64)?;
        self.write_all(word)?;
        tracing::trace!("sent word:\n{}", simple_hex(&word));
        Ok(())
    }

    fn write_sentence<I, W>(&mut self, words: I) -> Result<()>
    where
        I: IntoIterator<Item = W>,
        W: AsRef<[u8]>,
    {
        // Validate before the first byte goes out; erroring half way
        // through a sentence would desynchronise the stream.
        let words: Vec<W> = words.into_iter().collect();
        if words.is_empty() {
            return Err(Error::Misuse("a sentence needs at least one word"));
        }
        if words.iter().any(|w| w.as_ref().is_empty()) {
            return Err(Error::Misuse(
                "words must be non-empty; the empty word terminates a sentence",
            ));
        }
        for word in &words {
            self.write_word(word.as_ref())?;
        }
        self.write_length(0)?;
        self.flush()?;
        Ok(())
    }
}

pub(crate) trait ReadWord {
    fn read_word(&mut self) -> Result<Bytes>;
}

impl<T: Read> ReadWord for T {
    fn read_word(&mut self) -> Result<Bytes> {
        let len = self.read_length()?;
        if len == 0 {
            return Ok(Bytes::new());
        }
        let mut buf = vec![0u8; len as usize];
        self.read_exact(&mut buf)?;
        tracing::trace!("read word:\n{}", simple_hex(&buf));
        Ok(Bytes::from(buf))
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;

    #[test]
    fn word_is_prefix_plus_payload() {
        let mut buf = Vec::new();
        buf.write_word(b"/login").unwrap();
        assert_eq!(buf, b"\x06/login");
    }

    #[test]
    fn two_hundred_byte_word_uses_the_two_byte_prefix() {
        let payload = vec![b'x'; 200];
        let mut buf = Vec::new();
        buf.write_word(&payload).unwrap();
        assert_eq!(buf.len(), 202);
        assert_eq!(&buf[..2], &[0x80, 0xC8]);
        assert_eq!(&buf[2..], &payload[..]);
    }

    #[test]
    fn sentences_round_trip() {
        let words: &[&[u8]] = &[b"/interface/print", b"=stats=", b".tag=7"];
        let mut buf = Vec::new();
        buf.write_sentence(words).unwrap();

        let mut cursor = Cursor::new(buf);
        for expected in words {
            assert_eq!(cursor.read_word().unwrap(), expected[..]);
        }
        assert!(cursor.read_word().unwrap().is_empty());
    }

    #[test]
    fn large_words_round_trip() {
        let payload = vec![0xABu8; 20_000];
        let mut buf = Vec::new();
        buf.write_word(&payload).unwrap();
        let mut cursor = Cursor::new(buf);
        assert_eq!(cursor.read_word().unwrap(), payload[..]);
    }

    #[test]
    fn empty_words_cannot_be_sent() {
        let mut buf = Vec::new();
        let err = buf
            .write_sentence([b"/login".as_slice(), b"".as_slice()])
            .unwrap_err();
        assert!(matches!(err, Error::Misuse(_)));
        assert!(buf.is_empty());
    }

    #[test]
    fn empty_sentences_cannot_be_sent() {
        let mut buf = Vec::new();
        let err = buf.write_sentence(Vec::<&[u8]>::new()).unwrap_err();
        assert!(matches!(err, Error::Misuse(_)));
    }

    #[test]
    fn eof_inside_a_word_is_a_transport_error() {
        let mut cursor = Cursor::new(vec![0x05, b'a', b'b']);
        let err = cursor.read_word().unwrap_err();
        assert!(matches!(err, Error::Transport(_)));
    }
}
