//! The shard RPC wire protocol (spec.md §6), big-endian throughout:
//!
//! ```text
//! Request:  u32 len | utf8[len]
//! Response: u32 count | { u32 doc_id, u32 score, cstring url (NUL-terminated),
//!                          u32 title_word_count, cstring[title_word_count] } * count
//! ```
//!
//! Grounded on `examples/original_source/query/src/network.cpp`'s raw
//! `socket`/`connect`/`send`/`recv` client helper and
//! `QueryCoordinator.cpp`'s `handle_worker_response` one-request-per-
//! connection shape, replacing its ad hoc framing (spec.md §9's
//! DESIGN.md Open Question decision) with the explicit length-prefixed
//! binary frame spec.md §6 specifies.

use std::ffi::CString;
use std::io::{self, Read, Write};

use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};

use crate::error::CoordinatorError;

/// One document in a shard's response, per spec.md §6.
#[derive(Debug, Clone, PartialEq)]
pub struct ShardHit {
    pub doc_id: u32,
    pub score: u32,
    pub url: String,
    pub title_words: Vec<String>,
}

pub fn write_request(stream: &mut impl Write, query: &str) -> io::Result<()> {
    let bytes = query.as_bytes();
    stream.write_u32::<BigEndian>(bytes.len() as u32)?;
    stream.write_all(bytes)?;
    Ok(())
}

pub fn read_request(stream: &mut impl Read) -> io::Result<String> {
    let len = stream.read_u32::<BigEndian>()? as usize;
    let mut buf = vec![0u8; len];
    stream.read_exact(&mut buf)?;
    Ok(String::from_utf8_lossy(&buf).into_owned())
}

pub fn write_response(stream: &mut impl Write, hits: &[ShardHit]) -> Result<(), CoordinatorError> {
    (|| -> io::Result<()> {
        stream.write_u32::<BigEndian>(hits.len() as u32)?;
        for hit in hits {
            stream.write_u32::<BigEndian>(hit.doc_id)?;
            stream.write_u32::<BigEndian>(hit.score)?;
            write_cstring(stream, &hit.url)?;
            stream.write_u32::<BigEndian>(hit.title_words.len() as u32)?;
            for word in &hit.title_words {
                write_cstring(stream, word)?;
            }
        }
        Ok(())
    })()
    .map_err(|source| CoordinatorError::Io { what: "shard RPC response".to_string(), source })
}

pub fn read_response(stream: &mut impl Read) -> Result<Vec<ShardHit>, CoordinatorError> {
    (|| -> io::Result<Vec<ShardHit>> {
        let count = stream.read_u32::<BigEndian>()? as usize;
        let mut hits = Vec::with_capacity(count);
        for _ in 0..count {
            let doc_id = stream.read_u32::<BigEndian>()?;
            let score = stream.read_u32::<BigEndian>()?;
            let url = read_cstring(stream)?;
            let title_word_count = stream.read_u32::<BigEndian>()?;
            let mut title_words = Vec::with_capacity(title_word_count as usize);
            for _ in 0..title_word_count {
                title_words.push(read_cstring(stream)?);
            }
            hits.push(ShardHit { doc_id, score, url, title_words });
        }
        Ok(hits)
    })()
    .map_err(|source| CoordinatorError::Io { what: "shard RPC response".to_string(), source })
}

fn write_cstring(stream: &mut impl Write, s: &str) -> io::Result<()> {
    let c = CString::new(s.replace('\0', "")).unwrap_or_default();
    stream.write_all(c.as_bytes_with_nul())
}

fn read_cstring(stream: &mut impl Read) -> io::Result<String> {
    let mut bytes = Vec::new();
    let mut byte = [0u8; 1];
    loop {
        stream.read_exact(&mut byte)?;
        if byte[0] == 0 {
            break;
        }
        bytes.push(byte[0]);
    }
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn request_round_trips() {
        let mut buf = Vec::new();
        write_request(&mut buf, "cat AND dog").unwrap();
        let mut cursor = Cursor::new(buf);
        assert_eq!(read_request(&mut cursor).unwrap(), "cat AND dog");
    }

    #[test]
    fn response_round_trips() {
        let hits = vec![
            ShardHit { doc_id: 7, score: 900, url: "http://a.test/".to_string(), title_words: vec!["hello".to_string(), "world".to_string()] },
            ShardHit { doc_id: 3, score: 500, url: "http://b.test/".to_string(), title_words: vec![] },
        ];
        let mut buf = Vec::new();
        write_response(&mut buf, &hits).unwrap();
        let mut cursor = Cursor::new(buf);
        let decoded = read_response(&mut cursor).unwrap();
        assert_eq!(decoded, hits);
    }

    #[test]
    fn empty_response_round_trips() {
        let mut buf = Vec::new();
        write_response(&mut buf, &[]).unwrap();
        let mut cursor = Cursor::new(buf);
        assert_eq!(read_response(&mut cursor).unwrap(), vec![]);
    }
}
