use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use byteorder::{LittleEndian, WriteBytesExt};
use memmap2::Mmap;

use crate::dictionary::Dictionary;
use crate::error::IndexError;
use crate::posting::Posting;

/// Writes `dict`'s accumulated postings to `path` as a single intermediate
/// merge block: `[u32 term_count]` followed by, per term (in the
/// dictionary's already-sorted order), `[u32 term_len][term bytes]
/// [u32 posting_count][(u32 doc_id, u32 freq) * posting_count]`. Unlike the
/// final index, block postings are stored raw (no VByte) since a block's
/// only purpose is to survive until the next merge pass.
pub fn write_block(path: impl AsRef<Path>, dict: &Dictionary) -> Result<(), IndexError> {
    let path = path.as_ref();
    let file = File::create(path).map_err(|source| IndexError::Io { path: path.display().to_string(), source })?;
    let mut w = BufWriter::new(file);

    w.write_u32::<LittleEndian>(dict_term_count(dict))
        .map_err(|source| IndexError::Io { path: path.display().to_string(), source })?;

    for (term, postings) in dict.iter() {
        let term_bytes = term.as_bytes();
        w.write_u32::<LittleEndian>(term_bytes.len() as u32).and_then(|_| w.write_all(term_bytes)).and_then(|_| {
            w.write_u32::<LittleEndian>(postings.len() as u32)?;
            for p in postings {
                w.write_u32::<LittleEndian>(p.doc_id)?;
                w.write_u32::<LittleEndian>(p.freq)?;
            }
            Ok(())
        })
        .map_err(|source| IndexError::Io { path: path.display().to_string(), source })?;
    }

    w.flush().map_err(|source| IndexError::Io { path: path.display().to_string(), source })?;
    Ok(())
}

fn dict_term_count(dict: &Dictionary) -> u32 {
    dict.iter().count() as u32
}

/// Sequential, mmap-backed reader over one block file produced by
/// [`write_block`]. Mirrors the original's `BlockReader`: `read_next`
/// advances `current_term`/`current_postings`, `has_next` reports whether
/// another entry was found.
pub struct BlockReader {
    mmap: Mmap,
    cursor: usize,
    pub has_next: bool,
    pub current_term: String,
    pub current_postings: Vec<Posting>,
}

impl BlockReader {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, IndexError> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|source| IndexError::Io { path: path.display().to_string(), source })?;
        let mmap = unsafe { Mmap::map(&file) }.map_err(|source| IndexError::Io { path: path.display().to_string(), source })?;

        if mmap.len() < 4 {
            return Err(IndexError::Corrupt { what: "block file smaller than header".to_string() });
        }

        let mut reader = BlockReader { mmap, cursor: 4, has_next: true, current_term: String::new(), current_postings: Vec::new() };
        reader.read_next();
        Ok(reader)
    }

    fn remaining(&self) -> &[u8] {
        &self.mmap[self.cursor..]
    }

    /// Advances to the next term's entry, or sets `has_next` false once the
    /// block is exhausted or corrupt.
    pub fn read_next(&mut self) {
        let buf = self.remaining();
        if buf.len() < 4 {
            self.has_next = false;
            return;
        }
        let term_len = u32::from_le_bytes(buf[0..4].try_into().unwrap()) as usize;
        let mut pos = 4;
        if buf.len() < pos + term_len + 4 {
            self.has_next = false;
            return;
        }
        let term = String::from_utf8_lossy(&buf[pos..pos + term_len]).into_owned();
        pos += term_len;

        let count = u32::from_le_bytes(buf[pos..pos + 4].try_into().unwrap()) as usize;
        pos += 4;
        if buf.len() < pos + count * 8 {
            self.has_next = false;
            return;
        }

        let mut postings = Vec::with_capacity(count);
        for i in 0..count {
            let off = pos + i * 8;
            let doc_id = u32::from_le_bytes(buf[off..off + 4].try_into().unwrap());
            let freq = u32::from_le_bytes(buf[off + 4..off + 8].try_into().unwrap());
            postings.push(Posting { doc_id, freq });
        }
        pos += count * 8;

        self.current_term = term;
        self.current_postings = postings;
        self.cursor += pos;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mithril_crawler::Document;

    fn temp_path(name: &str) -> std::path::PathBuf {
        std::env::temp_dir().join(format!("mithril-index-test-{}-{name}", std::process::id()))
    }

    #[test]
    fn writes_and_reads_back_a_block() {
        let mut dict = Dictionary::new();
        dict.add_document(&Document {
            id: 1,
            url: "http://a.test/".to_string(),
            title: vec!["hello".to_string()],
            description: vec![],
            words: vec!["hello".to_string(), "world".to_string()],
            forward_links: vec![],
        });

        let path = temp_path("block.bin");
        write_block(&path, &dict).unwrap();

        let mut reader = BlockReader::open(&path).unwrap();
        let mut seen = Vec::new();
        while reader.has_next {
            seen.push((reader.current_term.clone(), reader.current_postings.clone()));
            reader.read_next();
        }
        std::fs::remove_file(&path).ok();

        assert_eq!(seen.len(), 2);
        assert_eq!(seen[0].0, "hello");
        assert_eq!(seen[0].1, vec![Posting { doc_id: 1, freq: 1 }]);
        assert_eq!(seen[1].0, "world");
    }
}
