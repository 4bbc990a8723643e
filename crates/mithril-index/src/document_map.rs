use std::collections::HashMap;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use byteorder::{LittleEndian, WriteBytesExt};
use memmap2::Mmap;
use mithril_crawler::{DocId, Document};

use crate::error::IndexError;

/// Per-document metadata `mithril-rank`'s BM25F/static-rank scorers need:
/// field token counts plus the title/url strings for display and
/// URL-structure heuristics. Pagerank is populated by a separate offline
/// pass (see `mithril-rank::PageRankReader`); it defaults to `0.0` here.
#[derive(Debug, Clone, PartialEq)]
pub struct DocRecord {
    pub id: DocId,
    pub url: String,
    pub title: String,
    pub body_tokens: u32,
    pub title_tokens: u32,
    pub url_tokens: u32,
    pub desc_tokens: u32,
    pub pagerank_score: f32,
}

fn url_token_count(url: &str) -> u32 {
    url.split(|c: char| !c.is_alphanumeric()).filter(|s| !s.is_empty()).count() as u32
}

/// Writes `document_map.data`: `[u32 doc_count]` followed by, per document
/// (in the order given), `[u32 id][u32 url_len][url][u32 title_len][title]
/// [u32 body_tokens][u32 title_tokens][u32 url_tokens][u32 desc_tokens]
/// [f32 pagerank_score]`. Mirrors `DocumentMapReader`'s expected layout.
pub fn write_document_map(path: impl AsRef<Path>, docs: &[Document]) -> Result<(), IndexError> {
    let path = path.as_ref();
    let file = File::create(path).map_err(|source| IndexError::Io { path: path.display().to_string(), source })?;
    let mut w = BufWriter::new(file);

    w.write_u32::<LittleEndian>(docs.len() as u32)
        .map_err(|source| IndexError::Io { path: path.display().to_string(), source })?;

    for doc in docs {
        let title = doc.title.join(" ");
        let write_result = (|| -> std::io::Result<()> {
            w.write_u32::<LittleEndian>(doc.id)?;
            w.write_u32::<LittleEndian>(doc.url.len() as u32)?;
            w.write_all(doc.url.as_bytes())?;
            w.write_u32::<LittleEndian>(title.len() as u32)?;
            w.write_all(title.as_bytes())?;
            w.write_u32::<LittleEndian>(doc.words.len() as u32)?;
            w.write_u32::<LittleEndian>(doc.title.len() as u32)?;
            w.write_u32::<LittleEndian>(url_token_count(&doc.url))?;
            w.write_u32::<LittleEndian>(doc.description.len() as u32)?;
            w.write_f32::<LittleEndian>(0.0)?;
            Ok(())
        })();
        write_result.map_err(|source| IndexError::Io { path: path.display().to_string(), source })?;
    }

    w.flush().map_err(|source| IndexError::Io { path: path.display().to_string(), source })?;
    Ok(())
}

/// Mmap-backed, randomly-accessible view over `document_map.data`: every
/// record's metadata is indexed up front, but URL/title bytes are sliced
/// out of the mapping on demand rather than copied into the index.
pub struct DocumentMapReader {
    mmap: Mmap,
    offsets: Vec<usize>,
    id_to_slot: HashMap<DocId, usize>,
    url_to_id: HashMap<String, DocId>,
}

impl DocumentMapReader {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, IndexError> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|source| IndexError::Io { path: path.display().to_string(), source })?;
        let mmap = unsafe { Mmap::map(&file) }.map_err(|source| IndexError::Io { path: path.display().to_string(), source })?;

        if mmap.len() < 4 {
            return Err(IndexError::Corrupt { what: "document map smaller than header".to_string() });
        }
        let doc_count = u32::from_le_bytes(mmap[0..4].try_into().unwrap()) as usize;

        let mut offsets = Vec::with_capacity(doc_count);
        let mut id_to_slot = HashMap::with_capacity(doc_count);
        let mut url_to_id = HashMap::with_capacity(doc_count);

        let mut pos = 4;
        for slot in 0..doc_count {
            offsets.push(pos);
            let id = read_u32(&mmap, pos)?;
            pos += 4;
            let url_len = read_u32(&mmap, pos)? as usize;
            pos += 4;
            let url = String::from_utf8_lossy(&mmap[pos..pos + url_len]).into_owned();
            pos += url_len;
            let title_len = read_u32(&mmap, pos)? as usize;
            pos += 4 + title_len;
            pos += 4 * 4 + 4; // body/title/url/desc token counts + pagerank f32

            id_to_slot.insert(id, slot);
            url_to_id.insert(url, id);
        }

        Ok(DocumentMapReader { mmap, offsets, id_to_slot, url_to_id })
    }

    pub fn document_count(&self) -> usize {
        self.offsets.len()
    }

    pub fn lookup_doc_id(&self, url: &str) -> Option<DocId> {
        self.url_to_id.get(url).copied()
    }

    pub fn get(&self, id: DocId) -> Option<DocRecord> {
        let &slot = self.id_to_slot.get(&id)?;
        let mut pos = self.offsets[slot];
        let data = &self.mmap;

        let id = read_u32(data, pos).ok()?;
        pos += 4;
        let url_len = read_u32(data, pos).ok()? as usize;
        pos += 4;
        let url = String::from_utf8_lossy(&data[pos..pos + url_len]).into_owned();
        pos += url_len;
        let title_len = read_u32(data, pos).ok()? as usize;
        pos += 4;
        let title = String::from_utf8_lossy(&data[pos..pos + title_len]).into_owned();
        pos += title_len;
        let body_tokens = read_u32(data, pos).ok()?;
        pos += 4;
        let title_tokens = read_u32(data, pos).ok()?;
        pos += 4;
        let url_tokens = read_u32(data, pos).ok()?;
        pos += 4;
        let desc_tokens = read_u32(data, pos).ok()?;
        pos += 4;
        let pagerank_score = f32::from_le_bytes(data[pos..pos + 4].try_into().ok()?);

        Some(DocRecord { id, url, title, body_tokens, title_tokens, url_tokens, desc_tokens, pagerank_score })
    }
}

fn read_u32(data: &[u8], pos: usize) -> Result<u32, IndexError> {
    data.get(pos..pos + 4)
        .map(|b| u32::from_le_bytes(b.try_into().unwrap()))
        .ok_or_else(|| IndexError::Corrupt { what: "unexpected end of document map".to_string() })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(id: DocId, url: &str, title: &[&str]) -> Document {
        Document {
            id,
            url: url.to_string(),
            title: title.iter().map(|s| s.to_string()).collect(),
            description: vec!["a".to_string()],
            words: vec!["a".to_string(), "b".to_string(), "c".to_string()],
            forward_links: vec![],
        }
    }

    #[test]
    fn writes_and_reads_records() {
        let dir = std::env::temp_dir().join(format!("mithril-index-docmap-test-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("document_map.data");

        let docs = vec![doc(1, "http://a.test/", &["hello", "world"]), doc(2, "http://b.test/x", &["other"])];
        write_document_map(&path, &docs).unwrap();

        let reader = DocumentMapReader::open(&path).unwrap();
        assert_eq!(reader.document_count(), 2);

        let rec = reader.get(1).unwrap();
        assert_eq!(rec.url, "http://a.test/");
        assert_eq!(rec.title, "hello world");
        assert_eq!(rec.body_tokens, 3);
        assert_eq!(rec.title_tokens, 2);

        assert_eq!(reader.lookup_doc_id("http://b.test/x"), Some(2));
        assert_eq!(reader.lookup_doc_id("http://missing/"), None);

        std::fs::remove_dir_all(&dir).ok();
    }
}
