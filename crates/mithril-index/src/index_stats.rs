use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use mithril_crawler::Document;

use crate::document_map::DocumentMapReader;
use crate::error::IndexError;

/// Corpus-wide term-scoring inputs `mithril-rank`'s BM25/BM25F scorers
/// need: the document count and each field's total token length, used to
/// derive the average field length for length normalization. Written once
/// by [`crate::builder::IndexBuilder::finalize`] as `index_stats.data`
/// (spec.md §6): `[u32 doc_count][u64 body_total][u64 title_total]
/// [u64 url_total][u64 desc_total]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IndexStats {
    pub doc_count: u32,
    pub body_total: u64,
    pub title_total: u64,
    pub url_total: u64,
    pub desc_total: u64,
}

impl IndexStats {
    pub fn average_body_length(&self) -> f64 {
        if self.doc_count == 0 {
            0.0
        } else {
            self.body_total as f64 / self.doc_count as f64
        }
    }

    pub fn average_title_length(&self) -> f64 {
        if self.doc_count == 0 {
            0.0
        } else {
            self.title_total as f64 / self.doc_count as f64
        }
    }

    pub fn average_url_length(&self) -> f64 {
        if self.doc_count == 0 {
            0.0
        } else {
            self.url_total as f64 / self.doc_count as f64
        }
    }

    pub fn average_desc_length(&self) -> f64 {
        if self.doc_count == 0 {
            0.0
        } else {
            self.desc_total as f64 / self.doc_count as f64
        }
    }

    pub fn open(path: impl AsRef<Path>) -> Result<Self, IndexError> {
        let path = path.as_ref();
        let bytes = std::fs::read(path).map_err(|source| IndexError::Io { path: path.display().to_string(), source })?;
        let mut cursor = &bytes[..];
        let read = (|| -> std::io::Result<IndexStats> {
            let doc_count = cursor.read_u32::<LittleEndian>()?;
            let body_total = cursor.read_u64::<LittleEndian>()?;
            let title_total = cursor.read_u64::<LittleEndian>()?;
            let url_total = cursor.read_u64::<LittleEndian>()?;
            let desc_total = cursor.read_u64::<LittleEndian>()?;
            Ok(IndexStats { doc_count, body_total, title_total, url_total, desc_total })
        })();
        read.map_err(|_| IndexError::Corrupt { what: "truncated index stats file".to_string() })
    }
}

/// Computes and writes `index_stats.data` from the same document set the
/// builder accumulated, using `url_tokens` the same way the field-qualified
/// dictionary entries do so `url_total` lines up with the `@`-decorated
/// posting counts.
pub fn write_index_stats(path: impl AsRef<Path>, docs: &[Document]) -> Result<(), IndexError> {
    let path = path.as_ref();

    let mut body_total = 0u64;
    let mut title_total = 0u64;
    let mut url_total = 0u64;
    let mut desc_total = 0u64;
    for doc in docs {
        body_total += doc.words.len() as u64;
        title_total += doc.title.len() as u64;
        desc_total += doc.description.len() as u64;
        url_total += crate::field::url_tokens(&doc.url).len() as u64;
    }

    let file = File::create(path).map_err(|source| IndexError::Io { path: path.display().to_string(), source })?;
    let mut w = BufWriter::new(file);
    let write = (|| -> std::io::Result<()> {
        w.write_u32::<LittleEndian>(docs.len() as u32)?;
        w.write_u64::<LittleEndian>(body_total)?;
        w.write_u64::<LittleEndian>(title_total)?;
        w.write_u64::<LittleEndian>(url_total)?;
        w.write_u64::<LittleEndian>(desc_total)?;
        Ok(())
    })();
    write.map_err(|source| IndexError::Io { path: path.display().to_string(), source })?;
    w.flush().map_err(|source| IndexError::Io { path: path.display().to_string(), source })?;
    Ok(())
}

/// Recomputes body-length totals from an already-open document map, for
/// callers (tests, tools) that have a built index but not the original
/// `Document` records in memory.
pub fn body_total_from_document_map(documents: &DocumentMapReader) -> u64 {
    (0..documents.document_count() as u32).filter_map(|id| documents.get(id)).map(|d| d.body_tokens as u64).sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(id: u32, url: &str, title: &[&str], words: &[&str]) -> Document {
        Document {
            id,
            url: url.to_string(),
            title: title.iter().map(|s| s.to_string()).collect(),
            description: vec![],
            words: words.iter().map(|s| s.to_string()).collect(),
            forward_links: vec![],
        }
    }

    #[test]
    fn writes_and_reads_stats() {
        let dir = std::env::temp_dir().join(format!("mithril-index-stats-test-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("index_stats.data");

        let docs = vec![
            doc(1, "http://example.test/a/b", &["t1", "t2"], &["w1", "w2", "w3"]),
            doc(2, "http://example.test/c", &["t1"], &["w1"]),
        ];
        write_index_stats(&path, &docs).unwrap();

        let stats = IndexStats::open(&path).unwrap();
        assert_eq!(stats.doc_count, 2);
        assert_eq!(stats.body_total, 4);
        assert_eq!(stats.title_total, 3);
        assert_eq!(stats.average_body_length(), 2.0);

        std::fs::remove_dir_all(&dir).ok();
    }
}
