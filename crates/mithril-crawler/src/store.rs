use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use flate2::write::GzEncoder;
use flate2::read::GzDecoder;
use flate2::Compression;

use crate::document::Document;
use crate::error::CrawlError;

/// Append-only, gzip-compressed store of `bincode`-encoded [`Document`]
/// records, written one after another with no index; a reader scans the
/// stream sequentially. Per spec.md §3's description of the crawler's
/// collaborator responsibility toward the document store the indexer reads.
pub struct DocumentWriter {
    encoder: GzEncoder<BufWriter<File>>,
}

impl DocumentWriter {
    pub fn create(path: impl AsRef<Path>) -> Result<Self, CrawlError> {
        let path = path.as_ref();
        let file = File::create(path).map_err(|source| CrawlError::Store { path: path.display().to_string(), source })?;
        Ok(DocumentWriter { encoder: GzEncoder::new(BufWriter::new(file), Compression::default()) })
    }

    /// Appends one document record: a little-endian `u32` length prefix
    /// followed by its `bincode` encoding.
    pub fn write(&mut self, doc: &Document) -> Result<(), CrawlError> {
        let bytes = bincode::serialize(doc).map_err(|source| CrawlError::Encode { id: doc.id, source })?;
        let len = bytes.len() as u32;
        self.encoder
            .write_all(&len.to_le_bytes())
            .and_then(|_| self.encoder.write_all(&bytes))
            .map_err(|source| CrawlError::Store { path: String::new(), source })?;
        Ok(())
    }

    pub fn finish(self) -> Result<(), CrawlError> {
        self.encoder.finish().map_err(|source| CrawlError::Store { path: String::new(), source })?;
        Ok(())
    }
}

/// Sequential reader over a store [`DocumentWriter`] produced, the side of
/// the document-store contract `mithril-index`'s build pipeline consumes
/// (spec.md §3: "crawler writes gzipped `Document` records [...] the
/// indexer reads that store once").
pub struct DocumentReader {
    decoder: GzDecoder<BufReader<File>>,
}

impl DocumentReader {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, CrawlError> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|source| CrawlError::Store { path: path.display().to_string(), source })?;
        Ok(DocumentReader { decoder: GzDecoder::new(BufReader::new(file)) })
    }

    /// Reads the next record, or `Ok(None)` at a clean end of stream.
    pub fn read_next(&mut self) -> Result<Option<Document>, CrawlError> {
        let mut len_bytes = [0u8; 4];
        match self.decoder.read_exact(&mut len_bytes) {
            Ok(()) => {}
            Err(err) if err.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(None),
            Err(source) => return Err(CrawlError::Store { path: String::new(), source }),
        }
        let len = u32::from_le_bytes(len_bytes) as usize;
        let mut buf = vec![0u8; len];
        self.decoder.read_exact(&mut buf).map_err(|source| CrawlError::Store { path: String::new(), source })?;
        let doc: Document = bincode::deserialize(&buf).map_err(|source| CrawlError::Decode { source })?;
        Ok(Some(doc))
    }
}

impl Iterator for DocumentReader {
    type Item = Result<Document, CrawlError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.read_next().transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;

    #[test]
    fn writes_and_reads_back_gzipped_records() {
        let dir = std::env::temp_dir().join(format!("mithril-crawler-test-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("docs.gz");

        let doc = Document {
            id: 1,
            url: "http://example.test/".to_string(),
            title: vec!["hello".to_string()],
            description: vec![],
            words: vec!["hello".to_string(), "world".to_string()],
            forward_links: vec![],
        };

        let mut writer = DocumentWriter::create(&path).unwrap();
        writer.write(&doc).unwrap();
        writer.finish().unwrap();

        let mut raw = Vec::new();
        File::open(&path).unwrap().read_to_end(&mut raw).unwrap();
        let mut decoder = flate2::read::GzDecoder::new(&raw[..]);
        let mut decompressed = Vec::new();
        decoder.read_to_end(&mut decompressed).unwrap();

        let len = u32::from_le_bytes(decompressed[..4].try_into().unwrap()) as usize;
        let decoded: Document = bincode::deserialize(&decompressed[4..4 + len]).unwrap();
        assert_eq!(decoded, doc);

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn document_reader_reads_back_every_written_record() {
        let dir = std::env::temp_dir().join(format!("mithril-crawler-reader-test-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("docs.gz");

        let docs = vec![
            Document { id: 0, url: "http://a.test/".to_string(), title: vec![], description: vec![], words: vec!["a".to_string()], forward_links: vec![] },
            Document { id: 1, url: "http://b.test/".to_string(), title: vec!["b".to_string()], description: vec![], words: vec!["b".to_string()], forward_links: vec!["http://a.test/".to_string()] },
        ];

        let mut writer = DocumentWriter::create(&path).unwrap();
        for doc in &docs {
            writer.write(doc).unwrap();
        }
        writer.finish().unwrap();

        let reader = DocumentReader::open(&path).unwrap();
        let read_back: Vec<Document> = reader.map(Result::unwrap).collect();
        assert_eq!(read_back, docs);

        std::fs::remove_dir_all(&dir).ok();
    }
}
