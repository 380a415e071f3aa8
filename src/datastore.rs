//! The data-block subsystem: staging `TABLE DATA`/`BLOB` payloads in
//! out-of-core temp files while an archive is being assembled, and
//! the length-prefixed, optionally gzip-compressed framing used to
//! read and write them inside the archive itself.
//!
//! Every entry's backing temp file is *always* gzip-compressed while
//! staged, regardless of the final archive's compression setting —
//! [`Archive::save`](crate::archive::Archive::save) decides at write
//! time whether to copy the gzip bytes straight through (compressed
//! archive) or inflate them first (uncompressed archive).

use crate::error::ArchiveError;
use crate::io::{Codec, Tell};
use flate2::write::GzEncoder;
use flate2::{read::GzDecoder, Compression};
use std::fs::File;
use std::io::{self, BufRead, BufReader, Read, Write};
use tempfile::NamedTempFile;

const CHUNK_SIZE: usize = 4096;

/// Appends rows (for `TABLE DATA`) or raw bytes (for `BLOB`) to a
/// fresh, gzip-compressed temp file. Returned by
/// [`crate::archive::Archive::table_data_writer`]; callers must call
/// [`DataWriter::finish`] once done, or the staged data is silently
/// incomplete (the gzip trailer is never written).
pub struct DataWriter {
    encoder: GzEncoder<File>,
}

impl DataWriter {
    /// Creates a new staging temp file and the writer for it. The
    /// `NamedTempFile` must be kept alive by the caller (typically
    /// inside the owning `Archive`) until `save` reads it back.
    pub fn create() -> io::Result<(DataWriter, NamedTempFile)> {
        let temp = NamedTempFile::new()?;
        let handle = temp.reopen()?;
        Ok((
            DataWriter {
                encoder: GzEncoder::new(handle, Compression::default()),
            },
            temp,
        ))
    }

    /// Appends one `COPY`-format text row: fields are tab-separated,
    /// `None` is written as the `\N` null token, and any literal
    /// backslash/tab/newline/carriage-return in a field value is
    /// backslash-escaped.
    pub fn append_row(&mut self, fields: &[Option<&str>]) -> io::Result<()> {
        let mut line = String::new();
        for (i, field) in fields.iter().enumerate() {
            if i > 0 {
                line.push('\t');
            }
            match field {
                None => line.push_str("\\N"),
                Some(s) => encode_copy_field(s, &mut line),
            }
        }
        line.push('\n');
        self.encoder.write_all(line.as_bytes())
    }

    /// Appends raw bytes, for `BLOB` entries.
    pub fn append_bytes(&mut self, bytes: &[u8]) -> io::Result<()> {
        self.encoder.write_all(bytes)
    }

    /// Flushes the gzip trailer. Must be called before the archive is
    /// saved; dropping a `DataWriter` without calling this leaves the
    /// staged temp file truncated.
    pub fn finish(self) -> io::Result<()> {
        self.encoder.finish()?;
        Ok(())
    }
}

fn encode_copy_field(s: &str, out: &mut String) {
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\t' => out.push_str("\\t"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            _ => out.push(c),
        }
    }
}

fn decode_copy_line(line: &str) -> Vec<Option<String>> {
    line.split('\t')
        .map(|raw| {
            if raw == "\\N" {
                None
            } else {
                Some(unescape_copy_field(raw))
            }
        })
        .collect()
}

fn unescape_copy_field(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some('\\') => out.push('\\'),
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    out
}

/// Copies a staged temp file into the archive stream as one data
/// block, preceded by the framing byte (`1` uncompressed, `2`
/// compressed) and followed by the zero-length terminator chunk.
/// Returns the byte offset the block started at.
pub fn write_data_block(
    out: &mut (impl Write + Tell),
    codec: &Codec,
    temp: &NamedTempFile,
    archive_compressed: bool,
) -> Result<u64, ArchiveError> {
    let offset = out.tell();
    if archive_compressed {
        codec.write_byte(out, 2)?;
        let mut src = temp.reopen()?;
        copy_chunked(&mut src, out, codec)?;
    } else {
        codec.write_byte(out, 1)?;
        let src = temp.reopen()?;
        let mut decoder = GzDecoder::new(src);
        copy_chunked(&mut decoder, out, codec)?;
    }
    codec.write_int(out, Some(0))?;
    Ok(offset)
}

fn copy_chunked(
    src: &mut impl Read,
    out: &mut impl Write,
    codec: &Codec,
) -> Result<(), ArchiveError> {
    let mut buf = vec![0u8; CHUNK_SIZE];
    loop {
        let n = src.read(&mut buf)?;
        if n == 0 {
            break;
        }
        codec.write_int(out, Some(n as i64))?;
        out.write_all(&buf[..n])?;
    }
    Ok(())
}

/// A forward-only reader over one length-prefixed chunk stream. Owns
/// its source outright (a caller that needs to keep using the
/// original handle passes a `try_clone()` of it), so a `ChunkedReader`
/// can be boxed and handed to callers without borrowing anything back.
/// The source must already be positioned right after the framing byte.
struct ChunkedReader<R: Read> {
    inner: R,
    codec: Codec,
    buf: Vec<u8>,
    pos: usize,
    done: bool,
}

impl<R: Read> ChunkedReader<R> {
    fn new(inner: R, codec: Codec) -> Self {
        ChunkedReader {
            inner,
            codec,
            buf: Vec::new(),
            pos: 0,
            done: false,
        }
    }

    fn fill(&mut self) -> io::Result<()> {
        let len = self.codec.read_int(&mut self.inner)?;
        if len <= 0 {
            self.done = true;
            self.buf.clear();
            self.pos = 0;
            return Ok(());
        }
        let mut chunk = vec![0u8; len as usize];
        self.inner.read_exact(&mut chunk)?;
        self.buf = chunk;
        self.pos = 0;
        Ok(())
    }
}

impl<R: Read> Read for ChunkedReader<R> {
    fn read(&mut self, out: &mut [u8]) -> io::Result<usize> {
        loop {
            if self.pos < self.buf.len() {
                let n = out.len().min(self.buf.len() - self.pos);
                out[..n].copy_from_slice(&self.buf[self.pos..self.pos + n]);
                self.pos += n;
                return Ok(n);
            }
            if self.done {
                return Ok(0);
            }
            self.fill()?;
        }
    }
}

/// Opens the data block starting at the source's current position:
/// reads the framing byte and returns a lazy, forward-only `Read` over
/// the block's decompressed (if needed) byte stream. Takes `f` by
/// value so the returned reader owns its source independently of
/// wherever `f` came from — callers that need to keep using their
/// original handle pass a `try_clone()` of it instead of `f` itself.
pub fn open_block<'a>(mut f: impl Read + 'a, codec: Codec) -> Result<Box<dyn Read + 'a>, ArchiveError> {
    let block_type = codec.read_byte(&mut f)?;
    let chunked = ChunkedReader::new(f, codec);
    match block_type {
        1 => Ok(Box::new(chunked)),
        2 => Ok(Box::new(GzDecoder::new(chunked))),
        other => Err(ArchiveError::CompressionMethodNotSupported(other)),
    }
}

/// Iterates `COPY`-format rows over an already-opened data block. The
/// `\.` end-of-data sentinel line is consumed but never yielded.
pub struct RowReader<'a> {
    inner: BufReader<Box<dyn Read + 'a>>,
}

impl<'a> RowReader<'a> {
    pub fn new(inner: Box<dyn Read + 'a>) -> Self {
        RowReader {
            inner: BufReader::new(inner),
        }
    }

    pub fn next_row(&mut self) -> Result<Option<Vec<Option<String>>>, ArchiveError> {
        let mut line = String::new();
        let n = self.inner.read_line(&mut line)?;
        if n == 0 {
            return Ok(None);
        }
        let trimmed = line.strip_suffix('\n').unwrap_or(&line);
        let trimmed = trimmed.strip_suffix('\r').unwrap_or(trimmed);
        if trimmed == "\\." {
            return Ok(None);
        }
        Ok(Some(decode_copy_line(trimmed)))
    }
}

/// Reads an already-opened data block to completion. Callers that want
/// a `BLOB` entry's bytes lazily should read from the block returned by
/// [`open_block`] directly instead.
pub fn read_all(mut inner: Box<dyn Read + '_>) -> Result<Vec<u8>, ArchiveError> {
    let mut buf = Vec::new();
    inner.read_to_end(&mut buf)?;
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn copy_field_escaping_roundtrip() {
        let mut out = String::new();
        encode_copy_field("a\tb\nc\\d\re", &mut out);
        assert_eq!(out, "a\\tb\\nc\\\\d\\re");
        assert_eq!(unescape_copy_field(&out), "a\tb\nc\\d\re");
    }

    #[test]
    fn decode_line_distinguishes_null_from_empty() {
        let fields = decode_copy_line("\\N\t\t\\N");
        assert_eq!(fields, vec![None, Some(String::new()), None]);
    }

    fn roundtrip_rows(rows: &[Vec<Option<&str>>], archive_compressed: bool) -> Vec<Vec<Option<String>>> {
        let (mut writer, temp) = DataWriter::create().unwrap();
        for row in rows {
            writer.append_row(row).unwrap();
        }
        writer.finish().unwrap();

        let codec = Codec::with_sizes(4, 8);
        let mut buffer = Vec::new();
        {
            let mut counting = crate::io::CountingWriter::new(&mut buffer);
            write_data_block(&mut counting, &codec, &temp, archive_compressed).unwrap();
        }

        let cursor: &[u8] = &buffer;
        let block = open_block(cursor, codec).unwrap();
        let mut reader = RowReader::new(block);
        let mut out = Vec::new();
        while let Some(row) = reader.next_row().unwrap() {
            out.push(row);
        }
        out
    }

    #[test]
    fn table_data_roundtrip_compressed() {
        let rows = vec![
            vec![Some("1"), Some("alice"), None],
            vec![Some("2"), Some("bo\tb"), Some("x\ny")],
        ];
        let decoded = roundtrip_rows(&rows, true);
        assert_eq!(
            decoded,
            vec![
                vec![Some("1".into()), Some("alice".into()), None],
                vec![Some("2".into()), Some("bo\tb".into()), Some("x\ny".into())],
            ]
        );
    }

    #[test]
    fn table_data_roundtrip_uncompressed() {
        let rows = vec![vec![Some("1"), Some("widget")]];
        let decoded = roundtrip_rows(&rows, false);
        assert_eq!(decoded, vec![vec![Some("1".into()), Some("widget".into())]]);
    }

    #[test]
    fn large_row_spans_multiple_chunks() {
        let big = "x".repeat(CHUNK_SIZE * 3 + 17);
        let rows = vec![vec![Some(big.as_str())]];
        let decoded = roundtrip_rows(&rows, true);
        assert_eq!(decoded, vec![vec![Some(big)]]);
    }

    #[test]
    fn blob_roundtrip() {
        let (mut writer, temp) = DataWriter::create().unwrap();
        let payload = vec![0u8, 1, 2, 255, 254, 253];
        writer.append_bytes(&payload).unwrap();
        writer.finish().unwrap();

        let codec = Codec::with_sizes(4, 8);
        let mut buffer = Vec::new();
        {
            let mut counting = crate::io::CountingWriter::new(&mut buffer);
            write_data_block(&mut counting, &codec, &temp, true).unwrap();
        }

        let cursor: &[u8] = &buffer;
        let block = open_block(cursor, codec).unwrap();
        let decoded = read_all(block).unwrap();
        assert_eq!(decoded, payload);
    }
}
