//! The archive reader/writer: opens a file, parses the header and TOC,
//! and performs the two-pass save that (re)writes the TOC with final
//! data offsets once every entry's data block has been appended.

use crate::constants::{archive_version_for_server, Oid, Version, MAX_SUPPORTED_VERSION};
use crate::converter::{Converter, DefaultConverter, Value};
use crate::datastore::{self, DataWriter, RowReader};
use crate::entry::{DataState, Entry, NewEntry, ID};
use crate::error::ArchiveError;
use crate::header::{Compression, Header};
use crate::io::{Codec, CountingWriter, Tell};
use crate::toc;
use crate::topo;
use chrono::{DateTime, FixedOffset, Utc};
use std::collections::HashMap;
use std::fmt;
use std::fs::{self, File};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::rc::Rc;

/// In-memory model of a PostgreSQL custom-format archive: the header
/// metadata, the table of contents, and (once [`load`]ed from a file)
/// enough state to lazily stream each entry's data block.
pub struct Archive {
    pub version: Version,
    pub compression: Compression,
    pub integer_size: usize,
    pub offset_size: usize,
    pub timestamp: DateTime<FixedOffset>,
    pub database_name: String,
    pub server_version: String,
    pub pgdump_version: String,
    pub encoding: String,
    pub std_strings: bool,
    pub search_path: String,
    pub entries: Vec<Entry>,

    converter: Rc<dyn Converter>,
    source: Option<File>,
    staged: HashMap<ID, tempfile::NamedTempFile>,
}

impl fmt::Debug for Archive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Archive")
            .field("version", &self.version)
            .field("compression", &self.compression)
            .field("database_name", &self.database_name)
            .field("entries", &self.entries.len())
            .finish()
    }
}

impl fmt::Display for Archive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} version={}.{}.{} compression={} entries={}",
            self.database_name,
            self.version.0,
            self.version.1,
            self.version.2,
            self.compression,
            self.entries.len()
        )
    }
}

/// Optional parameters for [`Archive::new`]. Every field defaults to
/// the value spec'd for a freshly created archive.
#[derive(Default)]
pub struct NewArchiveOptions {
    pub encoding: Option<String>,
    pub converter: Option<Box<dyn Converter>>,
    pub compression_level: Option<i64>,
    pub format_version: Option<Version>,
    /// A target PostgreSQL server major version; consulted via
    /// [`archive_version_for_server`] when `format_version` is unset.
    pub target_server_version: Option<u16>,
}

impl Archive {
    /// Builds an empty archive in memory, ready for [`Archive::add_entry`].
    pub fn new(database_name: impl Into<String>, opts: NewArchiveOptions) -> Archive {
        let version = opts
            .format_version
            .or_else(|| opts.target_server_version.map(archive_version_for_server))
            .unwrap_or(MAX_SUPPORTED_VERSION);

        let compression = match opts.compression_level {
            Some(level) if level > 0 => Compression::Gzip(level),
            _ => Compression::None,
        };

        let converter: Rc<dyn Converter> = match opts.converter {
            Some(c) => Rc::from(c),
            None => Rc::new(DefaultConverter),
        };

        Archive {
            version,
            compression,
            integer_size: 4,
            offset_size: 8,
            timestamp: Utc::now().fixed_offset(),
            database_name: database_name.into(),
            server_version: String::new(),
            pgdump_version: format!("pgarchive {}", env!("CARGO_PKG_VERSION")),
            encoding: opts.encoding.unwrap_or_else(|| "UTF8".to_string()),
            std_strings: true,
            search_path: String::new(),
            entries: Vec::new(),
            converter,
            source: None,
            staged: HashMap::new(),
        }
    }

    /// Reads the header and table of contents from `f`. Does not open
    /// a file or retain anything needed for lazy data access; use
    /// [`load`] for that.
    pub fn parse(f: &mut (impl Read + ?Sized)) -> Result<Archive, ArchiveError> {
        let (header, codec) = Header::read(f)?;
        let entries = toc::read_entries(f, &codec, header.version)?;

        let search_path = entries
            .iter()
            .find(|e| e.desc == "SEARCHPATH")
            .and_then(|e| search_path_from_defn(&e.defn))
            .unwrap_or_default();

        let (encoding, std_strings) = if header.version >= (1, 13, 0) {
            (header.encoding.clone(), header.std_strings)
        } else {
            let encoding = entries
                .iter()
                .find(|e| e.desc == "ENCODING")
                .and_then(|e| quoted_value_in(&e.defn))
                .unwrap_or_else(|| "UTF8".to_string());
            let std_strings = entries
                .iter()
                .find(|e| e.desc == "STDSTRINGS")
                .and_then(|e| quoted_value_in(&e.defn))
                .map(|v| v == "on")
                .unwrap_or(true);
            (encoding, std_strings)
        };

        Ok(Archive {
            version: header.version,
            compression: header.compression,
            integer_size: codec.int_size,
            offset_size: codec.offset_size,
            timestamp: header.timestamp,
            database_name: header.database_name,
            server_version: header.server_version,
            pgdump_version: header.pgdump_version,
            encoding,
            std_strings,
            search_path,
            entries,
            converter: Rc::new(DefaultConverter),
            source: None,
            staged: HashMap::new(),
        })
    }

    /// Adds a new TOC entry, enforcing every invariant in
    /// [`Entry::new_checked`].
    pub fn add_entry(&mut self, new: NewEntry) -> Result<&Entry, ArchiveError> {
        let entry = Entry::new_checked(&self.entries, new)?;
        self.entries.push(entry);
        Ok(self.entries.last().unwrap())
    }

    /// Finds the TOC entry matching `desc`, `namespace` and `tag`
    /// exactly.
    pub fn lookup_entry(&self, desc: &str, namespace: &str, tag: &str) -> Option<&Entry> {
        self.entries
            .iter()
            .find(|e| e.desc == desc && e.namespace == namespace && e.tag == tag)
    }

    /// Opens a lazy, forward-only sequence of converted rows for the
    /// `TABLE DATA` entry matching `(namespace, tag)`. Requires the
    /// archive to have been opened with [`load`] (a freshly built
    /// [`Archive::new`] has no backing file to stream from).
    pub fn table_data(&mut self, namespace: &str, tag: &str) -> Result<TableDataReader<'_>, ArchiveError> {
        let offset = {
            let entry = self
                .entries
                .iter()
                .find(|e| e.desc == "TABLE DATA" && e.namespace == namespace && e.tag == tag)
                .ok_or(ArchiveError::EntityNotFound)?;
            match entry.data_state {
                DataState::HasDataOffset(o) => o,
                _ => return Err(ArchiveError::NoDataPresent(entry.id)),
            }
        };

        let codec = Codec::with_sizes(self.integer_size, self.offset_size);
        let converter = Rc::clone(&self.converter);
        let mut file = self.source.as_ref().ok_or(ArchiveError::EntityNotFound)?.try_clone()?;
        file.seek(SeekFrom::Start(offset))?;
        let block = datastore::open_block(file, codec)?;
        Ok(TableDataReader {
            inner: RowReader::new(block),
            converter,
        })
    }

    /// Begins writing rows for the `TABLE DATA` (or similar) entry
    /// with the given dump id. `column_names` is recorded only to
    /// validate the column count of each appended row; it does not
    /// otherwise affect the archive.
    pub fn table_data_writer(
        &mut self,
        id: ID,
        column_names: Vec<String>,
    ) -> Result<TableDataWriter<'_>, ArchiveError> {
        if !self.entries.iter().any(|e| e.id == id) {
            return Err(ArchiveError::EntityNotFound);
        }
        let (inner, temp) = DataWriter::create()?;
        Ok(TableDataWriter {
            archive: self,
            id,
            column_names,
            inner: Some(inner),
            temp: Some(temp),
        })
    }

    /// Adds a `BLOB` entry carrying `bytes` under large-object id `oid`.
    pub fn add_blob(&mut self, oid: Oid, mut bytes: impl Read) -> Result<(), ArchiveError> {
        let (mut writer, temp) = DataWriter::create()?;
        let mut buf = [0u8; 8192];
        loop {
            let n = bytes.read(&mut buf)?;
            if n == 0 {
                break;
            }
            writer.append_bytes(&buf[..n])?;
        }
        writer.finish()?;

        let entry = Entry::new_checked(
            &self.entries,
            NewEntry {
                oid: oid.to_string(),
                tag: oid.to_string(),
                desc: "BLOB".to_string(),
                ..Default::default()
            },
        )?;
        let id = entry.id;
        self.entries.push(Entry {
            had_dumper: true,
            data_state: DataState::HasData,
            ..entry
        });
        self.staged.insert(id, temp);
        Ok(())
    }

    /// Returns a lazy, forward-only sequence over every `BLOB` entry's
    /// `(oid, bytes)` pair. Each blob's bytes are read in full as the
    /// sequence is advanced past it; the sequence itself remains lazy.
    pub fn blobs(&mut self) -> BlobIter<'_> {
        let ids: Vec<usize> = self
            .entries
            .iter()
            .enumerate()
            .filter(|(_, e)| e.desc == "BLOB")
            .map(|(i, _)| i)
            .collect();
        BlobIter {
            archive: self,
            ids: ids.into_iter(),
        }
    }

    /// Topologically sorts the entries on their dependencies and
    /// writes the archive to `path`. Writes to a sibling `.tmp` path
    /// first and renames it into place on success, so a failure never
    /// leaves a partially written file at `path`.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ArchiveError> {
        let path = path.as_ref();
        let tmp_path = sibling_tmp_path(path);
        match self.save_to(&tmp_path) {
            Ok(()) => {
                fs::rename(&tmp_path, path)?;
                Ok(())
            }
            Err(e) => {
                let _ = fs::remove_file(&tmp_path);
                Err(e)
            }
        }
    }

    fn save_to(&self, path: &Path) -> Result<(), ArchiveError> {
        let ordered = topo::topological_order(&self.entries)?;
        let codec = Codec::with_sizes(self.integer_size, self.offset_size);
        let header = Header {
            version: self.version,
            compression: self.compression,
            timestamp: self.timestamp,
            database_name: self.database_name.clone(),
            server_version: self.server_version.clone(),
            pgdump_version: self.pgdump_version.clone(),
            encoding: self.encoding.clone(),
            std_strings: self.std_strings,
        };

        let file = File::create(path)?;
        let mut out = CountingWriter::new(file);
        header.write(&mut out, &codec)?;

        let pending = toc::write_entries(&mut out, &codec, self.version, &ordered)?;
        if pending.is_empty() {
            out.get_mut().flush()?;
            return Ok(());
        }
        let mut pending_map: HashMap<ID, u64> = pending.into_iter().collect();

        let archive_compressed = self.compression.is_enabled();
        let mut offsets: HashMap<ID, u64> = HashMap::new();
        for entry in &ordered {
            match entry.data_state {
                DataState::HasData => {
                    let temp = self
                        .staged
                        .get(&entry.id)
                        .ok_or(ArchiveError::NoDataPresent(entry.id))?;
                    let offset = datastore::write_data_block(&mut out, &codec, temp, archive_compressed)?;
                    offsets.insert(entry.id, offset);
                }
                DataState::HasDataOffset(old_offset) => {
                    let mut src = self
                        .source
                        .as_ref()
                        .ok_or(ArchiveError::NoDataPresent(entry.id))?
                        .try_clone()?;
                    let offset = copy_raw_block(&mut src, old_offset, &mut out, &codec)?;
                    offsets.insert(entry.id, offset);
                }
                DataState::NoData => {}
            }
        }

        let mut file = out.into_inner();
        for (id, offset) in offsets {
            let pos = pending_map
                .remove(&id)
                .expect("entry with data must have a pending patch position");
            file.seek(SeekFrom::Start(pos))?;
            codec.write_data_state(&mut file, DataState::HasDataOffset(offset))?;
        }
        file.flush()?;
        Ok(())
    }
}

/// Opens the archive at `path`, parses its header and TOC, and retains
/// the open file handle so [`Archive::table_data`]/[`Archive::blobs`]
/// can seek to each entry's data block on demand.
pub fn load(path: impl AsRef<Path>, converter: Option<Box<dyn Converter>>) -> Result<Archive, ArchiveError> {
    let mut file = File::open(path.as_ref())?;
    let mut archive = Archive::parse(&mut file)?;
    if let Some(c) = converter {
        archive.converter = Rc::from(c);
    }
    archive.source = Some(file);
    Ok(archive)
}

/// A lazy sequence of converted rows for one `TABLE DATA` entry.
pub struct TableDataReader<'a> {
    inner: RowReader<'a>,
    converter: Rc<dyn Converter>,
}

impl<'a> Iterator for TableDataReader<'a> {
    type Item = Result<Vec<Value>, ArchiveError>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.inner.next_row() {
            Ok(Some(fields)) => Some(self.converter.convert(&fields)),
            Ok(None) => None,
            Err(e) => Some(Err(e)),
        }
    }
}

/// A scoped, append-only writer for one entry's row data. Dropping it
/// without calling [`TableDataWriter::finish`] discards the staged
/// rows; the entry is only marked as carrying data once `finish`
/// completes.
pub struct TableDataWriter<'a> {
    archive: &'a mut Archive,
    id: ID,
    column_names: Vec<String>,
    inner: Option<DataWriter>,
    temp: Option<tempfile::NamedTempFile>,
}

impl<'a> TableDataWriter<'a> {
    /// Appends one row. `values` must have the same length as the
    /// column names this writer was created with.
    pub fn append(&mut self, values: &[Option<&str>]) -> Result<(), ArchiveError> {
        if values.len() != self.column_names.len() {
            return Err(ArchiveError::FormatError {
                offset: None,
                message: format!(
                    "expected {} columns, got {}",
                    self.column_names.len(),
                    values.len()
                ),
            });
        }
        self.inner
            .as_mut()
            .expect("writer used after finish")
            .append_row(values)?;
        Ok(())
    }

    /// Flushes the staged rows and attaches them to the owning entry.
    pub fn finish(mut self) -> Result<(), ArchiveError> {
        let inner = self.inner.take().expect("writer used after finish");
        inner.finish()?;
        let temp = self.temp.take().expect("writer used after finish");

        let entry = self
            .archive
            .entries
            .iter_mut()
            .find(|e| e.id == self.id)
            .ok_or(ArchiveError::EntityNotFound)?;
        entry.had_dumper = true;
        entry.data_state = DataState::HasData;
        self.archive.staged.insert(self.id, temp);
        Ok(())
    }
}

/// A lazy sequence over every `BLOB` entry's `(oid, reader)` pair. Each
/// item's reader streams that blob's bytes on demand; it is never read
/// to completion by the iterator itself, so a caller can skip or
/// partially read a large blob without paying for the rest of it.
pub struct BlobIter<'a> {
    archive: &'a mut Archive,
    ids: std::vec::IntoIter<usize>,
}

impl<'a> Iterator for BlobIter<'a> {
    type Item = Result<(Oid, Box<dyn Read>), ArchiveError>;

    fn next(&mut self) -> Option<Self::Item> {
        let idx = self.ids.next()?;
        let entry = &self.archive.entries[idx];
        let entry_id = entry.id;
        let oid: Oid = entry.oid.parse().unwrap_or(0);
        let offset = match entry.data_state {
            DataState::HasDataOffset(o) => o,
            _ => return Some(Err(ArchiveError::NoDataPresent(entry_id))),
        };

        let codec = Codec::with_sizes(self.archive.integer_size, self.archive.offset_size);
        let mut file = match self.archive.source.as_ref() {
            Some(f) => match f.try_clone() {
                Ok(f) => f,
                Err(e) => return Some(Err(e.into())),
            },
            None => return Some(Err(ArchiveError::EntityNotFound)),
        };
        if let Err(e) = file.seek(SeekFrom::Start(offset)) {
            return Some(Err(e.into()));
        }
        match datastore::open_block(file, codec) {
            Ok(block) => Some(Ok((oid, block))),
            Err(e) => Some(Err(e)),
        }
    }
}

fn sibling_tmp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

/// Copies a data block unchanged from `old_offset` in `src` to the
/// current position in `out`, used when re-saving an archive that was
/// `load`ed with entries whose data is still only reachable through
/// the original file.
fn copy_raw_block(
    src: &mut File,
    old_offset: u64,
    out: &mut (impl Write + Tell),
    codec: &Codec,
) -> Result<u64, ArchiveError> {
    src.seek(SeekFrom::Start(old_offset))?;
    let new_offset = out.tell();
    let block_type = codec.read_byte(src)?;
    codec.write_byte(out, block_type)?;
    loop {
        let len = codec.read_int(src)?;
        codec.write_int(out, Some(len))?;
        if len <= 0 {
            break;
        }
        let mut buf = vec![0u8; len as usize];
        src.read_exact(&mut buf)?;
        out.write_all(&buf)?;
    }
    Ok(new_offset)
}

/// Extracts the first single-quoted substring in `defn`, used to pull
/// e.g. `'UTF8'` out of `SET client_encoding = 'UTF8';`.
fn quoted_value_in(defn: &str) -> Option<String> {
    let start = defn.find('\'')? + 1;
    let rest = &defn[start..];
    let end = rest.find('\'')?;
    Some(rest[..end].to_string())
}

/// Extracts the second single-quoted argument out of a
/// `pg_catalog.set_config('search_path', '...', false)` call, which is
/// how pre- and post-1.13 archives alike represent the SEARCHPATH TOC
/// entry's statement.
fn search_path_from_defn(defn: &str) -> Option<String> {
    let idx = defn.find("set_config(")?;
    let rest = &defn[idx..];
    let first_quote = rest.find('\'')?;
    let after_first = &rest[first_quote + 1..];
    let end_first = after_first.find('\'')?;
    let after_second_start = &after_first[end_first + 1..];
    let second_quote = after_second_start.find('\'')?;
    let after_second = &after_second_start[second_quote + 1..];
    let end_second = after_second.find('\'')?;
    Some(after_second[..end_second].to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use hex_literal::hex;

    #[test]
    fn v14_header_and_empty_toc() -> Result<(), ArchiveError> {
        let mut input = &hex!(
            "50 47 44 4d 50" // PGDMP
            "01 0e 00"  // major, minor, patch version
            "04" // integer size
            "08" // offset size
            "01" // header format
            "01 01 00 00 00" // Compression level
            "00 14 00 00 00" // Seconds
            "00 35 00 00 00" // Minutes
            "00 07 00 00 00" // Hours
            "00 18 00 00 00" // Days
            "00 0a 00 00 00" // Months
            "00 7a 00 00 00" // Years (since 1900)
            "00 00 00 00 00" // is DST
            "00 07 00 00 00 77 69 63 68 65 72 74" // database name
            "00 0f 00 00 00 31 34 2e 36 20 28 48 6f 6d 65 62 72 65 77 29" // server version
            "00 0f 00 00 00 31 34 2e 36 20 28 48 6f 6d 65 62 72 65 77 29" // pg_dump version
            "00 00 00 00 00" // toc size
        )[..];

        let archive = Archive::parse(&mut input)?;
        assert_eq!(archive.version, (1, 14, 0));
        assert_eq!(archive.compression, Compression::Gzip(-1));
        assert_eq!(archive.database_name, "wichert");
        assert_eq!(archive.entries.len(), 0);
        Ok(())
    }

    #[test]
    fn new_archive_has_sane_defaults() {
        let archive = Archive::new("exampledb", NewArchiveOptions::default());
        assert_eq!(archive.database_name, "exampledb");
        assert_eq!(archive.encoding, "UTF8");
        assert!(archive.std_strings);
        assert_eq!(archive.compression, Compression::None);
        assert!(archive.entries.is_empty());
    }

    #[test]
    fn new_archive_honors_target_server_version() {
        let archive = Archive::new(
            "db",
            NewArchiveOptions {
                target_server_version: Some(16),
                ..Default::default()
            },
        );
        assert_eq!(archive.version, (1, 15, 0));
    }

    #[test]
    fn add_entry_and_lookup_roundtrip() -> Result<(), ArchiveError> {
        let mut archive = Archive::new("db", NewArchiveOptions::default());
        archive.add_entry(NewEntry {
            tag: "widgets".into(),
            desc: "TABLE".into(),
            namespace: "public".into(),
            owner: "alice".into(),
            ..Default::default()
        })?;
        let found = archive.lookup_entry("TABLE", "public", "widgets");
        assert!(found.is_some());
        assert_eq!(found.unwrap().owner, "alice");
        Ok(())
    }

    #[test]
    fn save_without_data_is_single_pass_and_reloads() -> Result<(), ArchiveError> {
        let mut archive = Archive::new("exampledb", NewArchiveOptions::default());
        archive.add_entry(NewEntry {
            tag: "test".into(),
            desc: "SCHEMA".into(),
            defn: "CREATE SCHEMA test;\n".into(),
            drop_stmt: "DROP SCHEMA test;\n".into(),
            owner: "alice".into(),
            ..Default::default()
        })?;

        let temp = tempfile::NamedTempFile::new().unwrap();
        archive.save(temp.path())?;

        let reloaded = load(temp.path(), None)?;
        assert_eq!(reloaded.database_name, "exampledb");
        assert_eq!(reloaded.entries.len(), 1);
        assert_eq!(reloaded.entries[0].tag, "test");
        Ok(())
    }

    #[test]
    fn save_with_table_data_roundtrips_rows() -> Result<(), ArchiveError> {
        let mut archive = Archive::new("exampledb", NewArchiveOptions::default());
        let table = archive
            .add_entry(NewEntry {
                tag: "widgets".into(),
                desc: "TABLE".into(),
                namespace: "public".into(),
                defn: "CREATE TABLE widgets (id integer, name text);\n".into(),
                owner: "alice".into(),
                ..Default::default()
            })?
            .id;
        let data_id = archive
            .add_entry(NewEntry {
                id: None,
                tag: "widgets".into(),
                desc: "TABLE DATA".into(),
                namespace: "public".into(),
                copy_stmt: "COPY public.widgets (id, name) FROM stdin;\n".into(),
                owner: "alice".into(),
                dependencies: [table].into_iter().collect(),
                ..Default::default()
            })?
            .id;

        {
            let mut writer =
                archive.table_data_writer(data_id, vec!["id".into(), "name".into()])?;
            writer.append(&[Some("1"), Some("left-handed screwdriver")])?;
            writer.append(&[Some("2"), None])?;
            writer.finish()?;
        }

        let temp = tempfile::NamedTempFile::new().unwrap();
        archive.save(temp.path())?;

        let mut reloaded = load(temp.path(), None)?;
        let rows: Result<Vec<_>, _> = reloaded.table_data("public", "widgets")?.collect();
        let rows = rows?;
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0], vec![Value::Int(1), Value::Str("left-handed screwdriver".into())]);
        assert_eq!(rows[1], vec![Value::Int(2), Value::Null]);
        Ok(())
    }

    #[test]
    fn add_blob_and_read_back() -> Result<(), ArchiveError> {
        let mut archive = Archive::new("exampledb", NewArchiveOptions::default());
        archive.add_blob(16401, &b"hello blob"[..])?;

        let temp = tempfile::NamedTempFile::new().unwrap();
        archive.save(temp.path())?;

        let mut reloaded = load(temp.path(), None)?;
        let blobs: Result<Vec<_>, _> = reloaded.blobs().collect();
        let blobs = blobs?;
        assert_eq!(blobs.len(), 1);
        let (oid, mut reader) = blobs.into_iter().next().unwrap();
        assert_eq!(oid, 16401);
        let mut bytes = Vec::new();
        reader.read_to_end(&mut bytes)?;
        assert_eq!(bytes, b"hello blob".to_vec());
        Ok(())
    }

    #[test]
    fn cyclic_dependency_fails_at_save() -> Result<(), ArchiveError> {
        let mut archive = Archive::new("db", NewArchiveOptions::default());
        let a = archive
            .add_entry(NewEntry {
                tag: "a".into(),
                desc: "TABLE".into(),
                ..Default::default()
            })?
            .id;
        let b = archive
            .add_entry(NewEntry {
                tag: "b".into(),
                desc: "TABLE".into(),
                dependencies: [a].into_iter().collect(),
                ..Default::default()
            })?
            .id;
        for entry in archive.entries.iter_mut() {
            if entry.id == a {
                entry.dependencies.insert(b);
            }
        }

        let temp = tempfile::NamedTempFile::new().unwrap();
        let err = archive.save(temp.path()).unwrap_err();
        assert!(matches!(err, ArchiveError::CyclicDependencies));
        Ok(())
    }

    #[test]
    fn quoted_value_in_extracts_encoding() {
        assert_eq!(
            quoted_value_in("SET client_encoding = 'UTF8';\n"),
            Some("UTF8".to_string())
        );
    }

    #[test]
    fn search_path_from_defn_extracts_value() {
        let defn = "SELECT pg_catalog.set_config('search_path', 'public, test', false);\n";
        assert_eq!(
            search_path_from_defn(defn),
            Some("public, test".to_string())
        );
    }
}
