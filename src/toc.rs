//! The table-of-contents codec: version-aware reading and writing of
//! the fixed-field record every [`Entry`] is serialized as.
//!
//! Field order and most field widths are unchanged across every
//! format version this crate supports; only `table_access_method`
//! (>= 1.14) and `relkind` (>= 1.16) are version-gated.

use crate::constants::{section_of, Section, Version};
use crate::entry::{DataState, Entry, ID};
use crate::error::ArchiveError;
use crate::io::{Codec, Tell};
use std::collections::BTreeSet;
use std::io::{Read, Write};

/// Reads the entry count followed by that many entries.
pub fn read_entries(
    f: &mut (impl Read + ?Sized),
    codec: &Codec,
    version: Version,
) -> Result<Vec<Entry>, ArchiveError> {
    let n = codec.read_int(f)?;
    if n < 0 {
        return Err(ArchiveError::FormatError {
            offset: None,
            message: "negative TOC entry count".into(),
        });
    }
    let mut entries = Vec::with_capacity(n as usize);
    for _ in 0..n {
        entries.push(read_entry(f, codec, version)?);
    }
    Ok(entries)
}

fn read_entry(
    f: &mut (impl Read + ?Sized),
    codec: &Codec,
    version: Version,
) -> Result<Entry, ArchiveError> {
    let id: ID = codec.read_int(f)?;
    if id <= 0 {
        return Err(ArchiveError::InvalidId(id));
    }
    let had_dumper = codec.read_int_bool(f)?;
    let table_oid = codec.read_string(f)?.unwrap_or_default();
    let oid = codec.read_string(f)?.unwrap_or_default();
    let tag = codec.read_string(f)?.unwrap_or_default();
    let desc = codec.read_string(f)?.unwrap_or_default();
    let section_code = codec.read_int(f)?;
    // The wire value is only a sanity check: it must be one of the four
    // legal codes, but the section a restore actually honors is always
    // derived from `desc`. A producer that wrote a stale or mismatched
    // code should not be able to smuggle an entry into the wrong phase.
    Section::try_from(section_code).map_err(|_| ArchiveError::FormatError {
        offset: None,
        message: format!("invalid section code {section_code}"),
    })?;
    let section = section_of(&desc);
    let defn = codec.read_string(f)?.unwrap_or_default();
    let drop_stmt = codec.read_string(f)?.unwrap_or_default();
    let copy_stmt = codec.read_string(f)?.unwrap_or_default();
    let namespace = codec.read_string(f)?.unwrap_or_default();
    let tablespace = codec.read_string(f)?.unwrap_or_default();
    let table_access_method = if version >= (1, 14, 0) {
        codec.read_string(f)?.unwrap_or_default()
    } else {
        String::new()
    };
    let relkind = if version >= (1, 16, 0) {
        codec.read_string(f)?.unwrap_or_default()
    } else {
        String::new()
    };
    let owner = codec.read_string(f)?.unwrap_or_default();

    if codec.read_string_bool(f)? {
        return Err(ArchiveError::FormatError {
            offset: None,
            message: "TOC entry's \"with OIDs\" flag must be false".into(),
        });
    }

    let mut dependencies = BTreeSet::new();
    loop {
        let raw = codec.read_string(f)?.unwrap_or_default();
        if raw.is_empty() {
            break;
        }
        let dep: ID = raw.parse().map_err(|_| ArchiveError::FormatError {
            offset: None,
            message: format!("invalid dependency dump id {raw:?}"),
        })?;
        dependencies.insert(dep);
    }

    let data_state = codec.read_data_state(f)?;

    Ok(Entry {
        id,
        had_dumper,
        table_oid,
        oid,
        tag,
        desc,
        section,
        defn,
        drop_stmt,
        copy_stmt,
        namespace,
        tablespace,
        table_access_method,
        relkind,
        owner,
        dependencies,
        data_state,
    })
}

/// Writes the entry count followed by every entry, returning the
/// absolute byte position of the data-state field for each entry that
/// carries pending (not-yet-offset) data, so the caller can come back
/// and patch it once the real offset is known.
pub fn write_entries(
    f: &mut (impl Write + Tell),
    codec: &Codec,
    version: Version,
    entries: &[Entry],
) -> Result<Vec<(ID, u64)>, ArchiveError> {
    codec.write_int(f, Some(entries.len() as i64))?;
    let mut pending = Vec::new();
    for entry in entries {
        let pos = write_entry(f, codec, version, entry)?;
        if !matches!(entry.data_state, DataState::NoData) {
            pending.push((entry.id, pos));
        }
    }
    Ok(pending)
}

fn write_entry(
    f: &mut (impl Write + Tell),
    codec: &Codec,
    version: Version,
    entry: &Entry,
) -> Result<u64, ArchiveError> {
    codec.write_int(f, Some(entry.id))?;
    codec.write_int_bool(f, entry.had_dumper)?;
    codec.write_string(f, Some(&entry.table_oid))?;
    codec.write_string(f, Some(&entry.oid))?;
    codec.write_string(f, Some(&entry.tag))?;
    codec.write_string(f, Some(&entry.desc))?;
    codec.write_int(f, Some(entry.section as i64))?;
    codec.write_string(f, Some(&entry.defn))?;
    codec.write_string(f, Some(&entry.drop_stmt))?;
    codec.write_string(f, Some(&entry.copy_stmt))?;
    codec.write_string(f, Some(&entry.namespace))?;
    codec.write_string(f, Some(&entry.tablespace))?;
    if version >= (1, 14, 0) {
        codec.write_string(f, Some(&entry.table_access_method))?;
    }
    if version >= (1, 16, 0) {
        codec.write_string(f, Some(&entry.relkind))?;
    }
    codec.write_string(f, Some(&entry.owner))?;
    codec.write_string(f, Some("false"))?;
    for dep in &entry.dependencies {
        codec.write_string(f, Some(&dep.to_string()))?;
    }
    // Terminator is a null string (wire length -1), not an empty one —
    // see io.rs's write_string doc comment on the two being distinct.
    codec.write_string(f, None)?;

    let position = f.tell();
    let state_to_write = match entry.data_state {
        DataState::NoData => DataState::NoData,
        // Any pending or already-placed data is written as a
        // placeholder on this pass; the caller patches in the real,
        // final offset once every data block has been emitted.
        DataState::HasData | DataState::HasDataOffset(_) => DataState::HasData,
    };
    codec.write_data_state(f, state_to_write)?;
    Ok(position)
}
