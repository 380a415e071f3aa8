//! The table-of-contents entry model: one record per database object
//! (or per table's row data), plus the factory that enforces the
//! invariants spec'd for every entry added to an archive.

use crate::constants::{is_known_descriptor, section_of, Section};
use crate::error::ArchiveError;
use std::collections::BTreeSet;

/// Archive-local integer identity used for cross-entry dependency
/// references. Assigned monotonically by [`Entry::next_id`] unless the
/// caller supplies one explicitly.
pub type ID = i64;

/// Where, if anywhere, an entry's data block lives.
///
/// `HasData` means a writer appended rows/bytes for this entry but the
/// archive hasn't been saved yet, so no on-disk offset exists. It is
/// resolved to `HasDataOffset` during [`crate::archive::Archive::save`]'s
/// second pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataState {
    NoData,
    HasData,
    HasDataOffset(u64),
}

/// One table-of-contents record: a database object (schema, table,
/// index, ACL, …) together with the DDL needed to recreate it and,
/// for `TABLE DATA`/`BLOB` entries, a pointer to its data block.
#[derive(Debug, Clone, PartialEq)]
pub struct Entry {
    pub id: ID,
    pub had_dumper: bool,
    pub table_oid: String,
    pub oid: String,
    pub tag: String,
    pub desc: String,
    pub section: Section,
    pub defn: String,
    pub drop_stmt: String,
    pub copy_stmt: String,
    pub namespace: String,
    pub tablespace: String,
    /// Present only for archive format >= 1.14.
    pub table_access_method: String,
    /// Present only for archive format >= 1.16.
    pub relkind: String,
    pub owner: String,
    pub dependencies: BTreeSet<ID>,
    pub data_state: DataState,
}

/// Fields a caller supplies when adding a new entry; everything else
/// (`id` if unset, `section`, `had_dumper`, `data_state`) is derived.
#[derive(Debug, Clone, Default)]
pub struct NewEntry {
    pub id: Option<ID>,
    pub table_oid: String,
    pub oid: String,
    pub tag: String,
    pub desc: String,
    pub defn: String,
    pub drop_stmt: String,
    pub copy_stmt: String,
    pub namespace: String,
    pub tablespace: String,
    pub table_access_method: String,
    pub relkind: String,
    pub owner: String,
    pub dependencies: BTreeSet<ID>,
}

impl Entry {
    /// Builds an `Entry` from caller-supplied fields, enforcing every
    /// invariant from the data model: dump id assignment/uniqueness,
    /// section derived from `desc`, and dependency resolution against
    /// the entries already in the archive.
    pub fn new_checked(existing: &[Entry], new: NewEntry) -> Result<Entry, ArchiveError> {
        let id = match new.id {
            Some(id) => {
                if id <= 0 {
                    return Err(ArchiveError::InvalidId(id));
                }
                if existing.iter().any(|e| e.id == id) {
                    return Err(ArchiveError::InvalidId(id));
                }
                id
            }
            None => Self::next_id(existing),
        };

        if !is_known_descriptor(&new.desc) {
            return Err(ArchiveError::UnknownDescriptor(new.desc));
        }
        let section = section_of(&new.desc);

        for dep in &new.dependencies {
            if !existing.iter().any(|e| e.id == *dep) {
                return Err(ArchiveError::MissingDependency {
                    entry: id,
                    missing: *dep,
                });
            }
        }

        Ok(Entry {
            id,
            had_dumper: false,
            table_oid: new.table_oid,
            oid: new.oid,
            tag: new.tag,
            desc: new.desc,
            section,
            defn: new.defn,
            drop_stmt: new.drop_stmt,
            copy_stmt: new.copy_stmt,
            namespace: new.namespace,
            tablespace: new.tablespace,
            table_access_method: new.table_access_method,
            relkind: new.relkind,
            owner: new.owner,
            dependencies: new.dependencies,
            data_state: DataState::NoData,
        })
    }

    pub fn next_id(existing: &[Entry]) -> ID {
        existing.iter().map(|e| e.id).max().unwrap_or(0) + 1
    }
}
