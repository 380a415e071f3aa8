//! Reader and writer for PostgreSQL backup archives in `pg_dump`'s
//! custom format (`pg_dump -Fc`).
//!
//! This crate decodes the fixed header, the table of contents (every
//! schema, table, index, ACL, … together with its DDL, drop
//! statement, owner, dependencies and section), and the gzip-framed
//! data blocks holding table rows and large objects — without needing
//! a PostgreSQL client, and without trusting (or executing) any SQL
//! embedded in the dump.
//!
//! ```rust,no_run
//! use pgarchive::load;
//!
//! let mut archive = load("tests/test.pgdump", None).unwrap();
//! println!("backup of {}, {} TOC entries", archive.database_name, archive.entries.len());
//!
//! for row in archive.table_data("public", "pizza").unwrap() {
//!     println!("{:?}", row.unwrap());
//! }
//! ```
mod archive;
mod constants;
mod converter;
mod datastore;
mod entry;
mod error;
mod header;
mod io;
mod toc;
mod topo;

pub use archive::{load, Archive, BlobIter, NewArchiveOptions, TableDataReader, TableDataWriter};
pub use constants::{
    archive_version_for_server, Oid, Section, Version, MAX_SUPPORTED_VERSION, MIN_SUPPORTED_VERSION,
};
pub use converter::{Converter, DefaultConverter, NoOpConverter, SmartConverter, Value};
pub use entry::{DataState, Entry, NewEntry, ID};
pub use error::ArchiveError;
pub use header::Compression;
