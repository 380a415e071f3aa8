//! Fixed catalogues: the archive magic, the object-descriptor → section
//! map, and the PostgreSQL server-version → archive-format-version table.
//!
//! None of this is negotiated at runtime; it mirrors the tables baked
//! into `pg_dump`/`pg_restore` itself.

/// Type used for archive format and PostgreSQL version numbers.
pub type Version = (u8, u8, u8);

pub const MIN_SUPPORTED_VERSION: Version = (1, 12, 0);
pub const MAX_SUPPORTED_VERSION: Version = (1, 16, 0);

/// Five-byte magic every custom-format archive begins with.
pub const MAGIC: &[u8; 5] = b"PGDMP";

/// Archive format constant written in the header's "format" byte.
/// The custom format is the only one this crate ever writes or reads.
pub const FORMAT_CUSTOM: u8 = 1;

/// PostgreSQL object id. Carried as decimal strings on the wire (see
/// `Entry::oid`/`Entry::table_oid`); exposed numerically at the
/// `add_blob`/`blobs` API boundary since that's how callers think of
/// large object identifiers.
pub type Oid = u64;

/// Coarse phase classification controlling restore ordering.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum Section {
    /// Entries that don't modify the schema or load data (comments, ACLs).
    None = 1,
    /// Must be processed before table data is loaded.
    PreData,
    /// Loads data into tables or large objects.
    Data,
    /// Must be processed after table data is loaded (indexes, sequences).
    PostData,
}

impl TryFrom<i64> for Section {
    type Error = ();

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        match value {
            x if x == Section::None as i64 => Ok(Section::None),
            x if x == Section::PreData as i64 => Ok(Section::PreData),
            x if x == Section::Data as i64 => Ok(Section::Data),
            x if x == Section::PostData as i64 => Ok(Section::PostData),
            _ => Err(()),
        }
    }
}

impl std::fmt::Display for Section {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// Every object-type descriptor this crate recognizes, paired with the
/// section that governs its restore ordering. The single source of
/// truth for both [`section_of`] (used on the read path, where an
/// unrecognized descriptor must not fail the whole archive) and
/// [`is_known_descriptor`] (used on the `add_entry` path, where a
/// caller-supplied descriptor that isn't in this table is a mistake).
const DESCRIPTOR_SECTIONS: &[(&str, Section)] = &[
    ("TABLE", Section::PreData),
    ("SCHEMA", Section::PreData),
    ("EXTENSION", Section::PreData),
    ("TYPE", Section::PreData),
    ("DOMAIN", Section::PreData),
    ("SEQUENCE", Section::PreData),
    ("VIEW", Section::PreData),
    ("MATERIALIZED VIEW", Section::PreData),
    ("FUNCTION", Section::PreData),
    ("PROCEDURE", Section::PreData),
    ("AGGREGATE", Section::PreData),
    ("OPERATOR", Section::PreData),
    ("OPERATOR CLASS", Section::PreData),
    ("OPERATOR FAMILY", Section::PreData),
    ("COLLATION", Section::PreData),
    ("CONVERSION", Section::PreData),
    ("CAST", Section::PreData),
    ("SERVER", Section::PreData),
    ("FOREIGN DATA WRAPPER", Section::PreData),
    ("USER MAPPING", Section::PreData),
    ("FOREIGN TABLE", Section::PreData),
    ("TEXT SEARCH PARSER", Section::PreData),
    ("TEXT SEARCH DICTIONARY", Section::PreData),
    ("TEXT SEARCH TEMPLATE", Section::PreData),
    ("TEXT SEARCH CONFIGURATION", Section::PreData),
    ("SEQUENCE OWNED BY", Section::PreData),
    ("SHELL TYPE", Section::PreData),
    ("PROCEDURAL LANGUAGE", Section::PreData),
    ("DATABASE", Section::PreData),
    ("ENCODING", Section::PreData),
    ("STDSTRINGS", Section::PreData),
    ("SEARCHPATH", Section::PreData),
    ("TABLE DATA", Section::Data),
    ("BLOBS", Section::Data),
    ("BLOB", Section::Data),
    ("BLOB METADATA", Section::Data),
    ("INDEX", Section::PostData),
    ("CONSTRAINT", Section::PostData),
    ("FK CONSTRAINT", Section::PostData),
    ("TRIGGER", Section::PostData),
    ("RULE", Section::PostData),
    ("DEFAULT", Section::PostData),
    ("SEQUENCE SET", Section::PostData),
    ("POLICY", Section::PostData),
    ("ROW SECURITY", Section::PostData),
    ("PUBLICATION", Section::PostData),
    ("PUBLICATION TABLE", Section::PostData),
    ("SUBSCRIPTION", Section::PostData),
    ("MATERIALIZED VIEW DATA", Section::PostData),
    ("REFRESH MATERIALIZED VIEW", Section::PostData),
    ("COMMENT", Section::None),
    ("ACL", Section::None),
    ("ACL LANGUAGE", Section::None),
    ("CHECK CONSTRAINT", Section::None),
    ("DEFAULT ACL", Section::None),
    ("EVENT TRIGGER", Section::None),
    ("SECURITY LABEL", Section::None),
];

/// Maps an object-type descriptor (as it appears on the wire) to the
/// section that governs its restore ordering. Unrecognized descriptors
/// fall back to `Section::None` rather than failing the whole archive:
/// new object kinds show up in newer `pg_dump` versions faster than any
/// fixed table can track them. This leniency is only appropriate when
/// reading an existing TOC; callers building new entries go through
/// [`is_known_descriptor`] instead, which does not forgive a typo.
pub fn section_of(desc: &str) -> Section {
    DESCRIPTOR_SECTIONS
        .iter()
        .find(|(d, _)| *d == desc)
        .map(|&(_, section)| section)
        .unwrap_or(Section::None)
}

/// Whether `desc` is one of the object-type descriptors this crate
/// recognizes. Used to reject a caller-supplied descriptor at
/// `add_entry` time rather than silently bucketing it into
/// `Section::None` the way the forgiving read-path [`section_of`] does.
pub fn is_known_descriptor(desc: &str) -> bool {
    DESCRIPTOR_SECTIONS.iter().any(|(d, _)| *d == desc)
}

/// Maps a PostgreSQL server major version to the archive format version
/// `pg_dump` on that server emits by default. The write path consults
/// this when a caller supplies a target server version instead of a
/// literal archive format; unknown (future) versions fall back to the
/// newest format this crate knows how to write.
pub fn archive_version_for_server(pg_major: u16) -> Version {
    match pg_major {
        0..=9 => (1, 12, 0),
        10..=13 => (1, 13, 0),
        14 => (1, 14, 0),
        15..=16 => (1, 15, 0),
        _ => MAX_SUPPORTED_VERSION,
    }
}
