//! The archive header: magic, format version, the int/offset width
//! negotiation, the compression policy, and the handful of database
//! metadata strings that precede the table of contents.

use crate::constants::{Version, FORMAT_CUSTOM, MAGIC, MAX_SUPPORTED_VERSION, MIN_SUPPORTED_VERSION};
use crate::error::ArchiveError;
use crate::io::Codec;
use chrono::{DateTime, Datelike, FixedOffset, TimeZone, Timelike, Utc};
use std::io::{Read, Write};

/// Compression policy for an archive's data blocks.
///
/// `Gzip` carries the compression level; `0` means "let flate2 pick a
/// default" and mirrors what `pg_dump` itself writes for the common
/// case. `Lz4`/`Zstd` are recognized on read (archives written by
/// newer `pg_dump` builds can declare them) but this crate only ever
/// reads or writes gzip-compressed or uncompressed data blocks — see
/// DESIGN.md.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compression {
    None,
    Gzip(i64),
    Lz4,
    Zstd,
}

impl Compression {
    pub fn is_enabled(&self) -> bool {
        !matches!(self, Compression::None)
    }
}

impl std::fmt::Display for Compression {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Header {
    pub version: Version,
    pub compression: Compression,
    pub timestamp: DateTime<FixedOffset>,
    pub database_name: String,
    pub server_version: String,
    pub pgdump_version: String,
    pub encoding: String,
    pub std_strings: bool,
}

impl Header {
    /// Reads the magic, version preamble, width negotiation, and
    /// metadata fields. Returns the parsed header together with the
    /// [`Codec`] whose widths everything downstream (the TOC, the
    /// data blocks) must use.
    pub fn read(f: &mut (impl Read + ?Sized)) -> Result<(Header, Codec), ArchiveError> {
        let mut magic = [0u8; 5];
        f.read_exact(&mut magic)
            .map_err(|_| ArchiveError::NotAnArchive)?;
        if &magic != MAGIC {
            return Err(ArchiveError::NotAnArchive);
        }

        let probe = Codec::new();
        let version: Version = (
            probe.read_byte(f)?,
            probe.read_byte(f)?,
            probe.read_byte(f)?,
        );
        if version < MIN_SUPPORTED_VERSION || version > MAX_SUPPORTED_VERSION {
            return Err(ArchiveError::UnsupportedVersion(version));
        }

        let int_size = probe.read_byte(f)? as usize;
        let offset_size = probe.read_byte(f)? as usize;
        let codec = Codec::with_sizes(int_size, offset_size);

        if codec.read_byte(f)? != FORMAT_CUSTOM {
            return Err(ArchiveError::FormatError {
                offset: None,
                message: "archive format byte is not 'custom' (1)".into(),
            });
        }

        let compression = if version >= (1, 15, 0) {
            let alg = codec.read_byte(f)?;
            // The level varint always follows the algorithm byte on the
            // wire, even when the algorithm isn't gzip.
            let level = codec.read_int(f)?;
            match alg {
                0 => Compression::None,
                1 => Compression::Gzip(level),
                2 => Compression::Lz4,
                3 => Compression::Zstd,
                other => return Err(ArchiveError::CompressionMethodNotSupported(other)),
            }
        } else {
            let level = codec.read_int(f)?;
            if level == 0 {
                Compression::None
            } else {
                Compression::Gzip(level)
            }
        };

        let sec = codec.read_int(f)?;
        let min = codec.read_int(f)?;
        let hour = codec.read_int(f)?;
        let mday = codec.read_int(f)?;
        let mon = codec.read_int(f)?;
        let year = codec.read_int(f)?;
        let _is_dst = codec.read_int(f)?;

        // `pg_dump` writes `tm_year` as years-since-1900 through format
        // 1.14 and as the full year from 1.15 on; `tm_mon` is always
        // zero-based. See DESIGN.md for the boundary caveat this isn't
        // fully pinned down against a real archive.
        let full_year = if version >= (1, 15, 0) { year } else { year + 1900 };

        let naive_date =
            chrono::NaiveDate::from_ymd_opt(full_year as i32, (mon + 1) as u32, mday as u32)
                .ok_or_else(|| ArchiveError::FormatError {
                    offset: None,
                    message: "invalid creation date".into(),
                })?;
        let naive_time = naive_date
            .and_hms_opt(hour as u32, min as u32, sec as u32)
            .ok_or_else(|| ArchiveError::FormatError {
                offset: None,
                message: "invalid creation time".into(),
            })?;
        let timestamp = Utc.from_utc_datetime(&naive_time).fixed_offset();

        let database_name = codec.read_string(f)?.unwrap_or_default();
        let server_version = codec.read_string(f)?.unwrap_or_default();
        let pgdump_version = codec.read_string(f)?.unwrap_or_default();

        // Versions >= 1.13 carry encoding/std_strings as a small block
        // right here; earlier versions carry them as ENCODING/STDSTRINGS
        // TOC entries, which the caller fills in after parsing the TOC.
        let (encoding, std_strings) = if version >= (1, 13, 0) {
            let encoding = codec.read_string(f)?.unwrap_or_else(|| "UTF8".into());
            let std_strings = codec.read_int_bool(f)?;
            (encoding, std_strings)
        } else {
            ("UTF8".to_string(), true)
        };

        Ok((
            Header {
                version,
                compression,
                timestamp,
                database_name,
                server_version,
                pgdump_version,
                encoding,
                std_strings,
            },
            codec,
        ))
    }

    pub fn write(&self, f: &mut (impl Write + ?Sized), codec: &Codec) -> Result<(), ArchiveError> {
        f.write_all(MAGIC)?;
        codec.write_byte(f, self.version.0)?;
        codec.write_byte(f, self.version.1)?;
        codec.write_byte(f, self.version.2)?;
        codec.write_byte(f, codec.int_size as u8)?;
        codec.write_byte(f, codec.offset_size as u8)?;
        codec.write_byte(f, FORMAT_CUSTOM)?;

        if self.version >= (1, 15, 0) {
            let (alg, level) = match self.compression {
                Compression::None => (0, 0),
                Compression::Gzip(level) => (1, level),
                Compression::Lz4 => (2, 0),
                Compression::Zstd => (3, 0),
            };
            codec.write_byte(f, alg)?;
            // The level varint always follows the algorithm byte, even
            // when the algorithm isn't gzip.
            codec.write_int(f, Some(level))?;
        } else {
            let level = match self.compression {
                Compression::Gzip(level) => level,
                _ => 0,
            };
            codec.write_int(f, Some(level))?;
        }

        let utc = self.timestamp.naive_utc();
        codec.write_int(f, Some(utc.second() as i64))?;
        codec.write_int(f, Some(utc.minute() as i64))?;
        codec.write_int(f, Some(utc.hour() as i64))?;
        codec.write_int(f, Some(utc.day() as i64))?;
        codec.write_int(f, Some((utc.month() - 1) as i64))?;
        let year = if self.version >= (1, 15, 0) {
            utc.year() as i64
        } else {
            utc.year() as i64 - 1900
        };
        codec.write_int(f, Some(year))?;
        codec.write_int(f, Some(0))?; // isdst, unknown/unused on write

        codec.write_string(f, Some(&self.database_name))?;
        codec.write_string(f, Some(&self.server_version))?;
        codec.write_string(f, Some(&self.pgdump_version))?;

        if self.version >= (1, 13, 0) {
            codec.write_string(f, Some(&self.encoding))?;
            codec.write_int_bool(f, self.std_strings)?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hex_literal::hex;

    #[test]
    fn v14_header() -> Result<(), ArchiveError> {
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
        )[..];

        let (header, codec) = Header::read(&mut input)?;
        assert_eq!(header.version, (1, 14, 0));
        assert_eq!(header.compression, Compression::Gzip(-1));
        assert_eq!(header.database_name, "wichert");
        assert_eq!(header.server_version, "14.6 (Homebrew)");
        assert_eq!(codec.int_size, 4);
        assert_eq!(codec.offset_size, 8);
        Ok(())
    }

    #[test]
    fn rejects_bad_magic() {
        let mut input: &[u8] = b"NOTIT";
        assert!(matches!(
            Header::read(&mut input),
            Err(ArchiveError::NotAnArchive)
        ));
    }

    #[test]
    fn rejects_unsupported_version() {
        let mut input: &[u8] = &hex_literal::hex!("50 47 44 4d 50 01 0b 00");
        assert!(matches!(
            Header::read(&mut input),
            Err(ArchiveError::UnsupportedVersion(_))
        ));
    }

    #[test]
    fn header_roundtrip_v15() -> Result<(), ArchiveError> {
        let header = Header {
            version: (1, 15, 0),
            compression: Compression::Gzip(6),
            timestamp: Utc
                .with_ymd_and_hms(2024, 3, 1, 12, 30, 0)
                .unwrap()
                .fixed_offset(),
            database_name: "exampledb".into(),
            server_version: "16.2".into(),
            pgdump_version: "16.2".into(),
            encoding: "UTF8".into(),
            std_strings: true,
        };
        let codec = Codec::with_sizes(4, 8);
        let mut buffer = Vec::new();
        header.write(&mut buffer, &codec)?;
        let mut cursor: &[u8] = &buffer;
        let (parsed, parsed_codec) = Header::read(&mut cursor)?;
        assert_eq!(parsed.version, header.version);
        assert_eq!(parsed.compression, header.compression);
        assert_eq!(parsed.database_name, header.database_name);
        assert_eq!(parsed.encoding, header.encoding);
        assert_eq!(parsed.std_strings, header.std_strings);
        assert_eq!(parsed_codec, codec);
        Ok(())
    }

    #[test]
    fn v15_non_gzip_compression_still_writes_level_varint() -> Result<(), ArchiveError> {
        // Per spec.md, the level varint follows the algorithm byte
        // unconditionally at >= 1.15, even when the algorithm isn't
        // gzip; omitting it would desync every field that follows.
        let header = Header {
            version: (1, 15, 0),
            compression: Compression::None,
            timestamp: Utc.with_ymd_and_hms(2024, 3, 1, 12, 30, 0).unwrap().fixed_offset(),
            database_name: "db".into(),
            server_version: "16.2".into(),
            pgdump_version: "16.2".into(),
            encoding: "UTF8".into(),
            std_strings: true,
        };
        let codec = Codec::with_sizes(4, 8);
        let mut buffer = Vec::new();
        header.write(&mut buffer, &codec)?;

        // magic(5) + version(3) + intsize(1) + offsize(1) + format(1) = 11
        // bytes in, then the algorithm byte (0) and a 5-byte level varint.
        assert_eq!(buffer[11], 0);
        assert_eq!(&buffer[12..17], &[0, 0, 0, 0, 0]);

        let mut cursor: &[u8] = &buffer;
        let (parsed, _) = Header::read(&mut cursor)?;
        assert_eq!(parsed.compression, Compression::None);
        assert_eq!(parsed.database_name, "db");
        Ok(())
    }

    #[test]
    fn boundary_versions_parse() -> Result<(), ArchiveError> {
        for (major, minor) in [(12u8, 0u8), (16, 0)] {
            let header = Header {
                version: (1, major, minor),
                compression: Compression::None,
                timestamp: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap().fixed_offset(),
                database_name: "db".into(),
                server_version: "1.0".into(),
                pgdump_version: "1.0".into(),
                encoding: "UTF8".into(),
                std_strings: true,
            };
            let codec = Codec::with_sizes(4, 8);
            let mut buffer = Vec::new();
            header.write(&mut buffer, &codec)?;
            let mut cursor: &[u8] = &buffer;
            let (parsed, _) = Header::read(&mut cursor)?;
            assert_eq!(parsed.version, (1, major, minor));
        }
        Ok(())
    }
}
