//! BIFF string decoding.
//!
//! BIFF8 strings ("XLUnicodeString") have a header:
//! - char_count (1 or 2 bytes, depending on the record) + flags (1 byte)
//! - Flags bit 0 (`fHighByte`): 0 = compressed Latin-1, 1 = uncompressed UTF-16LE
//! - Flags bit 2 (`fExtSt`): extended string data follows (Asian phonetic)
//! - Flags bit 3 (`fRichSt`): rich text run array follows
//! - If fRichSt: 2-byte run count follows the flags
//! - If fExtSt: 4-byte extended data size follows
//! - Then the character data, the runs (4 bytes each), the extended data
//!
//! When the character data runs past a CONTINUE boundary, the continued
//! part starts with a new flags byte whose `fHighByte` applies from there on.
//!
//! BIFF5 strings are plain 8-bit byte strings in the workbook code page,
//! prefixed with a 1- or 2-byte length.

use biffcells_core::SharedString;
use encoding_rs::{
    Encoding, BIG5, EUC_KR, GBK, IBM866, MACINTOSH, SHIFT_JIS, UTF_8, WINDOWS_1250,
    WINDOWS_1251, WINDOWS_1252, WINDOWS_1253, WINDOWS_1254, WINDOWS_1255, WINDOWS_1256,
    WINDOWS_1257, WINDOWS_1258, WINDOWS_874,
};

use super::parser::ByteReader;
use crate::error::{XlsError, XlsResult};

const FLAG_HIGH_BYTE: u8 = 0x01;
const FLAG_EXT: u8 = 0x04;
const FLAG_RICH: u8 = 0x08;

/// Code page assumed when a workbook has no CODEPAGE record.
pub const DEFAULT_CODEPAGE: u16 = 1252;

/// The `encoding_rs` encoding for a CODEPAGE value, if there is one.
pub fn encoding_for_codepage(codepage: u16) -> Option<&'static Encoding> {
    Some(match codepage {
        866 => IBM866,
        874 => WINDOWS_874,
        932 => SHIFT_JIS,
        936 => GBK,
        949 => EUC_KR,
        950 => BIG5,
        1250 => WINDOWS_1250,
        1251 => WINDOWS_1251,
        // 367 is US-ASCII
        367 | 1252 => WINDOWS_1252,
        1253 => WINDOWS_1253,
        1254 => WINDOWS_1254,
        1255 => WINDOWS_1255,
        1256 => WINDOWS_1256,
        1257 => WINDOWS_1257,
        1258 => WINDOWS_1258,
        // 0x8000 is how Excel writes Mac Roman
        10000 | 32768 => MACINTOSH,
        65001 => UTF_8,
        _ => return None,
    })
}

/// Decode 8-bit text in `codepage`, falling back to Latin-1 for code pages
/// `encoding_rs` does not know.
pub fn decode_codepage(raw: &[u8], codepage: u16) -> String {
    match encoding_for_codepage(codepage) {
        Some(encoding) => encoding.decode_without_bom_handling(raw).0.into_owned(),
        None => raw.iter().map(|&b| b as char).collect(),
    }
}

/// Read a BIFF8 "short" string (1-byte length prefix, used in BOUNDSHEET, FONT).
pub fn read_short_string(r: &mut ByteReader<'_>) -> XlsResult<String> {
    let char_count = r.u8()? as usize;
    let flags = r.u8()?;
    read_character_data(r, char_count, flags)
}

/// Read a BIFF8 Unicode string with a 2-byte length prefix (SST, LABEL, STRING).
///
/// Rich-text runs and extended data are skipped.
pub fn read_unicode_string(r: &mut ByteReader<'_>) -> XlsResult<String> {
    let char_count = r.u16()? as usize;
    read_flagged_string(r, char_count)
}

/// Read a BIFF8 string whose character count was stored elsewhere in the
/// record (e.g. NAME, where `cch` sits in the fixed header).
pub fn read_unicode_chars(r: &mut ByteReader<'_>, char_count: usize) -> XlsResult<String> {
    let flags = r.u8()?;
    read_character_data(r, char_count, flags)
}

fn read_flagged_string(r: &mut ByteReader<'_>, char_count: usize) -> XlsResult<String> {
    let flags = r.u8()?;
    let run_count = if flags & FLAG_RICH != 0 { r.u16()? } else { 0 };
    let ext_size = if flags & FLAG_EXT != 0 { r.u32()? } else { 0 };

    let text = read_character_data(r, char_count, flags)?;

    // Rich text runs: char_pos u16 + font_idx u16
    r.skip(run_count as usize * 4)?;
    r.skip(ext_size as usize)?;

    Ok(text)
}

fn read_character_data(r: &mut ByteReader<'_>, count: usize, flags: u8) -> XlsResult<String> {
    let mut wide = flags & FLAG_HIGH_BYTE != 0;
    let mut units: Vec<u16> = Vec::with_capacity(count.min(r.remaining()));
    let mut left = count;

    while left > 0 {
        if r.at_continue() {
            wide = r.u8()? & FLAG_HIGH_BYTE != 0;
            continue;
        }
        let width = if wide { 2 } else { 1 };
        let available = r.remaining_in_fragment() / width;
        if available == 0 {
            return Err(XlsError::Parse(format!(
                "string data too short: need {} bytes at offset {}, have {}",
                left * width,
                r.position(),
                r.remaining_in_fragment()
            )));
        }
        let take = left.min(available);
        let raw = r.bytes(take * width)?;
        if wide {
            units.extend(
                raw.chunks_exact(2)
                    .map(|pair| u16::from_le_bytes([pair[0], pair[1]])),
            );
        } else {
            units.extend(raw.iter().map(|&b| b as u16));
        }
        left -= take;
    }

    String::from_utf16(&units).map_err(|e| XlsError::Parse(format!("invalid UTF-16 string: {e}")))
}

/// Read `count` 8-bit characters of a BIFF5 byte string.
pub fn read_byte_string(r: &mut ByteReader<'_>, count: usize, codepage: u16) -> XlsResult<String> {
    let raw = r.bytes(count).map_err(|_| {
        XlsError::Parse(format!(
            "string data too short: need {} bytes at offset {}, have {}",
            count,
            r.position(),
            r.remaining()
        ))
    })?;
    Ok(decode_codepage(raw, codepage))
}

/// BIFF5 byte string with a 1-byte length prefix.
pub fn read_byte_string_u8(r: &mut ByteReader<'_>, codepage: u16) -> XlsResult<String> {
    let count = r.u8()? as usize;
    read_byte_string(r, count, codepage)
}

/// BIFF5 byte string with a 2-byte length prefix.
pub fn read_byte_string_u16(r: &mut ByteReader<'_>, codepage: u16) -> XlsResult<String> {
    let count = r.u16()? as usize;
    read_byte_string(r, count, codepage)
}

/// Parse the SST (Shared String Table) from its body with all CONTINUE
/// bodies joined; `r` must carry the CONTINUE offsets.
///
/// The body starts with `total_strings` (u32) and `unique_strings` (u32),
/// then `unique_strings` Unicode string entries.
pub fn parse_sst(r: &mut ByteReader<'_>) -> XlsResult<Vec<SharedString>> {
    let _total_strings = r.u32()?;
    let unique_count = r.u32()? as usize;

    // The count comes from the file; don't trust it for the allocation.
    let mut strings = Vec::with_capacity(unique_count.min(r.remaining()));

    for i in 0..unique_count {
        match read_unicode_string(r) {
            Ok(s) => strings.push(SharedString::new(s)),
            Err(e) => {
                // Some writers pad or truncate the SST; keep what decoded.
                log::warn!("SST parse error at string {i}/{unique_count}: {e}");
                break;
            }
        }
    }

    Ok(strings)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_compressed_string() {
        let data = [0x03, 0x00, 0x00, b'A', b'B', b'C'];
        let mut r = ByteReader::new(&data);
        assert_eq!(read_unicode_string(&mut r).unwrap(), "ABC");
        assert!(r.is_empty());
    }

    #[test]
    fn test_read_wide_string() {
        let data = [0x02, 0x00, 0x01, b'H', 0x00, b'i', 0x00];
        let mut r = ByteReader::new(&data);
        assert_eq!(read_unicode_string(&mut r).unwrap(), "Hi");
        assert!(r.is_empty());
    }

    #[test]
    fn test_rich_runs_are_skipped() {
        // "Ab" with one rich-text run, followed by a trailing marker byte
        let data = [0x02, 0x00, 0x08, 0x01, 0x00, b'A', b'b', 0, 0, 1, 0, 0xEE];
        let mut r = ByteReader::new(&data);
        assert_eq!(read_unicode_string(&mut r).unwrap(), "Ab");
        assert_eq!(r.u8().unwrap(), 0xEE);
    }

    #[test]
    fn test_read_short_string() {
        let data = [0x02, 0x00, b'O', b'K'];
        let mut r = ByteReader::new(&data);
        assert_eq!(read_short_string(&mut r).unwrap(), "OK");
    }

    #[test]
    fn test_read_byte_strings() {
        let data = [0x03, b'a', b'b', 0xE9];
        let mut r = ByteReader::new(&data);
        assert_eq!(read_byte_string_u8(&mut r, 1252).unwrap(), "ab\u{e9}");

        let data = [0x02, 0x00, b'h', b'i'];
        let mut r = ByteReader::new(&data);
        assert_eq!(read_byte_string_u16(&mut r, 1252).unwrap(), "hi");
    }

    #[test]
    fn test_byte_strings_follow_the_code_page() {
        let data = [0x80, 0xE9];
        assert_eq!(
            read_byte_string(&mut ByteReader::new(&data), 2, 1252).unwrap(),
            "\u{20ac}\u{e9}"
        );
        assert_eq!(
            read_byte_string(&mut ByteReader::new(&data), 2, 1251).unwrap(),
            "\u{0402}\u{0449}"
        );
        // Unknown code page: bytes map straight to U+0000..U+00FF
        assert_eq!(
            read_byte_string(&mut ByteReader::new(&data), 2, 9999).unwrap(),
            "\u{80}\u{e9}"
        );
    }

    #[test]
    fn test_string_continues_with_new_flags() {
        // "abc" compressed, then a CONTINUE switching to UTF-16 for "de"
        let data = [0x05, 0x00, 0x00, b'a', b'b', b'c', 0x01, b'd', 0, b'e', 0];
        let mut r = ByteReader::with_continues(&data, &[6]);
        assert_eq!(read_unicode_string(&mut r).unwrap(), "abcde");
        assert!(r.is_empty());
    }

    #[test]
    fn test_string_ending_at_a_boundary_reads_no_flags() {
        let data = [0x02, 0x00, 0x00, b'a', b'b', 0x01, 0x00, 0x00, b'z'];
        let mut r = ByteReader::with_continues(&data, &[5]);
        assert_eq!(read_unicode_string(&mut r).unwrap(), "ab");
        assert_eq!(read_unicode_string(&mut r).unwrap(), "z");
    }

    #[test]
    fn test_short_character_data_is_an_error() {
        let data = [0x05, 0x00, 0x00, b'A'];
        let mut r = ByteReader::new(&data);
        assert!(read_unicode_string(&mut r).is_err());
    }

    #[test]
    fn test_parse_sst() {
        let mut buf = Vec::new();
        buf.extend_from_slice(&2u32.to_le_bytes());
        buf.extend_from_slice(&2u32.to_le_bytes());
        buf.extend_from_slice(&[0x01, 0x00, 0x00, b'A']);
        buf.extend_from_slice(&[0x02, 0x00, 0x00, b'B', b'C']);

        let strings = parse_sst(&mut ByteReader::new(&buf)).unwrap();
        let strings: Vec<&str> = strings.iter().map(|s| s.as_str()).collect();
        assert_eq!(strings, vec!["A", "BC"]);
    }

    #[test]
    fn test_parse_sst_across_continue() {
        let mut buf = Vec::new();
        buf.extend_from_slice(&2u32.to_le_bytes());
        buf.extend_from_slice(&2u32.to_le_bytes());
        buf.extend_from_slice(&[0x06, 0x00, 0x00, b'a', b'b', b'c']);
        let boundary = buf.len();
        buf.extend_from_slice(&[0x00, b'd', b'e', b'f']);
        buf.extend_from_slice(&[0x02, 0x00, 0x00, b'x', b'y']);

        let continues = [boundary];
        let strings = parse_sst(&mut ByteReader::with_continues(&buf, &continues)).unwrap();
        let strings: Vec<&str> = strings.iter().map(|s| s.as_str()).collect();
        assert_eq!(strings, vec!["abcdef", "xy"]);
    }

    #[test]
    fn test_parse_sst_keeps_prefix_on_truncation() {
        let mut buf = Vec::new();
        buf.extend_from_slice(&3u32.to_le_bytes());
        buf.extend_from_slice(&3u32.to_le_bytes());
        buf.extend_from_slice(&[0x01, 0x00, 0x00, b'A']);
        buf.extend_from_slice(&[0x09, 0x00, 0x00, b'B']);

        let strings = parse_sst(&mut ByteReader::new(&buf)).unwrap();
        assert_eq!(strings.len(), 1);
        assert_eq!(strings[0].as_str(), "A");
    }
}
