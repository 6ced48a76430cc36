//! CSV reading and writing with encoding auto-detection.
//!
//! Converts CSV files into [`Table`]s of text cells and back. No
//! dataset-specific logic here.

use std::fs;
use std::path::Path;

use crate::error::{CsvError, CsvResult};
use crate::models::Table;

/// Result of parsing with metadata
#[derive(Debug, Clone)]
pub struct ParseResult {
    /// Parsed table
    pub table: Table,
    /// Detected or used encoding
    pub encoding: String,
    /// Delimiter used
    pub delimiter: u8,
}

/// Detect the encoding of raw bytes using chardet
pub fn detect_encoding(bytes: &[u8]) -> String {
    let result = chardet::detect(bytes);
    let charset = result.0;

    // Normalize charset names
    match charset.to_lowercase().as_str() {
        "ascii" | "utf-8" | "utf8" | "" => "utf-8".to_string(),
        "iso-8859-1" | "iso-8859-15" | "latin-1" | "latin1" => "iso-8859-1".to_string(),
        "windows-1252" | "cp1252" => "windows-1252".to_string(),
        _ => charset,
    }
}

/// Decode bytes to string using the specified encoding.
///
/// The single-byte encodings map every byte, so decoding never fails; bytes
/// that are not valid UTF-8 under the fallback become U+FFFD.
pub fn decode_content(bytes: &[u8], encoding: &str) -> String {
    let decoded = match encoding.to_lowercase().as_str() {
        "iso-8859-1" | "latin-1" | "latin1" => {
            encoding_rs::ISO_8859_15.decode_without_bom_handling(bytes).0.into_owned()
        }
        "windows-1252" | "cp1252" => {
            encoding_rs::WINDOWS_1252.decode_without_bom_handling(bytes).0.into_owned()
        }
        // UTF-8, ASCII and anything unrecognized
        _ => String::from_utf8_lossy(bytes).into_owned(),
    };

    if decoded.starts_with('\u{feff}') {
        decoded['\u{feff}'.len_utf8()..].to_string()
    } else {
        decoded
    }
}

/// Parse CSV text into a table.
///
/// Headers are trimmed. Cells are kept verbatim; short records are padded
/// with empty cells. A record with more fields than the header is an error.
///
/// # Example
/// ```
/// use district_etl::parser::parse_str;
///
/// let table = parse_str("District,Rate\n001902,15.00\n", b',').unwrap();
/// assert_eq!(table.shape(), (1, 2));
/// assert_eq!(table.rows()[0][0], "001902");
/// ```
pub fn parse_str(content: &str, delimiter: u8) -> CsvResult<Table> {
    if content.trim().is_empty() {
        return Err(CsvError::EmptyFile);
    }

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(true)
        .flexible(true)
        .from_reader(content.as_bytes());

    let headers: Vec<String> = reader
        .headers()?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();

    if headers.iter().all(|h| h.is_empty()) {
        return Err(CsvError::NoHeaders);
    }

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        if record.len() > headers.len() {
            return Err(CsvError::Parse {
                line: record.position().map(|p| p.line()).unwrap_or(0),
                message: format!(
                    "expected {} fields, saw {}",
                    headers.len(),
                    record.len()
                ),
            });
        }
        rows.push(record.iter().map(str::to_string).collect());
    }

    Ok(Table::new(headers, rows))
}

/// Parse CSV bytes with auto-detection of encoding.
pub fn parse_bytes_auto(bytes: &[u8], delimiter: u8) -> CsvResult<ParseResult> {
    let encoding = detect_encoding(bytes);
    let content = decode_content(bytes, &encoding);
    let table = parse_str(&content, delimiter)?;

    Ok(ParseResult {
        table,
        encoding,
        delimiter,
    })
}

/// Read a CSV file with auto-detection of encoding.
///
/// The resulting table is named after the file stem.
pub fn read_table<P: AsRef<Path>>(path: P, delimiter: u8) -> CsvResult<ParseResult> {
    let path = path.as_ref();
    let bytes = fs::read(path).map_err(|source| CsvError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let mut result = parse_bytes_auto(&bytes, delimiter)?;
    let name = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("table")
        .to_string();
    result.table = result.table.with_name(name);
    Ok(result)
}

/// Serialize a table to CSV text.
pub fn to_csv_string(table: &Table, delimiter: u8) -> CsvResult<String> {
    let mut writer = csv::WriterBuilder::new()
        .delimiter(delimiter)
        .from_writer(Vec::new());

    writer.write_record(table.headers())?;
    for row in table.rows() {
        writer.write_record(row)?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| CsvError::Write(e.to_string()))?;
    String::from_utf8(bytes).map_err(|e| CsvError::Write(e.to_string()))
}

/// Write a table to disk as UTF-8 CSV, creating parent directories.
pub fn write_table<P: AsRef<Path>>(table: &Table, path: P, delimiter: u8) -> CsvResult<()> {
    let path = path.as_ref();
    let io_err = |source| CsvError::Io {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(io_err)?;
    }

    let content = to_csv_string(table, delimiter)?;
    fs::write(path, content).map_err(io_err)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simple_csv() {
        let t = parse_str("name,age\nAlice,30\nBob,25", b',').unwrap();

        assert_eq!(t.shape(), (2, 2));
        assert_eq!(t.headers(), &["name", "age"]);
        assert_eq!(t.rows()[1], vec!["Bob", "25"]);
    }

    #[test]
    fn test_quoted_header_with_commas() {
        let csv = "DISTRICT NUMBER,\"ALL FUNDS-INSTRUCTION + TRANSFER -11,95\"\n'001902,100\n";
        let t = parse_str(csv, b',').unwrap();

        assert_eq!(t.headers()[1], "ALL FUNDS-INSTRUCTION + TRANSFER -11,95");
        assert_eq!(t.rows()[0][0], "'001902");
    }

    #[test]
    fn test_leading_zeros_preserved() {
        let t = parse_str("campus_number\n001902001\n", b',').unwrap();
        assert_eq!(t.rows()[0][0], "001902001");
    }

    #[test]
    fn test_missing_values_padded() {
        let t = parse_str("a,b,c\n1,,3\n4", b',').unwrap();

        assert_eq!(t.rows()[0], vec!["1", "", "3"]);
        assert_eq!(t.rows()[1], vec!["4", "", ""]);
    }

    #[test]
    fn test_extra_fields_rejected() {
        let err = parse_str("a,b\n1,2\n3,4,5\n", b',').unwrap_err();
        match err {
            CsvError::Parse { line, message } => {
                assert_eq!(line, 3);
                assert!(message.contains("expected 2 fields, saw 3"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_empty_csv_error() {
        assert!(matches!(parse_str("", b','), Err(CsvError::EmptyFile)));
        assert!(matches!(parse_str("  \n", b','), Err(CsvError::EmptyFile)));
    }

    #[test]
    fn test_bom_stripped() {
        let bytes = b"\xEF\xBB\xBFa,b\n1,2\n";
        let result = parse_bytes_auto(bytes, b',').unwrap();
        assert_eq!(result.table.headers(), &["a", "b"]);
    }

    #[test]
    fn test_latin1_decoding() {
        // "Société" in ISO-8859-1
        let bytes: &[u8] = &[0x53, 0x6F, 0x63, 0x69, 0xE9, 0x74, 0xE9];
        let decoded = decode_content(bytes, "iso-8859-1");
        assert_eq!(decoded, "Société");
    }

    #[test]
    fn test_write_round_trip_quotes_commas() {
        let t = Table::from_str_rows(&["District", "Instruction, 11"], &[&["001902", "1.5"]]);
        let text = to_csv_string(&t, b',').unwrap();
        assert_eq!(text, "District,\"Instruction, 11\"\n001902,1.5\n");
    }

    #[test]
    fn test_read_missing_file() {
        let err = read_table("does/not/exist.csv", b',').unwrap_err();
        assert!(matches!(err, CsvError::Io { .. }));
        assert!(err.to_string().contains("does/not/exist.csv"));
    }
}
