// Text decoding and CSV reader setup shared by every file kind

use std::path::Path;

use serde::Serialize;

use crate::error::LoadError;

/// Encoding a file was decoded with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TextEncoding {
    Utf8,
    Windows1252,
}

impl std::fmt::Display for TextEncoding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Utf8 => write!(f, "utf-8"),
            Self::Windows1252 => write!(f, "windows-1252"),
        }
    }
}

/// Bytes with no Windows-1252 assignment. Their presence means the content
/// is not Windows-1252 either.
const WINDOWS_1252_UNDEFINED: [u8; 5] = [0x81, 0x8D, 0x8F, 0x90, 0x9D];

/// Decode file content: UTF-8 first (BOM stripped), Windows-1252 second
/// (common for Excel-exported CSVs). `None` when both fail.
pub fn decode_text(bytes: Vec<u8>) -> Option<(String, TextEncoding)> {
    // Try UTF-8 first; on failure, recover the buffer from the error
    match String::from_utf8(bytes) {
        Ok(mut s) => {
            if s.starts_with('\u{feff}') {
                s.remove(0);
            }
            Some((s, TextEncoding::Utf8))
        }
        Err(e) => {
            let bytes = e.into_bytes();
            if bytes.iter().any(|b| WINDOWS_1252_UNDEFINED.contains(b)) {
                return None;
            }
            encoding_rs::WINDOWS_1252
                .decode_without_bom_handling_and_without_replacement(&bytes)
                .map(|decoded| (decoded.into_owned(), TextEncoding::Windows1252))
        }
    }
}

/// Read and decode a whole file.
pub fn read_text(path: &Path) -> Result<(String, TextEncoding), LoadError> {
    let bytes = std::fs::read(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    decode_bytes(path, bytes)
}

pub(crate) fn decode_bytes(path: &Path, bytes: Vec<u8>) -> Result<(String, TextEncoding), LoadError> {
    let decoded = decode_text(bytes).ok_or_else(|| LoadError::Encoding { path: path.to_path_buf() })?;
    if decoded.1 == TextEncoding::Windows1252 {
        log::info!("{}: not UTF-8, decoded as Windows-1252", path.display());
    }
    Ok(decoded)
}

/// Header-first, ragged-row tolerant reader over decoded text.
pub(crate) fn csv_reader(content: &str, delimiter: u8) -> csv::Reader<&[u8]> {
    csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(true)
        .flexible(true)
        .from_reader(content.as_bytes())
}

/// Header row of a reader as owned strings.
pub(crate) fn read_headers(
    path: &Path,
    reader: &mut csv::Reader<&[u8]>,
) -> Result<Vec<String>, LoadError> {
    Ok(reader
        .headers()
        .map_err(|e| csv_error(path, e))?
        .iter()
        .map(|h| h.to_string())
        .collect())
}

pub(crate) fn csv_error(path: &Path, e: csv::Error) -> LoadError {
    LoadError::Csv {
        path: path.to_path_buf(),
        message: e.to_string(),
    }
}

/// Detect the most likely field delimiter by checking consistency across the first few lines.
///
/// For each candidate (tab, semicolon, comma, pipe), count fields per line. The delimiter
/// that produces the most consistent field count (>1 field) wins.
pub fn sniff_delimiter(content: &str) -> u8 {
    let candidates: &[u8] = &[b'\t', b';', b',', b'|'];
    let sample_lines: Vec<&str> = content.lines().take(10).collect();

    if sample_lines.is_empty() {
        return b',';
    }

    let mut best = b',';
    let mut best_score = 0u64;

    for &delim in candidates {
        let counts: Vec<usize> = sample_lines
            .iter()
            .map(|line| {
                csv::ReaderBuilder::new()
                    .delimiter(delim)
                    .has_headers(false)
                    .flexible(true)
                    .from_reader(line.as_bytes())
                    .records()
                    .next()
                    .and_then(|r| r.ok())
                    .map(|r| r.len())
                    .unwrap_or(1)
            })
            .collect();

        if counts.first().copied().unwrap_or(0) <= 1 {
            continue;
        }

        // Lines agreeing with line 1, weighted by field count
        let target = counts[0];
        let consistent = counts.iter().filter(|&&c| c == target).count() as u64;
        let score = consistent * target as u64;

        if score > best_score {
            best_score = score;
            best = delim;
        }
    }

    best
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn utf8_with_bom_is_stripped() {
        let bytes = b"\xEF\xBB\xBFAnn\xC3\xA9e;Code\n".to_vec();
        let (text, enc) = decode_text(bytes).unwrap();
        assert_eq!(enc, TextEncoding::Utf8);
        assert_eq!(text, "Année;Code\n");
    }

    #[test]
    fn latin_bytes_fall_back_to_windows_1252() {
        // "Année" with é as 0xE9, "’" as 0x92
        let bytes = b"Ann\xE9e;d\x92un\n".to_vec();
        let (text, enc) = decode_text(bytes).unwrap();
        assert_eq!(enc, TextEncoding::Windows1252);
        assert_eq!(text, "Année;d\u{2019}un\n");
    }

    #[test]
    fn undecodable_bytes_fail_both() {
        let bytes = vec![0xFF, 0x81, 0x00, 0x9D];
        assert!(decode_text(bytes).is_none());
    }

    #[test]
    fn sniff_semicolon_delimiter() {
        let content = "Name;Age;City\nAlice;30;Paris\nBob;25;London\n";
        assert_eq!(sniff_delimiter(content), b';');
    }

    #[test]
    fn sniff_comma_delimiter() {
        let content = "SIREN,Nom\n401234567,LP PROMOTION\n";
        assert_eq!(sniff_delimiter(content), b',');
    }

    #[test]
    fn sniff_single_column_defaults_to_comma() {
        assert_eq!(sniff_delimiter("SIREN\n401234567\n"), b',');
        assert_eq!(sniff_delimiter(""), b',');
    }

    #[test]
    fn sniff_semicolon_with_commas_in_values() {
        let content = "Nom;Adresse;Ville\n\"Doe, Jane\";\"12 allée, Bât 4\";Toulouse\nBob;\"4 rue\";Blagnac\n";
        assert_eq!(sniff_delimiter(content), b';');
    }
}
