use std::{fmt, fs::File, io::Read, path::Path};

use serde::Serialize;

use crate::{SignatureStatus, SignatureVerdict, error::Result};

/// Number of leading bytes the classifier looks at.
pub const HEADER_LEN: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum FormatTag {
    Jpeg,
    Png,
    Gif,
    Bmp,
    Tiff,
    Unknown,
}

impl FormatTag {
    /// Canonical extension for the format, `None` for `Unknown`.
    pub fn extension(&self) -> Option<&'static str> {
        match self {
            FormatTag::Jpeg => Some("jpg"),
            FormatTag::Png => Some("png"),
            FormatTag::Gif => Some("gif"),
            FormatTag::Bmp => Some("bmp"),
            FormatTag::Tiff => Some("tiff"),
            FormatTag::Unknown => None,
        }
    }
}

impl fmt::Display for FormatTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension().unwrap_or("unknown"))
    }
}

// First match wins; the two-byte BMP prefix stays after the longer patterns.
const SIGNATURES: &[(&[u8], FormatTag)] = &[
    (&[0xFF, 0xD8, 0xFF], FormatTag::Jpeg),
    (&[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A], FormatTag::Png),
    (b"GIF87a", FormatTag::Gif),
    (b"GIF89a", FormatTag::Gif),
    (b"BM", FormatTag::Bmp),
    (&[0x49, 0x49, 0x2A, 0x00], FormatTag::Tiff),
    (&[0x4D, 0x4D, 0x00, 0x2A], FormatTag::Tiff),
];

pub struct SignatureClassifier;

impl SignatureClassifier {
    /// Never fails: unrecognized or too-short prefixes yield `Unknown`.
    pub fn classify(header: &[u8]) -> FormatTag {
        SIGNATURES
            .iter()
            .find(|(magic, _)| header.starts_with(magic))
            .map(|&(_, tag)| tag)
            .unwrap_or(FormatTag::Unknown)
    }

    /// Reads up to [`HEADER_LEN`] bytes from the start of `path`.
    pub fn read_header<P: AsRef<Path>>(path: P) -> Result<Vec<u8>> {
        Self::read_header_from(File::open(path)?)
    }

    pub fn read_header_from<R: Read>(reader: R) -> Result<Vec<u8>> {
        let mut header = Vec::with_capacity(HEADER_LEN);
        reader.take(HEADER_LEN as u64).read_to_end(&mut header)?;
        Ok(header)
    }

    /// Lowercased text after the last dot of the file name, as the user typed
    /// it. Dotfiles such as `.png` count; empty when the name has no dot.
    pub fn declared_extension<P: AsRef<Path>>(path: P) -> String {
        path.as_ref()
            .file_name()
            .map(|name| name.to_string_lossy())
            .and_then(|name| name.rsplit_once('.').map(|(_, ext)| ext.to_lowercase()))
            .unwrap_or_default()
    }

    /// Folds `jpeg` into `jpg` and `tif` into `tiff` for comparison.
    pub fn normalize_extension(ext: &str) -> &str {
        match ext {
            "jpeg" => "jpg",
            "tif" => "tiff",
            _ => ext,
        }
    }

    /// `declared` is kept verbatim in the verdict and its message; only the
    /// comparison uses the normalized form.
    pub fn verify(declared: &str, header: &[u8]) -> SignatureVerdict {
        let detected = Self::classify(header);
        let matches = detected.extension() == Some(Self::normalize_extension(declared));

        let status = match detected.extension() {
            None => SignatureStatus::UnknownFormat,
            Some(_) if matches => SignatureStatus::Match,
            Some(expected) => SignatureStatus::Mismatch {
                expected: expected.to_string(),
                found: declared.to_string(),
            },
        };

        SignatureVerdict {
            declared: declared.to_string(),
            detected,
            matches,
            status,
        }
    }
}
