use std::{
    fs::File,
    io::{BufRead, BufReader, ErrorKind, Seek},
    path::Path,
};

use exif::{Context, Exif, Field, In, Tag, Value};

use crate::{
    MetadataEntry, MetadataReport,
    analysis::signature::{FormatTag, SignatureClassifier},
    error::{ForensicsError, Result},
};

pub struct ExifExtractor {
    max_input_bytes: u64,
}

impl ExifExtractor {
    pub fn new(max_input_bytes: u64) -> Self {
        Self { max_input_bytes }
    }

    /// GIF and BMP carry no EXIF container and report empty; anything the
    /// container parser cannot recognize is malformed.
    pub fn extract<P: AsRef<Path>>(&self, path: P) -> Result<MetadataReport> {
        let path = path.as_ref();
        let file = File::open(path)?;

        let size = file.metadata()?.len();
        if size > self.max_input_bytes {
            return Err(ForensicsError::InputTooLarge {
                size,
                limit: self.max_input_bytes,
            });
        }

        let format = SignatureClassifier::classify(&SignatureClassifier::read_header_from(&file)?);
        if matches!(format, FormatTag::Gif | FormatTag::Bmp) {
            log::debug!("{} has no EXIF container", format);
            return Ok(MetadataReport::default());
        }

        let mut reader = BufReader::new(file);
        reader.rewind()?;
        Self::extract_from_reader(&mut reader)
    }

    pub fn extract_from_reader<R: BufRead + Seek>(reader: &mut R) -> Result<MetadataReport> {
        let mut exif_reader = exif::Reader::new();
        exif_reader.continue_on_error(true);

        match exif_reader.read_from_container(reader) {
            Ok(exif) => Ok(Self::parse_exif(&exif, Vec::new())),
            Err(exif::Error::PartialResult(partial)) => {
                let (exif, errors) = partial.into_inner();
                let warnings = errors.iter().map(|e| e.to_string()).collect::<Vec<_>>();
                log::warn!("EXIF parsed with {} field error(s)", warnings.len());
                Ok(Self::parse_exif(&exif, warnings))
            }
            Err(exif::Error::NotFound(container)) => {
                log::debug!("no EXIF data in {} container", container);
                Ok(MetadataReport::default())
            }
            Err(exif::Error::Io(e)) if e.kind() == ErrorKind::UnexpectedEof => {
                Err(ForensicsError::MalformedContainer(format!("truncated container: {}", e)))
            }
            Err(exif::Error::Io(e)) => Err(ForensicsError::Io(e)),
            Err(e) => Err(ForensicsError::MalformedContainer(e.to_string())),
        }
    }

    fn parse_exif(exif: &Exif, warnings: Vec<String>) -> MetadataReport {
        let entries = exif
            .fields()
            .map(|field| MetadataEntry {
                tag: Self::tag_name(field),
                value: Self::render(field, exif),
            })
            .collect::<Vec<_>>();

        let primary = |tag: Tag| exif.get_field(tag, In::PRIMARY).map(|f| Self::render(f, exif));

        let camera_make = primary(Tag::Make);
        let camera_model = primary(Tag::Model);
        let software = primary(Tag::Software);
        let date_time = primary(Tag::DateTime);
        let datetime_original = primary(Tag::DateTimeOriginal);
        let datetime_digitized = primary(Tag::DateTimeDigitized);

        let mut indicators = Vec::new();

        if let Some(ref sw) = software {
            let sw_lower = sw.to_lowercase();
            if ["photoshop", "paint", "gimp"].iter().any(|editor| sw_lower.contains(*editor)) {
                indicators.push(format!("Edited with: {}", sw));
            }
        }

        if datetime_original.is_none() && date_time.is_some() {
            indicators.push("Original datetime missing (may be stripped)".into());
        }

        if let (Some(orig), Some(digi)) = (&datetime_original, &datetime_digitized) {
            if orig != digi {
                indicators.push("Inconsistent date time values".into());
            }
        }

        let gps_coordinates = Self::extract_gps(exif);

        log::debug!("extracted {} EXIF tag(s)", entries.len());

        MetadataReport {
            entries,
            camera_make,
            camera_model,
            software,
            date_time,
            gps_coordinates,
            indicators,
            warnings,
        }
    }

    /// IFD group followed by the tag name, e.g. `Image Make` or `GPS GPSLatitude`.
    fn tag_name(field: &Field) -> String {
        let group = if field.ifd_num == In::THUMBNAIL {
            "Thumbnail"
        } else {
            match field.tag.context() {
                Context::Exif => "EXIF",
                Context::Gps => "GPS",
                Context::Interop => "Interoperability",
                _ => "Image",
            }
        };

        format!("{} {}", group, field.tag)
    }

    fn render(field: &Field, exif: &Exif) -> String {
        match field.value {
            Value::Ascii(ref parts) => parts
                .iter()
                .map(|part| String::from_utf8_lossy(part).trim_end_matches('\0').trim().to_string())
                .collect::<Vec<_>>()
                .join(", "),
            _ => field.display_value().with_unit(exif).to_string(),
        }
    }

    fn extract_gps(exif: &Exif) -> Option<(f64, f64)> {
        let lat = Self::gps_coordinate(exif, Tag::GPSLatitude, Tag::GPSLatitudeRef, b'S')?;
        let lon = Self::gps_coordinate(exif, Tag::GPSLongitude, Tag::GPSLongitudeRef, b'W')?;
        Some((lat, lon))
    }

    fn gps_coordinate(exif: &Exif, value_tag: Tag, ref_tag: Tag, negative: u8) -> Option<f64> {
        let field = exif.get_field(value_tag, In::PRIMARY)?;
        let degrees = match field.value {
            Value::Rational(ref parts) if parts.len() >= 3 => {
                parts[0].to_f64() + parts[1].to_f64() / 60.0 + parts[2].to_f64() / 3600.0
            }
            _ => return None,
        };

        let reference = exif.get_field(ref_tag, In::PRIMARY)?;
        let sign = match reference.value {
            Value::Ascii(ref parts) if parts.first().and_then(|p| p.first()) == Some(&negative) => -1.0,
            _ => 1.0,
        };

        Some(degrees * sign)
    }
}
