use crate::core::lut::{LutDataset, LutKind, LutVector, RepresentationType, SparseLut};
use crate::io::safe::{SafeProduct, CALIBRATION_DIR};
use crate::types::{resolve_polarization, SarError, SarResult};
use quick_xml::events::Event;
use quick_xml::Reader;
use std::path::Path;

/// Current noise annotation layout (IPF 2.9 and later)
const NOISE_RANGE_RECORD: (&str, &str) = ("noiseRangeVector", "noiseRangeLut");

/// Noise layout written by older processors
const LEGACY_NOISE_RECORD: (&str, &str) = ("noiseVector", "noiseLut");

const CALIBRATION_RECORD: &str = "calibrationVector";

/// Text collected for one record while scanning the document
#[derive(Default)]
struct RecordText {
    line: Option<String>,
    pixel: Option<String>,
    value: Option<String>,
}

/// Extract every `record_tag` element of a document as a [`LutVector`].
///
/// Records are found at any depth. Each must carry `line`, `pixel` and
/// `value_tag` children; other children are ignored.
pub fn parse_lut_vectors(xml_content: &str, record_tag: &str, value_tag: &str) -> SarResult<Vec<LutVector>> {
    let mut reader = Reader::from_str(xml_content);
    reader.trim_text(true);

    let mut vectors = Vec::new();
    let mut buf = Vec::new();
    let mut current: Option<RecordText> = None;
    let mut current_tag = String::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) => {
                current_tag = String::from_utf8_lossy(e.local_name().as_ref()).to_string();
                if current_tag == record_tag {
                    current = Some(RecordText::default());
                }
            }
            Ok(Event::End(ref e)) => {
                let tag_name = String::from_utf8_lossy(e.local_name().as_ref()).to_string();
                if tag_name == record_tag {
                    if let Some(record) = current.take() {
                        vectors.push(build_vector(record, record_tag, value_tag)?);
                    }
                }
                current_tag.clear();
            }
            Ok(Event::Text(ref e)) => {
                if let Some(ref mut record) = current {
                    let slot = match current_tag.as_str() {
                        "line" => Some(&mut record.line),
                        "pixel" => Some(&mut record.pixel),
                        tag if tag == value_tag => Some(&mut record.value),
                        _ => None,
                    };
                    if let Some(slot) = slot {
                        let text = e.unescape().map_err(|err| {
                            SarError::XmlParsing(format!("Invalid text in <{}>: {}", current_tag, err))
                        })?;
                        slot.get_or_insert_with(String::new).push_str(&text);
                    }
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(SarError::XmlParsing(format!(
                    "Error at position {}: {}",
                    reader.buffer_position(),
                    e
                )));
            }
            _ => {}
        }
        buf.clear();
    }

    log::debug!("Extracted {} <{}> records", vectors.len(), record_tag);
    Ok(vectors)
}

fn build_vector(record: RecordText, record_tag: &str, value_tag: &str) -> SarResult<LutVector> {
    let missing = |tag: &str| SarError::InvalidFormat(format!("<{}> without <{}>", record_tag, tag));

    let line_str = record.line.ok_or_else(|| missing("line"))?;
    let line = line_str
        .trim()
        .parse::<i64>()
        .map_err(|e| SarError::InvalidFormat(format!("Invalid line number '{}': {}", line_str.trim(), e)))?;
    let pixels = parse_space_separated_numbers::<i64>(&record.pixel.ok_or_else(|| missing("pixel"))?)?;
    let values = parse_space_separated_numbers::<f32>(&record.value.ok_or_else(|| missing(value_tag))?)?;

    Ok(LutVector { line, pixels, values })
}

/// Parse space-separated numbers from a string
fn parse_space_separated_numbers<T>(input: &str) -> SarResult<Vec<T>>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    input
        .split_whitespace()
        .map(|s| {
            s.parse::<T>()
                .map_err(|e| SarError::InvalidFormat(format!("Parse error for '{}': {}", s, e)))
        })
        .collect()
}

/// Build the thermal noise LUT of one noise annotation document
pub fn parse_noise_lut(xml_content: &str) -> SarResult<SparseLut> {
    let (record_tag, value_tag) = NOISE_RANGE_RECORD;
    let mut vectors = parse_lut_vectors(xml_content, record_tag, value_tag)?;

    if vectors.is_empty() {
        let (legacy_record, legacy_value) = LEGACY_NOISE_RECORD;
        vectors = parse_lut_vectors(xml_content, legacy_record, legacy_value)?;
        if !vectors.is_empty() {
            log::warn!(
                "No <{}> records, using {} legacy <{}> records",
                record_tag,
                vectors.len(),
                legacy_record
            );
        }
    }

    if vectors.is_empty() {
        return Err(SarError::InvalidFormat(format!(
            "No <{}> records found in noise document",
            record_tag
        )));
    }

    SparseLut::from_vectors(vectors)
}

/// Build the calibration LUT of one calibration annotation document
pub fn parse_calibration_lut(xml_content: &str, representation: RepresentationType) -> SarResult<SparseLut> {
    let vectors = parse_lut_vectors(xml_content, CALIBRATION_RECORD, representation.xml_tag())?;

    if vectors.is_empty() {
        return Err(SarError::InvalidFormat(format!(
            "No <{}> records found in calibration document",
            CALIBRATION_RECORD
        )));
    }

    SparseLut::from_vectors(vectors)
}

/// Document name prefix selecting one kind of annotation
fn document_prefix(kind: LutKind) -> &'static str {
    match kind {
        LutKind::Noise => "noise",
        LutKind::Calibration(_) => "calibration",
    }
}

fn parse_document(xml_content: &str, kind: LutKind) -> SarResult<SparseLut> {
    match kind {
        LutKind::Noise => parse_noise_lut(xml_content),
        LutKind::Calibration(repr) => parse_calibration_lut(xml_content, repr),
    }
}

/// Read one LUT per polarization from a product's calibration folder
pub fn read_lut_dataset(product: &SafeProduct, kind: LutKind) -> SarResult<LutDataset> {
    let names = product.list_dir(CALIBRATION_DIR)?.ok_or_else(|| {
        SarError::NotFound(format!(
            "calibration folder missing: {}/{}",
            product.path().display(),
            CALIBRATION_DIR
        ))
    })?;

    let prefix = document_prefix(kind);
    let documents: Vec<String> = names
        .into_iter()
        .filter(|name| {
            let lowered = name.to_lowercase();
            lowered.starts_with(prefix) && lowered.ends_with(".xml")
        })
        .collect();

    if documents.is_empty() {
        return Err(SarError::NotFound(format!(
            "no LUT documents found: no {}*.xml in {}/{}",
            prefix,
            product.path().display(),
            CALIBRATION_DIR
        )));
    }

    let mut dataset = LutDataset::new(kind);
    for name in &documents {
        let pol = resolve_polarization(name)?;
        log::info!("Reading {} LUT for {} band", kind, pol);

        let xml_content = product.read_to_string(CALIBRATION_DIR, name)?;
        let lut = parse_document(&xml_content, kind).map_err(|e| {
            log::error!("Failed to parse {}: {}", name, e);
            e
        })?;
        log::debug!("{} {} LUT: {} lines x {} pixels", pol, kind, lut.dim().0, lut.dim().1);

        dataset.insert(pol, lut)?;
    }

    log::info!("{} LUT created for bands {:?}", kind, dataset.polarizations());
    Ok(dataset)
}

/// Thermal noise LUTs of every band in a product
pub fn read_noise_luts(product: &SafeProduct) -> SarResult<LutDataset> {
    read_lut_dataset(product, LutKind::Noise)
}

/// Calibration LUTs of every band in a product for one representation
pub fn read_calibration_luts(product: &SafeProduct, representation: RepresentationType) -> SarResult<LutDataset> {
    read_lut_dataset(product, LutKind::Calibration(representation))
}

/// Open a product and read its thermal noise LUTs
pub fn parse_thermal_noise_removal_lut<P: AsRef<Path>>(safe_path: P) -> SarResult<LutDataset> {
    let product = SafeProduct::open(safe_path)?;
    read_noise_luts(&product)
}

/// Open a product and read its calibration LUTs.
///
/// `representation_type` is validated before the product is touched.
pub fn parse_radiometric_calibration_lut<P: AsRef<Path>>(
    safe_path: P,
    representation_type: &str,
) -> SarResult<LutDataset> {
    let representation: RepresentationType = representation_type.parse()?;
    let product = SafeProduct::open(safe_path)?;
    read_calibration_luts(&product, representation)
}
