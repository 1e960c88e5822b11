//! CSV ingestion for Movella DOT style exports.
//!
//! A raw export is cleaned into a [`SensorStream`]:
//!
//! 1. skip any device preamble before the header line
//! 2. drop columns that hold no data at all (trailing delimiters)
//! 3. require `SampleTimeFine` and the four quaternion columns
//! 4. drop rows whose time or quaternion cells are not numeric
//! 5. reject short recordings and recordings with too many bad quaternions
//! 6. renormalise quaternions when the stream as a whole drifts off unit length

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use csv::{ReaderBuilder, StringRecord, Trim};
use flate2::read::GzDecoder;

use crate::config::AnalysisConfig;
use crate::error::{AnalysisError, AnalysisResult, FormatError};
use crate::types::{quat_magnitude, quat_wxyz, Axis, Channel, Quat, Sample, SensorRole, SensorStream};

pub const TIME_COLUMN: &str = "SampleTimeFine";
pub const QUATERNION_COLUMNS: [&str; 4] = ["Quat_W", "Quat_X", "Quat_Y", "Quat_Z"];

/// Magnitudes below this are treated as 1.0 when normalising.
const ZERO_MAGNITUDE: f64 = 1e-10;

/// Check an upload's name and size before reading a byte of it.
///
/// A trailing `.gz` is ignored for the extension check.
pub fn validate_upload(name: &str, size: u64, config: &AnalysisConfig) -> AnalysisResult<()> {
    let inner = strip_gz(name);
    let extension = Path::new(inner)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();

    if !config
        .allowed_extensions
        .iter()
        .any(|allowed| allowed.eq_ignore_ascii_case(&extension))
    {
        let shown = if extension.is_empty() {
            name.to_string()
        } else {
            extension
        };
        return Err(FormatError::UnsupportedExtension(shown).into());
    }

    if size > config.max_file_bytes {
        return Err(AnalysisError::FileTooLarge {
            size,
            limit: config.max_file_bytes,
        });
    }
    Ok(())
}

fn strip_gz(name: &str) -> &str {
    let cut = name.len().saturating_sub(3);
    match name.get(cut..) {
        Some(tail) if cut > 0 && tail.eq_ignore_ascii_case(".gz") => &name[..cut],
        _ => name,
    }
}

fn is_gzip(path: &Path) -> bool {
    path.extension()
        .map(|e| e.eq_ignore_ascii_case("gz"))
        .unwrap_or(false)
}

/// Ingest a file from disk, decompressing `.gz` transparently.
pub fn ingest_path(
    path: &Path,
    role: SensorRole,
    config: &AnalysisConfig,
) -> AnalysisResult<SensorStream> {
    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or_default()
        .to_string();
    let size = std::fs::metadata(path)?.len();
    validate_upload(&name, size, config)?;

    let file = File::open(path)?;
    let sensor_name = strip_gz(&name).to_string();
    if is_gzip(path) {
        ingest_reader(GzDecoder::new(file), role, &sensor_name, config)
    } else {
        ingest_reader(BufReader::new(file), role, &sensor_name, config)
    }
}

/// Ingest from any byte source, enforcing the size limit on what is read.
pub fn ingest_reader<R: Read>(
    reader: R,
    role: SensorRole,
    sensor_name: &str,
    config: &AnalysisConfig,
) -> AnalysisResult<SensorStream> {
    let limit = config.max_file_bytes;
    let mut bytes = Vec::new();
    reader.take(limit.saturating_add(1)).read_to_end(&mut bytes)?;
    if bytes.len() as u64 > limit {
        return Err(AnalysisError::FileTooLarge {
            size: bytes.len() as u64,
            limit,
        });
    }
    ingest_bytes(&bytes, role, sensor_name, config)
}

/// Ingest an in-memory export.
pub fn ingest_bytes(
    bytes: &[u8],
    role: SensorRole,
    sensor_name: &str,
    config: &AnalysisConfig,
) -> AnalysisResult<SensorStream> {
    if bytes.len() as u64 > config.max_file_bytes {
        return Err(AnalysisError::FileTooLarge {
            size: bytes.len() as u64,
            limit: config.max_file_bytes,
        });
    }

    let table = RawTable::parse(bytes)?;

    let time_idx = table.column(TIME_COLUMN);
    let quat_idx: Vec<Option<usize>> = QUATERNION_COLUMNS.iter().map(|c| table.column(c)).collect();

    let missing: Vec<String> = std::iter::once((TIME_COLUMN, time_idx))
        .chain(QUATERNION_COLUMNS.iter().copied().zip(quat_idx.iter().copied()))
        .filter(|(_, idx)| idx.is_none())
        .map(|(name, _)| name.to_string())
        .collect();
    if !missing.is_empty() {
        return Err(FormatError::MissingColumns(missing).into());
    }
    // all present past this point
    let time_idx = time_idx.unwrap_or_default();
    let quat_idx: Vec<usize> = quat_idx.into_iter().flatten().collect();

    let channel_idx: Vec<(Channel, Axis, usize)> = Channel::ALL
        .iter()
        .flat_map(|&ch| Axis::ALL.iter().map(move |&axis| (ch, axis)))
        .filter_map(|(ch, axis)| table.column(&ch.column_name(axis)).map(|idx| (ch, axis, idx)))
        .collect();

    let mut samples = Vec::with_capacity(table.records.len());
    let mut dropped = 0usize;
    for record in &table.records {
        let time = parse_cell(record, time_idx);
        let quat: Option<Vec<f64>> = quat_idx.iter().map(|&i| parse_cell(record, i)).collect();
        let (time, quat) = match (time, quat) {
            (Some(t), Some(q)) => (t, q),
            _ => {
                dropped += 1;
                continue;
            }
        };

        let mut sample = Sample::new(time, quat_wxyz(quat[0], quat[1], quat[2], quat[3]));
        for &(channel, axis, idx) in &channel_idx {
            sample.channel_mut(channel).set(axis, parse_cell(record, idx));
        }
        samples.push(sample);
    }
    if dropped > 0 {
        log::debug!("{}: dropped {} rows with non-numeric time/quaternion", sensor_name, dropped);
    }

    if samples.len() < config.min_samples {
        return Err(AnalysisError::InsufficientData {
            found: samples.len(),
            required: config.min_samples,
        });
    }

    if let Some(row) = samples.windows(2).position(|w| w[1].time < w[0].time) {
        return Err(FormatError::NonMonotonicTime { row: row + 1 }.into());
    }

    let magnitudes: Vec<f64> = samples.iter().map(|s| quat_magnitude(&s.quaternion)).collect();
    check_quaternion_magnitudes(&magnitudes, config)?;

    let tolerance = config.magnitude_tolerance;
    if magnitudes.iter().any(|m| (m - 1.0).abs() > tolerance) {
        log::debug!("{}: quaternions off unit length, normalising", sensor_name);
        for (sample, &m) in samples.iter_mut().zip(&magnitudes) {
            sample.quaternion = normalize_quaternion(&sample.quaternion, m);
        }
    }

    let stream = SensorStream::new(role, sensor_name, config.time_unit, samples);
    log::debug!(
        "{}: {} samples, {:.1} Hz, {:.2} s",
        stream.sensor_name,
        stream.len(),
        stream.sample_rate_hz,
        stream.duration_sec()
    );
    Ok(stream)
}

/// Fail when more than the allowed fraction of rows has |q| outside 1 ± tolerance.
pub fn check_quaternion_magnitudes(
    magnitudes: &[f64],
    config: &AnalysisConfig,
) -> AnalysisResult<()> {
    let lo = 1.0 - config.magnitude_tolerance;
    let hi = 1.0 + config.magnitude_tolerance;
    let invalid = magnitudes.iter().filter(|&&m| m < lo || m > hi).count();
    let total = magnitudes.len();
    if invalid as f64 > total as f64 * config.max_invalid_quaternion_fraction {
        return Err(AnalysisError::InvalidQuaternions {
            invalid,
            total,
            tolerance: config.magnitude_tolerance,
        });
    }
    Ok(())
}

/// Divide by the row's own magnitude; a (near) zero quaternion is left as is.
pub fn normalize_quaternion(q: &Quat, magnitude: f64) -> Quat {
    let divisor = if magnitude < ZERO_MAGNITUDE { 1.0 } else { magnitude };
    Quat::from_vector(q.coords / divisor)
}

fn parse_cell(record: &StringRecord, idx: usize) -> Option<f64> {
    record
        .get(idx)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .and_then(|s| s.parse::<f64>().ok())
        .filter(|v| v.is_finite())
}

/// Header + data rows with empty columns removed.
struct RawTable {
    /// (trimmed name, index into each record)
    columns: Vec<(String, usize)>,
    records: Vec<StringRecord>,
}

impl RawTable {
    fn parse(bytes: &[u8]) -> AnalysisResult<Self> {
        let text = std::str::from_utf8(bytes)
            .map_err(|e| FormatError::Unparseable(format!("not UTF-8 text: {e}")))?;
        let text = text.trim_start_matches('\u{feff}');
        let body = &text[header_offset(text)..];

        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .trim(Trim::All)
            .from_reader(body.as_bytes());

        let headers: Vec<String> = reader.headers()?.iter().map(|h| h.trim().to_string()).collect();
        let records = reader.records().collect::<Result<Vec<_>, _>>()?;

        let width = records
            .iter()
            .map(StringRecord::len)
            .chain(std::iter::once(headers.len()))
            .max()
            .unwrap_or(0);

        let columns = (0..width)
            .filter(|&j| {
                records
                    .iter()
                    .any(|r| r.get(j).map(|c| !c.trim().is_empty()).unwrap_or(false))
            })
            .map(|j| {
                let name = headers
                    .get(j)
                    .filter(|h| !h.is_empty())
                    .cloned()
                    .unwrap_or_else(|| format!("Unnamed: {j}"));
                (name, j)
            })
            .collect();

        Ok(RawTable { columns, records })
    }

    fn column(&self, name: &str) -> Option<usize> {
        self.columns
            .iter()
            .find(|(n, _)| n == name)
            .map(|&(_, idx)| idx)
    }
}

/// Byte offset of the header line: the first line naming the time column.
/// Falls back to the start of the text when no line does.
fn header_offset(text: &str) -> usize {
    let mut offset = 0;
    for line in text.split_inclusive('\n') {
        if line.split(',').any(|field| field.trim().trim_matches('"').trim() == TIME_COLUMN) {
            return offset;
        }
        offset += line.len();
    }
    0
}
