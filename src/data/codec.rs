//! Raw volume container
//!
//! ```text
//! {"extent":[d0,d1,d2],"dtype":"f32"}\n
//! <d0*d1*d2 little-endian samples, row-major>
//! ```
//!
//! Files whose name ends in `.gz` are gzip streams of the same layout.

use crate::volume::{Extent, LabelVolume, ScalarVolume};
use anyhow::{bail, Context, Result};
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Read, Write};
use std::path::Path;

/// Sample encoding of a container payload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SampleType {
    F32,
    U16,
}

impl SampleType {
    pub fn size(&self) -> usize {
        match self {
            SampleType::F32 => 4,
            SampleType::U16 => 2,
        }
    }
}

/// First line of a container
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VolumeHeader {
    pub extent: Extent,
    pub dtype: SampleType,
}

impl VolumeHeader {
    fn payload_len(&self) -> Result<usize> {
        self.extent
            .voxel_count()
            .and_then(|count| count.checked_mul(self.dtype.size()))
            .with_context(|| format!("extent {} is too large", self.extent))
    }
}

/// Decoded samples, still in their stored type
pub enum RawSamples {
    F32(Vec<f32>),
    U16(Vec<u16>),
}

/// Reader and writer for the raw container format
#[derive(Debug, Clone, Copy, Default)]
pub struct RawVolumeCodec;

impl RawVolumeCodec {
    pub fn new() -> Self {
        Self
    }

    /// Decode a container from any buffered reader.
    pub fn decode<R: BufRead>(&self, mut reader: R) -> Result<(VolumeHeader, RawSamples)> {
        let mut line = String::new();
        reader
            .read_line(&mut line)
            .context("failed to read volume header")?;
        if line.trim().is_empty() {
            bail!("missing volume header");
        }
        let header: VolumeHeader =
            serde_json::from_str(line.trim_end()).context("malformed volume header")?;

        // Only allocate for bytes that are actually present
        let expected = header.payload_len()?;
        let mut payload = Vec::new();
        reader
            .by_ref()
            .take(expected as u64)
            .read_to_end(&mut payload)
            .context("failed to read volume payload")?;
        if payload.len() != expected {
            bail!(
                "truncated payload: expected {} bytes for {} {:?} samples, found {}",
                expected,
                header.extent,
                header.dtype,
                payload.len()
            );
        }

        let mut trailing = [0u8; 1];
        if reader.read(&mut trailing).context("failed to read past payload")? != 0 {
            bail!("unexpected data after {} payload", header.extent);
        }

        let samples = match header.dtype {
            SampleType::F32 => RawSamples::F32(
                payload
                    .chunks_exact(4)
                    .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
                    .collect(),
            ),
            SampleType::U16 => RawSamples::U16(
                payload
                    .chunks_exact(2)
                    .map(|b| u16::from_le_bytes([b[0], b[1]]))
                    .collect(),
            ),
        };

        Ok((header, samples))
    }

    /// Decode as floats; `u16` payloads are widened.
    pub fn decode_scalar<R: BufRead>(&self, reader: R) -> Result<ScalarVolume> {
        let (header, samples) = self.decode(reader)?;
        let samples = match samples {
            RawSamples::F32(values) => values,
            RawSamples::U16(values) => values.into_iter().map(f32::from).collect(),
        };
        Ok(ScalarVolume::from_vec(header.extent, samples)?)
    }

    /// Decode as labels; only `u16` payloads are accepted.
    pub fn decode_labels<R: BufRead>(&self, reader: R) -> Result<LabelVolume> {
        let (header, samples) = self.decode(reader)?;
        match samples {
            RawSamples::U16(values) => Ok(LabelVolume::from_vec(header.extent, values)?),
            RawSamples::F32(_) => bail!("label volumes must be stored as u16, found f32"),
        }
    }

    pub fn encode_scalar<W: Write>(&self, volume: &ScalarVolume, writer: W) -> Result<()> {
        let bytes = volume.as_array().iter().flat_map(|v| v.to_le_bytes());
        encode(
            VolumeHeader {
                extent: volume.extent(),
                dtype: SampleType::F32,
            },
            bytes,
            writer,
        )
    }

    pub fn encode_labels<W: Write>(&self, volume: &LabelVolume, writer: W) -> Result<()> {
        let bytes = volume.as_array().iter().flat_map(|v| v.to_le_bytes());
        encode(
            VolumeHeader {
                extent: volume.extent(),
                dtype: SampleType::U16,
            },
            bytes,
            writer,
        )
    }

    pub fn read_scalar_file(&self, path: &Path) -> Result<ScalarVolume> {
        let reader = open_reader(path)?;
        self.decode_scalar(reader)
            .with_context(|| format!("failed to read volume {}", path.display()))
    }

    pub fn read_label_file(&self, path: &Path) -> Result<LabelVolume> {
        let reader = open_reader(path)?;
        self.decode_labels(reader)
            .with_context(|| format!("failed to read label volume {}", path.display()))
    }

    pub fn write_scalar_file(&self, volume: &ScalarVolume, path: &Path) -> Result<()> {
        write_file(path, |w| self.encode_scalar(volume, w))
    }

    pub fn write_label_file(&self, volume: &LabelVolume, path: &Path) -> Result<()> {
        write_file(path, |w| self.encode_labels(volume, w))
    }
}

fn encode<W, I>(header: VolumeHeader, bytes: I, writer: W) -> Result<()>
where
    W: Write,
    I: Iterator<Item = u8>,
{
    let mut writer = BufWriter::new(writer);
    serde_json::to_writer(&mut writer, &header)?;
    writer.write_all(b"\n")?;
    for byte in bytes {
        writer.write_all(&[byte])?;
    }
    writer.flush()?;
    Ok(())
}

fn is_gzip(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext.eq_ignore_ascii_case("gz"))
}

fn open_reader(path: &Path) -> Result<Box<dyn BufRead>> {
    let file = File::open(path).with_context(|| format!("cannot open {}", path.display()))?;
    if is_gzip(path) {
        Ok(Box::new(BufReader::new(GzDecoder::new(file))))
    } else {
        Ok(Box::new(BufReader::new(file)))
    }
}

fn write_file<F>(path: &Path, encode: F) -> Result<()>
where
    F: FnOnce(&mut dyn Write) -> Result<()>,
{
    let file = File::create(path).with_context(|| format!("cannot create {}", path.display()))?;
    let result = if is_gzip(path) {
        let mut encoder = GzEncoder::new(BufWriter::new(file), Compression::default());
        encode(&mut encoder).and_then(|_| {
            encoder.finish()?;
            Ok(())
        })
    } else {
        let mut writer = BufWriter::new(file);
        encode(&mut writer).and_then(|_| {
            writer.flush()?;
            Ok(())
        })
    };
    result.with_context(|| format!("failed to write volume {}", path.display()))
}
