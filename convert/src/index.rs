use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use crate::error::ConvertError;
use crate::target::TargetRepresentation;

/// Binary format magic and version.
const INDEX_MAGIC: [u8; 4] = [b'V', b'X', b'T', b'I'];
const INDEX_VERSION: u32 = 1;

/// Upper bounds that keep a corrupt header from driving huge allocations.
const MAX_KIND_LEN: usize = 256;
const MAX_DIMENSION: usize = 1 << 20;

/// Serializes a target representation in a compact binary format:
///
/// ```text
/// [4B magic "VXTI"] [4B version=1]
/// [4B kindLen] [kindLen bytes engine kind]
/// [4B dim] [dim x 4B float32 value]
/// ```
///
/// All multi-byte values are little-endian. Values round-trip bit-exactly.
pub fn save(target: &TargetRepresentation, w: &mut dyn Write) -> std::io::Result<()> {
    let mut bw = BufWriter::new(w);

    bw.write_all(&INDEX_MAGIC)?;
    bw.write_all(&INDEX_VERSION.to_le_bytes())?;

    let kind = target.engine().as_bytes();
    bw.write_all(&(kind.len() as u32).to_le_bytes())?;
    bw.write_all(kind)?;

    bw.write_all(&(target.dimension() as u32).to_le_bytes())?;
    for &v in target.values() {
        bw.write_all(&v.to_le_bytes())?;
    }

    bw.flush()
}

/// Deserializes a target representation written by [`save`].
///
/// Rejects bad magic, unknown versions, truncated data, trailing bytes,
/// a zero dimension and non-finite values.
pub fn load(r: &mut dyn Read) -> Result<TargetRepresentation, String> {
    let mut br = BufReader::new(r);
    let read_err = |e: std::io::Error| format!("read: {e}");

    let mut buf4 = [0u8; 4];

    br.read_exact(&mut buf4).map_err(read_err)?;
    if buf4 != INDEX_MAGIC {
        return Err(format!("invalid magic {buf4:?}"));
    }

    br.read_exact(&mut buf4).map_err(read_err)?;
    let version = u32::from_le_bytes(buf4);
    if version != INDEX_VERSION {
        return Err(format!("unsupported version {version} (want {INDEX_VERSION})"));
    }

    br.read_exact(&mut buf4).map_err(read_err)?;
    let kind_len = u32::from_le_bytes(buf4) as usize;
    if kind_len == 0 || kind_len > MAX_KIND_LEN {
        return Err(format!("invalid engine kind length {kind_len}"));
    }
    let mut kind = vec![0u8; kind_len];
    br.read_exact(&mut kind).map_err(read_err)?;
    let kind = String::from_utf8(kind).map_err(|e| format!("engine kind: {e}"))?;

    br.read_exact(&mut buf4).map_err(read_err)?;
    let dim = u32::from_le_bytes(buf4) as usize;
    if dim == 0 || dim > MAX_DIMENSION {
        return Err(format!("invalid dimension {dim}"));
    }

    let mut values = vec![0.0f32; dim];
    for (i, v) in values.iter_mut().enumerate() {
        br.read_exact(&mut buf4).map_err(read_err)?;
        *v = f32::from_le_bytes(buf4);
        if !v.is_finite() {
            return Err(format!("value {i} is not finite"));
        }
    }

    let mut extra = [0u8; 1];
    match br.read(&mut extra) {
        Ok(0) => {}
        Ok(_) => return Err("trailing data after values".into()),
        Err(e) => return Err(read_err(e)),
    }

    Ok(TargetRepresentation::new(kind, values))
}

/// Writes an index file, replacing any existing file.
pub fn save_file(target: &TargetRepresentation, path: &Path) -> Result<(), ConvertError> {
    let write_err = |e: std::io::Error| ConvertError::WriteFailure {
        path: path.to_path_buf(),
        reason: e.to_string(),
    };
    let mut file = File::create(path).map_err(write_err)?;
    save(target, &mut file).map_err(write_err)
}

/// Reads an index file. Any failure, including a missing file, is reported
/// as [`ConvertError::InvalidIndex`].
pub fn load_file(path: &Path) -> Result<TargetRepresentation, ConvertError> {
    let invalid = |reason: String| ConvertError::InvalidIndex {
        path: path.to_path_buf(),
        reason,
    };
    let mut file = File::open(path).map_err(|e| invalid(format!("open: {e}")))?;
    load(&mut file).map_err(invalid)
}
