// mitgcmrs-strat/src/mds.rs

use log::debug;
use ndarray::{ArrayD, IxDyn};
use std::fs::File;
use std::io::{BufReader, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Storage precision of a `.data` file, taken from the `dataprec` entry of
/// the companion `.meta` file.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum DataPrec {
    Float32,
    Float64,
}

impl DataPrec {
    fn size(&self) -> usize {
        match self {
            DataPrec::Float32 => 4,
            DataPrec::Float64 => 8,
        }
    }
}

/// Parsed contents of a `.meta` file.
///
/// `dims` holds the global dimension sizes in the order they are listed in
/// the file, which is the on-disk order with the first dimension varying
/// fastest.
#[derive(Debug)]
pub struct MdsMeta {
    pub ndims: usize,
    pub dims: Vec<usize>,
    pub dataprec: DataPrec,
    pub nrecords: usize,
    pub time_step: Option<u64>,
    pub fields: Option<Vec<String>>,
}

impl MdsMeta {
    pub fn elements_per_record(&self) -> usize {
        self.dims.iter().product()
    }
}

/// Base file name (no extension) of a dataset. Time-dependent datasets carry
/// a ten-digit zero-padded iteration number, static files just the prefix.
pub fn dataset_basename(prefix: &str, iteration: Option<u64>) -> String {
    match iteration {
        Some(it) => format!("{}.{:010}", prefix, it),
        None => prefix.to_string(),
    }
}

pub fn read_meta(path: &Path) -> Result<MdsMeta, MdsError> {
    let text =
        std::fs::read_to_string(path).map_err(|e| MdsError::Io(path.to_path_buf(), e))?;

    let mut ndims: Option<usize> = None;
    let mut dim_values: Option<Vec<usize>> = None;
    let mut dataprec: Option<DataPrec> = None;
    let mut nrecords: Option<usize> = None;
    let mut time_step: Option<u64> = None;
    let mut fields: Option<Vec<String>> = None;

    for statement in text.split(';') {
        let (key, value) = match statement.split_once('=') {
            Some(pair) => pair,
            None => continue,
        };
        let contents = match bracket_contents(value) {
            Some(contents) => contents,
            None => continue,
        };
        match key.trim() {
            "nDims" => {
                ndims = Some(parse_single(contents, path, "nDims")?);
            }
            "dimList" => {
                dim_values = Some(parse_numbers(contents, path, "dimList")?);
            }
            "dataprec" | "format" => {
                let token = contents.trim().trim_matches('\'');
                dataprec = Some(match token {
                    "float32" => DataPrec::Float32,
                    "float64" => DataPrec::Float64,
                    other => {
                        return Err(MdsError::UnsupportedPrecision(
                            path.to_path_buf(),
                            other.to_string(),
                        ))
                    }
                });
            }
            "nrecords" => {
                nrecords = Some(parse_single(contents, path, "nrecords")?);
            }
            "timeStepNumber" => {
                time_step = Some(parse_single(contents, path, "timeStepNumber")? as u64);
            }
            "fldList" => {
                fields = Some(parse_strings(contents));
            }
            _ => {}
        }
    }

    let ndims = ndims
        .ok_or_else(|| MdsError::InvalidMeta(path.to_path_buf(), "missing nDims".to_string()))?;
    let raw = dim_values
        .ok_or_else(|| MdsError::InvalidMeta(path.to_path_buf(), "missing dimList".to_string()))?;
    // dimList rows are (global size, subdomain start, subdomain end) triplets;
    // older files list the global sizes only
    let dims = if raw.len() == 3 * ndims {
        raw.iter().step_by(3).copied().collect()
    } else if raw.len() == ndims {
        raw
    } else {
        return Err(MdsError::InvalidMeta(
            path.to_path_buf(),
            format!("dimList has {} entries for nDims = {}", raw.len(), ndims),
        ));
    };
    let dataprec = dataprec
        .ok_or_else(|| MdsError::InvalidMeta(path.to_path_buf(), "missing dataprec".to_string()))?;

    Ok(MdsMeta {
        ndims,
        dims,
        dataprec,
        nrecords: nrecords.unwrap_or(1),
        time_step,
        fields,
    })
}

/// Read one record of a dataset as an `ArrayD<f64>`.
///
/// The payload is big-endian IEEE floats with the first listed dimension
/// varying fastest, so the returned shape is the reversed `dimList`: a field
/// stored as (nx, ny, nz) on disk comes back shaped (nz, ny, nx).
pub fn read_mds(
    dir: &Path,
    prefix: &str,
    iteration: Option<u64>,
    record: usize,
) -> Result<ArrayD<f64>, MdsError> {
    let basename = dataset_basename(prefix, iteration);
    let meta_path = dir.join(format!("{}.meta", basename));
    let meta = read_meta(&meta_path)?;
    if record >= meta.nrecords {
        return Err(MdsError::RecordOutOfRange(record, meta_path, meta.nrecords));
    }

    let data_path = dir.join(format!("{}.data", basename));
    let nvalues = meta.elements_per_record();
    let nbytes = nvalues * meta.dataprec.size();
    let offset = (record * nbytes) as u64;

    let file = File::open(&data_path).map_err(|e| MdsError::Io(data_path.clone(), e))?;
    let available = file
        .metadata()
        .map_err(|e| MdsError::Io(data_path.clone(), e))?
        .len();
    if available < offset + nbytes as u64 {
        return Err(MdsError::TruncatedData(
            data_path,
            offset + nbytes as u64,
            available,
        ));
    }

    let mut reader = BufReader::new(file);
    reader
        .seek(SeekFrom::Start(offset))
        .map_err(|e| MdsError::Io(data_path.clone(), e))?;
    let mut buf = vec![0u8; nbytes];
    reader
        .read_exact(&mut buf)
        .map_err(|e| MdsError::Io(data_path.clone(), e))?;

    let mut values = Vec::with_capacity(nvalues);
    match meta.dataprec {
        DataPrec::Float32 => {
            let mut word = [0u8; 4];
            for chunk in buf.chunks_exact(4) {
                word.copy_from_slice(chunk);
                values.push(f32::from_be_bytes(word) as f64);
            }
        }
        DataPrec::Float64 => {
            let mut word = [0u8; 8];
            for chunk in buf.chunks_exact(8) {
                word.copy_from_slice(chunk);
                values.push(f64::from_be_bytes(word));
            }
        }
    }

    let mut shape = meta.dims.clone();
    shape.reverse();
    debug!(
        "read record {} of {} ({} values, shape {:?})",
        record,
        data_path.display(),
        nvalues,
        shape
    );
    Ok(ArrayD::from_shape_vec(IxDyn(&shape), values)?)
}

fn bracket_contents(value: &str) -> Option<&str> {
    let open = value.find(|c| c == '[' || c == '{')?;
    let close = value.rfind(|c| c == ']' || c == '}')?;
    if close <= open {
        return None;
    }
    Some(&value[open + 1..close])
}

fn parse_numbers(contents: &str, path: &Path, name: &str) -> Result<Vec<usize>, MdsError> {
    contents
        .split(|c: char| c.is_whitespace() || c == ',')
        .filter(|token| !token.is_empty())
        .map(|token| {
            token.parse::<usize>().map_err(|_| {
                MdsError::InvalidMeta(
                    path.to_path_buf(),
                    format!("bad {} value '{}'", name, token),
                )
            })
        })
        .collect()
}

fn parse_single(contents: &str, path: &Path, name: &str) -> Result<usize, MdsError> {
    let values = parse_numbers(contents, path, name)?;
    match values.as_slice() {
        [value] => Ok(*value),
        _ => Err(MdsError::InvalidMeta(
            path.to_path_buf(),
            format!("{} must hold exactly one value", name),
        )),
    }
}

fn parse_strings(contents: &str) -> Vec<String> {
    contents
        .split('\'')
        .skip(1)
        .step_by(2)
        .map(|token| token.trim().to_string())
        .collect()
}

#[derive(Error, Debug)]
pub enum MdsError {
    #[error("failed to read {0:?}: {1}")]
    Io(PathBuf, #[source] std::io::Error),
    #[error("invalid meta file {0:?}: {1}")]
    InvalidMeta(PathBuf, String),
    #[error("unsupported dataprec '{1}' in {0:?}")]
    UnsupportedPrecision(PathBuf, String),
    #[error("record {0} out of range: {1:?} holds {2} records")]
    RecordOutOfRange(usize, PathBuf, usize),
    #[error("{0:?} is too short: expected at least {1} bytes, found {2}")]
    TruncatedData(PathBuf, u64, u64),
    #[error(transparent)]
    ShapeError(#[from] ndarray::ShapeError),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch_dir(tag: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("mitgcmrs-mds-{}-{}", tag, std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn write_pair(dir: &Path, base: &str, meta: &str, values: &[f32]) {
        std::fs::write(dir.join(format!("{}.meta", base)), meta).unwrap();
        let mut bytes = Vec::new();
        for v in values {
            bytes.extend_from_slice(&v.to_be_bytes());
        }
        std::fs::write(dir.join(format!("{}.data", base)), &bytes).unwrap();
    }

    const META_3D: &str = "\
 nDims = [   3 ];\n\
 dimList = [\n\
     2,    1,    2,\n\
     1,    1,    1,\n\
     3,    1,    3\n\
 ];\n\
 dataprec = [ 'float32' ];\n\
 nrecords = [   2 ];\n\
 timeStepNumber = [ 9 ];\n";

    #[test]
    fn parses_meta_fields() {
        let dir = scratch_dir("meta");
        std::fs::write(dir.join("ocestrat.0000000009.meta"), META_3D).unwrap();
        let meta = read_meta(&dir.join("ocestrat.0000000009.meta")).unwrap();
        assert_eq!(meta.ndims, 3);
        assert_eq!(meta.dims, vec![2, 1, 3]);
        assert_eq!(meta.dataprec, DataPrec::Float32);
        assert_eq!(meta.nrecords, 2);
        assert_eq!(meta.time_step, Some(9));
    }

    #[test]
    fn reads_record_with_reversed_shape() {
        let dir = scratch_dir("read");
        let values: Vec<f32> = (0..12).map(|v| v as f32).collect();
        write_pair(&dir, "ocestrat.0000000009", META_3D, &values);

        let arr = read_mds(&dir, "ocestrat", Some(9), 1).unwrap();
        assert_eq!(arr.shape(), &[3, 1, 2]);
        // second record starts at 6, x varies fastest on disk
        assert_eq!(arr[[0, 0, 0]], 6.0);
        assert_eq!(arr[[0, 0, 1]], 7.0);
        assert_eq!(arr[[2, 0, 1]], 11.0);
    }

    #[test]
    fn rejects_record_out_of_range() {
        let dir = scratch_dir("range");
        let values: Vec<f32> = (0..12).map(|v| v as f32).collect();
        write_pair(&dir, "ocestrat.0000000009", META_3D, &values);

        let err = read_mds(&dir, "ocestrat", Some(9), 2).unwrap_err();
        assert!(matches!(err, MdsError::RecordOutOfRange(2, _, 2)));
    }

    #[test]
    fn rejects_truncated_data() {
        let dir = scratch_dir("short");
        let values: Vec<f32> = (0..6).map(|v| v as f32).collect();
        write_pair(&dir, "ocestrat.0000000009", META_3D, &values);

        let err = read_mds(&dir, "ocestrat", Some(9), 1).unwrap_err();
        assert!(matches!(err, MdsError::TruncatedData(_, _, _)));
    }

    #[test]
    fn static_datasets_have_no_iteration_suffix() {
        assert_eq!(dataset_basename("XC", None), "XC");
        assert_eq!(dataset_basename("ocestrat", Some(9)), "ocestrat.0000000009");
    }
}
