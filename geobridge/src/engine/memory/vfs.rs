//! Virtual file table contents and version-specific error text.

use crate::engine::{codes, EngineVersion, NativeError};

/// Remote path prefixes. Missing remote objects fail the way the matching
/// network backend reports them rather than as missing local files.
pub const VSICURL_PREFIX: &str = "/vsicurl/";
pub const VSIS3_PREFIX: &str = "/vsis3/";

/// One raster band.
#[derive(Clone, Debug, PartialEq)]
pub struct BandSpec {
    pub data_type: String,
    pub no_data: Option<f64>,
}

impl BandSpec {
    pub fn new(data_type: impl Into<String>) -> Self {
        Self {
            data_type: data_type.into(),
            no_data: None,
        }
    }

    pub fn with_no_data(mut self, value: f64) -> Self {
        self.no_data = Some(value);
        self
    }
}

/// One vector feature: id and geometry as WKT.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FeatureSpec {
    pub fid: u64,
    pub wkt: String,
}

/// One vector layer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LayerSpec {
    pub name: String,
    pub geometry_type: String,
    pub features: Vec<FeatureSpec>,
}

impl LayerSpec {
    pub fn new(name: impl Into<String>, geometry_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            geometry_type: geometry_type.into(),
            features: Vec::new(),
        }
    }

    pub fn with_feature(mut self, fid: u64, wkt: impl Into<String>) -> Self {
        self.features.push(FeatureSpec {
            fid,
            wkt: wkt.into(),
        });
        self
    }
}

/// Contents of a recognizable dataset file.
#[derive(Clone, Debug, PartialEq)]
pub struct DatasetSpec {
    pub driver: String,
    pub width: usize,
    pub height: usize,
    pub bands: Vec<BandSpec>,
    pub layers: Vec<LayerSpec>,
}

impl DatasetSpec {
    pub fn raster(driver: impl Into<String>, width: usize, height: usize) -> Self {
        Self {
            driver: driver.into(),
            width,
            height,
            bands: Vec::new(),
            layers: Vec::new(),
        }
    }

    pub fn vector(driver: impl Into<String>) -> Self {
        Self::raster(driver, 0, 0)
    }

    pub fn with_band(mut self, band: BandSpec) -> Self {
        self.bands.push(band);
        self
    }

    pub fn with_layer(mut self, layer: LayerSpec) -> Self {
        self.layers.push(layer);
        self
    }

    /// Nominal on-disk size reported by `stat`.
    pub fn nominal_size(&self) -> u64 {
        let raster = (self.width * self.height * self.bands.len()) as u64;
        let vector: u64 = self
            .layers
            .iter()
            .map(|l| l.features.iter().map(|f| f.wkt.len() as u64).sum::<u64>())
            .sum();
        raster + vector + 512
    }
}

/// An entry in the virtual file table.
#[derive(Clone, Debug, PartialEq)]
pub enum MemoryFile {
    /// A file some driver recognizes.
    Dataset(DatasetSpec),
    /// Content no driver recognizes.
    Bytes(Vec<u8>),
}

impl MemoryFile {
    pub fn size(&self) -> u64 {
        match self {
            Self::Dataset(spec) => spec.nominal_size(),
            Self::Bytes(bytes) => bytes.len() as u64,
        }
    }
}

/// Normalizes a path: collapses duplicate separators and drops a trailing one.
pub fn normalize_path(path: &str) -> String {
    let mut out = String::with_capacity(path.len());
    let mut last_slash = false;
    for ch in path.chars() {
        if ch == '/' {
            if !last_slash {
                out.push(ch);
            }
            last_slash = true;
        } else {
            out.push(ch);
            last_slash = false;
        }
    }
    if out.len() > 1 && out.ends_with('/') {
        out.pop();
    }
    out
}

/// The error an engine of `version` reports for a path that does not exist.
pub fn missing_path_error(version: EngineVersion, path: &str) -> NativeError {
    if path.starts_with(VSICURL_PREFIX) {
        return NativeError::new(codes::HTTP_RESPONSE, "HTTP response code: 404");
    }
    if path.starts_with(VSIS3_PREFIX) {
        return NativeError::new(
            codes::AWS_OBJECT_NOT_FOUND,
            "The specified key does not exist.",
        );
    }
    match version.major {
        0 | 1 => NativeError::new(
            codes::FILE_IO,
            format!("Unable to open {path}: No such file or directory"),
        ),
        2 => NativeError::new(
            codes::OPEN_FAILED,
            format!(
                "`{path}' does not exist in the file system, and is not recognized as a supported dataset name."
            ),
        ),
        _ => NativeError::new(
            codes::OPEN_FAILED,
            format!("{path}: No such file or directory"),
        ),
    }
}

/// The error an engine of `version` reports for content no driver accepts.
pub fn unrecognized_format_error(version: EngineVersion, path: &str) -> NativeError {
    let what = if version.major < 2 {
        "dataset name"
    } else {
        "file format"
    };
    NativeError::new(
        codes::OPEN_FAILED,
        format!("`{path}' not recognized as a supported {what}."),
    )
}
