//! Catalogue of the column labels recognized in particle STAR files.
//!
//! The catalogue is fixed: the RELION labels consumed and produced by the
//! refinement tools, plus the `_ps*` labels carrying segmentation and
//! affinity-propagation results. Label matching is case sensitive.

use std::collections::HashMap;

use crate::value::ColumnType;

pub const MICROGRAPH_NAME: &str = "_rlnMicrographName";
pub const COORDINATE_X: &str = "_rlnCoordinateX";
pub const COORDINATE_Y: &str = "_rlnCoordinateY";
pub const COORDINATE_Z: &str = "_rlnCoordinateZ";
pub const IMAGE_NAME: &str = "_rlnImageName";
pub const CTF_IMAGE: &str = "_rlnCtfImage";
pub const GROUP_NUMBER: &str = "_rlnGroupNumber";
pub const ANGLE_ROT: &str = "_rlnAngleRot";
pub const ANGLE_TILT: &str = "_rlnAngleTilt";
pub const ANGLE_PSI: &str = "_rlnAnglePsi";
pub const ORIGIN_X: &str = "_rlnOriginX";
pub const ORIGIN_Y: &str = "_rlnOriginY";
pub const ORIGIN_Z: &str = "_rlnOriginZ";
pub const CLASS_NUMBER: &str = "_rlnClassNumber";
pub const RANDOM_SUBSET: &str = "_rlnRandomSubset";

/// Recognized labels with their scalar types, in catalogue order.
pub const KNOWN_LABELS: &[(&str, ColumnType)] = &[
    // RELION
    (MICROGRAPH_NAME, ColumnType::Text),
    (COORDINATE_X, ColumnType::Real),
    (COORDINATE_Y, ColumnType::Real),
    (COORDINATE_Z, ColumnType::Real),
    (IMAGE_NAME, ColumnType::Text),
    (CTF_IMAGE, ColumnType::Text),
    (GROUP_NUMBER, ColumnType::Integer),
    ("_rlnAngleRotPrior", ColumnType::Real),
    ("_rlnAngleTiltPrior", ColumnType::Real),
    ("_rlnAnglePsiPrior", ColumnType::Real),
    (ANGLE_ROT, ColumnType::Real),
    (ANGLE_TILT, ColumnType::Real),
    (ANGLE_PSI, ColumnType::Real),
    (ORIGIN_X, ColumnType::Real),
    (ORIGIN_Y, ColumnType::Real),
    (CLASS_NUMBER, ColumnType::Integer),
    ("_rlnNormCorrection", ColumnType::Real),
    (ORIGIN_Z, ColumnType::Real),
    ("_rlnLogLikeliContribution", ColumnType::Real),
    ("_rlnMaxValueProbDistribution", ColumnType::Real),
    ("_rlnNrOfSignificantSamples", ColumnType::Integer),
    (RANDOM_SUBSET, ColumnType::Integer),
    // PySeg: graph analysis
    ("_psGhMCFPickle", ColumnType::Text),
    // PySeg: segmentation
    ("_psSegImage", ColumnType::Text),
    ("_psSegLabel", ColumnType::Integer),
    ("_psSegScale", ColumnType::Real),
    ("_psSegRot", ColumnType::Real),
    ("_psSegTilt", ColumnType::Real),
    ("_psSegPsi", ColumnType::Real),
    ("_psSegOffX", ColumnType::Real),
    ("_psSegOffY", ColumnType::Real),
    ("_psSegOffZ", ColumnType::Real),
    // PySeg: affinity propagation
    ("_psAPClass", ColumnType::Integer),
    ("_psAPCenter", ColumnType::Integer),
];

/// Prefix of the labels understood by RELION itself.
const RELION_PREFIX: &str = "_rln";

/// Validity and type lookup over [`KNOWN_LABELS`].
#[derive(Debug, Clone)]
pub struct LabelCatalog {
    types: HashMap<&'static str, ColumnType>,
}

impl LabelCatalog {
    pub fn new() -> Self {
        let mut types = HashMap::with_capacity(KNOWN_LABELS.len());
        for (name, dtype) in KNOWN_LABELS {
            types.insert(*name, *dtype);
        }
        Self { types }
    }

    /// Whether `name` is a recognized label.
    pub fn is_valid(&self, name: &str) -> bool {
        self.types.contains_key(name)
    }

    /// Scalar type bound to `name`, `None` for unrecognized labels.
    pub fn type_of(&self, name: &str) -> Option<ColumnType> {
        self.types.get(name).copied()
    }

    /// Whether `name` is a recognized label RELION itself understands.
    pub fn is_relion_compatible(&self, name: &str) -> bool {
        self.is_valid(name) && name.len() >= 4 && name.starts_with(RELION_PREFIX)
    }
}

impl Default for LabelCatalog {
    fn default() -> Self {
        Self::new()
    }
}
