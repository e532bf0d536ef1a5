//! Export of particle rows into a per-tomogram peak container.

use std::path::Path;

use anyhow::Context;
use tracing::info;

use relion_model::labels::{CLASS_NUMBER, MICROGRAPH_NAME};
use relion_model::{CellValue, ColumnType, StarError};
use relion_star::StarTable;

use crate::particles::{COORD_LABELS, origin_shift_or_zero, particle_coords};
use crate::volume::VolumeStore;

/// Receiver for peaks harvested from one tomogram.
///
/// Implementations carry the peak geometry plus one property slot per table
/// column; properties are registered once, right after the first peak.
pub trait PeakSink {
    /// Append a peak at `coords`, returning its index.
    fn add_peak(&mut self, coords: [f64; 3]) -> usize;
    /// Register a property every peak can carry.
    fn add_prop(&mut self, name: &str, dtype: ColumnType);
    /// Store one property value on one peak.
    fn set_peak_prop(&mut self, peak: usize, name: &str, value: &CellValue);
    fn num_peaks(&self) -> usize;
}

/// Row filtering and coordinate handling for [`collect_tomo_peaks`].
#[derive(Debug, Clone)]
pub struct TomoPeaksOptions {
    /// Keep only rows whose class id is listed; `None` keeps every class.
    pub classes: Option<Vec<i64>>,
    /// Subtract the origin shift from the picked coordinates.
    pub origin_corrected: bool,
    /// Match micrograph names against the full tomogram path rather than its
    /// file name.
    pub full_path: bool,
    /// Skip rows picked from a different micrograph.
    pub check_micrograph: bool,
}

impl Default for TomoPeaksOptions {
    fn default() -> Self {
        Self {
            classes: None,
            origin_corrected: true,
            full_path: true,
            check_micrograph: true,
        }
    }
}

/// Collect the rows picked from the tomogram at `tomo_path` into a peak
/// container built by `make_sink` from the tomogram shape and name.
///
/// Every table column is registered as a peak property and copied onto each
/// collected peak.
pub fn collect_tomo_peaks<S: PeakSink>(
    star: &StarTable,
    tomo_path: &Path,
    volumes: &impl VolumeStore,
    options: &TomoPeaksOptions,
    make_sink: impl FnOnce([usize; 3], &str) -> S,
) -> anyhow::Result<S> {
    const OP: &str = "collect_tomo_peaks";
    for name in [MICROGRAPH_NAME].iter().chain(COORD_LABELS.iter()) {
        if !star.has_column(name) {
            return Err(StarError::missing_column(OP, *name).into());
        }
    }
    if options.classes.is_some() && !star.has_column(CLASS_NUMBER) {
        return Err(StarError::missing_column(OP, CLASS_NUMBER).into());
    }

    let tomogram = volumes
        .load(tomo_path, true)
        .with_context(|| format!("loading tomogram {}", tomo_path.display()))?;
    let target = if options.full_path {
        tomo_path.display().to_string()
    } else {
        file_name_of(tomo_path).unwrap_or_default().to_string()
    };
    let mut sink = make_sink(tomogram.shape(), &target);

    for row in 0..star.nrows() {
        if options.check_micrograph {
            let mic = star.get_element(MICROGRAPH_NAME, row)?.to_string();
            let picked_from = if options.full_path {
                mic.as_str()
            } else {
                file_name_of(Path::new(&mic)).unwrap_or(mic.as_str())
            };
            if picked_from != target {
                continue;
            }
        }
        if let Some(classes) = &options.classes {
            let class = star.get_element(CLASS_NUMBER, row)?.as_i64();
            if !class.is_some_and(|id| classes.contains(&id)) {
                continue;
            }
        }

        let mut coords = particle_coords(star, row, false)?;
        if options.origin_corrected {
            let shift = origin_shift_or_zero(star, row)?;
            for (c, s) in coords.iter_mut().zip(shift.iter()) {
                *c -= s;
            }
        }
        let peak = sink.add_peak(coords);
        if sink.num_peaks() == 1 {
            for name in star.column_names() {
                if let Some(dtype) = star.column_type(name) {
                    sink.add_prop(name, dtype);
                }
            }
        }
        for name in star.column_names() {
            sink.set_peak_prop(peak, name, star.get_element(name, row)?);
        }
    }

    info!(
        tomogram = %tomo_path.display(),
        peaks = sink.num_peaks(),
        "Collected tomogram peaks"
    );
    Ok(sink)
}

fn file_name_of(path: &Path) -> Option<&str> {
    path.file_name().and_then(|name| name.to_str())
}
