//! Subvolume extraction during table storage.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use anyhow::Context;
use tracing::info;

use relion_model::labels::{IMAGE_NAME, MICROGRAPH_NAME};
use relion_model::{CellValue, StarError};
use relion_star::StarTable;

use crate::particles::{COORD_LABELS, clear_angles, particle_coords};
use crate::volume::{Volume, VolumeStore, cut_box, relion_norm};

/// Controls for [`store_with_subvolumes`].
#[derive(Debug, Clone, Default)]
pub struct SubvolumeExportOptions {
    /// Cut one box of this shape per row; `None` stores the table only.
    pub box_shape: Option<[usize; 3]>,
    /// Normalization mask, same shape as the box.
    pub mask: Option<Volume>,
    /// Swap the x and y axes of centers and of the box.
    pub swap_xy: bool,
    /// Ask the store to memory-map micrographs on load.
    pub memory_map: bool,
    /// Zero these Euler angle columns before storing.
    pub clear_angles: [bool; 3],
}

/// Store the table at `path`, optionally cutting one normalized subvolume
/// per particle first.
///
/// With a box shape, each row's micrograph is loaded (and cached across
/// rows), a box around the particle is cut, inverted and normalized, and
/// written to a `sub/` directory next to `path` under the image's file
/// name. `_rlnImageName` is rewritten to the stored location. Angle columns
/// flagged in the options are zeroed whether or not subvolumes are cut.
pub fn store_with_subvolumes(
    star: &mut StarTable,
    path: &Path,
    volumes: &impl VolumeStore,
    options: &SubvolumeExportOptions,
) -> anyhow::Result<()> {
    const OP: &str = "store_subvolumes";
    if let Some(box_shape) = options.box_shape {
        if box_shape.iter().any(|dim| *dim == 0 || *dim % 2 != 0) {
            return Err(StarError::invalid_argument(
                OP,
                format!("box shape {box_shape:?} must have positive even dimensions"),
            )
            .into());
        }
        if let Some(mask) = &options.mask {
            if mask.shape() != box_shape {
                return Err(StarError::invalid_argument(
                    OP,
                    format!(
                        "mask shape {:?} does not match box shape {box_shape:?}",
                        mask.shape()
                    ),
                )
                .into());
            }
        }
        for name in [MICROGRAPH_NAME, IMAGE_NAME].iter().chain(COORD_LABELS.iter()) {
            if !star.has_column(name) {
                return Err(StarError::missing_column(OP, *name).into());
            }
        }

        let sub_dir = path.parent().unwrap_or_else(|| Path::new("")).join("sub");
        fs::create_dir_all(&sub_dir)
            .with_context(|| format!("creating subvolume directory {}", sub_dir.display()))?;

        let mut micrographs: BTreeMap<String, Volume> = BTreeMap::new();
        for row in 0..star.nrows() {
            let mic = star.get_element(MICROGRAPH_NAME, row)?.to_string();
            if !micrographs.contains_key(&mic) {
                let tomogram = volumes
                    .load(Path::new(&mic), options.memory_map)
                    .with_context(|| format!("loading micrograph {mic}"))?;
                micrographs.insert(mic.clone(), tomogram);
            }

            let mut center = particle_coords(star, row, false)?;
            let mut dims = box_shape;
            if options.swap_xy {
                center.swap(0, 1);
                dims.swap(0, 1);
            }
            let cut = cut_box(&micrographs[&mic], center, dims);
            let normalized = relion_norm(&cut, options.mask.as_ref());

            let image = star.get_element(IMAGE_NAME, row)?.to_string();
            let file_name = Path::new(&image)
                .file_name()
                .with_context(|| format!("image name '{image}' has no file name"))?;
            let dest = sub_dir.join(file_name);
            volumes
                .save(&normalized, &dest)
                .with_context(|| format!("saving subvolume {}", dest.display()))?;
            star.set_element(IMAGE_NAME, row, &CellValue::Text(dest.display().to_string()))?;
        }
        info!(
            rows = star.nrows(),
            dir = %sub_dir.display(),
            "Exported subvolumes"
        );
    }

    clear_angles(star, options.clear_angles)?;
    star.store(path)?;
    Ok(())
}
