//! Misalignment of a particle set against a reference set.

use relion_model::labels::IMAGE_NAME;
use relion_model::{Result, StarError};
use relion_star::StarTable;

use crate::orientation::{OrientationModel, apply, transpose};
use crate::particles::{
    ANGLE_LABELS, COORD_LABELS, origin_shift_or_zero, particle_angles, particle_coords,
};

/// Compare every particle against the row with the same image name in
/// `reference`, returning per-row angular differences (degrees) and shift
/// distances. `ref_vect` is rotated by the inverse of each orientation before
/// the angle is measured. Rows with no reference counterpart keep `-1.0` in
/// both outputs.
pub fn compute_malign(
    star: &StarTable,
    reference: &StarTable,
    ref_vect: [f64; 3],
    model: &impl OrientationModel,
) -> Result<(Vec<f64>, Vec<f64>)> {
    const OP: &str = "compute_malign";
    for table in [star, reference] {
        for name in [IMAGE_NAME]
            .iter()
            .chain(ANGLE_LABELS.iter())
            .chain(COORD_LABELS.iter())
        {
            if !table.has_column(name) {
                return Err(StarError::missing_column(OP, *name));
            }
        }
    }

    let mut angle_diffs = vec![-1.0; star.nrows()];
    let mut shift_diffs = vec![-1.0; star.nrows()];
    for row in 0..star.nrows() {
        let image = star.get_element(IMAGE_NAME, row)?;
        let Ok(ref_row) = reference.find_element(IMAGE_NAME, image) else {
            continue;
        };

        let [rot, tilt, psi] = particle_angles(star, row)?;
        let [ref_rot, ref_tilt, ref_psi] = particle_angles(reference, ref_row)?;
        let matrix = model.rotation_matrix(rot, tilt, psi, true);
        let ref_matrix = model.rotation_matrix(ref_rot, ref_tilt, ref_psi, true);
        let rotated = apply(&transpose(&matrix), ref_vect);
        let ref_rotated = apply(&transpose(&ref_matrix), ref_vect);
        angle_diffs[row] = model.angle_between(rotated, ref_rotated).to_degrees();

        let coords = corrected_coords(star, row)?;
        let ref_coords = corrected_coords(reference, ref_row)?;
        shift_diffs[row] = coords
            .iter()
            .zip(ref_coords.iter())
            .map(|(a, b)| (a - b) * (a - b))
            .sum::<f64>()
            .sqrt();
    }
    Ok((angle_diffs, shift_diffs))
}

/// Coordinates with the origin shift subtracted where origin columns exist.
fn corrected_coords(star: &StarTable, row: usize) -> Result<[f64; 3]> {
    let coords = particle_coords(star, row, false)?;
    let shift = origin_shift_or_zero(star, row)?;
    Ok([
        coords[0] - shift[0],
        coords[1] - shift[1],
        coords[2] - shift[2],
    ])
}
