//! Per-particle coordinate and angle access on top of the table.

use relion_model::labels::{
    ANGLE_PSI, ANGLE_ROT, ANGLE_TILT, COORDINATE_X, COORDINATE_Y, COORDINATE_Z, ORIGIN_X, ORIGIN_Y,
    ORIGIN_Z,
};
use relion_model::{CellValue, Result, StarError};
use relion_star::StarTable;

pub(crate) const COORD_LABELS: [&str; 3] = [COORDINATE_X, COORDINATE_Y, COORDINATE_Z];
pub(crate) const ORIGIN_LABELS: [&str; 3] = [ORIGIN_X, ORIGIN_Y, ORIGIN_Z];
pub(crate) const ANGLE_LABELS: [&str; 3] = [ANGLE_ROT, ANGLE_TILT, ANGLE_PSI];

pub(crate) fn numeric_element(
    star: &StarTable,
    op: &'static str,
    name: &str,
    row: usize,
) -> Result<f64> {
    let value = star.get_element(name, row)?;
    value.as_f64().ok_or_else(|| {
        StarError::format(op, format!("column '{name}' holds non-numeric '{value}'"))
    })
}

/// Coordinates of one particle, optionally corrected by the origin shift.
///
/// Origin-corrected access requires the origin columns.
pub fn particle_coords(star: &StarTable, row: usize, origin_corrected: bool) -> Result<[f64; 3]> {
    const OP: &str = "particle_coords";
    let mut coords = [0.0; 3];
    for (axis, name) in COORD_LABELS.iter().enumerate() {
        coords[axis] = numeric_element(star, OP, name, row)?;
    }
    if origin_corrected {
        for (axis, name) in ORIGIN_LABELS.iter().enumerate() {
            coords[axis] -= numeric_element(star, OP, name, row)?;
        }
    }
    Ok(coords)
}

/// Orientation angles of one particle: rotation, tilt, psi.
pub fn particle_angles(star: &StarTable, row: usize) -> Result<[f64; 3]> {
    const OP: &str = "particle_angles";
    let mut angles = [0.0; 3];
    for (axis, name) in ANGLE_LABELS.iter().enumerate() {
        angles[axis] = numeric_element(star, OP, name, row)?;
    }
    Ok(angles)
}

/// Coordinates of every particle in row order.
pub fn particles_coords(star: &StarTable, origin_corrected: bool) -> Result<Vec<[f64; 3]>> {
    (0..star.nrows())
        .map(|row| particle_coords(star, row, origin_corrected))
        .collect()
}

/// Orientation angles of every particle in row order.
pub fn particles_angles(star: &StarTable) -> Result<Vec<[f64; 3]>> {
    (0..star.nrows()).map(|row| particle_angles(star, row)).collect()
}

/// Origin shift of one particle, zero on any axis whose column is absent.
pub fn origin_shift_or_zero(star: &StarTable, row: usize) -> Result<[f64; 3]> {
    const OP: &str = "origin_shift";
    let mut shift = [0.0; 3];
    for (axis, name) in ORIGIN_LABELS.iter().enumerate() {
        if star.has_column(name) {
            shift[axis] = numeric_element(star, OP, name, row)?;
        }
    }
    Ok(shift)
}

/// Scale particle coordinates and origin shifts in place.
///
/// All six columns must exist; nothing is modified otherwise.
pub fn scale_coords(star: &mut StarTable, factor: f64) -> Result<()> {
    const OP: &str = "scale_coords";
    for name in COORD_LABELS.iter().chain(ORIGIN_LABELS.iter()) {
        if !star.has_column(name) {
            return Err(StarError::unknown_column(OP, *name));
        }
    }
    for name in COORD_LABELS.iter().chain(ORIGIN_LABELS.iter()) {
        let mut scaled = Vec::with_capacity(star.nrows());
        for row in 0..star.nrows() {
            scaled.push(CellValue::Real(numeric_element(star, OP, name, row)? * factor));
        }
        star.set_column(name, scaled)?;
    }
    Ok(())
}

/// Zero the selected orientation-angle columns on every row.
///
/// The flags select rotation, tilt and psi in that order; a selected angle
/// whose column is absent is skipped.
pub fn clear_angles(star: &mut StarTable, which: [bool; 3]) -> Result<()> {
    for (flag, name) in which.iter().zip(ANGLE_LABELS.iter()) {
        if *flag && star.has_column(name) {
            star.set_column(name, vec![CellValue::Real(0.0); star.nrows()])?;
        }
    }
    Ok(())
}
