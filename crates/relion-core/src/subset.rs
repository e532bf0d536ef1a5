//! Randomized row selection and column synthesis.

use rand::Rng;
use tracing::info;

use relion_model::labels::RANDOM_SUBSET;
use relion_model::{CellValue, Result, StarError};
use relion_star::StarTable;

/// Draw `n` rows uniformly with replacement into a new table.
///
/// With `relion_parsed` the draw happens on the RELION-compatible column
/// subset. Asking for at least as many rows as exist returns the whole
/// (possibly column-filtered) table unchanged.
pub fn random_subset(
    star: &StarTable,
    n: usize,
    relion_parsed: bool,
    rng: &mut impl Rng,
) -> Result<StarTable> {
    const OP: &str = "random_subset";
    if n == 0 {
        return Err(StarError::invalid_argument(OP, "subset size must be positive"));
    }
    let source = if relion_parsed {
        star.to_relion_subset()
    } else {
        star.clone()
    };
    if n >= source.nrows() {
        return Ok(source);
    }
    let indices: Vec<usize> = (0..n).map(|_| rng.gen_range(0..source.nrows())).collect();
    info!(drawn = n, from = source.nrows(), "Sampled random subset");
    source.get_subset(&indices)
}

/// Overwrite an existing column with uniform draws from `lo..hi`.
pub fn randomize_column(
    star: &mut StarTable,
    name: &str,
    lo: f64,
    hi: f64,
    rng: &mut impl Rng,
) -> Result<()> {
    const OP: &str = "randomize_column";
    if !star.has_column(name) {
        return Err(StarError::unknown_column(OP, name));
    }
    if !(lo < hi) {
        return Err(StarError::invalid_argument(
            OP,
            format!("empty range {lo}..{hi}"),
        ));
    }
    let values: Vec<CellValue> = (0..star.nrows())
        .map(|_| CellValue::Real(rng.gen_range(lo..hi)))
        .collect();
    star.set_column(name, values)
}

/// Assign every row to half-set 1 or 2 in `_rlnRandomSubset`.
pub fn assign_random_subsets(star: &mut StarTable, rng: &mut impl Rng) -> Result<()> {
    let values: Vec<CellValue> = (0..star.nrows())
        .map(|_| CellValue::Integer(rng.gen_range(1..=2)))
        .collect();
    star.add_column_values(RANDOM_SUBSET, values)
}
