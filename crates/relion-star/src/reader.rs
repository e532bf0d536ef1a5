//! STAR text parsing.
//!
//! The serialized layout is: an opaque preamble (every line before the
//! first line starting with `_`), one header line per column (`name #k`,
//! the position suffix is ignored), then one whitespace-separated data line
//! per row. Row parsing stops at the first line whose token count differs
//! from the column count; that line and everything after it is trailing
//! content.

use std::fs;
use std::path::Path;

use tracing::{debug, info};

use relion_model::{Result, StarError};

use crate::table::StarTable;

/// Parse serialized STAR content into a table.
///
/// Header names must be catalogue-valid and unique; a violation rejects
/// the whole input. A text with no header lines parses as an empty table
/// whose preamble is the entire input.
pub fn parse_star(text: &str) -> Result<StarTable> {
    const OP: &str = "load";
    let mut star = StarTable::new();
    star.preamble.clear();

    let lines: Vec<&str> = text.lines().collect();
    let mut lidx = 0;

    // Preamble: everything before the first header line.
    while lidx < lines.len() && !lines[lidx].starts_with('_') {
        star.preamble.push(lines[lidx].to_string());
        lidx += 1;
    }

    // Column headers.
    while lidx < lines.len() && lines[lidx].starts_with('_') {
        let token = lines[lidx]
            .split_whitespace()
            .next()
            .ok_or_else(|| StarError::format(OP, "empty column header line"))?;
        if !star.catalog.is_valid(token) {
            return Err(StarError::format(
                OP,
                format!("unrecognized column header '{token}'"),
            ));
        }
        if star.has_column(token) {
            return Err(StarError::format(
                OP,
                format!("duplicate column header '{token}'"),
            ));
        }
        let dtype = star
            .catalog
            .type_of(token)
            .ok_or_else(|| StarError::format(OP, format!("unrecognized column header '{token}'")))?;
        star.columns.push(token.to_string());
        star.dtypes.push(dtype);
        star.data.insert(token.to_string(), Vec::new());
        lidx += 1;
    }

    // Data rows, until the first line that does not fit the column count.
    let mut trailing = 0usize;
    for (pos, line) in lines[lidx..].iter().enumerate() {
        let tokens: Vec<&str> = line.split_whitespace().collect();
        if tokens.len() != star.columns.len() {
            trailing = lines.len() - lidx - pos;
            break;
        }
        for ((token, name), dtype) in tokens.iter().copied().zip(&star.columns).zip(&star.dtypes) {
            let value = dtype
                .parse_token(token)
                .map_err(|e| StarError::cast(OP, &e))?;
            if let Some(values) = star.data.get_mut(name) {
                values.push(value);
            }
        }
        star.nrows += 1;
    }
    if trailing > 0 {
        debug!(lines = trailing, "Ignored trailing content after data rows");
    }

    Ok(star)
}

impl StarTable {
    /// Read and parse a STAR file, recording its path as the origin.
    pub fn load(path: impl AsRef<Path>) -> Result<StarTable> {
        const OP: &str = "load";
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|e| StarError::io(OP, path, e))?;
        let mut star = parse_star(&text)?;
        star.origin = Some(path.to_path_buf());
        info!(
            path = %path.display(),
            rows = star.nrows(),
            cols = star.ncols(),
            "Loaded STAR file"
        );
        Ok(star)
    }
}
