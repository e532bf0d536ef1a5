//! STAR text rendering.

use std::fs;
use std::path::Path;

use tracing::info;

use relion_model::{Result, StarError};

use crate::table::StarTable;

/// Render a table as STAR text.
///
/// Preamble lines come first, verbatim. Each column becomes a `name #k`
/// header with a 1-based position. Rows are tab-separated and followed by
/// one blank line. A table with no columns renders as its preamble alone;
/// the parser would otherwise fold the terminator into the preamble and
/// grow the file on every store-load cycle.
pub fn render_star(star: &StarTable) -> String {
    let mut out = String::new();
    for line in &star.preamble {
        out.push_str(line);
        out.push('\n');
    }
    if star.columns.is_empty() {
        return out;
    }
    for (idx, name) in star.columns.iter().enumerate() {
        out.push_str(name);
        out.push_str(" #");
        out.push_str(&(idx + 1).to_string());
        out.push('\n');
    }
    for row in 0..star.nrows {
        for (cidx, name) in star.columns.iter().enumerate() {
            if cidx > 0 {
                out.push('\t');
            }
            out.push_str(&star.data[name][row].to_string());
        }
        out.push('\n');
    }
    out.push('\n');
    out
}

impl StarTable {
    /// Serialize the table as STAR text.
    pub fn to_star_string(&self) -> String {
        render_star(self)
    }

    /// Write the table to a STAR file and record the path as the origin.
    pub fn store(&mut self, path: impl AsRef<Path>) -> Result<()> {
        const OP: &str = "store";
        let path = path.as_ref();
        let text = render_star(self);
        fs::write(path, &text).map_err(|e| StarError::io(OP, path, e))?;
        self.origin = Some(path.to_path_buf());
        info!(
            path = %path.display(),
            rows = self.nrows(),
            cols = self.ncols(),
            "Stored STAR file"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use relion_model::labels::{COORDINATE_X, GROUP_NUMBER, MICROGRAPH_NAME};
    use relion_model::CellValue;

    use super::*;

    fn sample_table() -> StarTable {
        let mut star = StarTable::new();
        star.add_column(MICROGRAPH_NAME).unwrap();
        star.add_column(COORDINATE_X).unwrap();
        star.add_column(GROUP_NUMBER).unwrap();
        star.add_row(&[
            (MICROGRAPH_NAME, CellValue::Text("mics/tomo_a.mrc".to_string())),
            (COORDINATE_X, CellValue::Real(10.0)),
            (GROUP_NUMBER, CellValue::Integer(1)),
        ])
        .unwrap();
        star.add_row(&[
            (MICROGRAPH_NAME, CellValue::Text("mics/tomo_b.mrc".to_string())),
            (COORDINATE_X, CellValue::Real(-4.5)),
            (GROUP_NUMBER, CellValue::Integer(2)),
        ])
        .unwrap();
        star
    }

    #[test]
    fn test_render_exact_text() {
        let text = render_star(&sample_table());
        assert_eq!(
            text,
            "\ndata_\n\nloop_\n\
_rlnMicrographName #1\n\
_rlnCoordinateX #2\n\
_rlnGroupNumber #3\n\
mics/tomo_a.mrc\t10.0\t1\n\
mics/tomo_b.mrc\t-4.5\t2\n\
\n"
        );
    }

    #[test]
    fn test_render_snapshot() {
        let text = render_star(&sample_table());
        insta::assert_snapshot!(text.trim(), @r"
        data_

        loop_
        _rlnMicrographName #1
        _rlnCoordinateX #2
        _rlnGroupNumber #3
        mics/tomo_a.mrc	10.0	1
        mics/tomo_b.mrc	-4.5	2
        ");
    }

    #[test]
    fn test_render_empty_table_is_preamble_only() {
        let star = StarTable::new();
        assert_eq!(render_star(&star), "\ndata_\n\nloop_\n");
    }

    #[test]
    fn test_render_is_stable_across_reparse() {
        for star in [sample_table(), StarTable::new()] {
            let first = render_star(&star);
            let reparsed = crate::parse_star(&first).unwrap();
            assert_eq!(render_star(&reparsed), first);
        }
    }

    #[test]
    fn test_render_keeps_integer_valued_reals_decimal() {
        let mut star = StarTable::new();
        star.add_column(COORDINATE_X).unwrap();
        star.add_row(&[(COORDINATE_X, CellValue::Real(3.0))]).unwrap();
        let text = render_star(&star);
        assert!(text.contains("\n3.0\n"), "unexpected render: {text:?}");
    }

    #[test]
    fn test_headers_are_one_based() {
        let text = render_star(&sample_table());
        assert!(text.contains("_rlnMicrographName #1\n"));
        assert!(text.contains("_rlnGroupNumber #3\n"));
    }
}
