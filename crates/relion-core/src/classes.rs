//! Partitioning of a particle table by classification result.

use std::collections::BTreeMap;

use tracing::info;

use relion_model::labels::CLASS_NUMBER;
use relion_model::{Result, StarError};
use relion_star::StarTable;

/// Split the table into one table per distinct `_rlnClassNumber`, returned in
/// ascending class order. Every output keeps the full column set and the
/// preamble of the input.
pub fn split_class(star: &StarTable) -> Result<Vec<StarTable>> {
    const OP: &str = "split_class";
    if !star.has_column(CLASS_NUMBER) {
        return Err(StarError::missing_column(OP, CLASS_NUMBER));
    }

    let mut rows_by_class: BTreeMap<i64, Vec<usize>> = BTreeMap::new();
    for row in 0..star.nrows() {
        let value = star.get_element(CLASS_NUMBER, row)?;
        let class = value.as_i64().ok_or_else(|| {
            StarError::format(OP, format!("class id '{value}' is not an integer"))
        })?;
        rows_by_class.entry(class).or_default().push(row);
    }

    let mut splits = Vec::with_capacity(rows_by_class.len());
    for (class, rows) in &rows_by_class {
        info!(class, rows = rows.len(), "Split class");
        splits.push(star.get_subset(rows)?);
    }
    Ok(splits)
}

#[cfg(test)]
mod tests {
    use super::*;
    use relion_model::CellValue;
    use relion_model::labels::COORDINATE_X;

    fn classified_table(classes: &[i64]) -> StarTable {
        let mut star = StarTable::new();
        star.add_column(COORDINATE_X).unwrap();
        star.add_column(CLASS_NUMBER).unwrap();
        for (row, class) in classes.iter().enumerate() {
            star.push_row(vec![
                CellValue::Real(row as f64),
                CellValue::Integer(*class),
            ])
            .unwrap();
        }
        star
    }

    #[test]
    fn splits_into_ascending_class_order() {
        let star = classified_table(&[2, 1, 2, 1, 2]);
        let splits = split_class(&star).unwrap();
        assert_eq!(splits.len(), 2);
        assert_eq!(splits[0].nrows(), 2);
        assert_eq!(splits[1].nrows(), 3);
        assert_eq!(
            *splits[0].get_element(CLASS_NUMBER, 0).unwrap(),
            CellValue::Integer(1)
        );
        assert_eq!(
            *splits[1].get_element(CLASS_NUMBER, 0).unwrap(),
            CellValue::Integer(2)
        );
    }

    #[test]
    fn split_rows_keep_their_values() {
        let star = classified_table(&[5, 9, 5]);
        let splits = split_class(&star).unwrap();
        let fives = &splits[0];
        assert_eq!(
            fives.column_values(COORDINATE_X).unwrap(),
            [CellValue::Real(0.0), CellValue::Real(2.0)]
        );
    }

    #[test]
    fn single_class_yields_one_table() {
        let star = classified_table(&[3, 3, 3]);
        let splits = split_class(&star).unwrap();
        assert_eq!(splits.len(), 1);
        assert_eq!(splits[0].nrows(), 3);
    }

    #[test]
    fn missing_class_column_is_rejected() {
        let mut star = StarTable::new();
        star.add_column(COORDINATE_X).unwrap();
        let err = split_class(&star).unwrap_err();
        assert!(err.to_string().contains(CLASS_NUMBER));
    }

    #[test]
    fn empty_table_splits_into_nothing() {
        let mut star = StarTable::new();
        star.add_column(CLASS_NUMBER).unwrap();
        assert!(split_class(&star).unwrap().is_empty());
    }
}
