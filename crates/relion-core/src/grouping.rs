//! Consolidation of particles into groups of a minimum occupancy.

use std::collections::BTreeMap;

use tracing::debug;

use relion_model::labels::{GROUP_NUMBER, MICROGRAPH_NAME};
use relion_model::{CellValue, Result, StarError};
use relion_star::StarTable;

/// Assign every row a group id such that no group has `min_group` rows or
/// fewer, merging the smallest groups until that holds or one group is left.
///
/// The initial grouping comes from an existing `_rlnGroupNumber` column, or
/// from the micrograph names (ids 1, 2, … in order of first appearance), or
/// falls back to a single group. The group-id column is created or rewritten
/// in place. `min_group` of zero keeps the initial grouping.
pub fn particle_group(star: &mut StarTable, min_group: usize) -> Result<()> {
    const OP: &str = "particle_group";
    if star.nrows() == 0 {
        return Ok(());
    }

    let ids = initial_group_ids(star, OP)?;

    // Per-id row counts in discovery order.
    let mut groups: Vec<(i64, usize)> = Vec::new();
    for id in &ids {
        match groups.iter_mut().find(|(gid, _)| gid == id) {
            Some((_, count)) => *count += 1,
            None => groups.push((*id, 1)),
        }
    }

    let mut relabel: BTreeMap<i64, i64> = BTreeMap::new();
    while groups.len() > 1 {
        let mut order: Vec<usize> = (0..groups.len()).collect();
        order.sort_by_key(|&idx| groups[idx].1);
        let smallest = order[0];
        if groups[smallest].1 > min_group {
            break;
        }
        let survivor = order[1];
        let (old_id, old_count) = groups[smallest];
        let new_id = groups[survivor].0;
        debug!(from = old_id, into = new_id, rows = old_count, "Merged group");
        for target in relabel.values_mut() {
            if *target == old_id {
                *target = new_id;
            }
        }
        relabel.insert(old_id, new_id);
        groups[survivor].1 += old_count;
        groups.remove(smallest);
    }

    let relabeled: Vec<CellValue> = ids
        .iter()
        .map(|id| CellValue::Integer(relabel.get(id).copied().unwrap_or(*id)))
        .collect();
    star.set_column(GROUP_NUMBER, relabeled)
}

/// Per-row initial ids, installing the group column when it is derived.
fn initial_group_ids(star: &mut StarTable, op: &'static str) -> Result<Vec<i64>> {
    if star.has_column(GROUP_NUMBER) {
        let mut ids = Vec::with_capacity(star.nrows());
        for row in 0..star.nrows() {
            let value = star.get_element(GROUP_NUMBER, row)?;
            ids.push(value.as_i64().ok_or_else(|| {
                StarError::format(op, format!("group id '{value}' is not an integer"))
            })?);
        }
        return Ok(ids);
    }

    let ids = if star.has_column(MICROGRAPH_NAME) {
        let mut by_micrograph: BTreeMap<String, i64> = BTreeMap::new();
        let mut next = 1_i64;
        let mut ids = Vec::with_capacity(star.nrows());
        for row in 0..star.nrows() {
            let mic = star.get_element(MICROGRAPH_NAME, row)?.to_string();
            let id = *by_micrograph.entry(mic).or_insert_with(|| {
                let id = next;
                next += 1;
                id
            });
            ids.push(id);
        }
        ids
    } else {
        vec![1; star.nrows()]
    };
    let column: Vec<CellValue> = ids.iter().map(|id| CellValue::Integer(*id)).collect();
    star.add_column_values(GROUP_NUMBER, column)?;
    Ok(ids)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn micrograph_table(mics: &[&str]) -> StarTable {
        let mut star = StarTable::new();
        star.add_column(MICROGRAPH_NAME).unwrap();
        for mic in mics {
            star.add_row(&[(MICROGRAPH_NAME, CellValue::Text((*mic).to_string()))])
                .unwrap();
        }
        star
    }

    fn group_ids(star: &StarTable) -> Vec<i64> {
        star.column_values(GROUP_NUMBER)
            .unwrap()
            .iter()
            .map(|v| v.as_i64().unwrap())
            .collect()
    }

    fn occupancies(ids: &[i64]) -> BTreeMap<i64, usize> {
        let mut counts = BTreeMap::new();
        for id in ids {
            *counts.entry(*id).or_insert(0) += 1;
        }
        counts
    }

    #[test]
    fn derives_ids_from_micrographs_in_first_appearance_order() {
        let mut star = micrograph_table(&["a.mrc", "b.mrc", "a.mrc", "c.mrc", "b.mrc"]);
        particle_group(&mut star, 0).unwrap();
        assert_eq!(group_ids(&star), [1, 2, 1, 3, 2]);
    }

    #[test]
    fn reuses_existing_group_column() {
        let mut star = micrograph_table(&["a.mrc", "b.mrc", "c.mrc"]);
        star.add_column_values(
            GROUP_NUMBER,
            vec![
                CellValue::Integer(7),
                CellValue::Integer(7),
                CellValue::Integer(9),
            ],
        )
        .unwrap();
        particle_group(&mut star, 0).unwrap();
        assert_eq!(group_ids(&star), [7, 7, 9]);
    }

    #[test]
    fn falls_back_to_a_single_group() {
        let mut star = StarTable::new();
        star.add_column("_rlnCoordinateX").unwrap();
        star.push_row(vec![CellValue::Real(1.0)]).unwrap();
        star.push_row(vec![CellValue::Real(2.0)]).unwrap();
        particle_group(&mut star, 5).unwrap();
        assert_eq!(group_ids(&star), [1, 1]);
    }

    #[test]
    fn merges_small_groups_until_min_occupancy() {
        // a: 1 row, b: 2 rows, c: 4 rows
        let mut star = micrograph_table(&[
            "a.mrc", "b.mrc", "b.mrc", "c.mrc", "c.mrc", "c.mrc", "c.mrc",
        ]);
        particle_group(&mut star, 2).unwrap();
        let counts = occupancies(&group_ids(&star));
        // a merges into b (3 rows), which now exceeds the minimum
        assert_eq!(counts.len(), 2);
        assert!(counts.values().all(|count| *count > 2));
        assert_eq!(counts.values().sum::<usize>(), 7);
    }

    #[test]
    fn merge_chains_resolve_to_the_survivor() {
        // Three singleton groups collapse into one.
        let mut star = micrograph_table(&["a.mrc", "b.mrc", "c.mrc"]);
        particle_group(&mut star, 1).unwrap();
        let ids = group_ids(&star);
        assert_eq!(ids, [ids[0]; 3]);
    }

    #[test]
    fn stops_at_a_single_group() {
        let mut star = micrograph_table(&["a.mrc", "b.mrc"]);
        particle_group(&mut star, 100).unwrap();
        let counts = occupancies(&group_ids(&star));
        assert_eq!(counts.len(), 1);
        assert_eq!(counts.values().sum::<usize>(), 2);
    }

    #[test]
    fn empty_table_is_untouched() {
        let mut star = StarTable::new();
        particle_group(&mut star, 3).unwrap();
        assert!(!star.has_column(GROUP_NUMBER));
    }

    #[test]
    fn row_total_is_conserved() {
        let mut star = micrograph_table(&["a.mrc", "a.mrc", "b.mrc", "c.mrc", "c.mrc", "d.mrc"]);
        particle_group(&mut star, 2).unwrap();
        let counts = occupancies(&group_ids(&star));
        assert_eq!(counts.values().sum::<usize>(), 6);
        assert!(counts.len() == 1 || counts.values().all(|count| *count > 2));
    }
}
