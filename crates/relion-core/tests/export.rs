//! End-to-end subvolume export and peak collection against an in-memory
//! volume store.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::path::Path;

use anyhow::bail;
use relion_core::peaks::{PeakSink, TomoPeaksOptions, collect_tomo_peaks};
use relion_core::subvolumes::{SubvolumeExportOptions, store_with_subvolumes};
use relion_core::volume::{Volume, VolumeStore};
use relion_model::labels::{
    ANGLE_PSI, ANGLE_ROT, ANGLE_TILT, COORDINATE_X, COORDINATE_Y, COORDINATE_Z, IMAGE_NAME,
    MICROGRAPH_NAME,
};
use relion_model::{CellValue, ColumnType};
use relion_star::StarTable;

// ============================================================================
// Fixtures
// ============================================================================

struct MemoryStore {
    volumes: RefCell<BTreeMap<String, Volume>>,
}

impl MemoryStore {
    fn with_tomogram(name: &str, tomogram: Volume) -> Self {
        let mut volumes = BTreeMap::new();
        volumes.insert(name.to_string(), tomogram);
        Self {
            volumes: RefCell::new(volumes),
        }
    }

    fn saved(&self, path: &Path) -> Option<Volume> {
        self.volumes
            .borrow()
            .get(&path.display().to_string())
            .cloned()
    }
}

impl VolumeStore for MemoryStore {
    fn load(&self, path: &Path, _memory_map: bool) -> anyhow::Result<Volume> {
        let key = path.display().to_string();
        match self.volumes.borrow().get(&key) {
            Some(volume) => Ok(volume.clone()),
            None => bail!("no volume at {key}"),
        }
    }

    fn save(&self, volume: &Volume, path: &Path) -> anyhow::Result<()> {
        self.volumes
            .borrow_mut()
            .insert(path.display().to_string(), volume.clone());
        Ok(())
    }
}

fn ramp_tomogram() -> Volume {
    let shape = [8, 8, 8];
    let data = (0..shape[0] * shape[1] * shape[2])
        .map(|i| i as f32)
        .collect();
    Volume::from_data(shape, data).unwrap()
}

fn picked_particles() -> StarTable {
    let mut star = StarTable::new();
    for name in [
        MICROGRAPH_NAME,
        IMAGE_NAME,
        COORDINATE_X,
        COORDINATE_Y,
        COORDINATE_Z,
        ANGLE_ROT,
        ANGLE_TILT,
        ANGLE_PSI,
    ] {
        star.add_column(name).unwrap();
    }
    for (row, center) in [[4.0, 4.0, 4.0], [2.0, 3.0, 4.0]].iter().enumerate() {
        star.push_row(vec![
            CellValue::Text("tomo.mrc".to_string()),
            CellValue::Text(format!("imgs/p{row}.mrc")),
            CellValue::Real(center[0]),
            CellValue::Real(center[1]),
            CellValue::Real(center[2]),
            CellValue::Real(10.0),
            CellValue::Real(20.0),
            CellValue::Real(30.0),
        ])
        .unwrap();
    }
    star
}

fn mean_and_std(voxels: &[f32]) -> (f64, f64) {
    let n = voxels.len() as f64;
    let mean = voxels.iter().map(|v| f64::from(*v)).sum::<f64>() / n;
    let var = voxels
        .iter()
        .map(|v| (f64::from(*v) - mean).powi(2))
        .sum::<f64>()
        / n;
    (mean, var.sqrt())
}

// ============================================================================
// Subvolume Export Tests
// ============================================================================

#[test]
fn exports_normalized_subvolumes_and_relinks_the_table() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("particles.star");
    let store = MemoryStore::with_tomogram("tomo.mrc", ramp_tomogram());
    let options = SubvolumeExportOptions {
        box_shape: Some([4, 4, 4]),
        clear_angles: [true, true, true],
        ..SubvolumeExportOptions::default()
    };

    let mut star = picked_particles();
    store_with_subvolumes(&mut star, &path, &store, &options).unwrap();

    let sub_dir = dir.path().join("sub");
    for name in ["p0.mrc", "p1.mrc"] {
        let saved = store.saved(&sub_dir.join(name)).unwrap();
        assert_eq!(saved.shape(), [4, 4, 4]);
        let (mean, std) = mean_and_std(saved.voxels());
        assert!(mean.abs() < 1e-4);
        assert!((std - 1.0).abs() < 1e-4);
    }

    // The densest source voxel inside the box becomes the most negative one.
    let saved = store.saved(&sub_dir.join("p0.mrc")).unwrap();
    let min = saved.voxels().iter().copied().fold(f32::INFINITY, f32::min);
    assert_eq!(saved.get(3, 3, 3), min);
}

#[test]
fn stored_table_reloads_with_rewritten_image_names() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("particles.star");
    let store = MemoryStore::with_tomogram("tomo.mrc", ramp_tomogram());
    let options = SubvolumeExportOptions {
        box_shape: Some([4, 4, 4]),
        clear_angles: [true, false, true],
        ..SubvolumeExportOptions::default()
    };

    let mut star = picked_particles();
    store_with_subvolumes(&mut star, &path, &store, &options).unwrap();

    let reloaded = StarTable::load(&path).unwrap();
    assert_eq!(reloaded.nrows(), 2);
    assert_eq!(
        reloaded.get_element(IMAGE_NAME, 0).unwrap().to_string(),
        dir.path().join("sub").join("p0.mrc").display().to_string()
    );
    assert_eq!(
        *reloaded.get_element(ANGLE_ROT, 0).unwrap(),
        CellValue::Real(0.0)
    );
    assert_eq!(
        *reloaded.get_element(ANGLE_TILT, 0).unwrap(),
        CellValue::Real(20.0)
    );
    assert_eq!(
        *reloaded.get_element(ANGLE_PSI, 1).unwrap(),
        CellValue::Real(0.0)
    );
}

#[test]
fn missing_micrograph_volume_fails_with_context() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("particles.star");
    let store = MemoryStore::with_tomogram("elsewhere.mrc", ramp_tomogram());
    let options = SubvolumeExportOptions {
        box_shape: Some([4, 4, 4]),
        ..SubvolumeExportOptions::default()
    };

    let err = store_with_subvolumes(&mut picked_particles(), &path, &store, &options).unwrap_err();
    assert!(format!("{err:#}").contains("loading micrograph tomo.mrc"));
}

// ============================================================================
// Peak Collection Tests
// ============================================================================

#[derive(Default)]
struct CountingSink {
    shape: [usize; 3],
    peaks: Vec<[f64; 3]>,
    props: Vec<(String, ColumnType)>,
}

impl PeakSink for CountingSink {
    fn add_peak(&mut self, coords: [f64; 3]) -> usize {
        self.peaks.push(coords);
        self.peaks.len() - 1
    }

    fn add_prop(&mut self, name: &str, dtype: ColumnType) {
        self.props.push((name.to_string(), dtype));
    }

    fn set_peak_prop(&mut self, _peak: usize, _name: &str, _value: &CellValue) {}

    fn num_peaks(&self) -> usize {
        self.peaks.len()
    }
}

#[test]
fn collects_peaks_from_a_stored_and_reloaded_table() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("particles.star");
    let store = MemoryStore::with_tomogram("tomo.mrc", ramp_tomogram());

    let mut star = picked_particles();
    store_with_subvolumes(&mut star, &path, &store, &SubvolumeExportOptions::default()).unwrap();
    let reloaded = StarTable::load(&path).unwrap();

    let sink = collect_tomo_peaks(
        &reloaded,
        Path::new("tomo.mrc"),
        &store,
        &TomoPeaksOptions::default(),
        |shape, _name| CountingSink {
            shape,
            ..CountingSink::default()
        },
    )
    .unwrap();

    assert_eq!(sink.shape, [8, 8, 8]);
    assert_eq!(sink.peaks, [[4.0, 4.0, 4.0], [2.0, 3.0, 4.0]]);
    assert_eq!(sink.props.len(), reloaded.ncols());
    assert!(
        sink.props
            .contains(&(COORDINATE_X.to_string(), ColumnType::Real))
    );
}
