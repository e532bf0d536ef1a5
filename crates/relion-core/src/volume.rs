//! Dense voxel volumes, normalization and box cutting.

use std::path::Path;

use anyhow::{Result, ensure};
use tracing::warn;

/// Dense 3-D voxel grid with shape `(nx, ny, nz)` in x-major order.
#[derive(Debug, Clone, PartialEq)]
pub struct Volume {
    shape: [usize; 3],
    data: Vec<f32>,
}

impl Volume {
    /// Zero-filled volume of the given shape.
    pub fn new(shape: [usize; 3]) -> Self {
        Self {
            shape,
            data: vec![0.0; shape[0] * shape[1] * shape[2]],
        }
    }

    /// Volume from raw voxels; the data length must match the shape.
    pub fn from_data(shape: [usize; 3], data: Vec<f32>) -> Result<Self> {
        let expected = shape[0] * shape[1] * shape[2];
        ensure!(
            data.len() == expected,
            "volume of shape {shape:?} needs {expected} voxels, got {}",
            data.len()
        );
        Ok(Self { shape, data })
    }

    pub fn shape(&self) -> [usize; 3] {
        self.shape
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn get(&self, x: usize, y: usize, z: usize) -> f32 {
        self.data[self.index(x, y, z)]
    }

    pub fn set(&mut self, x: usize, y: usize, z: usize, value: f32) {
        let idx = self.index(x, y, z);
        self.data[idx] = value;
    }

    pub fn voxels(&self) -> &[f32] {
        &self.data
    }

    pub fn voxels_mut(&mut self) -> &mut [f32] {
        &mut self.data
    }

    fn index(&self, x: usize, y: usize, z: usize) -> usize {
        (x * self.shape[1] + y) * self.shape[2] + z
    }
}

/// Contract for reading and writing volumes from backing storage.
///
/// Implementations own the on-disk format; this crate only moves [`Volume`]
/// values through it.
pub trait VolumeStore {
    fn load(&self, path: &Path, memory_map: bool) -> Result<Volume>;
    fn save(&self, volume: &Volume, path: &Path) -> Result<()>;
}

/// Normalize a volume the way RELION expects its particles.
///
/// The density is inverted, then shifted and scaled to zero mean and unit
/// standard deviation. Statistics come from the voxels where `mask` is
/// positive, or from the whole volume without a mask; a non-positive
/// standard deviation yields an all-zero volume and a warning. The mask
/// must share the volume's shape.
pub fn relion_norm(volume: &Volume, mask: Option<&Volume>) -> Volume {
    let inverted: Vec<f32> = volume.voxels().iter().map(|v| -v).collect();

    let mut sum = 0.0_f64;
    let mut sum_sq = 0.0_f64;
    let mut count = 0usize;
    for (idx, value) in inverted.iter().enumerate() {
        let selected = match mask {
            Some(mask) => mask.voxels().get(idx).is_some_and(|m| *m > 0.0),
            None => true,
        };
        if selected {
            sum += f64::from(*value);
            sum_sq += f64::from(*value) * f64::from(*value);
            count += 1;
        }
    }

    let mut out = Volume::new(volume.shape());
    if count == 0 {
        warn!("Normalization mask selects no voxels");
        return out;
    }
    let mean = sum / count as f64;
    let var = sum_sq / count as f64 - mean * mean;
    let std = if var > 0.0 { var.sqrt() } else { 0.0 };
    if std > 0.0 {
        for (slot, value) in out.voxels_mut().iter_mut().zip(&inverted) {
            *slot = ((f64::from(*value) - mean) / std) as f32;
        }
    } else {
        warn!(std, "Normalization standard deviation is not positive");
    }
    out
}

/// Cut a box of the given shape centered on `center` (rounded to voxels).
///
/// The box low corner sits at `round(center) - dim/2 + 1` on each axis;
/// voxels outside the source volume are zero.
pub fn cut_box(volume: &Volume, center: [f64; 3], box_shape: [usize; 3]) -> Volume {
    let shape = volume.shape();
    let mut low = [0_i64; 3];
    for axis in 0..3 {
        let c = center[axis].round() as i64;
        low[axis] = c - (box_shape[axis] as i64) / 2 + 1;
    }
    let mut out = Volume::new(box_shape);
    for i in 0..box_shape[0] {
        let sx = low[0] + i as i64;
        if sx < 0 || sx >= shape[0] as i64 {
            continue;
        }
        for j in 0..box_shape[1] {
            let sy = low[1] + j as i64;
            if sy < 0 || sy >= shape[1] as i64 {
                continue;
            }
            for k in 0..box_shape[2] {
                let sz = low[2] + k as i64;
                if sz < 0 || sz >= shape[2] as i64 {
                    continue;
                }
                out.set(i, j, k, volume.get(sx as usize, sy as usize, sz as usize));
            }
        }
    }
    out
}
