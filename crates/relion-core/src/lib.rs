pub mod alignment;
pub mod classes;
pub mod grouping;
pub mod orientation;
pub mod particles;
pub mod peaks;
pub mod subset;
pub mod subvolumes;
pub mod volume;

pub use alignment::compute_malign;
pub use classes::split_class;
pub use grouping::particle_group;
pub use orientation::{OrientationModel, RelionAngles, apply, transpose};
pub use particles::{
    clear_angles, origin_shift_or_zero, particle_angles, particle_coords, particles_angles,
    particles_coords, scale_coords,
};
pub use peaks::{PeakSink, TomoPeaksOptions, collect_tomo_peaks};
pub use subset::{assign_random_subsets, random_subset, randomize_column};
pub use subvolumes::{SubvolumeExportOptions, store_with_subvolumes};
pub use volume::{Volume, VolumeStore, cut_box, relion_norm};
