pub use super::density::{generate_batch, DensityOutputs, DensityParams, DEFAULT_VOXEL_SIZE};
pub use super::error::{Error, Result};
pub use super::pipeline::{compare, CompareConfig, Comparison};
pub use super::report::{ReportOutcome, Reporter};
pub use super::stats::{reduce, GroupSpec, Reduced, Reduction, VarianceModel};
pub use super::timer::AccTimer;
pub use super::volume::{write_volume, Volume, VolumeFormat};
