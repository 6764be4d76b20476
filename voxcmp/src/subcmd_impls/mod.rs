pub mod args;
mod compare;
mod density_map;
mod utils;
mod voxel_reduce;
