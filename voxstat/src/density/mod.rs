//! 由原始荧光体数据生成二值掩码和密度图。
//!
//! 流程：Otsu 阈值 → 滞后阈值分割 → 按物理尺寸缩放的高斯滤波。

pub mod gaussian;
pub mod threshold;

use crate::error::{Error, Result};
use crate::report::{colormap, projection, save_png, PANEL_GAP};
use crate::stats::GroupSpec;
use crate::volume::{write_volume, Volume};
use image::{Rgb, RgbImage};
use ndarray::{ArrayD, ArrayView2, ArrayViewD, Ix2};
use std::path::{Path, PathBuf};
use std::sync::mpsc::channel;
use std::sync::Arc;
use threadpool::ThreadPool;

/// 默认体素尺寸（微米/体素），按 x、y、z 轴排列。
pub const DEFAULT_VOXEL_SIZE: [f64; 3] = [0.2, 0.2, 0.5];

/// 密度图参数。
#[derive(Clone, Debug, PartialEq)]
pub struct DensityParams {
    /// 高斯核标准差，单位为微米。
    pub sigma: f64,
    /// 每轴的体素尺寸。为`None`时使用文件中的体素间距，文件中也没有时使用[`DEFAULT_VOXEL_SIZE`]。
    pub voxel_size: Option<Vec<f64>>,
    pub low_ratio: f64,
    pub high_ratio: f64,
}

impl Default for DensityParams {
    fn default() -> Self {
        Self {
            sigma: 2.5,
            voxel_size: Some(DEFAULT_VOXEL_SIZE.to_vec()),
            low_ratio: 0.3,
            high_ratio: 0.8,
        }
    }
}

impl DensityParams {
    /// 以体素为单位的每轴标准差。
    pub fn voxel_sigmas(&self, ndim: usize, spacing: Option<&[f64]>) -> Result<Vec<f64>> {
        let voxel_size: &[f64] = match (self.voxel_size.as_deref(), spacing) {
            (Some(v), _) => v,
            (None, Some(s)) if s.iter().all(|x| x.is_finite()) => s,
            (None, _) => &DEFAULT_VOXEL_SIZE,
        };
        if voxel_size.len() != ndim || voxel_size.iter().any(|&v| !(v > 0.0)) {
            return Err(Error::InvalidVoxelSize {
                voxel_size: voxel_size.to_vec(),
                ndim,
            });
        }
        Ok(voxel_size.iter().map(|v| self.sigma / v).collect())
    }
}

/// 单个体数据的处理结果。
#[derive(Clone, Debug)]
pub struct DensityMap {
    pub otsu: f64,
    pub low: f64,
    pub high: f64,
    pub binary: ArrayD<bool>,
    pub density: ArrayD<f64>,
}

/// 对一个体数据做阈值分割和高斯滤波。
pub fn density_map(volume: &Volume, params: &DensityParams) -> Result<DensityMap> {
    let sigmas = params.voxel_sigmas(volume.data().ndim(), volume.spacing())?;
    let otsu = threshold::otsu(volume.data()).unwrap_or(0.0);
    let (low, high) = (params.low_ratio * otsu, params.high_ratio * otsu);
    let binary = threshold::hysteresis(volume.data(), low, high);
    let density = gaussian::gaussian_filter(binary.mapv(|b| b as u8 as f64).view(), &sigmas);
    Ok(DensityMap {
        otsu,
        low,
        high,
        binary,
        density,
    })
}

/// 一个输入文件对应的输出路径。
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DensityOutputs {
    pub binary: PathBuf,
    pub density: PathBuf,
    /// 原始数据与二值掩码的三轴投影对比图。
    pub segmentation: PathBuf,
    /// 原始数据与密度图的三轴投影对比图。
    pub png: PathBuf,
}

impl DensityOutputs {
    /// 把`input`文件名末尾的`suffix`替换为各输出的后缀。
    pub fn for_input(input: &Path, suffix: &str) -> Self {
        let name = input
            .file_name()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let stem = name.strip_suffix(suffix).unwrap_or(name.as_str());
        let sibling = |tail: &str| input.with_file_name(format!("{stem}{tail}"));
        Self {
            binary: sibling("_binary.npy"),
            density: sibling("_density_map.nrrd"),
            segmentation: sibling("_segmentation.png"),
            png: sibling("_density_map.png"),
        }
    }
}

/// 处理单个文件并写出全部结果。
pub fn process_file(input: &Path, suffix: &str, params: &DensityParams) -> Result<DensityOutputs> {
    let volume = Volume::open(input)?;
    let map = density_map(&volume, params)?;
    log::info!(
        "{}: otsu = {:.4}，滞后阈值 = ({:.4}, {:.4})，保留{}个体素",
        input.display(),
        map.otsu,
        map.low,
        map.high,
        map.binary.iter().filter(|&&b| b).count()
    );

    let outputs = DensityOutputs::for_input(input, suffix);
    let spacing = volume.spacing();
    write_volume(&outputs.binary, map.binary.mapv(|b| b as u8 as f32).view(), spacing)?;
    write_volume(&outputs.density, map.density.mapv(|v| v as f32).view(), spacing)?;

    if map.density.ndim() == 3 {
        let binary = map.binary.mapv(|b| b as u8 as f64);
        let img = projection_grid(volume.data(), binary.view(), colormap::hot)?;
        save_png(&img, &outputs.segmentation)?;
        let img = projection_grid(volume.data(), map.density.view(), colormap::white_red)?;
        save_png(&img, &outputs.png)?;
    } else {
        log::warn!("{}: {}维数据不生成投影图", input.display(), map.density.ndim());
    }
    Ok(outputs)
}

/// 三维数据沿 X、Y、Z 轴的最大投影拼成两行：第一行为灰度的`original`，第二行为用`color`着色的`derived`。
fn projection_grid<F>(
    original: ArrayViewD<'_, f64>,
    derived: ArrayViewD<'_, f64>,
    color: F,
) -> Result<RgbImage>
where
    F: Fn(f64, f64) -> Rgb<u8>,
{
    let mut top = Vec::with_capacity(3);
    let mut bottom = Vec::with_capacity(3);
    for axis in 0..3 {
        let o = projection::max_projection(original.view(), axis)?.into_dimensionality::<Ix2>()?;
        let (lo, hi) = value_range(o.view());
        top.push(colormap::render(o.view(), |v| colormap::gray(v, lo, hi)));

        let d = projection::max_projection(derived.view(), axis)?.into_dimensionality::<Ix2>()?;
        let (_, max) = value_range(d.view());
        bottom.push(colormap::render(d.view(), |v| color(v, max)));
    }
    Ok(colormap::vstack(
        &[
            colormap::hstack(&top, PANEL_GAP),
            colormap::hstack(&bottom, PANEL_GAP),
        ],
        PANEL_GAP,
    ))
}

/// 有限值的最小值和最大值，没有有限值时为`(0, 0)`。
fn value_range(a: ArrayView2<'_, f64>) -> (f64, f64) {
    a.iter()
        .filter(|v| v.is_finite())
        .fold(None, |acc: Option<(f64, f64)>, &v| match acc {
            None => Some((v, v)),
            Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
        })
        .unwrap_or((0.0, 0.0))
}

/// 并行处理`spec`匹配的每个文件。单个文件失败不影响其他文件，结束时若有失败则返回`Error::BatchFailed`。
pub fn generate_batch(spec: &GroupSpec, params: &DensityParams) -> Result<Vec<DensityOutputs>> {
    let files = spec.files()?;
    let total = files.len();
    log::info!("在`{}`中找到{}个文件", spec.dir.display(), total);

    let results: Vec<(PathBuf, Result<DensityOutputs>)> = match num_cpus::get() {
        1 => files
            .into_iter()
            .map(|f| {
                let r = process_file(&f, &spec.suffix, params);
                (f, r)
            })
            .collect(),
        cpus => {
            let pool = ThreadPool::new(cpus.min(total));
            let (tx, rx) = channel();
            let shared = Arc::new((spec.suffix.clone(), params.clone()));
            for f in files {
                let tx = tx.clone();
                let shared = Arc::clone(&shared);
                pool.execute(move || {
                    let r = process_file(&f, &shared.0, &shared.1);
                    let _ = tx.send((f, r));
                });
            }
            drop(tx);
            let mut results: Vec<_> = rx.iter().collect();
            results.sort_by(|a, b| a.0.cmp(&b.0));
            results
        }
    };

    let mut outputs = Vec::with_capacity(total);
    let mut failed = total - results.len();
    for (path, r) in results {
        match r {
            Ok(o) => outputs.push(o),
            Err(e) => {
                log::error!("处理`{}`失败: {e}", path.display());
                failed += 1;
            }
        }
    }
    if failed > 0 {
        return Err(Error::BatchFailed { failed, total });
    }
    Ok(outputs)
}
