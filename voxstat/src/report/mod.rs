//! 比较结果的持久化与可视化。
//!
//! 写出失败只记录日志并收集到[`ReportOutcome`]中，不会中断其余输出，也不影响已计算的统计量。

pub mod colormap;
pub mod projection;

use crate::error::{Error, Result};
use crate::pipeline::Comparison;
use crate::volume::{write_volume, VolumeFormat};
use image::RgbImage;
use json::JsonValue;
use ndarray::{ArrayView2, ArrayViewD, Ix2};
use std::path::{Path, PathBuf};

/// 投影图中|t|色图的截断值。
pub const T_COLOR_LIMIT: f64 = 5.0;

const AXIS_NAMES: [&str; 3] = ["X", "Y", "Z"];
pub(crate) const PANEL_GAP: u32 = 4;

/// 输出过程中的成功与失败记录。
#[derive(Debug, Default)]
pub struct ReportOutcome {
    pub written: Vec<PathBuf>,
    pub failures: Vec<(PathBuf, Error)>,
}

impl ReportOutcome {
    #[inline]
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }

    fn record(&mut self, path: PathBuf, r: Result<()>) {
        match r {
            Ok(()) => {
                log::info!("已写入 {}", path.display());
                self.written.push(path);
            }
            Err(e) => {
                log::error!("写入`{}`失败: {e}", path.display());
                self.failures.push((path, e));
            }
        }
    }
}

/// 按`{prefix}_{name}.{ext}`的规则写出所有结果文件。
#[derive(Clone, Debug)]
pub struct Reporter {
    prefix: String,
    format: VolumeFormat,
    png: bool,
}

impl Reporter {
    pub fn new<S: Into<String>>(prefix: S, format: VolumeFormat) -> Self {
        Self {
            prefix: prefix.into(),
            format,
            png: true,
        }
    }

    /// 是否输出投影图。
    #[inline]
    pub fn with_png(mut self, png: bool) -> Self {
        self.png = png;
        self
    }

    #[inline]
    pub fn path_for(&self, name: &str, ext: &str) -> PathBuf {
        PathBuf::from(format!("{}_{name}.{ext}", self.prefix))
    }

    /// 写出体数据、摘要和（三维时的）投影图。
    pub fn write(&self, c: &Comparison) -> ReportOutcome {
        let mut outcome = ReportOutcome::default();
        let ext = self.format.extension();
        let spacing = c.spacing.as_deref();

        let as_f32 = |a: ArrayViewD<'_, f64>| a.mapv(|v| v as f32);
        let volumes = [
            ("t_statistics", as_f32(c.tmap.t.view())),
            ("p_values_uncorrected", as_f32(c.tmap.p.view())),
            ("p_values_corrected_fdr", as_f32(c.fdr.adjusted.view())),
            ("mean_difference", as_f32(c.tmap.mean_difference.view())),
            ("degrees_of_freedom", as_f32(c.tmap.df.view())),
        ];
        for (name, data) in volumes.iter() {
            let path = self.path_for(name, ext);
            let r = write_volume(&path, data.view(), spacing);
            outcome.record(path, r);
        }
        let mask = c.fdr.rejected.mapv(u8::from);
        let path = self.path_for("significant_mask_fdr", ext);
        let r = write_volume(&path, mask.view(), spacing);
        outcome.record(path, r);

        let path = self.path_for("summary", "json");
        let r = std::fs::write(&path, summary(c).pretty(2)).map_err(Error::from);
        outcome.record(path, r);

        if self.png {
            if c.tmap.t.ndim() == 3 {
                for (axis, name) in AXIS_NAMES.iter().enumerate() {
                    let path = self.path_for(&format!("t_stats_projection_{name}"), "png");
                    let r = projection_figure(c, axis).and_then(|img| save_png(&img, &path));
                    outcome.record(path, r);
                }
            } else {
                log::warn!("结果为{}维，跳过投影图", c.tmap.t.ndim());
            }
        }
        outcome
    }
}

/// 摘要报告。
pub fn summary(c: &Comparison) -> JsonValue {
    let mut group1 = JsonValue::new_object();
    group1["dir"] = c.config.group1.dir.display().to_string().into();
    group1["suffix"] = c.config.group1.suffix.as_str().into();
    group1["count"] = c.n1.into();
    let mut group2 = JsonValue::new_object();
    group2["dir"] = c.config.group2.dir.display().to_string().into();
    group2["suffix"] = c.config.group2.suffix.as_str().into();
    group2["count"] = c.n2.into();

    let mut j = JsonValue::new_object();
    j["group1"] = group1;
    j["group2"] = group2;
    j["shape"] = JsonValue::Array(c.tmap.shape().iter().map(|&s| s.into()).collect());
    j["total_voxels"] = c.voxel_count().into();
    j["significant_voxels"] = c.significant_count().into();
    j["significant_percentage"] = c.significant_percentage().into();
    j["alpha"] = c.config.alpha.into();
    j["fdr_threshold"] = c.fdr.threshold.into();
    j["test"] = c.config.variance.name().into();
    // 均值差的方向，与t同号。
    j["mean_difference"] = "group1 - group2".into();
    j["degenerate_voxels"] = c.tmap.degenerate_voxels.into();
    j
}

/// 一个轴向的三联图：最大|t|投影、显著体素投影、显著体素的带符号均值差投影。
pub fn projection_figure(c: &Comparison, axis: usize) -> Result<RgbImage> {
    let t = projection::abs_max_projection(c.tmap.t.view(), axis)?;
    let sig = projection::any_projection(c.fdr.rejected.view(), axis)?;
    let diff = projection::signed_max_abs_projection(
        c.tmap.mean_difference.view(),
        c.fdr.rejected.view(),
        axis,
    )?;
    let limit = diff.iter().fold(0.0_f64, |acc, &x| acc.max(x.abs()));
    let limit = if limit > 0.0 { limit } else { 1.0 };

    let t = into_2d(t.view())?;
    let sig = into_2d(sig.view())?;
    let diff = into_2d(diff.view())?;
    Ok(colormap::hstack(
        &[
            colormap::render(t, |v| colormap::diverging(v, T_COLOR_LIMIT)),
            colormap::render(sig, colormap::binary),
            colormap::render(diff, |v| colormap::diverging(v, limit)),
        ],
        PANEL_GAP,
    ))
}

fn into_2d<A>(a: ArrayViewD<'_, A>) -> Result<ArrayView2<'_, A>> {
    Ok(a.into_dimensionality::<Ix2>()?)
}

pub(crate) fn save_png(img: &RgbImage, path: &Path) -> Result<()> {
    img.save(path)?;
    Ok(())
}
