//! 逐体素的均值和最大值归约。一次只读入一个体数据。

use super::group::{load_checked, GroupSpec};
use super::welford::MomentAccumulator;
use crate::error::{Error, Result};
use ndarray::{ArrayD, Zip};
use std::path::PathBuf;

/// 归约方式。
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Reduction {
    Mean,
    Max,
}

impl Reduction {
    /// 用于默认输出文件名的标签。
    #[inline]
    pub fn label(self) -> &'static str {
        match self {
            Reduction::Mean => "voxel_mean",
            Reduction::Max => "voxel_max",
        }
    }
}

/// 归约结果。
#[derive(Clone, Debug)]
pub struct Reduced {
    pub data: ArrayD<f64>,
    pub count: usize,
    pub spacing: Option<Vec<f64>>,
}

/// 对`spec`匹配的所有文件做逐体素归约。
pub fn reduce(spec: &GroupSpec, how: Reduction) -> Result<Reduced> {
    let files = spec.files()?;
    log::info!(
        "对`{}`中的{}个文件计算{}",
        spec.dir.display(),
        files.len(),
        how.label()
    );
    let (data, spacing) = match how {
        Reduction::Mean => mean_of(spec, &files)?,
        Reduction::Max => max_of(spec, &files)?,
    };
    Ok(Reduced {
        data,
        count: files.len(),
        spacing,
    })
}

fn mean_of(spec: &GroupSpec, files: &[PathBuf]) -> Result<(ArrayD<f64>, Option<Vec<f64>>)> {
    let (first, rest) = files.split_first().ok_or_else(|| empty(spec))?;
    let volume = load_checked(first, None)?;
    let spacing = volume.spacing().map(<[f64]>::to_vec);
    let mut acc = MomentAccumulator::new(volume.shape());
    acc.update(volume.data())?;
    drop(volume);

    for path in rest {
        let volume = load_checked(path, Some(acc.shape()))?;
        acc.update(volume.data())?;
    }
    Ok((acc.finalize().into_mean(), spacing))
}

fn max_of(spec: &GroupSpec, files: &[PathBuf]) -> Result<(ArrayD<f64>, Option<Vec<f64>>)> {
    let (first, rest) = files.split_first().ok_or_else(|| empty(spec))?;
    let (mut max, spacing) = load_checked(first, None)?.into_parts();

    for path in rest {
        let volume = load_checked(path, Some(max.shape()))?;
        Zip::from(&mut max)
            .and(&volume.data())
            .for_each(|m, &v| *m = m.max(v));
    }
    Ok((max, spacing))
}

fn empty(spec: &GroupSpec) -> Error {
    Error::EmptyGroup {
        dir: spec.dir.clone(),
        suffix: spec.suffix.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array3;

    fn group_with(values: &[f32]) -> (tempfile::TempDir, GroupSpec) {
        let dir = tempfile::tempdir().unwrap();
        for (i, &v) in values.iter().enumerate() {
            let a = Array3::<f32>::from_shape_fn((2, 3, 4), |(z, y, x)| v * (1 + z + y + x) as f32);
            ndarray_npy::write_npy(dir.path().join(format!("{i}_binary.npy")), &a).unwrap();
        }
        let spec = GroupSpec::new(dir.path(), "_binary.npy");
        (dir, spec)
    }

    #[test]
    fn test_voxel_mean() {
        let (_dir, spec) = group_with(&[1.0, 2.0, 3.0, 6.0]);
        let r = reduce(&spec, Reduction::Mean).unwrap();
        assert_eq!(r.count, 4);
        assert!((r.data[[1, 2, 3]] - 3.0 * 7.0).abs() < 1e-9);
        assert!((r.data[[0, 0, 0]] - 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_voxel_max() {
        let (_dir, spec) = group_with(&[1.0, -2.0, 5.0]);
        let r = reduce(&spec, Reduction::Max).unwrap();
        assert_eq!(r.data[[0, 0, 0]], 5.0);
        assert_eq!(r.data[[1, 1, 1]], 20.0);
    }

    #[test]
    fn test_reduce_rejects_shape_mismatch() {
        let (dir, spec) = group_with(&[1.0, 2.0]);
        let bad = Array3::<f32>::zeros((2, 3, 5));
        ndarray_npy::write_npy(dir.path().join("9_binary.npy"), &bad).unwrap();
        assert!(matches!(
            reduce(&spec, Reduction::Max),
            Err(Error::ShapeMismatch { .. })
        ));
    }
}
