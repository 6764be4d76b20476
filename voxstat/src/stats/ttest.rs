//! 逐体素的双样本t检验。

use super::welford::GroupStatistics;
use crate::error::{Error, Result};
use ndarray::{ArrayD, ArrayViewD, IxDyn, Zip};
use statrs::distribution::{ContinuousCDF, Normal, StudentsT};

/// 方差模型。
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub enum VarianceModel {
    /// 不假设两组方差相等，自由度用 Welch–Satterthwaite 公式。
    #[default]
    Welch,
    /// 假设两组方差相等，使用合并方差，自由度为`n1 + n2 - 2`。
    Pooled,
}

impl VarianceModel {
    #[inline]
    pub fn name(self) -> &'static str {
        match self {
            VarianceModel::Welch => "welch",
            VarianceModel::Pooled => "pooled",
        }
    }
}

/// 逐体素的t检验结果。所有数组形状相同。
#[derive(Clone, Debug)]
pub struct TStatMap {
    pub t: ArrayD<f64>,
    pub df: ArrayD<f64>,
    pub p: ArrayD<f64>,
    /// 第一组均值减第二组均值，与`t`同号。
    pub mean_difference: ArrayD<f64>,
    /// 两组方差均为0的体素数。
    pub degenerate_voxels: usize,
}

impl TStatMap {
    #[inline]
    pub fn shape(&self) -> &[usize] {
        self.t.shape()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.t.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.t.is_empty()
    }
}

/// 单个体素的检验结果。
#[derive(Copy, Clone, Debug, PartialEq)]
struct VoxelTest {
    t: f64,
    df: f64,
    p: f64,
    degenerate: bool,
}

/// 两组方差均为0且均值不同时，t饱和到的幅值（可写入`f32`的最大值）。
const SATURATED_T: f64 = f32::MAX as f64;

/// 对两组统计量逐体素做t检验。
///
/// 任意一组样本数少于2时返回`Error::TooFewSamples`，两组形状不一致时返回`Error::ShapeMismatch`。
pub fn t_test(a: &GroupStatistics, b: &GroupStatistics, model: VarianceModel) -> Result<TStatMap> {
    for count in [a.count(), b.count()] {
        if count < 2 {
            return Err(Error::TooFewSamples { count });
        }
    }
    if a.shape() != b.shape() {
        return Err(Error::ShapeMismatch {
            origin: "第二组".to_owned(),
            expected: a.shape().to_vec(),
            found: b.shape().to_vec(),
        });
    }

    let (n1, n2) = (a.count() as f64, b.count() as f64);
    let shape = IxDyn(a.shape());
    let mut t = ArrayD::<f64>::zeros(shape.clone());
    let mut df = ArrayD::<f64>::zeros(shape.clone());
    let mut p = ArrayD::<f64>::zeros(shape);
    let mean_difference = diff(a.mean(), b.mean());

    let mut degenerate_voxels = 0usize;
    Zip::from(&mut t)
        .and(&mut df)
        .and(&mut p)
        .and(&mean_difference)
        .and(&a.variance())
        .and(&b.variance())
        .for_each(|t, df, p, &d, &v1, &v2| {
            let r = voxel_test(d, v1, v2, n1, n2, model);
            *t = r.t;
            *df = r.df;
            *p = r.p;
            degenerate_voxels += r.degenerate as usize;
        });

    if degenerate_voxels > 0 {
        log::warn!("{degenerate_voxels}个体素两组方差均为0，t值按退化规则处理");
    }
    Ok(TStatMap {
        t,
        df,
        p,
        mean_difference,
        degenerate_voxels,
    })
}

/// 自由度为`df`的 Student t 分布的双尾 p 值`P(|T| >= |t|)`。`df`为无穷大时按标准正态分布计算。
///
/// `t`为无穷大时返回0，`t`为 NaN 或`df`不是正数时返回 NaN。
pub fn two_tailed_p(t: f64, df: f64) -> f64 {
    if t.is_nan() {
        return f64::NAN;
    }
    if t.is_infinite() {
        return 0.0;
    }
    let tail = if df == f64::INFINITY {
        Normal::new(0.0, 1.0).ok().map(|n| n.sf(t.abs()))
    } else {
        StudentsT::new(0.0, 1.0, df).ok().map(|d| d.sf(t.abs()))
    };
    tail.map_or(f64::NAN, |q| (2.0 * q).clamp(0.0, 1.0))
}

fn diff(a: ArrayViewD<'_, f64>, b: ArrayViewD<'_, f64>) -> ArrayD<f64> {
    &a - &b
}

fn voxel_test(d: f64, v1: f64, v2: f64, n1: f64, n2: f64, model: VarianceModel) -> VoxelTest {
    let (se, df) = match model {
        VarianceModel::Welch => {
            let (q1, q2) = (v1 / n1, v2 / n2);
            let se2 = q1 + q2;
            let df = se2 * se2 / (q1 * q1 / (n1 - 1.0) + q2 * q2 / (n2 - 1.0));
            (se2.sqrt(), df)
        }
        VarianceModel::Pooled => {
            let dof = n1 + n2 - 2.0;
            let sp2 = ((n1 - 1.0) * v1 + (n2 - 1.0) * v2) / dof;
            ((sp2 * (1.0 / n1 + 1.0 / n2)).sqrt(), dof)
        }
    };

    if se == 0.0 {
        let df = n1 + n2 - 2.0;
        return if d == 0.0 || d.is_nan() {
            VoxelTest {
                t: 0.0,
                df,
                p: 1.0,
                degenerate: true,
            }
        } else {
            VoxelTest {
                t: SATURATED_T.copysign(d),
                df,
                p: 0.0,
                degenerate: true,
            }
        };
    }

    let t = d / se;
    VoxelTest {
        t,
        df,
        p: two_tailed_p(t, df),
        degenerate: false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stats::welford::MomentAccumulator;
    use ndarray::Array1;

    fn group(samples: &[&[f64]]) -> GroupStatistics {
        let mut acc = MomentAccumulator::new(&[samples[0].len()]);
        for s in samples {
            acc.update(Array1::from(s.to_vec()).into_dyn().view()).unwrap();
        }
        acc.finalize()
    }

    #[test]
    fn test_equal_means_give_zero_t() {
        let a = group(&[&[1.0, 4.0], &[3.0, 2.0], &[2.0, 3.0]]);
        let b = group(&[&[2.0, 3.0], &[2.5, 3.5], &[1.5, 2.5]]);
        let r = t_test(&a, &b, VarianceModel::Welch).unwrap();
        assert_eq!(r.t[[0]], 0.0);
        assert_eq!(r.t[[1]], 0.0);
        assert!((r.p[[0]] - 1.0).abs() < 1e-12);
        assert_eq!(r.degenerate_voxels, 0);
    }

    #[test]
    fn test_sign_follows_first_minus_second() {
        let a = group(&[&[5.0], &[6.0], &[7.0]]);
        let b = group(&[&[1.0], &[2.0], &[3.0]]);
        let r = t_test(&a, &b, VarianceModel::Welch).unwrap();
        assert!(r.t[[0]] > 0.0);
        assert_eq!(r.mean_difference[[0]], 4.0);
        let r = t_test(&b, &a, VarianceModel::Welch).unwrap();
        assert!(r.t[[0]] < 0.0);
        assert_eq!(r.mean_difference[[0]], -4.0);
    }

    #[test]
    fn test_welch_against_reference() {
        // scipy.stats.ttest_ind([1,2,3,4], [2,4,6,8,10], equal_var=False)
        let a = group(&[&[1.0], &[2.0], &[3.0], &[4.0]]);
        let b = group(&[&[2.0], &[4.0], &[6.0], &[8.0], &[10.0]]);
        let r = t_test(&a, &b, VarianceModel::Welch).unwrap();
        assert!((r.t[[0]] - (-2.251_436_323_159_369)).abs() < 1e-9);
        assert!((r.df[[0]] - 5.520_787_746_170_678).abs() < 1e-9);
        assert!((r.p[[0]] - 0.069_133_593_192_392_41).abs() < 1e-6);
    }

    #[test]
    fn test_pooled_against_reference() {
        // scipy.stats.ttest_ind([1,2,3,4], [2,4,6,8,10], equal_var=True)
        let a = group(&[&[1.0], &[2.0], &[3.0], &[4.0]]);
        let b = group(&[&[2.0], &[4.0], &[6.0], &[8.0], &[10.0]]);
        let r = t_test(&a, &b, VarianceModel::Pooled).unwrap();
        assert_eq!(r.df[[0]], 7.0);
        assert!((r.t[[0]] - (-2.057_806_575_272_459)).abs() < 1e-9);
        assert!((r.p[[0]] - 0.078_619_235_058_693_79).abs() < 1e-6);
    }

    #[test]
    fn test_constant_groups_are_degenerate() {
        let a = group(&[&[10.0, 5.0], &[10.0, 5.0], &[10.0, 5.0]]);
        let b = group(&[&[0.0, 5.0], &[0.0, 5.0], &[0.0, 5.0]]);
        let r = t_test(&a, &b, VarianceModel::Welch).unwrap();
        assert!(r.t[[0]].is_finite() && r.t[[0]] > 0.0);
        assert_eq!(r.p[[0]], 0.0);
        assert_eq!(r.t[[1]], 0.0);
        assert_eq!(r.p[[1]], 1.0);
        assert_eq!(r.df[[0]], 4.0);
        assert_eq!(r.degenerate_voxels, 2);
        assert!(r.t.iter().chain(r.p.iter()).all(|x| !x.is_nan()));
    }

    #[test]
    fn test_two_tailed_p_known_values() {
        let close = |a: f64, b: f64, tol: f64| (a - b).abs() <= tol;
        // df = 1 为柯西分布: P(|T| > 1) = 0.5
        assert!(close(two_tailed_p(1.0, 1.0), 0.5, 1e-12));
        assert!(close(two_tailed_p(-1.0, 1.0), 0.5, 1e-12));
        assert!(close(two_tailed_p(0.0, 7.0), 1.0, 1e-12));
        // 双尾 0.05 临界值
        assert!(close(two_tailed_p(2.228_138_851_986_273, 10.0), 0.05, 1e-8));
        assert!(close(two_tailed_p(12.706_204_736_174_7, 1.0), 0.05, 1e-8));
        assert!(close(two_tailed_p(1.959_963_984_540_054, f64::INFINITY), 0.05, 1e-8));
        // df = 2 有闭式解: p = 1 - t / sqrt(t^2 + 2)
        let t: f64 = 1.7;
        assert!(close(two_tailed_p(t, 2.0), 1.0 - t / (t * t + 2.0).sqrt(), 1e-10));
        assert!(two_tailed_p(40.0, 4.0) < 1e-5);
    }

    #[test]
    fn test_two_tailed_p_limits() {
        assert_eq!(two_tailed_p(f64::INFINITY, 4.0), 0.0);
        assert_eq!(two_tailed_p(f64::NEG_INFINITY, 4.0), 0.0);
        assert!(two_tailed_p(f64::NAN, 4.0).is_nan());
        assert!(two_tailed_p(1.0, 0.0).is_nan());
        assert!(two_tailed_p(1.0, f64::NAN).is_nan());
    }

    #[test]
    fn test_too_few_samples() {
        let a = group(&[&[1.0]]);
        let b = group(&[&[1.0], &[2.0]]);
        assert!(matches!(
            t_test(&a, &b, VarianceModel::Welch),
            Err(Error::TooFewSamples { count: 1 })
        ));
    }

    #[test]
    fn test_group_shape_mismatch() {
        let a = group(&[&[1.0, 2.0], &[2.0, 3.0]]);
        let b = group(&[&[1.0], &[2.0]]);
        assert!(matches!(
            t_test(&a, &b, VarianceModel::Pooled),
            Err(Error::ShapeMismatch { .. })
        ));
    }
}
