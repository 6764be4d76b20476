//! Otsu 阈值与滞后阈值分割。

use ndarray::{ArrayD, ArrayViewD};
use std::collections::VecDeque;

/// Otsu 直方图的分箱数。
pub const OTSU_BINS: usize = 256;

/// 在`OTSU_BINS`个等宽分箱的直方图上求使类间方差最大的阈值（取分箱中心）。
///
/// 忽略非有限值。所有有限值相等时返回该值，没有有限值时返回`None`。
pub fn otsu(data: ArrayViewD<'_, f64>) -> Option<f64> {
    let (min, max) = data
        .iter()
        .filter(|v| v.is_finite())
        .fold(None, |acc: Option<(f64, f64)>, &v| match acc {
            None => Some((v, v)),
            Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
        })?;
    if min == max {
        return Some(min);
    }

    let width = (max - min) / OTSU_BINS as f64;
    let mut hist = [0u64; OTSU_BINS];
    for &v in data.iter().filter(|v| v.is_finite()) {
        let bin = (((v - min) / width) as usize).min(OTSU_BINS - 1);
        hist[bin] += 1;
    }
    let centers: Vec<f64> = (0..OTSU_BINS)
        .map(|i| min + (i as f64 + 0.5) * width)
        .collect();

    // 前缀（背景）与后缀（前景）的权重和一阶矩
    let mut w1 = [0.0; OTSU_BINS];
    let mut s1 = [0.0; OTSU_BINS];
    let (mut w, mut s) = (0.0, 0.0);
    for i in 0..OTSU_BINS {
        w += hist[i] as f64;
        s += hist[i] as f64 * centers[i];
        w1[i] = w;
        s1[i] = s;
    }
    let mut w2 = [0.0; OTSU_BINS];
    let mut s2 = [0.0; OTSU_BINS];
    let (mut w, mut s) = (0.0, 0.0);
    for i in (0..OTSU_BINS).rev() {
        w += hist[i] as f64;
        s += hist[i] as f64 * centers[i];
        w2[i] = w;
        s2[i] = s;
    }

    let mut best = (0usize, f64::NEG_INFINITY);
    for i in 0..OTSU_BINS - 1 {
        if w1[i] == 0.0 || w2[i + 1] == 0.0 {
            continue;
        }
        let m1 = s1[i] / w1[i];
        let m2 = s2[i + 1] / w2[i + 1];
        let between = w1[i] * w2[i + 1] * (m1 - m2) * (m1 - m2);
        if between > best.1 {
            best = (i, between);
        }
    }
    Some(centers[best.0])
}

/// 滞后阈值：保留`> low`且与某个`> high`的体素面连通（每轴前后相邻）的体素。
pub fn hysteresis(data: ArrayViewD<'_, f64>, low: f64, high: f64) -> ArrayD<bool> {
    let shape = data.shape().to_vec();
    let values: Vec<f64> = data.iter().copied().collect();
    let n = values.len();

    // 标准布局下每个轴的步长
    let mut strides = vec![1usize; shape.len()];
    for k in (0..shape.len().saturating_sub(1)).rev() {
        strides[k] = strides[k + 1] * shape[k + 1];
    }

    let mut keep = vec![false; n];
    let mut queue: VecDeque<usize> = VecDeque::new();
    for (i, &v) in values.iter().enumerate() {
        if v > high && v > low {
            keep[i] = true;
            queue.push_back(i);
        }
    }
    while let Some(i) = queue.pop_front() {
        for (k, &stride) in strides.iter().enumerate() {
            let coord = (i / stride) % shape[k];
            let mut visit = |j: usize| {
                if !keep[j] && values[j] > low {
                    keep[j] = true;
                    queue.push_back(j);
                }
            };
            if coord > 0 {
                visit(i - stride);
            }
            if coord + 1 < shape[k] {
                visit(i + stride);
            }
        }
    }
    ArrayD::from_shape_vec(shape, keep).unwrap_or_else(|_| ArrayD::from_elem(data.raw_dim(), false))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{array, Array1, Array3};

    #[test]
    fn test_otsu_separates_two_modes() {
        let mut v = vec![1.0; 60];
        v.extend(vec![9.0; 40]);
        let t = otsu(Array1::from(v).into_dyn().view()).unwrap();
        assert!(t > 1.0 && t < 9.0, "{t}");
    }

    #[test]
    fn test_otsu_constant_and_empty() {
        let a = Array3::<f64>::from_elem((2, 2, 2), 3.5).into_dyn();
        assert_eq!(otsu(a.view()), Some(3.5));
        let nan = Array1::from(vec![f64::NAN; 3]).into_dyn();
        assert_eq!(otsu(nan.view()), None);
    }

    #[test]
    fn test_otsu_matches_histogram_center() {
        // 0..=255 均匀分布时，阈值为中间分箱的中心
        let a = Array1::from_iter((0..256).map(|i| i as f64)).into_dyn();
        let t = otsu(a.view()).unwrap();
        let width = 255.0 / 256.0;
        assert!((t - (127.0 + 0.5) * width).abs() < 1e-9, "{t}");
    }

    #[test]
    fn test_hysteresis_keeps_only_connected_components() {
        let a = array![[0.5, 0.5, 0.0, 0.5], [0.0, 1.0, 0.0, 0.5], [0.0, 0.0, 0.0, 0.0]].into_dyn();
        let m = hysteresis(a.view(), 0.3, 0.8);
        let expected = array![
            [true, true, false, false],
            [false, true, false, false],
            [false, false, false, false]
        ]
        .into_dyn();
        assert_eq!(m, expected);
    }

    #[test]
    fn test_hysteresis_is_face_connected_in_3d() {
        let mut a = Array3::<f64>::zeros((3, 3, 3));
        a[[1, 1, 1]] = 1.0;
        a[[1, 1, 2]] = 0.5;
        // 仅对角相邻，不应保留
        a[[2, 2, 2]] = 0.5;
        let m = hysteresis(a.view().into_dyn(), 0.3, 0.8);
        assert!(m[[1, 1, 1]] && m[[1, 1, 2]]);
        assert!(!m[[2, 2, 2]]);
        assert_eq!(m.iter().filter(|&&x| x).count(), 2);
    }
}
