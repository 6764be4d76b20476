//! 可分离的 N 维高斯滤波，边界按镜像反射（`d c b a | a b c d | d c b a`）延拓。

use ndarray::{ArrayD, ArrayViewD, Axis};

/// 核半径为`TRUNCATE * sigma`（四舍五入）。
pub const TRUNCATE: f64 = 4.0;

/// 归一化的一维高斯核，长度为`2 * radius + 1`。
pub fn kernel(sigma: f64) -> Vec<f64> {
    let radius = (TRUNCATE * sigma + 0.5) as usize;
    let denom = -0.5 / (sigma * sigma);
    let mut w: Vec<f64> = (0..=2 * radius)
        .map(|i| {
            let x = i as f64 - radius as f64;
            (denom * x * x).exp()
        })
        .collect();
    let sum: f64 = w.iter().sum();
    w.iter_mut().for_each(|v| *v /= sum);
    w
}

/// 把任意整数下标反射进`[0, n)`，周期为`2n`。
#[inline]
pub fn reflect_index(i: isize, n: usize) -> usize {
    let n = n as isize;
    let period = 2 * n;
    let m = i.rem_euclid(period);
    (if m >= n { period - 1 - m } else { m }) as usize
}

/// 对每个轴依次做一维卷积。`sigmas`的长度必须等于数组维数，`sigma <= 0`的轴跳过。
pub fn gaussian_filter(data: ArrayViewD<'_, f64>, sigmas: &[f64]) -> ArrayD<f64> {
    debug_assert_eq!(sigmas.len(), data.ndim());
    let mut out = data.to_owned();
    let mut buf = Vec::new();
    for (k, &sigma) in sigmas.iter().enumerate() {
        if !(sigma > 0.0) || data.shape()[k] == 0 {
            continue;
        }
        let w = kernel(sigma);
        let radius = (w.len() / 2) as isize;
        let n = data.shape()[k];
        for mut lane in out.lanes_mut(Axis(k)) {
            buf.clear();
            buf.extend(lane.iter().copied());
            for (j, o) in lane.iter_mut().enumerate() {
                *o = w
                    .iter()
                    .enumerate()
                    .map(|(t, &wt)| wt * buf[reflect_index(j as isize + t as isize - radius, n)])
                    .sum();
            }
        }
    }
    out
}
