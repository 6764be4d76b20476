//! Benjamini–Hochberg 错误发现率校正。

use crate::error::{Error, Result};
use ndarray::{ArrayD, ArrayViewD};

/// FDR 校正结果，数组形状与输入 p 值相同。
#[derive(Clone, Debug)]
pub struct FdrOutcome {
    /// 被拒绝原假设（显著）的体素。
    pub rejected: ArrayD<bool>,
    /// 实际使用的 p 值阈值`k·α/m`，没有任何拒绝时为0。
    pub threshold: f64,
    /// BH 校正后的 p 值。
    pub adjusted: ArrayD<f64>,
}

impl FdrOutcome {
    /// 显著体素数。
    pub fn rejected_count(&self) -> usize {
        self.rejected.iter().filter(|&&r| r).count()
    }
}

/// 对所有体素的 p 值做 Benjamini–Hochberg 校正。NaN 视为1。
///
/// `alpha`必须在`(0, 1)`内，否则返回`Error::InvalidAlpha`。
pub fn benjamini_hochberg(p: ArrayViewD<'_, f64>, alpha: f64) -> Result<FdrOutcome> {
    if !(alpha > 0.0 && alpha < 1.0) {
        return Err(Error::InvalidAlpha(alpha));
    }
    let values: Vec<f64> = p
        .iter()
        .map(|&x| if x.is_nan() { 1.0 } else { x })
        .collect();
    let m = values.len();
    let mut rejected = ArrayD::from_elem(p.raw_dim(), false);
    let mut adjusted = ArrayD::from_elem(p.raw_dim(), 1.0);
    if m == 0 {
        return Ok(FdrOutcome {
            rejected,
            threshold: 0.0,
            adjusted,
        });
    }

    let mut order: Vec<usize> = (0..m).collect();
    order.sort_by(|&a, &b| values[a].total_cmp(&values[b]));

    let mf = m as f64;
    let k = order
        .iter()
        .enumerate()
        .rev()
        .find(|&(rank, &i)| values[i] <= (rank + 1) as f64 / mf * alpha)
        .map_or(0, |(rank, _)| rank + 1);

    // 从最大的秩往下取累计最小值
    let mut adj_sorted = vec![0.0; m];
    let mut running = 1.0_f64;
    for (rank, &i) in order.iter().enumerate().rev() {
        running = running.min(values[i] * mf / (rank + 1) as f64);
        adj_sorted[rank] = running;
    }

    // `rejected`/`adjusted`以标准布局新建，按逻辑顺序与`p.iter()`一一对应
    if let (Some(rej), Some(adj)) = (rejected.as_slice_mut(), adjusted.as_slice_mut()) {
        for (rank, &i) in order.iter().enumerate() {
            rej[i] = rank < k;
            adj[i] = adj_sorted[rank];
        }
    }

    Ok(FdrOutcome {
        rejected,
        threshold: k as f64 * alpha / mf,
        adjusted,
    })
}
