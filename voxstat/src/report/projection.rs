//! 沿某一轴的最大值投影。

use crate::error::{Error, Result};
use ndarray::{ArrayD, ArrayViewD, Axis, RemoveAxis, Zip};

fn check_axis(ndim: usize, axis: usize) -> Result<Axis> {
    if axis < ndim {
        Ok(Axis(axis))
    } else {
        Err(Error::InvalidAxis { axis, ndim })
    }
}

/// 最大强度投影。忽略 NaN；整列都是 NaN 时结果为负无穷。
pub fn max_projection(data: ArrayViewD<'_, f64>, axis: usize) -> Result<ArrayD<f64>> {
    let axis = check_axis(data.ndim(), axis)?;
    Ok(data.fold_axis(axis, f64::NEG_INFINITY, |&acc, &x| acc.max(x)))
}

/// 绝对值的最大投影。
pub fn abs_max_projection(data: ArrayViewD<'_, f64>, axis: usize) -> Result<ArrayD<f64>> {
    let axis = check_axis(data.ndim(), axis)?;
    Ok(data.fold_axis(axis, 0.0, |&acc, &x| acc.max(x.abs())))
}

/// 布尔数组的“任一为真”投影。
pub fn any_projection(mask: ArrayViewD<'_, bool>, axis: usize) -> Result<ArrayD<bool>> {
    let axis = check_axis(mask.ndim(), axis)?;
    Ok(mask.fold_axis(axis, false, |&acc, &x| acc || x))
}

/// 只考虑`mask`为真的体素，取绝对值最大者并保留其符号。没有这样的体素时为0。
pub fn signed_max_abs_projection(
    data: ArrayViewD<'_, f64>,
    mask: ArrayViewD<'_, bool>,
    axis: usize,
) -> Result<ArrayD<f64>> {
    if data.shape() != mask.shape() {
        return Err(Error::ShapeMismatch {
            origin: "显著性掩码".to_owned(),
            expected: data.shape().to_vec(),
            found: mask.shape().to_vec(),
        });
    }
    let axis = check_axis(data.ndim(), axis)?;
    let mut out = ArrayD::<f64>::zeros(data.raw_dim().remove_axis(axis));
    Zip::from(&mut out)
        .and(data.lanes(axis))
        .and(mask.lanes(axis))
        .for_each(|o, lane_d, lane_m| {
            *o = lane_d
                .iter()
                .zip(lane_m.iter())
                .filter(|&(_, &m)| m)
                .fold(0.0, |acc: f64, (&x, _)| if x.abs() > acc.abs() { x } else { acc });
        });
    Ok(out)
}
