//! 逐体素的 Welford 在线均值/方差累加器。
//!
//! 任意时刻内存中只有累加器本身（均值、M2）和当前折叠进来的一个体数据。

use crate::error::{Error, Result};
use ndarray::{ArrayD, ArrayViewD, IxDyn, Zip};

/// 增量矩累加器。所有体素共享同一个样本数。
#[derive(Clone, Debug)]
pub struct MomentAccumulator {
    count: u64,
    mean: ArrayD<f64>,
    m2: ArrayD<f64>,
}

impl MomentAccumulator {
    /// 为形状为`shape`的体数据创建空累加器。
    pub fn new(shape: &[usize]) -> Self {
        Self {
            count: 0,
            mean: ArrayD::zeros(IxDyn(shape)),
            m2: ArrayD::zeros(IxDyn(shape)),
        }
    }

    #[inline]
    pub fn count(&self) -> u64 {
        self.count
    }

    #[inline]
    pub fn shape(&self) -> &[usize] {
        self.mean.shape()
    }

    /// 将一个体数据折叠进累加器:
    ///
    /// `delta = x - mean; mean += delta / n; M2 += delta * (x - mean)`
    ///
    /// 形状不一致时返回`Error::ShapeMismatch`，累加器保持不变。
    pub fn update(&mut self, x: ArrayViewD<'_, f64>) -> Result<()> {
        if x.shape() != self.shape() {
            return Err(Error::ShapeMismatch {
                origin: format!("第{}个样本", self.count + 1),
                expected: self.shape().to_vec(),
                found: x.shape().to_vec(),
            });
        }
        self.count += 1;
        let n = self.count as f64;
        Zip::from(&mut self.mean)
            .and(&mut self.m2)
            .and(&x)
            .for_each(|mean, m2, &v| {
                let delta = v - *mean;
                *mean += delta / n;
                *m2 += delta * (v - *mean);
            });
        Ok(())
    }

    /// 结束累加，得到只读的分组统计量。样本数少于2时方差为 NaN。
    pub fn finalize(self) -> GroupStatistics {
        let Self { count, mean, mut m2 } = self;
        if count < 2 {
            m2.fill(f64::NAN);
        } else {
            let denom = (count - 1) as f64;
            m2.mapv_inplace(|s| s / denom);
        }
        GroupStatistics {
            count,
            mean,
            variance: m2,
        }
    }
}

/// 一个实验组逐体素的样本数、均值和（Bessel 校正的）样本方差。
///
/// 只能由[`MomentAccumulator::finalize`]构造，之后不再可变。
#[derive(Clone, Debug)]
pub struct GroupStatistics {
    count: u64,
    mean: ArrayD<f64>,
    variance: ArrayD<f64>,
}

impl GroupStatistics {
    #[inline]
    pub fn count(&self) -> u64 {
        self.count
    }

    #[inline]
    pub fn shape(&self) -> &[usize] {
        self.mean.shape()
    }

    #[inline]
    pub fn mean(&self) -> ArrayViewD<'_, f64> {
        self.mean.view()
    }

    #[inline]
    pub fn variance(&self) -> ArrayViewD<'_, f64> {
        self.variance.view()
    }

    /// 取出均值数组，丢弃方差。
    #[inline]
    pub fn into_mean(self) -> ArrayD<f64> {
        self.mean
    }
}
