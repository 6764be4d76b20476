//! 两组体数据的完整比较流程：并行聚合、t检验、FDR 校正。

use crate::error::{Error, Result};
use crate::stats::{aggregate, benjamini_hochberg, t_test, AggregatedGroup, FdrOutcome, GroupSpec};
use crate::stats::{TStatMap, VarianceModel};
use crate::timer::AccTimer;
use std::sync::mpsc::channel;
use threadpool::ThreadPool;

/// 一次比较的全部配置。
#[derive(Clone, Debug)]
pub struct CompareConfig {
    pub group1: GroupSpec,
    pub group2: GroupSpec,
    /// FDR 显著性水平，在`(0, 1)`内。
    pub alpha: f64,
    pub variance: VarianceModel,
}

impl CompareConfig {
    pub const DEFAULT_ALPHA: f64 = 0.05;

    /// 以默认的显著性水平和 Welch 检验创建配置。
    pub fn new(group1: GroupSpec, group2: GroupSpec) -> Self {
        Self {
            group1,
            group2,
            alpha: Self::DEFAULT_ALPHA,
            variance: VarianceModel::default(),
        }
    }
}

/// 比较结果。
#[derive(Clone, Debug)]
pub struct Comparison {
    pub config: CompareConfig,
    pub n1: u64,
    pub n2: u64,
    /// 第一组第一个文件的体素间距。
    pub spacing: Option<Vec<f64>>,
    pub tmap: TStatMap,
    pub fdr: FdrOutcome,
}

impl Comparison {
    #[inline]
    pub fn voxel_count(&self) -> usize {
        self.tmap.len()
    }

    #[inline]
    pub fn significant_count(&self) -> usize {
        self.fdr.rejected_count()
    }

    /// 显著体素所占百分比。
    pub fn significant_percentage(&self) -> f64 {
        match self.voxel_count() {
            0 => 0.0,
            n => self.significant_count() as f64 / n as f64 * 100.0,
        }
    }
}

/// 运行比较流程。任何输入错误都会在写出结果之前返回。
pub fn compare(config: CompareConfig) -> Result<Comparison> {
    if !(config.alpha > 0.0 && config.alpha < 1.0) {
        return Err(Error::InvalidAlpha(config.alpha));
    }

    let mut timer = AccTimer::new("aggregate");
    let (g1, g2) = aggregate_both(&config.group1, &config.group2)?;
    timer.finish();
    log::info!(
        "第一组`{}`: {}个样本；第二组`{}`: {}个样本",
        config.group1.dir.display(),
        g1.stats.count(),
        config.group2.dir.display(),
        g2.stats.count()
    );

    let mut timer = AccTimer::new("t-test");
    let tmap = t_test(&g1.stats, &g2.stats, config.variance)?;
    timer.finish();

    let mut timer = AccTimer::new("fdr");
    let fdr = benjamini_hochberg(tmap.p.view(), config.alpha)?;
    timer.finish();

    let comparison = Comparison {
        n1: g1.stats.count(),
        n2: g2.stats.count(),
        spacing: g1.spacing,
        tmap,
        fdr,
        config,
    };
    log::info!(
        "显著体素: {}/{} ({:.4}%)，FDR阈值 = {:e}",
        comparison.significant_count(),
        comparison.voxel_count(),
        comparison.significant_percentage(),
        comparison.fdr.threshold
    );
    Ok(comparison)
}

/// 在两个工作线程上分别聚合两组，各自持有自己的累加器。单核时顺序执行。
fn aggregate_both(a: &GroupSpec, b: &GroupSpec) -> Result<(AggregatedGroup, AggregatedGroup)> {
    if num_cpus::get() == 1 {
        return Ok((aggregate(a)?, aggregate(b)?));
    }

    let pool = ThreadPool::new(2);
    let (tx, rx) = channel();
    for (index, spec) in [a.clone(), b.clone()].into_iter().enumerate() {
        let tx = tx.clone();
        pool.execute(move || {
            // 接收端只会在本函数返回后关闭
            let _ = tx.send((index, aggregate(&spec)));
        });
    }
    drop(tx);

    let mut results = [None, None];
    for (index, r) in rx.iter() {
        results[index] = Some(r);
    }
    let [r1, r2] = results;
    let g1 = r1.ok_or_else(|| Error::WorkerLost(a.dir.display().to_string()))??;
    let g2 = r2.ok_or_else(|| Error::WorkerLost(b.dir.display().to_string()))??;
    Ok((g1, g2))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array3;
    use std::path::Path;

    fn write_group(dir: &Path, values: &[f32], shape: (usize, usize, usize)) {
        for (i, &v) in values.iter().enumerate() {
            let a = Array3::<f32>::from_elem(shape, v);
            ndarray_npy::write_npy(dir.join(format!("s{i}_density_map.npy")), &a).unwrap();
        }
    }

    fn config(a: &Path, b: &Path) -> CompareConfig {
        CompareConfig::new(
            GroupSpec::new(a, "_density_map.npy"),
            GroupSpec::new(b, "_density_map.npy"),
        )
    }

    #[test]
    fn test_ten_versus_zero_is_significant_everywhere() {
        let (a, b) = (tempfile::tempdir().unwrap(), tempfile::tempdir().unwrap());
        write_group(a.path(), &[10.0; 3], (4, 4, 4));
        write_group(b.path(), &[0.0; 3], (4, 4, 4));

        let c = compare(config(a.path(), b.path())).unwrap();
        assert_eq!((c.n1, c.n2), (3, 3));
        assert!(c.tmap.t.iter().all(|&t| t.is_finite() && t > 0.0));
        assert!(c.tmap.p.iter().all(|&p| p < 1e-12));
        assert!(c.fdr.rejected.iter().all(|&r| r));
        assert_eq!(c.significant_count(), 64);
        assert_eq!(c.significant_percentage(), 100.0);
    }

    #[test]
    fn test_identical_constant_groups() {
        let (a, b) = (tempfile::tempdir().unwrap(), tempfile::tempdir().unwrap());
        write_group(a.path(), &[5.0; 3], (4, 4, 4));
        write_group(b.path(), &[5.0; 3], (4, 4, 4));

        let c = compare(config(a.path(), b.path())).unwrap();
        assert!(c.tmap.t.iter().all(|&t| t == 0.0));
        assert!(c.tmap.p.iter().all(|&p| p == 1.0));
        assert!(c.fdr.rejected.iter().all(|&r| !r));
        assert_eq!(c.fdr.threshold, 0.0);
    }

    #[test]
    fn test_mismatch_between_groups() {
        let (a, b) = (tempfile::tempdir().unwrap(), tempfile::tempdir().unwrap());
        write_group(a.path(), &[1.0, 2.0], (4, 4, 4));
        write_group(b.path(), &[1.0, 2.0], (4, 4, 2));
        assert!(matches!(
            compare(config(a.path(), b.path())),
            Err(Error::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn test_invalid_alpha_fails_before_reading() {
        let mut cfg = config(Path::new("/nonexistent/a"), Path::new("/nonexistent/b"));
        cfg.alpha = 1.5;
        assert!(matches!(compare(cfg), Err(Error::InvalidAlpha(_))));
    }

    #[test]
    fn test_empty_group_is_reported() {
        let (a, b) = (tempfile::tempdir().unwrap(), tempfile::tempdir().unwrap());
        write_group(a.path(), &[1.0, 2.0], (2, 2, 2));
        assert!(matches!(
            compare(config(a.path(), b.path())),
            Err(Error::EmptyGroup { .. })
        ));
    }
}
