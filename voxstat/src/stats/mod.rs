//! 逐体素统计：在线矩累加、组聚合、双样本t检验和 FDR 校正。

pub mod fdr;
pub mod group;
pub mod reduce;
pub mod ttest;
pub mod welford;

pub use fdr::{benjamini_hochberg, FdrOutcome};
pub use group::{aggregate, AggregatedGroup, GroupSpec};
pub use reduce::{reduce, Reduced, Reduction};
pub use ttest::{t_test, two_tailed_p, TStatMap, VarianceModel};
pub use welford::{GroupStatistics, MomentAccumulator};
