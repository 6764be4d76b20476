//! 体素级两组比较工具集：体数据读写、在线矩累加、t检验、FDR 校正、结果报告和密度图生成。

pub mod density;
pub mod error;
pub mod pipeline;
pub mod prelude;
pub mod report;
pub mod stats;
pub mod timer;
pub mod volume;

pub use error::{Error, Result};
