//! 运行时错误。

use std::path::PathBuf;
use thiserror::Error;

/// 本 crate 的统一返回类型。
pub type Result<T> = std::result::Result<T, Error>;

/// 体素统计流程中可能出现的全部错误。
#[derive(Error, Debug)]
pub enum Error {
    /// 目录下没有任何文件匹配给定后缀。
    #[error("目录`{}`中没有后缀为`{suffix}`的文件", .dir.display())]
    EmptyGroup { dir: PathBuf, suffix: String },

    /// 给定路径不是目录。
    #[error("`{}`不是目录", .0.display())]
    NotADirectory(PathBuf),

    /// 体素数组形状不一致。`origin`描述出错的数据来源（通常是文件路径）。
    #[error("`{origin}`的形状为{found:?}，与期望的形状{expected:?}不一致")]
    ShapeMismatch {
        origin: String,
        expected: Vec<usize>,
        found: Vec<usize>,
    },

    /// t检验中某一组的样本数不足两个，方差无定义。
    #[error("每组至少需要2个样本才能做t检验，但只有{count}个")]
    TooFewSamples { count: u64 },

    /// 显著性水平不在(0, 1)内。
    #[error("显著性水平必须在(0, 1)之间，但得到`{0}`")]
    InvalidAlpha(f64),

    /// 投影轴越界。
    #[error("投影轴{axis}越界（数组维数为{ndim}）")]
    InvalidAxis { axis: usize, ndim: usize },

    /// 体素尺寸的个数与数组维数不一致，或者包含非正数。
    #[error("体素尺寸{voxel_size:?}不适用于{ndim}维数组")]
    InvalidVoxelSize { voxel_size: Vec<f64>, ndim: usize },

    /// 无法根据扩展名判断文件格式。
    #[error("不支持的体数据格式: `{}`", .0.display())]
    UnsupportedFormat(PathBuf),

    /// NRRD 文件头或数据损坏。
    #[error("NRRD文件`{}`解析失败: {reason}", .path.display())]
    Nrrd { path: PathBuf, reason: String },

    /// 批处理中部分文件失败。
    #[error("{total}个文件中有{failed}个处理失败")]
    BatchFailed { failed: usize, total: usize },

    /// 工作线程在返回结果前退出（通常是 panic）。
    #[error("工作线程`{0}`未返回结果")]
    WorkerLost(String),

    #[error("数组维数不符: {0}")]
    Shape(#[from] ndarray::ShapeError),

    #[error("读取npy失败: {0}")]
    NpyRead(#[from] ndarray_npy::ReadNpyError),

    #[error("写入npy失败: {0}")]
    NpyWrite(#[from] ndarray_npy::WriteNpyError),

    #[error("nifti读写失败: {0}")]
    Nifti(#[from] nifti::NiftiError),

    #[error("图像写入失败: {0}")]
    Image(#[from] image::ImageError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Error {
    /// 以文件路径作为数据来源构造形状不一致错误。
    pub fn shape_mismatch<P: Into<PathBuf>>(path: P, expected: &[usize], found: &[usize]) -> Self {
        Error::ShapeMismatch {
            origin: path.into().display().to_string(),
            expected: expected.to_vec(),
            found: found.to_vec(),
        }
    }
}
