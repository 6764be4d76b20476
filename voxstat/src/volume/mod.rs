//! 体数据文件的读写。
//!
//! 文件格式由扩展名决定：`.npy`、`.nrrd`、`.nii`、`.nii.gz`。读入的数据统一为`f64`，
//! 写出支持`f32`和`u8`。体素间距随数据保留，但不参与统计计算。

pub mod nii;
pub mod npy;
pub mod nrrd;

use crate::error::{Error, Result};
use ndarray::{ArrayD, ArrayViewD};
use nifti::writer::WriterOptions;
use nifti::NiftiHeader;
use std::path::Path;

/// 体数据文件格式。
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum VolumeFormat {
    Npy,
    Nrrd,
    Nifti,
}

impl VolumeFormat {
    /// 根据文件名判断格式。
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let name = path
            .file_name()
            .and_then(|s| s.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();
        if name.ends_with(".npy") {
            Ok(VolumeFormat::Npy)
        } else if name.ends_with(".nrrd") {
            Ok(VolumeFormat::Nrrd)
        } else if name.ends_with(".nii") || name.ends_with(".nii.gz") {
            Ok(VolumeFormat::Nifti)
        } else {
            Err(Error::UnsupportedFormat(path.to_owned()))
        }
    }

    /// 该格式输出文件的扩展名（不含`.`）。
    #[inline]
    pub fn extension(self) -> &'static str {
        match self {
            VolumeFormat::Npy => "npy",
            VolumeFormat::Nrrd => "nrrd",
            VolumeFormat::Nifti => "nii",
        }
    }
}

/// 可写出的体素元素类型。
pub trait VoxelElement: Copy + ndarray_npy::WritableElement + 'static {
    /// NRRD 文件头中的`type`字段。
    const NRRD_TYPE: &'static str;

    /// 以小端序追加到`buf`末尾。
    fn extend_le_bytes(self, buf: &mut Vec<u8>);

    /// 以`header`为参考写出 nifti 文件。
    fn write_nifti(path: &Path, data: ArrayViewD<'_, Self>, header: &NiftiHeader)
        -> nifti::Result<()>;
}

macro_rules! impl_voxel_element {
    ($t: ty, $name: expr) => {
        impl VoxelElement for $t {
            const NRRD_TYPE: &'static str = $name;

            #[inline]
            fn extend_le_bytes(self, buf: &mut Vec<u8>) {
                buf.extend_from_slice(&self.to_le_bytes());
            }

            fn write_nifti(
                path: &Path,
                data: ArrayViewD<'_, Self>,
                header: &NiftiHeader,
            ) -> nifti::Result<()> {
                WriterOptions::new(path)
                    .reference_header(header)
                    .write_nifti(&data)
            }
        }
    };
}

impl_voxel_element!(f32, "float");
impl_voxel_element!(u8, "uint8");

/// 一个体数据：N 维强度数组及其可选的体素间距。
#[derive(Clone, Debug)]
pub struct Volume {
    data: ArrayD<f64>,
    spacing: Option<Vec<f64>>,
}

impl Volume {
    #[inline]
    pub fn new(data: ArrayD<f64>, spacing: Option<Vec<f64>>) -> Self {
        Self { data, spacing }
    }

    /// 按扩展名读取`path`处的体数据文件。
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let (data, spacing) = match VolumeFormat::from_path(path)? {
            VolumeFormat::Npy => (npy::read(path)?, None),
            VolumeFormat::Nrrd => nrrd::read(path)?,
            VolumeFormat::Nifti => nii::read(path)?,
        };
        Ok(Self { data, spacing })
    }

    #[inline]
    pub fn shape(&self) -> &[usize] {
        self.data.shape()
    }

    #[inline]
    pub fn data(&self) -> ArrayViewD<'_, f64> {
        self.data.view()
    }

    #[inline]
    pub fn spacing(&self) -> Option<&[f64]> {
        self.spacing.as_deref()
    }

    #[inline]
    pub fn into_parts(self) -> (ArrayD<f64>, Option<Vec<f64>>) {
        (self.data, self.spacing)
    }
}

/// 按扩展名将`data`写入`path`。npy 格式不保存体素间距。
pub fn write_volume<A: VoxelElement, P: AsRef<Path>>(
    path: P,
    data: ArrayViewD<'_, A>,
    spacing: Option<&[f64]>,
) -> Result<()> {
    let path = path.as_ref();
    match VolumeFormat::from_path(path)? {
        VolumeFormat::Npy => npy::write(path, data),
        VolumeFormat::Nrrd => nrrd::write(path, data, spacing),
        VolumeFormat::Nifti => {
            A::write_nifti(path, data, &nii::reference_header(spacing))?;
            Ok(())
        }
    }
}
