use crate::error::Result;
use ndarray::ArrayD;
use nifti::{IntoNdArray, NiftiHeader, NiftiObject, ReaderOptions};
use std::path::Path;

/// 读取 nii / nii.gz 文件。体素间距取自`pixdim[1..=dim[0]]`。
pub fn read<P: AsRef<Path>>(path: P) -> Result<(ArrayD<f64>, Option<Vec<f64>>)> {
    let obj = ReaderOptions::new().read_file(path.as_ref())?;
    let header = obj.header();
    let ndim = (header.dim[0] as usize).min(7);
    let spacing: Vec<f64> = header.pixdim[1..=ndim].iter().map(|&v| v as f64).collect();
    let data = obj.into_volume().into_ndarray::<f64>()?;
    let spacing = (spacing.len() == data.ndim()).then_some(spacing);
    Ok((data, spacing))
}

/// 写出时使用的参考 header，只携带体素间距。
pub fn reference_header(spacing: Option<&[f64]>) -> NiftiHeader {
    let mut header = NiftiHeader::default();
    if let Some(spacing) = spacing {
        for (dst, &src) in header.pixdim[1..].iter_mut().zip(spacing) {
            *dst = src as f32;
        }
    }
    header
}

#[cfg(test)]
mod tests {
    use crate::volume::{write_volume, Volume};
    use ndarray::Array3;

    #[test]
    fn test_nifti_write_then_read() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("t.nii.gz");
        let data = Array3::<f32>::from_shape_fn((5, 4, 3), |(x, y, z)| x as f32 - y as f32 * 0.5 + z as f32);
        write_volume(&path, data.view().into_dyn(), Some(&[0.2, 0.2, 0.5])).unwrap();

        let back = Volume::open(&path).unwrap();
        assert_eq!(back.shape(), &[5, 4, 3]);
        for ((x, y, z), v) in data.indexed_iter() {
            assert!((back.data()[[x, y, z]] - *v as f64).abs() < 1e-6);
        }
        let spacing = back.spacing().unwrap();
        assert!((spacing[2] - 0.5).abs() < 1e-6);
    }
}
