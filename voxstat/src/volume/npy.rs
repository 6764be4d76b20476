use crate::error::Result;
use ndarray::{ArrayD, ArrayViewD};
use ndarray_npy::{ReadNpyError, WritableElement};
use std::path::Path;

/// 依次尝试几种常见的元素类型，直到与文件中的`descr`相符。
macro_rules! try_read_as {
    ($path: expr, $($t: ty),+) => {
        $(
            match ndarray_npy::read_npy::<_, ArrayD<$t>>($path) {
                Ok(a) => return Ok(a.mapv(|v| v as f64)),
                Err(ReadNpyError::WrongDescriptor(_)) => {}
                Err(e) => return Err(e.into()),
            }
        )+
    };
}

/// 读取任意数值类型的 npy 文件，并统一转换为`f64`。
pub fn read<P: AsRef<Path>>(path: P) -> Result<ArrayD<f64>> {
    let path = path.as_ref();
    match ndarray_npy::read_npy::<_, ArrayD<f64>>(path) {
        Ok(a) => return Ok(a),
        Err(ReadNpyError::WrongDescriptor(_)) => {}
        Err(e) => return Err(e.into()),
    }
    try_read_as!(path, f32, u8, i8, u16, i16, u32, i32, u64, i64);
    let bools: ArrayD<bool> = ndarray_npy::read_npy(path)?;
    Ok(bools.mapv(|b| if b { 1.0 } else { 0.0 }))
}

#[inline]
pub fn write<A: WritableElement, P: AsRef<Path>>(path: P, data: ArrayViewD<'_, A>) -> Result<()> {
    ndarray_npy::write_npy(path, &data)?;
    Ok(())
}
