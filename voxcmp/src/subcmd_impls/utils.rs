use clap::ValueEnum;
use voxstat::volume::VolumeFormat;

/// 结果体数据的输出格式。
#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
pub enum OutputFormat {
    Nrrd,
    Npy,
    Nii,
}

impl From<OutputFormat> for VolumeFormat {
    fn from(f: OutputFormat) -> Self {
        match f {
            OutputFormat::Nrrd => VolumeFormat::Nrrd,
            OutputFormat::Npy => VolumeFormat::Npy,
            OutputFormat::Nii => VolumeFormat::Nifti,
        }
    }
}

/// 体素归约结果的输出格式。
#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
pub enum ReduceFormat {
    Nrrd,
    Npy,
}

impl ReduceFormat {
    #[inline]
    pub fn extension(self) -> &'static str {
        match self {
            ReduceFormat::Nrrd => "nrrd",
            ReduceFormat::Npy => "npy",
        }
    }
}

pub fn alpha_in_unit_interval(s: &str) -> Result<f64, &'static str> {
    const ERR: &str = "显著性水平必须是(0, 1)之间的数";
    let v: f64 = s.trim().parse().map_err(|_| ERR)?;
    if v > 0.0 && v < 1.0 {
        Ok(v)
    } else {
        Err(ERR)
    }
}

pub fn positive_f64(s: &str) -> Result<f64, &'static str> {
    const ERR: &str = "必须是正数";
    let v: f64 = s.trim().parse().map_err(|_| ERR)?;
    if v > 0.0 && v.is_finite() {
        Ok(v)
    } else {
        Err(ERR)
    }
}

/// 去掉开头的`.`，用于构造默认输出文件名。
pub fn clean_suffix(suffix: &str) -> &str {
    suffix.strip_prefix('.').unwrap_or(suffix)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_alpha_parser() {
        assert_eq!(alpha_in_unit_interval("0.05"), Ok(0.05));
        assert!(alpha_in_unit_interval("0").is_err());
        assert!(alpha_in_unit_interval("1").is_err());
        assert!(alpha_in_unit_interval("abc").is_err());
    }

    #[test]
    fn test_positive_f64() {
        assert_eq!(positive_f64(" 0.2 "), Ok(0.2));
        assert!(positive_f64("0").is_err());
        assert!(positive_f64("-1").is_err());
        assert!(positive_f64("inf").is_err());
    }

    #[test]
    fn test_clean_suffix() {
        assert_eq!(clean_suffix(".nrrd"), "nrrd");
        assert_eq!(clean_suffix("_binary.nrrd"), "_binary.nrrd");
    }
}
