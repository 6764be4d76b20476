use clap::Args;
use std::path::PathBuf;
use voxstat::prelude::{generate_batch, DensityParams, GroupSpec, DEFAULT_VOXEL_SIZE};

#[derive(Args, Debug)]
pub struct DensityMap {
    /// 原始体数据所在目录。
    folder: PathBuf,
    /// 参与处理的文件名后缀。
    #[arg(long, default_value = ".nrrd")]
    suffix: String,
    /// 高斯核标准差（微米）。
    #[arg(long, default_value_t = 2.5, value_parser = super::utils::positive_f64)]
    sigma: f64,
    /// 每轴的体素尺寸（微米/体素），逗号分隔。默认`0.2,0.2,0.5`。
    #[arg(long = "voxel-size", value_delimiter = ',', value_parser = super::utils::positive_f64)]
    voxel_size: Option<Vec<f64>>,
    /// 使用文件中记录的体素间距（文件没有记录时回退到默认体素尺寸）。与`--voxel-size`互斥。
    #[arg(long = "file-spacing", conflicts_with = "voxel_size")]
    file_spacing: bool,
    /// 低阈值与Otsu阈值之比。
    #[arg(long = "low-ratio", default_value_t = 0.3, value_parser = super::utils::positive_f64)]
    low_ratio: f64,
    /// 高阈值与Otsu阈值之比。
    #[arg(long = "high-ratio", default_value_t = 0.8, value_parser = super::utils::positive_f64)]
    high_ratio: f64,
}

impl DensityMap {
    pub fn run(&mut self) -> voxstat::Result<()> {
        let voxel_size = match (self.voxel_size.take(), self.file_spacing) {
            (Some(v), _) => Some(v),
            (None, true) => None,
            (None, false) => Some(DEFAULT_VOXEL_SIZE.to_vec()),
        };
        let params = DensityParams {
            sigma: self.sigma,
            voxel_size,
            low_ratio: self.low_ratio,
            high_ratio: self.high_ratio,
        };
        let spec = GroupSpec::new(self.folder.as_path(), self.suffix.as_str());
        let outputs = generate_batch(&spec, &params)?;
        println!("已生成{}个密度图", outputs.len());
        Ok(())
    }
}
