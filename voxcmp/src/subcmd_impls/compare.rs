use super::utils::OutputFormat;
use clap::Args;
use std::path::PathBuf;
use voxstat::prelude::{compare, CompareConfig, GroupSpec, Reporter, VarianceModel};

#[derive(Args, Debug)]
pub struct Compare {
    /// 第一组体数据所在目录。
    folder1: PathBuf,
    /// 第二组体数据所在目录。
    folder2: PathBuf,
    /// 参与比较的文件名后缀。
    #[arg(long, default_value = "_density_map.nrrd")]
    suffix: String,
    /// FDR校正的显著性水平。
    #[arg(long, default_value_t = CompareConfig::DEFAULT_ALPHA, value_parser = super::utils::alpha_in_unit_interval)]
    alpha: f64,
    /// 输出文件名前缀。
    #[arg(long, short, default_value = "voxel_ttest_results")]
    output: String,
    /// 假设两组方差相等（默认使用Welch检验）。
    #[arg(long)]
    pooled: bool,
    /// 结果体数据的格式。
    #[arg(long, value_enum, default_value_t = OutputFormat::Nrrd)]
    format: OutputFormat,
    /// 不生成投影图。
    #[arg(long = "no-png")]
    no_png: bool,
}

impl Compare {
    pub fn run(&mut self) -> voxstat::Result<()> {
        let config = CompareConfig {
            group1: GroupSpec::new(self.folder1.as_path(), self.suffix.as_str()),
            group2: GroupSpec::new(self.folder2.as_path(), self.suffix.as_str()),
            alpha: self.alpha,
            variance: if self.pooled {
                VarianceModel::Pooled
            } else {
                VarianceModel::Welch
            },
        };
        let c = compare(config)?;

        let outcome = Reporter::new(self.output.as_str(), self.format.into())
            .with_png(!self.no_png)
            .write(&c);
        if !outcome.is_complete() {
            log::warn!(
                "{}个输出文件写入失败，统计结果不受影响",
                outcome.failures.len()
            );
        }

        println!("第一组: {}个文件 ({})", c.n1, self.folder1.display());
        println!("第二组: {}个文件 ({})", c.n2, self.folder2.display());
        println!(
            "共{}个体素，其中{}个 ({:.2}%) 在alpha={}下显著，FDR阈值 = {:e}",
            c.voxel_count(),
            c.significant_count(),
            c.significant_percentage(),
            self.alpha,
            c.fdr.threshold
        );
        Ok(())
    }
}
