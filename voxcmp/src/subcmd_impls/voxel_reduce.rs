use super::utils::{clean_suffix, ReduceFormat};
use clap::Args;
use std::path::PathBuf;
use voxstat::prelude::{reduce, write_volume, GroupSpec, Reduction};

#[derive(Args, Debug)]
pub struct VoxelReduce {
    /// 体数据所在目录。
    folder: PathBuf,
    /// 参与计算的文件名后缀。
    #[arg(long, default_value = "_binary.nrrd")]
    suffix: String,
    /// 输出文件路径（格式由扩展名决定）。默认为目录下的`<目录名>_voxel_<mean|max>_<后缀>.<格式>`。
    #[arg(long, short)]
    output: Option<PathBuf>,
    /// 未指定`--output`时的输出格式。
    #[arg(long = "output-format", value_enum, default_value_t = ReduceFormat::Nrrd)]
    output_format: ReduceFormat,
}

impl VoxelReduce {
    pub fn run(&mut self, how: Reduction) -> voxstat::Result<()> {
        let spec = GroupSpec::new(self.folder.as_path(), self.suffix.as_str());
        let reduced = reduce(&spec, how)?;

        let output = match self.output {
            Some(ref p) => p.clone(),
            None => self.default_output(&spec, how),
        };
        write_volume(
            &output,
            reduced.data.mapv(|v| v as f32).view(),
            reduced.spacing.as_deref(),
        )?;
        println!(
            "已将{}个文件的{}写入`{}`",
            reduced.count,
            how.label(),
            output.display()
        );
        Ok(())
    }

    fn default_output(&self, spec: &GroupSpec, how: Reduction) -> PathBuf {
        self.folder.join(format!(
            "{}_{}_{}.{}",
            spec.dir_name(),
            how.label(),
            clean_suffix(self.suffix.as_str()),
            self.output_format.extension()
        ))
    }
}
