use clap::{Parser, Subcommand};
use simple_logger::SimpleLogger;
use voxstat::stats::Reduction;

#[derive(Parser, Debug)]
#[command(name = "voxcmp")]
#[command(about = "体素级两组比较工具集：t检验、体素均值/最大值、密度图。")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// 输出调试日志。
    #[arg(long, short, global = true)]
    verbose: bool,
    /// 子命令。
    #[command(subcommand)]
    command: Commands,
}

impl Cli {
    /// 初始化日志。重复初始化时忽略。
    pub fn init_logger(&self) {
        let level = if self.verbose {
            log::LevelFilter::Debug
        } else {
            log::LevelFilter::Info
        };
        let _ = SimpleLogger::new().with_level(level).init();
    }

    pub fn run_program(&mut self) -> voxstat::Result<()> {
        match self.command {
            Commands::Compare(ref mut v) => v.run(),
            Commands::VoxelMean(ref mut v) => v.run(Reduction::Mean),
            Commands::VoxelMax(ref mut v) => v.run(Reduction::Max),
            Commands::DensityMap(ref mut v) => v.run(),
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// 对两个目录中的体数据逐体素做双样本t检验，并做FDR校正。
    Compare(crate::subcmd_impls::compare::Compare),
    /// 计算目录中所有体数据的逐体素均值。
    VoxelMean(crate::subcmd_impls::voxel_reduce::VoxelReduce),
    /// 计算目录中所有体数据的逐体素最大值。
    VoxelMax(crate::subcmd_impls::voxel_reduce::VoxelReduce),
    /// 对目录中的每个体数据做阈值分割和高斯滤波，生成密度图。
    DensityMap(crate::subcmd_impls::density_map::DensityMap),
}
