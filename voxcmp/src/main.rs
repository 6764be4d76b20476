use clap::Parser;
use voxcmp::Cli;

fn main() {
    let mut cmd: Cli = Cli::parse();
    cmd.init_logger();
    if let Err(e) = cmd.run_program() {
        log::error!("{e}");
        eprintln!("错误: {e}");
        std::process::exit(1);
    }
}
