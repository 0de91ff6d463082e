// CLI modules
mod cli;

use clap::{Parser, Subcommand};
use cli::{args::Args, op::Op, Init, Publish, Version};

command_enum! {
    (Publish, Publish),
    (Init, Init),
    (Version, Version),
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    let guard = tinyhost_cli::process::init_logging(args.log_level);

    let ctx = cli::op::OpContext::new(args.config_path);

    let code = match args.command.execute(&ctx).await {
        Ok(output) => {
            println!("{}", output);
            0
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            1
        }
    };

    // Flush buffered log lines before exiting
    drop(guard);
    std::process::exit(code);
}
