mod app;
mod cli;

use clap::Parser;
use cli::{Cli, Command, ConfigArgs, RunArgs};
use reqlog_core::config::Config;

fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let command = cli.command.unwrap_or(Command::Run(RunArgs::default()));

    match command {
        Command::Run(args) => cmd_run(args),
        Command::CheckConfig(args) => cmd_check_config(args),
    }
}

fn cmd_run(args: RunArgs) -> anyhow::Result<()> {
    // Peek at config for logging settings; a broken file is reported after init
    let (to_file, log_dir) = Config::load(&args.config)
        .map(|c| (c.logging_to_file, c.log_dir))
        .unwrap_or((false, None));
    let _guard =
        reqlog_core::lifecycle::logging::init_logging(&args.log_level, to_file, log_dir.as_deref());

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    runtime.block_on(async {
        let application = app::Application::build(&args)?;
        application.serve().await
    })
}

fn cmd_check_config(args: ConfigArgs) -> anyhow::Result<()> {
    let config = Config::load(&args.config)?;
    println!("{}: OK", args.config);
    println!(
        "  listen {}:{}, request capture {}, {} api user(s)",
        config.host,
        config.port,
        if config.request_log.enabled {
            "enabled"
        } else {
            "disabled"
        },
        config.api_users.len(),
    );
    Ok(())
}
