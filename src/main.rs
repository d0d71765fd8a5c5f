use anyhow::Result;
use clap::Parser;
use faultline::cli::{AppContext, Cli, Commands};
use faultline::core::Mode;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

fn main() -> Result<()> {
    let cli = Cli::parse();

    // RUST_LOG wins; otherwise -v/-vv raise the default warn level
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(match cli.verbose {
            0 => "warn",
            1 => "debug",
            _ => "trace",
        })
    });
    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_ansi(!cli.no_color),
        )
        .with(filter)
        .init();

    // Build a context once, pass everywhere
    let ctx = AppContext {
        quiet: cli.quiet,
        no_color: cli.no_color,
        dry_run: cli.dry_run,
    };
    let config = cli.config.as_deref();

    match cli.command {
        Commands::Catalog(args) => faultline::batch_run(args, Mode::Catalog, config, &ctx),
        Commands::Attach(args) => faultline::batch_run(args, Mode::Attach, config, &ctx),
        Commands::Run(args) => faultline::batch_run(args, Mode::Run, config, &ctx),
        Commands::Resolve(args) => faultline::resolve_run(args, &ctx),
        Commands::Init(args) => faultline::infra::config::init(args, &ctx),
        Commands::Completions(args) => faultline::completion::run(args, &ctx),
    }
}
