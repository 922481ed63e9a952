#![deny(clippy::all)]

use clap::Parser;
use color_eyre::{eyre::eyre, Result};
use morph_core::{CommandContext, GlobalOptions};

mod cli;
mod dispatch;
mod output;
mod style;

use cli::MorphCli;
use output::OutputOptions;

fn main() -> Result<()> {
    color_eyre::install()?;

    let cli = MorphCli::parse();
    init_tracing(cli.trace, cli.verbose);

    let global = GlobalOptions {
        json: cli.json,
        address: cli.at.clone(),
    };

    let ctx = CommandContext::new(&global).map_err(|err| eyre!("{err:?}"))?;
    let (info, outcome) = dispatch::dispatch_command(&ctx, &cli.command)?;
    let code = output::emit_output(
        OutputOptions {
            quiet: cli.quiet,
            json: cli.json,
            no_color: cli.no_color,
        },
        info,
        &outcome,
    )?;

    if code == 0 {
        Ok(())
    } else {
        std::process::exit(code);
    }
}

fn init_tracing(trace: bool, verbose: u8) {
    let level = if trace {
        "trace"
    } else {
        match verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };

    let filter = format!("morph={level},morph_core={level},morph_cli={level}");
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_level(true)
        .finish();

    let _ = tracing::subscriber::set_global_default(subscriber);
}
