use std::process::ExitCode;

use anyhow::Context as _;
use clap::Parser as _;

#[tokio::main]
async fn main() -> ExitCode {
    if let Err(err) = try_main().await {
        eprintln!("{err:#}");
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}

async fn try_main() -> anyhow::Result<()> {
    wpmigrate::logging::init().context("init logging")?;

    let cli = wpmigrate::cli::Cli::parse();
    tracing::debug!(?cli, "parsed cli");

    match cli.command {
        wpmigrate::cli::Command::Migrate(args) => {
            wpmigrate::migrate::run(args).await.context("migrate")?;
        }
        wpmigrate::cli::Command::Convert(args) => {
            wpmigrate::convert::run(args).await.context("convert")?;
        }
        wpmigrate::cli::Command::CheckConnection(args) => {
            wpmigrate::check::run(args)
                .await
                .context("check connection")?;
        }
        wpmigrate::cli::Command::Dates {
            command: wpmigrate::cli::DatesCommand::Extract(args),
        } => {
            wpmigrate::dates::run_extract(args)
                .await
                .context("dates extract")?;
        }
        wpmigrate::cli::Command::Dates {
            command: wpmigrate::cli::DatesCommand::Backfill(args),
        } => {
            wpmigrate::dates::run_backfill(args)
                .await
                .context("dates backfill")?;
        }
    }

    Ok(())
}
