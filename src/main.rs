use clap::Parser;
use gmail_archive::app::run;
use gmail_archive::cli::{
    handle_token_clear, report_config_error, report_unauthorized_client, Cli,
};
use gmail_archive::config::Settings;
use gmail_archive::gmail_api::ConsolePrompt;
use gmail_archive::Error;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let settings = Settings::from_cli(&cli);

    if cli.clear_token {
        handle_token_clear(&settings).await?;
        return Ok(());
    }

    println!(
        "Using credentials file: {}",
        settings.credentials_path.display()
    );

    match run(&settings, &ConsolePrompt).await {
        Ok(report) => {
            println!(
                "Done: {} saved, {} skipped, {} failed.",
                report.saved.len(),
                report.skipped.len(),
                report.failed.len()
            );
            Ok(())
        }
        Err(Error::Config(e)) => {
            report_config_error(&e);
            std::process::exit(1);
        }
        Err(e) if e.is_unauthorized_client() => {
            tracing::debug!(error = %e, "unauthorized_client");
            report_unauthorized_client(&settings);
            std::process::exit(1);
        }
        Err(e) => Err(e.into()),
    }
}
