//! timehunt CLI entry point.

use std::io;
use std::process::ExitCode;

use chrono::Local;
use clap::Parser;

use timehunt_client::cli::{AuthProvider, Cli, Command, ConfigAction};
use timehunt_client::commands;
use timehunt_client::config::ClientConfig;
use timehunt_client::error::{ClientError, ClientResult};
use timehunt_core::init_tracing;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = init_tracing(cli.tracing_config()) {
        eprintln!("warning: could not initialize logging: {}", e);
    }

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> ClientResult<()> {
    let config_path = cli.config.clone().unwrap_or_else(ClientConfig::default_path);
    let config = ClientConfig::resolve(cli.config.as_deref()).map_err(ClientError::Config)?;
    let calendar_id = cli.calendar_id.as_deref();

    match cli.command {
        #[cfg(feature = "google")]
        Command::List { name } => {
            use timehunt_core::DayFormatter;

            let provider = open_google(&config, calendar_id)?;
            let formatter = DayFormatter::new(config.display.to_display_options()?, Local);
            commands::list::run(
                &name,
                &provider,
                &provider,
                config.fix.reauth_policy(),
                &formatter,
                &Local,
                config.display.event_count_notice,
                &mut io::stdout(),
            )
            .await
        }
        #[cfg(feature = "google")]
        Command::Fix {
            range,
            after,
            before,
        } => {
            use timehunt_client::commands::fix::{FixOutcome, FixRequest, Fixer};
            use timehunt_client::prompt::StdinPrompt;

            let provider = open_google(&config, calendar_id)?;
            let mut prompt = StdinPrompt::stdin();
            let request = FixRequest {
                range,
                after,
                before,
            };

            let outcome = Fixer::new(
                &provider,
                &provider,
                &mut prompt,
                config.display.to_display_options()?,
                Local,
            )
            .with_policy(config.fix.reauth_policy())
            .run(&request, &mut io::stdout())
            .await?;

            match outcome {
                FixOutcome::Replaced { deleted, created } => {
                    println!("Removed {} events and added \"{}\".", deleted, created.name);
                }
                FixOutcome::Aborted => println!("Nothing changed."),
                FixOutcome::NotFound { .. } => {}
            }
            Ok(())
        }
        #[cfg(not(feature = "google"))]
        Command::List { .. } | Command::Fix { .. } => Err(ClientError::Config(
            "timehunt was built without a calendar backend".to_string(),
        )),
        Command::Auth { provider } => match provider {
            #[cfg(feature = "google")]
            AuthProvider::Google {
                client_id,
                client_secret,
                credentials_file,
                force,
            } => {
                let args = commands::auth::GoogleAuthArgs {
                    client_id,
                    client_secret,
                    credentials_file,
                    force,
                };
                commands::auth::google(args, &config, &config_path, calendar_id).await
            }
        },
        Command::Config { action } => match action {
            ConfigAction::Dump => commands::config::dump(&config, &config_path),
            ConfigAction::Validate => commands::config::validate(&config),
            ConfigAction::Path => commands::config::path(&config_path),
        },
    }
}

#[cfg(feature = "google")]
fn open_google(
    config: &ClientConfig,
    calendar_id: Option<&str>,
) -> ClientResult<timehunt_providers::google::GoogleProvider> {
    let provider_config = config
        .google_settings()
        .to_provider_config(calendar_id)
        .map_err(ClientError::Config)?;
    Ok(timehunt_providers::google::GoogleProvider::new(provider_config)?)
}
