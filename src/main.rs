use anyhow::Result;
use clap::Parser;
use std::time::Duration;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use mailtidy::cli::{Cli, Commands};
use mailtidy::doctor::{DoctorOptions, prompt::LinePrompter};
use mailtidy::gmail::GmailClient;
use mailtidy::store::Store;

fn init_tracing(verbose: bool) {
    let default = if verbose { "mailtidy=debug" } else { "warn" };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| default.into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let root = cli.data.clone().unwrap_or_else(mailtidy::resolve::root_dir);
    let store = Store::new(&root);
    let config = mailtidy::app_config::load(&root)?;
    let token = mailtidy::app_config::resolve_access_token(&config.gmail)?;
    let client = GmailClient::new(
        &config.gmail.api_base,
        &token,
        Duration::from_secs(config.gmail.timeout_secs),
    );

    match cli.command {
        Commands::Fetch { target } => mailtidy::fetch::run(&client, &store, target),
        Commands::Labels { all } => mailtidy::labels::run(&client, all),
        Commands::Doctor {
            since_hours,
            yes,
            no_fetch,
        } => {
            let options = DoctorOptions {
                since_hours: since_hours.unwrap_or(config.doctor.lookback_hours),
                yes,
                fetch: !no_fetch,
            };
            let mut prompter = LinePrompter::stdio();
            mailtidy::doctor::run(&client, &store, &mut prompter, &options).map(|_| ())
        }
        Commands::Migrate { daily, no_refresh } => mailtidy::migration::run(
            &client,
            &store,
            config.retry.policy(),
            daily,
            !no_refresh,
        ),
    }
}
