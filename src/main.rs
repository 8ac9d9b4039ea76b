use std::io::{self, Write};

use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;
use env_logger::Env;
use log::debug;

use plato_timesheets::auth::{AuthOutcome, Authenticator, Credentials};
use plato_timesheets::browser::Session;
use plato_timesheets::cli::{Args, Command};
use plato_timesheets::config::RunConfig;
use plato_timesheets::workflows;

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    env_logger::Builder::from_env(Env::default().default_filter_or(args.log_filter())).init();

    if args.test_mode {
        println!(
            "\n{}\n",
            "RUNNING IN TEST MODE. No changes will be applied.".yellow().bold()
        );
    }

    let credentials = resolve_credentials(&args)?;
    let config = RunConfig::resolve(&args);
    debug!("Resolved configuration: {config:?}");

    let mut session = Session::open(&config)
        .await
        .context("Failed to open browser session")?;

    // The session is released on every exit path from here on; close() is
    // idempotent and Drop reaps the driver process if run() panics.
    let result = run(&session, &config, &credentials, args.command).await;
    session.close().await;
    result
}

async fn run(
    session: &Session,
    config: &RunConfig,
    credentials: &Credentials,
    command: Command,
) -> Result<()> {
    println!("Waiting for Duo 2FA...");
    let outcome = Authenticator::from_config(config)
        .login(session, credentials)
        .await
        .context("Authentication failed")?;
    match outcome {
        AuthOutcome::Authenticated => debug!("Authenticated against the identity provider"),
        AuthOutcome::NotChallenged => debug!("No login form presented; proceeding directly"),
    }

    let outcomes = match command {
        Command::Submit => workflows::submit(session, config.test_mode).await?,
        Command::Approve => workflows::approve(session, config.test_mode).await?,
    };
    workflows::print_summary(&outcomes);
    Ok(())
}

fn resolve_credentials(args: &Args) -> Result<Credentials> {
    let netid = match &args.username {
        Some(username) => username.clone(),
        None => prompt("NetID: ")?,
    };
    let password = match &args.password {
        Some(password) => password.clone(),
        None => rpassword::prompt_password("Password: ").context("Failed to read password")?,
    };
    Ok(Credentials { netid, password })
}

fn prompt(label: &str) -> Result<String> {
    print!("{label}");
    io::stdout().flush()?;
    let mut line = String::new();
    io::stdin()
        .read_line(&mut line)
        .context("Failed to read NetID")?;
    Ok(line.trim().to_string())
}
