//! sessionkit - command-line harness for the session subsystem.
//!
//! Signs in against the configured identity provider, shows who is signed
//! in and clears the stored session. Credentials live in the OS keychain
//! (or in the cache directory with `--no-keychain`).

use std::io::{self, Write};
use std::sync::Arc;

use anyhow::{bail, Result};
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use sessionkit_core::auth::OtpChannel;
use sessionkit_core::{AppContext, Config, FileStore, KeyValueStore, KeyringStore, User};

const USAGE: &str = "\
Usage: sessionkit [--no-keychain] <command>

Commands:
  status                    Show whether a session is stored and valid
  whoami                    Fetch the signed-in user
  login <email>             Sign in with email and password
  login-phone <phone>       Send an OTP by SMS and sign in with it
  forgot-password <email>   Request a password reset email
  logout                    Revoke and clear the stored session

Configuration is read from ~/.config/sessionkit/config.json and the
AUTH_URL, API_URL and AUTH_CLIENT_ID environment variables.";

/// Initialize the tracing subscriber for logging
fn init_tracing() {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(filter)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();
    init_tracing();

    let mut args: Vec<String> = std::env::args().skip(1).collect();
    let use_keychain = match args.iter().position(|a| a == "--no-keychain") {
        Some(index) => {
            args.remove(index);
            false
        }
        None => true,
    };

    let Some(command) = args.first().cloned() else {
        eprintln!("{}", USAGE);
        return Ok(());
    };
    if command == "-h" || command == "--help" {
        println!("{}", USAGE);
        return Ok(());
    }

    let context = connect(use_keychain).await?;
    info!(command = %command, "sessionkit starting");

    match (command.as_str(), args.get(1)) {
        ("status", _) => status(&context).await,
        ("whoami", _) => whoami(&context).await,
        ("login", Some(email)) => login(&context, email).await,
        ("login-phone", Some(phone)) => login_phone(&context, phone).await,
        ("forgot-password", Some(email)) => {
            context.session().forgot_password(email).await?;
            println!("If {} has an account, a reset link is on its way.", email);
            Ok(())
        }
        ("logout", _) => {
            context.session().sign_out().await?;
            println!("Signed out.");
            Ok(())
        }
        _ => {
            eprintln!("{}", USAGE);
            bail!("Unknown or incomplete command: {}", args.join(" "))
        }
    }
}

async fn connect(use_keychain: bool) -> Result<AppContext> {
    let config = Config::load()?;
    let cache: Arc<dyn KeyValueStore> = Arc::new(FileStore::new(Config::cache_dir()?)?);
    let secure: Arc<dyn KeyValueStore> = if use_keychain {
        Arc::new(KeyringStore::default())
    } else {
        cache.clone()
    };
    AppContext::connect_with(config, secure, cache).await
}

async fn status(context: &AppContext) -> Result<()> {
    let Some(credentials) = context.credentials().get().await else {
        println!("Not signed in.");
        return Ok(());
    };
    let remaining = credentials.seconds_until_expiry(sessionkit_core::auth::unix_now());
    if remaining > 0 {
        println!("Signed in, access token valid for {}s.", remaining);
    } else if credentials.has_refresh_token() {
        println!("Signed in, access token expired (will refresh on next request).");
    } else {
        println!("Stored session has expired and cannot be refreshed.");
    }
    if !credentials.scope.is_empty() {
        println!("Scope: {}", credentials.scope);
    }
    Ok(())
}

async fn whoami(context: &AppContext) -> Result<()> {
    match context.session().hydrate().await? {
        Some(user) => print_user(&user),
        None => println!("Not signed in."),
    }
    Ok(())
}

async fn login(context: &AppContext, email: &str) -> Result<()> {
    let password = rpassword::prompt_password("Password: ")?;
    let user = context
        .session()
        .sign_in_by_email(email, &password, None)
        .await?;
    print_user(&user);
    Ok(())
}

async fn login_phone(context: &AppContext, phone: &str) -> Result<()> {
    context
        .session()
        .send_otp(phone, OtpChannel::Sms, None)
        .await?;
    print!("Code sent to {}. Enter code: ", phone);
    io::stdout().flush()?;
    let mut code = String::new();
    io::stdin().read_line(&mut code)?;

    let user = context
        .session()
        .sign_in_by_phone_number(phone, code.trim())
        .await?;
    print_user(&user);
    Ok(())
}

fn print_user(user: &User) {
    println!("Signed in as {} (id {})", user.display_name(), user.id);
    if !user.email.is_empty() {
        println!("  email: {}", user.email);
    }
    if let Some(ref phone) = user.phone_number {
        println!("  phone: {}", phone);
    }
}
