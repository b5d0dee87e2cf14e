//! restodash - terminal front end for the restaurant dashboard.
//!
//! Signs staff in, shows the role-aware menu, lists cached records and runs
//! the admin, payment and QR actions, all gated by the same navigation
//! rules as the web dashboard. `--demo` runs against a seeded in-memory
//! restaurant.

mod commands;
mod demo;

use std::io;
use std::path::PathBuf;

use anyhow::{bail, Result};
use restodash_core::config::Config;
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use commands::App;

const USAGE: &str = "\
Usage: restodash [--demo [--as <email>]] <command>

Commands:
  login [email] [--remember]      Sign in (--remember keeps the password in the OS keychain)
  logout                          Sign out and forget the stored session
  whoami                          Show the signed-in account and its routes
  menu [--mobile]                 Show the sidebar for this account
  check <route>                   Evaluate navigation to a route (tag or path)
  refresh [section]               Refresh one or all sections (menu, categories, orders, staff)
  list <section> [page]           List a cached section
  staff add <email> <name> [admin]
  staff grant <email> <route>...
  staff disable <email>
  pay <amount> [description]      Start a CinetPay checkout
  pay status <transaction-id>     Check a CinetPay transaction
  qr <table>                      Print the ordering URL for a table QR code";

/// Log file prefix inside the cache directory
const LOG_FILE: &str = "restodash.log";

#[derive(Debug, Default, PartialEq)]
struct Args {
    demo: bool,
    demo_user: Option<String>,
    remember: bool,
    mobile: bool,
    command: Vec<String>,
}

fn parse_args(raw: impl IntoIterator<Item = String>) -> Result<Args> {
    let mut args = Args::default();
    let mut raw = raw.into_iter();
    while let Some(arg) = raw.next() {
        match arg.as_str() {
            "--demo" => args.demo = true,
            "--as" => match raw.next() {
                Some(email) => args.demo_user = Some(email),
                None => bail!("--as needs an email"),
            },
            "--remember" => args.remember = true,
            "--mobile" => args.mobile = true,
            "-h" | "--help" => args.command = vec!["help".to_string()],
            flag if flag.starts_with("--") => bail!("Unknown option {}\n\n{}", flag, USAGE),
            _ => args.command.push(arg),
        }
    }
    Ok(args)
}

/// Initialize the tracing subscriber: stderr plus a daily log file when the
/// cache directory is usable.
fn init_tracing(log_dir: Option<PathBuf>) -> Option<WorkerGuard> {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=restodash_core=debug)
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    let log_dir = log_dir.filter(|dir| std::fs::create_dir_all(dir).is_ok());
    let (file_layer, guard) = match log_dir {
        Some(dir) => {
            let (writer, guard) = tracing_appender::non_blocking(tracing_appender::rolling::daily(dir, LOG_FILE));
            (Some(fmt::layer().with_ansi(false).with_writer(writer)), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(file_layer)
        .with(filter)
        .init();
    guard
}

async fn run(app: &mut App, args: &Args) -> Result<()> {
    let words: Vec<&str> = args.command.iter().map(String::as_str).collect();
    match words.as_slice() {
        ["login"] => app.login(None, args.remember).await,
        ["login", email] => app.login(Some(email.to_string()), args.remember).await,
        ["logout"] => app.logout().await,
        ["whoami"] => app.whoami().await,
        ["menu"] => app.menu(args.mobile).await,
        ["check", route] => app.check(route).await,
        ["refresh"] => app.refresh(None).await,
        ["refresh", section] => app.refresh(Some(*section)).await,
        ["list", section] => app.list(section, None).await,
        ["list", section, page] => app.list(section, Some(*page)).await,
        ["staff", "add", email, name] => app.staff_add(email, name, false).await,
        ["staff", "add", email, name, "admin"] => app.staff_add(email, name, true).await,
        ["staff", "grant", email, routes @ ..] => {
            let routes: Vec<String> = routes.iter().map(|r| r.to_string()).collect();
            app.staff_grant(email, &routes).await
        }
        ["staff", "disable", email] => app.staff_disable(email).await,
        ["pay", "status", transaction_id] => app.pay_status(transaction_id).await,
        ["pay", amount] => app.pay(amount, None).await,
        ["pay", amount, description @ ..] => {
            let description = description.join(" ");
            app.pay(amount, Some(description.as_str())).await
        }
        ["qr", table] => app.qr(table).await,
        _ => bail!("{}", USAGE),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let args = parse_args(std::env::args().skip(1))?;
    if args.command.is_empty() || args.command[0] == "help" {
        println!("{}", USAGE);
        return Ok(());
    }

    let config = Config::load()?;
    let _log_guard = init_tracing(config.cache_dir().ok());
    info!(demo = args.demo, command = %args.command.join(" "), "restodash starting");

    let mut app = if args.demo {
        // login picks its own account; everything else runs as the demo owner
        let user = match args.command[0].as_str() {
            "login" => None,
            _ => Some(args.demo_user.as_deref().unwrap_or(demo::OWNER_EMAIL)),
        };
        App::demo(config, user).await?
    } else {
        App::connect(config)?
    };

    let result = run(&mut app, &args).await;
    app.shutdown();
    result
}
