use anyhow::Context;
use clap::{Parser, Subcommand};
use url::Url;

use bookshelf_kernel::settings::Settings;

#[derive(Debug, Parser)]
#[command(name = "bookshelf", version, about = "Book catalog service")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run the HTTP API
    Serve,
    /// Apply pending schema migrations
    Migrate {
        /// List migrations and whether they have been applied, without running any
        #[arg(long)]
        status: bool,
    },
    /// Print the effective configuration, without secrets
    Config,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let settings = Settings::load().context("failed to load bookshelf settings")?;

    match cli.command {
        Command::Serve => {
            bookshelf_telemetry::init(&settings.telemetry)?;
            bookshelf_app::run(settings).await
        }
        Command::Migrate { status: true } => {
            bookshelf_telemetry::init(&settings.telemetry)?;
            for (module, id, applied) in bookshelf_app::migration_status(&settings).await? {
                let state = if applied { "applied" } else { "pending" };
                println!("{module}/{id}\t{state}");
            }
            Ok(())
        }
        Command::Migrate { status: false } => {
            bookshelf_telemetry::init(&settings.telemetry)?;
            let count = bookshelf_app::migrate(&settings).await?;
            println!("applied {count} migration(s)");
            Ok(())
        }
        Command::Config => {
            print_config(&settings);
            Ok(())
        }
    }
}

fn print_config(settings: &Settings) {
    println!("environment: {}", settings.environment.as_str());
    println!("server.host: {}", settings.server.host);
    println!("server.port: {}", settings.server.port);
    println!("server.request_timeout_ms: {}", settings.server.request_timeout_ms);
    println!("database.url: {}", redact_url(&settings.database.url));
    println!("database.max_connections: {}", settings.database.max_connections);
    println!("database.min_connections: {}", settings.database.min_connections);
    println!("database.acquire_timeout_ms: {}", settings.database.acquire_timeout_ms);
    println!("database.run_migrations: {}", settings.database.run_migrations);
    println!("telemetry.log_format: {:?}", settings.telemetry.log_format);
    println!("telemetry.log_level: {}", settings.telemetry.log_level);
}

const MASK: &str = "***";

/// Mask credentials in a connection URL: the userinfo password and any
/// `password` query parameter.
fn redact_url(raw: &str) -> String {
    let Ok(mut url) = Url::parse(raw) else {
        return "<unparseable url>".to_string();
    };

    if url.password().is_some() && url.set_password(Some(MASK)).is_err() {
        return "<unparseable url>".to_string();
    }

    let has_query_secret = url
        .query_pairs()
        .any(|(key, _)| key.eq_ignore_ascii_case("password"));
    if has_query_secret {
        let pairs: Vec<(String, String)> = url
            .query_pairs()
            .map(|(key, value)| {
                let value = if key.eq_ignore_ascii_case("password") {
                    MASK.to_string()
                } else {
                    value.into_owned()
                };
                (key.into_owned(), value)
            })
            .collect();
        url.query_pairs_mut().clear().extend_pairs(pairs);
    }

    url.to_string()
}
