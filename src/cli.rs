use anyhow::Context;
use clap::Parser;
use clap_complete::Shell;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use crate::config::Settings;
use crate::console::Terminal;
use crate::decommission::Session;
use crate::gateway::S3Gateway;

/// Uses `RUST_LOG` if set, otherwise the configured level.
fn init_tracing(log_level: &str) -> anyhow::Result<()> {
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else {
        EnvFilter::try_new(log_level)
            .with_context(|| format!("invalid log level filter: {log_level}"))?
    };

    // stdout belongs to the prompts
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    Ok(())
}

pub const fn get_styles() -> clap::builder::Styles {
    clap::builder::Styles::styled()
        .usage(
            anstyle::Style::new()
                .bold()
                .underline()
                .fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Yellow))),
        )
        .header(
            anstyle::Style::new()
                .bold()
                .underline()
                .fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Yellow))),
        )
        .literal(
            anstyle::Style::new().fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Green))),
        )
        .invalid(
            anstyle::Style::new()
                .bold()
                .fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Red))),
        )
        .error(
            anstyle::Style::new()
                .bold()
                .fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Red))),
        )
        .valid(
            anstyle::Style::new()
                .bold()
                .underline()
                .fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Green))),
        )
        .placeholder(
            anstyle::Style::new().fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::White))),
        )
}

pub trait Process {
    async fn process(self) -> anyhow::Result<i32>;
}

/// Interactively empty and delete one bucket, including all object versions.
///
/// Endpoint and credentials are read from `.reaper`, `.env`, `~/.reaper` or
/// the environment (`S3_ENDPOINT_URL`, `S3_REGION`, `S3_ACCESS_KEY_ID`,
/// `S3_SECRET_ACCESS_KEY`, `R2_ACCOUNT_ID`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Parser)]
#[clap(version, styles=get_styles())]
pub struct Args {
    /// Print shell completions and exit.
    #[arg(long = "generate", value_enum)]
    pub generator: Option<Shell>,
}

impl Process for Args {
    async fn process(self) -> anyhow::Result<i32> {
        let settings = Settings::guess();
        init_tracing(settings.log_level())?;
        debug!(%settings, "resolved provider settings");

        let gateway = S3Gateway::new(settings.into_s3().await?);
        let mut console = Terminal::stdin();

        let outcome = Session::new(&gateway, &mut console).run().await?;
        debug!(?outcome, "session finished");

        Ok(outcome.exit_code())
    }
}
