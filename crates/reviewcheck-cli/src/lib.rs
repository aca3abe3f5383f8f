#![allow(clippy::print_stdout, clippy::print_stderr)]

use clap::Parser;

mod admin_cli;
mod analyze_cli;
mod inquiries_cli;
mod notices_cli;

#[derive(Parser)]
#[command(name = "reviewcheck")]
#[command(about = "ReviewCheck analysis and admin CLI")]
pub struct ReviewCheckCli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(clap::Subcommand)]
pub enum Commands {
    /// Submit a product review URL and watch the analysis to completion
    Analyze(analyze_cli::AnalyzeArgs),
    /// Log in as an administrator and store the session
    Login(admin_cli::LoginArgs),
    /// Notify the backend and clear the stored session
    Logout,
    /// Show the restored session state
    Status,
    /// Notice administration (list, create, delete)
    Notices(notices_cli::NoticesArgs),
    /// Inquiry administration (list, reply)
    Inquiries(inquiries_cli::InquiriesArgs),
}

pub fn run() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = ReviewCheckCli::parse();
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    runtime.block_on(async {
        match cli.command {
            Commands::Analyze(args) => analyze_cli::run(args).await,
            Commands::Login(args) => admin_cli::login(args).await,
            Commands::Logout => admin_cli::logout().await,
            Commands::Status => admin_cli::status().await,
            Commands::Notices(args) => notices_cli::run(args).await,
            Commands::Inquiries(args) => inquiries_cli::run(args).await,
        }
    })
}
