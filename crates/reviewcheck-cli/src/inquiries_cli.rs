use anyhow::bail;
use clap::Args;
use reviewcheck_api_client::ReviewCheckApi;

use crate::admin_cli::authenticated_context;
use crate::notices_cli::{bearer, privileged_failure, user_error};

#[derive(Args)]
pub struct InquiriesArgs {
    #[command(subcommand)]
    pub command: InquiriesCommand,
}

#[derive(clap::Subcommand)]
pub enum InquiriesCommand {
    /// Submit a new inquiry (no login required)
    Submit { content: String },
    /// List user inquiries
    List,
    /// Answer an inquiry by id
    Reply { inquiry_id: i64, answer: String },
}

pub async fn run(args: InquiriesArgs) -> anyhow::Result<()> {
    match args.command {
        InquiriesCommand::Submit { content } => submit(&content).await,
        InquiriesCommand::List => list().await,
        InquiriesCommand::Reply { inquiry_id, answer } => reply(inquiry_id, &answer).await,
    }
}

async fn submit(content: &str) -> anyhow::Result<()> {
    let content = content.trim();
    if content.is_empty() {
        bail!("inquiry content must not be empty");
    }
    let api = ReviewCheckApi::from_env()?;
    let inquiry = api.submit_inquiry(content).await.map_err(user_error)?;
    println!("submitted inquiry #{}", inquiry.inquiry_id);
    Ok(())
}

async fn list() -> anyhow::Result<()> {
    let mut ctx = authenticated_context().await?;
    let token = bearer(&ctx)?;
    match ctx.api.list_inquiries(&token).await {
        Ok(inquiries) => {
            if inquiries.is_empty() {
                println!("no inquiries");
                return Ok(());
            }
            for inquiry in inquiries {
                let state = if inquiry.answer.is_some() {
                    "answered"
                } else {
                    "open"
                };
                println!("#{} [{state}] {}", inquiry.inquiry_id, inquiry.content);
            }
            Ok(())
        }
        Err(err) => privileged_failure(&mut ctx, err),
    }
}

async fn reply(inquiry_id: i64, answer: &str) -> anyhow::Result<()> {
    let mut ctx = authenticated_context().await?;
    let token = bearer(&ctx)?;
    match ctx.api.reply_inquiry(&token, inquiry_id, answer).await {
        Ok(inquiry) => {
            println!("answered inquiry #{}", inquiry.inquiry_id);
            Ok(())
        }
        Err(err) => privileged_failure(&mut ctx, err),
    }
}
