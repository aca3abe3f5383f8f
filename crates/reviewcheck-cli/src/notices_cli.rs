use anyhow::bail;
use clap::Args;
use reviewcheck_api_client::ReviewCheckApi;
use reviewcheck_api_client::wire::NoticeDraft;
use reviewcheck_client_core::ApiError;

use crate::admin_cli::{AdminContext, authenticated_context};

#[derive(Args)]
pub struct NoticesArgs {
    #[command(subcommand)]
    pub command: NoticesCommand,
}

#[derive(clap::Subcommand)]
pub enum NoticesCommand {
    /// List published notices (no login required)
    List,
    /// Publish a notice
    Create { title: String, content: String },
    /// Delete a notice by id
    Delete { notice_id: i64 },
}

pub async fn run(args: NoticesArgs) -> anyhow::Result<()> {
    match args.command {
        NoticesCommand::List => list().await,
        NoticesCommand::Create { title, content } => create(&title, &content).await,
        NoticesCommand::Delete { notice_id } => delete(notice_id).await,
    }
}

async fn list() -> anyhow::Result<()> {
    let api = ReviewCheckApi::from_env()?;
    let notices = api.list_notices().await.map_err(user_error)?;
    if notices.is_empty() {
        println!("no notices");
        return Ok(());
    }
    for notice in notices {
        println!("#{} {}", notice.notice_id, notice.title);
    }
    Ok(())
}

async fn create(title: &str, content: &str) -> anyhow::Result<()> {
    let draft = NoticeDraft::validated(title, content)?;
    let mut ctx = authenticated_context().await?;
    let token = bearer(&ctx)?;
    match ctx.api.create_notice(&token, &draft).await {
        Ok(notice) => {
            println!("published notice #{}", notice.notice_id);
            Ok(())
        }
        Err(err) => privileged_failure(&mut ctx, err),
    }
}

async fn delete(notice_id: i64) -> anyhow::Result<()> {
    let mut ctx = authenticated_context().await?;
    let token = bearer(&ctx)?;
    match ctx.api.delete_notice(&token, notice_id).await {
        Ok(()) => {
            println!("deleted notice #{notice_id}");
            Ok(())
        }
        Err(err) => privileged_failure(&mut ctx, err),
    }
}

pub(crate) fn bearer(ctx: &AdminContext) -> anyhow::Result<String> {
    match ctx.manager.bearer_token() {
        Some(token) => Ok(token.to_string()),
        None => bail!("not logged in; run `reviewcheck login` first"),
    }
}

/// A 401-class rejection invalidates the stored session before the
/// error is surfaced.
pub(crate) fn privileged_failure(ctx: &mut AdminContext, err: ApiError) -> anyhow::Result<()> {
    if err == ApiError::Unauthorized {
        ctx.manager.mark_unauthorized();
    }
    bail!(err.user_message())
}

pub(crate) fn user_error(err: ApiError) -> anyhow::Error {
    anyhow::anyhow!(err.user_message())
}
