use anyhow::bail;
use clap::Args;
use reviewcheck_api_client::ReviewCheckApi;
use reviewcheck_api_client::store::FileSessionStore;
use reviewcheck_client_core::{LoginOutcome, RestoreOutcome, SessionManager};

pub(crate) type CliSession = SessionManager<FileSessionStore, ReviewCheckApi>;

pub(crate) struct AdminContext {
    pub api: ReviewCheckApi,
    pub manager: CliSession,
}

fn build_context() -> anyhow::Result<AdminContext> {
    let api = ReviewCheckApi::from_env()?;
    let store = FileSessionStore::from_env()?;
    let manager = SessionManager::new(store, api.clone());
    Ok(AdminContext { api, manager })
}

/// Restores the persisted session before anything privileged runs; the
/// caller sees a fully resolved authenticated/anonymous state.
pub(crate) async fn restored_context() -> anyhow::Result<AdminContext> {
    let mut ctx = build_context()?;
    ctx.manager.restore().await;
    Ok(ctx)
}

pub(crate) async fn authenticated_context() -> anyhow::Result<AdminContext> {
    let ctx = restored_context().await?;
    if !ctx.manager.is_authenticated() {
        bail!("not logged in; run `reviewcheck login` first");
    }
    Ok(ctx)
}

#[derive(Args)]
pub struct LoginArgs {
    /// Administrator username
    pub username: String,
    /// Administrator password
    pub password: String,
}

pub async fn login(args: LoginArgs) -> anyhow::Result<()> {
    let mut ctx = build_context()?;
    match ctx.manager.login(&args.username, &args.password).await? {
        LoginOutcome::Authenticated { username } => {
            println!("logged in as {username}");
            Ok(())
        }
        LoginOutcome::Rejected { reason } => bail!(reason),
    }
}

pub async fn logout() -> anyhow::Result<()> {
    let mut ctx = restored_context().await?;
    ctx.manager.logout().await;
    println!("logged out");
    Ok(())
}

pub async fn status() -> anyhow::Result<()> {
    let mut ctx = build_context()?;
    match ctx.manager.restore().await {
        RestoreOutcome::Authenticated {
            username,
            restore_target,
        } => {
            println!("logged in as {username}");
            if let Some(target) = restore_target {
                println!("last admin view: {target}");
            }
        }
        RestoreOutcome::Anonymous => println!("not logged in"),
    }
    Ok(())
}
