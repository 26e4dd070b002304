//! Identity provisioning command handlers.

use anyhow::{Context, Result};

use prompt_gateway::identity::{
    authorize_provisioning, require_administrator, UserDirectory, UserRole,
};

use super::common::AppContext;
use super::UsersAction;

pub(crate) fn cmd_users(ctx: &AppContext, action: UsersAction) -> Result<()> {
    let directory = ctx.directory();
    match action {
        UsersAction::Add { name, role } => {
            let role: UserRole = role.parse()?;
            let actor = if directory.is_empty()? {
                None
            } else {
                Some(ctx.login()?)
            };
            authorize_provisioning(&directory, actor.as_ref(), role)?;
            let secret = rpassword::prompt_password("Secret: ")
                .with_context(|| "Failed to read secret")?;
            let confirm = rpassword::prompt_password("Confirm secret: ")
                .with_context(|| "Failed to read secret")?;
            if secret != confirm {
                anyhow::bail!("Secrets do not match");
            }
            let record = directory.register(&name, &secret, role)?;
            println!("Provisioned {} as {}.", record.name, record.role.label());
        }
        UsersAction::List => {
            if directory.is_empty()? {
                println!("No identities provisioned.");
                return Ok(());
            }
            require_administrator(Some(&ctx.login()?))?;
            let users = directory.list()?;
            for user in users {
                println!(
                    "- {} | {} | since {}",
                    user.name,
                    user.role.label(),
                    user.provisioned_at.format("%Y-%m-%d")
                );
            }
        }
    }
    Ok(())
}
