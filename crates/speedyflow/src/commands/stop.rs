use super::Context;
use colored::Colorize;
use speedyflow_cloud::status::PROVIDER_STOPPED_STATUS;

pub async fn handle(ctx: &Context, name: &str, wait: bool) -> anyhow::Result<()> {
    let (_, mut session) = ctx.open(name).await?;

    println!("{}", format!("Stopping machine '{}'...", name).yellow());
    session.stop().await?;

    if wait {
        session.wait_for_status(PROVIDER_STOPPED_STATUS).await?;
        println!("{}", format!("✓ '{}' is stopped", name).green().bold());
    } else {
        println!("{}", format!("✓ Stop requested for '{}'", name).green());
    }
    Ok(())
}

pub async fn handle_kill(ctx: &Context, name: &str) -> anyhow::Result<()> {
    let (_, session) = ctx.open(name).await?;

    println!("{}", format!("Killing machine '{}'...", name).yellow());
    session.kill().await?;
    println!("{}", format!("✓ '{}' killed", name).green());
    Ok(())
}
