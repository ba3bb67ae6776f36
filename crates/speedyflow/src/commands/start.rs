use super::Context;
use colored::Colorize;
use speedyflow_cloud::status::PROVIDER_RUNNING_STATUS;

pub async fn handle(ctx: &Context, name: &str, wait: bool) -> anyhow::Result<()> {
    let (_, mut session) = ctx.open(name).await?;

    println!("{}", format!("Starting machine '{}'...", name).yellow());
    session.start().await?;

    if wait {
        session.wait_for_status(PROVIDER_RUNNING_STATUS).await?;
        println!("{}", format!("✓ '{}' is running", name).green().bold());
    } else {
        println!("{}", format!("✓ Start requested for '{}'", name).green());
    }
    Ok(())
}

pub async fn handle_restart(ctx: &Context, name: &str) -> anyhow::Result<()> {
    let (_, session) = ctx.open(name).await?;

    println!("{}", format!("Restarting machine '{}'...", name).yellow());
    session.restart().await?;
    println!("{}", format!("✓ Restart requested for '{}'", name).green());
    Ok(())
}
