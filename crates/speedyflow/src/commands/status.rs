use super::Context;
use colored::Colorize;
use speedyflow_cloud::CanonicalState;

fn colorize(state: CanonicalState) -> colored::ColoredString {
    let text = state.to_string();
    match state {
        CanonicalState::Running => text.green(),
        CanonicalState::Starting => text.cyan(),
        CanonicalState::Stopped | CanonicalState::Saved => text.yellow(),
        CanonicalState::Error => text.red().bold(),
        CanonicalState::Unknown => text.dimmed(),
    }
}

pub async fn handle(ctx: &Context, name: &str) -> anyhow::Result<()> {
    let (_, mut session) = ctx.open(name).await?;
    let state = session.state().await?;
    println!("{}", colorize(state));
    Ok(())
}

/// Print the stored record; no remote call
pub async fn handle_inspect(ctx: &Context, name: &str) -> anyhow::Result<()> {
    let record = ctx.store.load(name).await?;
    println!("{}", serde_json::to_string_pretty(&record)?);
    Ok(())
}

/// List stored machines; no remote call
pub async fn handle_ls(ctx: &Context) -> anyhow::Result<()> {
    let names = ctx.store.list().await?;
    if names.is_empty() {
        println!("{}", "No machines".dimmed());
        return Ok(());
    }

    println!("{:<24} {:<16} {:<16}", "NAME".bold(), "INSTANCE".bold(), "IP".bold());
    for name in names {
        let record = ctx.store.load(&name).await?;
        println!(
            "{:<24} {:<16} {:<16}",
            name.cyan(),
            record.instance_id.as_deref().unwrap_or("-"),
            record.ip_address.as_deref().unwrap_or("-")
        );
    }
    Ok(())
}
