use super::Context;
use colored::Colorize;

/// Stop and delete the instance, then drop the local record and keys
///
/// The key pair on the provider is only deleted with `purge_key`, since it may
/// be shared with other machines.
pub async fn handle(ctx: &Context, name: &str, purge_key: bool) -> anyhow::Result<()> {
    let (record, mut session) = ctx.open(name).await?;

    println!("{}", format!("Removing machine '{}'...", name).yellow());

    if session.instance_id().is_some() {
        session.remove().await?;
        println!("  instance deleted");
    } else {
        println!("{}", "  no instance was created; removing local files only".dimmed());
    }

    if purge_key {
        match &record.key_pair_name {
            Some(key_pair) => {
                session.remove_key_pair(key_pair).await?;
                println!("  key pair {} deleted", key_pair.cyan());
            }
            None => println!("{}", "  no key pair recorded".dimmed()),
        }
    }

    ctx.store.remove(name).await?;

    println!();
    println!("{}", format!("✓ Machine '{}' removed", name).green().bold());
    Ok(())
}
