use super::Context;

/// Print the machine address, resolving and recording it on first use
pub async fn handle(ctx: &Context, name: &str) -> anyhow::Result<()> {
    let (mut record, mut session) = ctx.open(name).await?;
    let ip = session.ip().await?;

    if record.ip_address.as_deref() != Some(ip.as_str()) {
        record.ip_address = Some(ip.clone());
        record.touch();
        ctx.store.save(&record).await?;
    }

    println!("{}", ip);
    Ok(())
}

pub async fn handle_url(ctx: &Context, name: &str) -> anyhow::Result<()> {
    let (_, mut session) = ctx.open(name).await?;
    println!("{}", session.url().await?);
    Ok(())
}
