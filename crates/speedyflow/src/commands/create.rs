use super::Context;
use colored::Colorize;
use speedyflow_cloud::MachineRecord;

/// Provision a machine, saving the record after every stage
///
/// The record is kept when a later stage fails so the instance can still be
/// inspected or removed.
pub async fn handle(ctx: &Context, name: &str) -> anyhow::Result<()> {
    if ctx.store.exists(name) {
        anyhow::bail!("Machine '{}' already exists", name);
    }

    let mut session = ctx.new_session(name)?;
    let spec = ctx.config.instance_spec(name)?;
    spec.validate()?;

    println!("{}", format!("Creating machine '{}'...", name).yellow());

    let mut record = MachineRecord::new(name);
    record.ssh_user = ctx.config.ssh_user.clone();
    record.ssh_port = ctx.config.ssh_port;
    record.address_class = ctx.config.address_class()?;

    session.prepare_key_pair().await?;
    if let Some(kp) = session.key_pair() {
        println!("  key pair: {}", kp.display_name.cyan());
        record.key_pair_name = Some(kp.display_name.clone());
        record.key_pair_generated = kp.private_key.is_some();
    }
    ctx.store.save(&record).await?;

    let id = session.submit(&spec).await?;
    println!("  instance: {}", id.cyan());
    record.instance_id = Some(id);
    record.touch();
    ctx.store.save(&record).await?;

    println!("{}", "Waiting for the instance to become active...".blue());
    session.wait_for_active().await?;

    println!(
        "{}",
        format!("Looking for the {} address...", record.address_class).blue()
    );
    let ip = session.resolve_address().await?;
    record.ip_address = Some(ip.clone());
    record.touch();
    ctx.store.save(&record).await?;

    println!();
    println!(
        "{}",
        format!("✓ Machine '{}' is running at {}", name, ip)
            .green()
            .bold()
    );
    println!(
        "  ssh -i {} -p {} {}@{}",
        ctx.store.key_store(name)?.private_key_path().display(),
        record.ssh_port,
        record.ssh_user,
        ip
    );
    Ok(())
}
