use crate::cli::StatusArgs;
use crate::config::Config;
use crate::provider::create_invoker;
use anyhow::Context;
use tracing::info;

pub async fn execute(args: StatusArgs) -> anyhow::Result<()> {
    let mut config = Config::resolve(args.config.as_deref())?;
    if let Some(provider) = args.provider {
        config.provider = provider;
    }

    println!("Provider: {}", config.provider);
    println!("Council: {}", config.council_models.join(", "));
    println!("Chairman: {}", config.chairman_model);

    if let Err(e) = config.validate() {
        println!("⚠️  Config problem: {}", e);
    }

    let invoker = create_invoker(&config);
    info!("Checking {} readiness", invoker.name());
    invoker
        .check_ready()
        .await
        .with_context(|| format!("{} is not ready", invoker.name()))?;

    println!("✅ {} is ready", invoker.name());
    Ok(())
}
