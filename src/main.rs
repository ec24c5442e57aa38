use system_telemetry_manager::*;

/**
 * Start our managers
 */
async fn let_there_be_light() {
    cli::manager::init();
    logger::manager::init();
    settings::manager::init(cli::manager::settings_file());
    controls::manager::init();
    telemetry::manager::init().await;
    wifi::manager::init().await;
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let_there_be_light().await;

    if cli::manager::is_once() {
        let snapshot = telemetry::manager::tick_once().await;
        println!("{}", serde_json::to_string_pretty(&snapshot)?);
        return Ok(());
    }

    telemetry::manager::start().await;
    wifi::manager::start().await;
    controls::button::start();

    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutting down");

    Ok(())
}
