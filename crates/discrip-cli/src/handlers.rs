//! Command handlers.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use discrip_core::DriveTopics;
use discrip_runtime::runner::{prime, register_key};
use discrip_runtime::{JsonDiscStore, MqttTransport, OutboundPublisher, probe_disc_identity};
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::bootstrap::{DriveContext, bootstrap};
use crate::config::RipperConfig;
use crate::error::CliError;
use crate::ripper::Ripper;

/// Time the publisher gets to flush queued messages on shutdown.
const PUBLISHER_FLUSH_TIMEOUT: Duration = Duration::from_secs(5);

/// Run the scan loop until cancelled or a device error occurs.
pub async fn run(config: RipperConfig, cancel: CancellationToken) -> Result<(), CliError> {
    let mqtt = config.mqtt.clone().ok_or_else(|| {
        CliError::Config("MQTT broker not specified: set MQTT_HOSTNAME or pass --mqtt-host".to_string())
    })?;

    if let Some(key) = &config.makemkv_key {
        register_key(&config.runner, key).await?;
    }
    prime(&config.runner).await?;

    let DriveContext { controller, runner } = bootstrap(&config);
    let (publisher, worker) = OutboundPublisher::new(config.publisher.clone());
    let worker = tokio::spawn(worker.run(MqttTransport::new(mqtt)));

    let topics = DriveTopics::new(&config.topic_root, &config.name, &config.drive_path);
    info!(topic = topics.base(), device = %config.drive_path.display(), "Starting scan loop");

    let ripper = Ripper::new(
        controller,
        runner,
        publisher,
        topics,
        Arc::new(JsonDiscStore::new(&config.out_dir)),
        config.autoclose,
    );
    let result = ripper.run(cancel).await;

    // Dropping the ripper closes the outbound queue so the worker can finish.
    drop(ripper);
    match timeout(PUBLISHER_FLUSH_TIMEOUT, worker).await {
        Ok(Ok(stats)) => info!(delivered = stats.delivered, dropped = stats.dropped, "Publisher flushed"),
        Ok(Err(e)) => warn!(error = %e, "Publisher task failed"),
        Err(_) => warn!("Publisher did not flush in time"),
    }

    result.map_err(Into::into)
}

pub async fn status(ctx: &DriveContext) -> anyhow::Result<()> {
    let status = ctx.controller.status().await.map_err(CliError::from)?;
    println!("{status}");
    Ok(())
}

pub async fn eject(ctx: &DriveContext) -> anyhow::Result<()> {
    ctx.controller.open_tray().await.map_err(CliError::from)?;
    Ok(())
}

pub async fn close(ctx: &DriveContext) -> anyhow::Result<()> {
    ctx.controller.close_tray().await.map_err(CliError::from)?;
    Ok(())
}

/// Scan the inserted disc once with the door locked and print the summary.
pub async fn info(ctx: &DriveContext) -> anyhow::Result<()> {
    let summary = ctx
        .controller
        .with_locked_door(ctx.runner.get_info())
        .await
        .map_err(CliError::from)?
        .map_err(CliError::from)?;

    let json = serde_json::to_string_pretty(&summary.to_json()).context("serializing disc summary")?;
    println!("{json}");
    Ok(())
}

pub async fn identify(ctx: &DriveContext) -> anyhow::Result<()> {
    let device = ctx.controller.device_path();
    let identity = probe_disc_identity(&device).await.map_err(CliError::from)?;
    println!("{}\t{}", identity.disc_id, identity.label);
    Ok(())
}
