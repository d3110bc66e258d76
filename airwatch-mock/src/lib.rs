use std::sync::Arc;
use std::time::Duration;

use airwatch_api::codec::{fixed, json};
use airwatch_api::{Measurement, WireProtocol};
use rand::Rng;
use rand_distr::{Distribution, Normal};
use time::OffsetDateTime;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;

use crate::settings::Settings;
use crate::simulate::{
    simulated_humidity, simulated_noise, simulated_pm25, simulated_temperature,
};

pub mod settings;
mod simulate;

pub async fn run(settings: &Arc<Settings>) {
    let address = format!("{}:{}", settings.node.host, settings.node.port);
    let listener = tokio::net::TcpListener::bind(&address)
        .await
        .expect("Failed to bind the node address.");

    tracing::info!(
        "mock sensor node listening on {address} ({} framing)",
        settings.node.protocol.name()
    );

    loop {
        match listener.accept().await {
            Ok((stream, peer)) => {
                tracing::info!("host connected from {peer}");
                let settings = Arc::clone(settings);
                tokio::spawn(async move {
                    if let Err(e) = feed_host(stream, &settings).await {
                        tracing::warn!("host connection closed: {e}");
                    }
                });
            }
            Err(e) => tracing::error!("failed to accept connection: {e}"),
        }
    }
}

/// Sends one frame per interval until the host hangs up.
async fn feed_host(mut stream: TcpStream, settings: &Settings) -> std::io::Result<()> {
    let mut interval =
        tokio::time::interval(Duration::from_secs(settings.mock.send_interval_secs));

    loop {
        interval.tick().await;

        let measurement = sample_measurement();
        tracing::debug!(?measurement, "frame sent");

        match settings.node.protocol {
            WireProtocol::Fixed => stream.write_all(&fixed::encode(&measurement)).await?,
            WireProtocol::Json => stream.write_all(&json::encode(&measurement)).await?,
        }
    }
}

/// One sample off the diurnal baselines plus sensor jitter.
fn sample_measurement() -> Measurement {
    let now = OffsetDateTime::now_utc();
    let second_of_day =
        now.hour() as f64 * 3600.0 + now.minute() as f64 * 60.0 + now.second() as f64;
    let day_fraction = second_of_day / 86_400.0;

    let mut rng = rand::rng();
    let jitter = Normal::new(0.0, 0.4).expect("finite standard deviation");

    Measurement {
        temperature: (simulated_temperature(day_fraction) + jitter.sample(&mut rng)) as f32,
        humidity: (simulated_humidity(day_fraction) + jitter.sample(&mut rng)).clamp(0.0, 100.0)
            as f32,
        pm25: (simulated_pm25(day_fraction) + rng.random_range(-5.0..5.0)).max(0.0) as u16,
        noise: (simulated_noise(day_fraction) + rng.random_range(-3.0..3.0)).clamp(0.0, 255.0)
            as u8,
    }
}
