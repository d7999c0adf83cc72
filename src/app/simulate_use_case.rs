use anyhow::{bail, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};
use uuid::Uuid;

use crate::app::ports::EnvelopePublisherPort;
use crate::constants::SIMULATOR_SEED;
use crate::envelope::{DeliveryEnvelope, PushRequest};
use crate::metrics::simulator as simulator_metrics;

/// Settings for one simulator run
#[derive(Debug, Clone)]
pub struct SimulatorConfig {
    pub sensors: usize,
    pub interval: Duration,
    pub regions: Vec<String>,
    /// Stop after a single round of readings
    pub once: bool,
}

/// One fake reading in the producer's wire shape
#[derive(Debug, Clone, Serialize)]
pub struct SimulatedReading {
    pub capteur_id: String,
    pub region: String,
    pub temperature: f64,
    pub humidite: f64,
    pub vibration: f64,
    pub timestamp: String,
}

impl SimulatedReading {
    pub fn generate<R: Rng>(rng: &mut R, sensor_id: &str, region: &str, now: DateTime<Utc>) -> Self {
        Self {
            capteur_id: sensor_id.to_string(),
            region: region.to_string(),
            temperature: round2(rng.gen_range(20.0..=100.0)),
            humidite: round2(rng.gen_range(30.0..=80.0)),
            vibration: round2(rng.gen_range(0.0..=1.0)),
            timestamp: now.to_rfc3339_opts(SecondsFormat::Micros, false),
        }
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Split a comma separated region list, dropping blanks.
pub fn parse_regions(list: &str) -> Vec<String> {
    list.split(',')
        .map(str::trim)
        .filter(|r| !r.is_empty())
        .map(str::to_string)
        .collect()
}

/// Give every `sensor-i` (1-based) its own region after a seeded shuffle.
pub fn assign_regions<R: Rng>(rng: &mut R, sensors: usize, regions: &[String]) -> Result<Vec<(String, String)>> {
    if sensors > regions.len() {
        bail!(
            "{} sensors requested but only {} regions available",
            sensors,
            regions.len()
        );
    }
    let mut shuffled = regions.to_vec();
    shuffled.shuffle(rng);
    Ok((1..=sensors)
        .map(|i| (format!("sensor-{}", i), shuffled[i - 1].clone()))
        .collect())
}

/// Telemetry producer: publishes one reading per sensor every interval.
pub struct SimulateUseCase {
    publisher: Box<dyn EnvelopePublisherPort>,
}

impl SimulateUseCase {
    pub fn new(publisher: Box<dyn EnvelopePublisherPort>) -> Self {
        Self { publisher }
    }

    /// Run until `ctx` is cancelled (or after one round with `once`).
    /// Returns the number of readings the endpoint accepted.
    pub async fn run(&self, ctx: CancellationToken, config: SimulatorConfig) -> Result<usize> {
        let mut rng = StdRng::seed_from_u64(SIMULATOR_SEED);
        let assignments = assign_regions(&mut rng, config.sensors, &config.regions)?;
        info!(?assignments, "Regions per sensor");

        let mut published = 0;
        while !ctx.is_cancelled() {
            for (sensor_id, region) in &assignments {
                let reading = SimulatedReading::generate(&mut rng, sensor_id, region, Utc::now());
                let payload = serde_json::to_vec(&reading)?;
                let request = PushRequest::new(
                    DeliveryEnvelope::from_payload(&payload, Uuid::new_v4().to_string()),
                    None,
                );

                match self.publisher.publish(&request).await {
                    Ok(()) => {
                        published += 1;
                        simulator_metrics::envelope_published();
                        debug!(
                            sensor_id = %reading.capteur_id,
                            temperature = reading.temperature,
                            "Published reading"
                        );
                    }
                    Err(e) => {
                        simulator_metrics::publish_failed();
                        error!(sensor_id = %reading.capteur_id, error = %e, "Failed to publish reading");
                    }
                }
            }

            if config.once {
                info!("Single round requested, stopping");
                break;
            }

            tokio::select! {
                _ = ctx.cancelled() => {
                    info!("Received shutdown signal, stopping simulator");
                }
                _ = tokio::time::sleep(config.interval) => {}
            }
        }

        info!(published, "Simulator stopped");
        Ok(published)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SinkFault;
    use crate::pipeline::decode;
    use async_trait::async_trait;
    use std::collections::HashSet;
    use std::sync::Arc;
    use tokio::sync::Mutex;

    struct MockPublisher {
        requests: Arc<Mutex<Vec<PushRequest>>>,
        fail: bool,
    }

    #[async_trait]
    impl EnvelopePublisherPort for MockPublisher {
        async fn publish(&self, request: &PushRequest) -> std::result::Result<(), SinkFault> {
            self.requests.lock().await.push(request.clone());
            if self.fail {
                return Err(SinkFault::Status {
                    status: 503,
                    body: "down".to_string(),
                });
            }
            Ok(())
        }
    }

    fn use_case(fail: bool) -> (SimulateUseCase, Arc<Mutex<Vec<PushRequest>>>) {
        let requests = Arc::new(Mutex::new(Vec::new()));
        let publisher = MockPublisher {
            requests: requests.clone(),
            fail,
        };
        (SimulateUseCase::new(Box::new(publisher)), requests)
    }

    fn config(sensors: usize, once: bool) -> SimulatorConfig {
        SimulatorConfig {
            sensors,
            interval: Duration::from_secs(30),
            regions: parse_regions("Tunis, Gafsa,Sfax,,Sousse,Nabeul"),
            once,
        }
    }

    #[test]
    fn test_parse_regions_skips_blanks() {
        assert_eq!(parse_regions(" Tunis,,Sfax , "), vec!["Tunis", "Sfax"]);
    }

    #[test]
    fn test_assign_regions_is_unique_and_seeded() {
        let regions = parse_regions("Tunis,Gafsa,Sfax,Sousse,Nabeul");
        let first = assign_regions(&mut StdRng::seed_from_u64(SIMULATOR_SEED), 5, &regions).unwrap();
        let second = assign_regions(&mut StdRng::seed_from_u64(SIMULATOR_SEED), 5, &regions).unwrap();

        assert_eq!(first, second);
        assert_eq!(first[0].0, "sensor-1");
        let distinct: HashSet<_> = first.iter().map(|(_, r)| r.clone()).collect();
        assert_eq!(distinct.len(), 5);
    }

    #[test]
    fn test_too_many_sensors_is_an_error() {
        let regions = parse_regions("Tunis,Sfax");
        assert!(assign_regions(&mut StdRng::seed_from_u64(1), 3, &regions).is_err());
    }

    #[test]
    fn test_generated_reading_ranges() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..200 {
            let r = SimulatedReading::generate(&mut rng, "sensor-1", "Tunis", Utc::now());
            assert!((20.0..=100.0).contains(&r.temperature));
            assert!((30.0..=80.0).contains(&r.humidite));
            assert!((0.0..=1.0).contains(&r.vibration));
            assert_eq!(round2(r.temperature), r.temperature);
        }
    }

    #[tokio::test]
    async fn test_once_publishes_one_decodable_reading_per_sensor() {
        let (simulator, requests) = use_case(false);

        let published = simulator.run(CancellationToken::new(), config(3, true)).await.unwrap();

        assert_eq!(published, 3);
        let requests = requests.lock().await;
        let sensors: Vec<String> = requests
            .iter()
            .map(|r| decode(&r.message).unwrap().sensor_id)
            .collect();
        assert_eq!(sensors, vec!["sensor-1", "sensor-2", "sensor-3"]);
    }

    #[tokio::test]
    async fn test_publish_failures_do_not_stop_the_round() {
        let (simulator, requests) = use_case(true);

        let published = simulator.run(CancellationToken::new(), config(2, true)).await.unwrap();

        assert_eq!(published, 0);
        assert_eq!(requests.lock().await.len(), 2);
    }

    #[tokio::test]
    async fn test_cancellation_interrupts_the_wait() {
        let (simulator, requests) = use_case(false);
        let ctx = CancellationToken::new();
        let canceller = ctx.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            canceller.cancel();
        });

        let published = tokio::time::timeout(Duration::from_secs(5), simulator.run(ctx, config(2, false)))
            .await
            .expect("simulator should stop on cancellation")
            .unwrap();

        assert_eq!(published, 2);
        assert_eq!(requests.lock().await.len(), 2);
    }
}
