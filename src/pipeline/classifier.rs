use crate::constants::ANOMALY_THRESHOLD;
use crate::domain::{ClassifiedEvent, SensorEvent};

/// Flags the event as anomalous when its temperature exceeds the fixed threshold.
///
/// A missing temperature counts as `0`, so such events are never anomalous.
pub fn classify(event: SensorEvent) -> ClassifiedEvent {
    let anomaly = event.temperature.unwrap_or(0.0) > ANOMALY_THRESHOLD;
    ClassifiedEvent::new(event, anomaly)
}
