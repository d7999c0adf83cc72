/// Wire names shared by the producer, the analytical table and the archive blobs.
pub const SENSOR_ID_FIELD: &str = "capteur_id";
pub const REGION_FIELD: &str = "region";
pub const TEMPERATURE_FIELD: &str = "temperature";
pub const HUMIDITY_FIELD: &str = "humidite";
pub const VIBRATION_FIELD: &str = "vibration";
pub const TIMESTAMP_FIELD: &str = "timestamp";
pub const ANOMALY_FIELD: &str = "anomalie";

/// English spellings still accepted on decode
pub const SENSOR_ID_FIELD_ALIAS: &str = "sensor_id";
pub const HUMIDITY_FIELD_ALIAS: &str = "humidity";
pub const ANOMALY_FIELD_ALIAS: &str = "anomaly";

/// Readings strictly above this temperature are anomalous.
pub const ANOMALY_THRESHOLD: f64 = 70.0;

pub const UNKNOWN: &str = "unknown";
pub const NO_TIMESTAMP: &str = "no-timestamp";

pub const ARCHIVE_PREFIX: &str = "archive/";
pub const ARCHIVE_SUFFIX: &str = ".json";

pub const DEFAULT_REGIONS: &str = "Tunis,Gafsa,Sfax,Sousse,Nabeul";
pub const SIMULATOR_SEED: u64 = 42;
