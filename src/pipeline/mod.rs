// Pure stages of one ingestion run: envelope decoding and anomaly classification

pub mod classifier;
pub mod decoder;

pub use classifier::classify;
pub use decoder::decode;
