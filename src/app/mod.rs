pub mod ingest_use_case;
pub mod ports;
pub mod simulate_use_case;
