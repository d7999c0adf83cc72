pub mod fs_archive_adapter;
pub mod http_analytics_adapter;
pub mod http_archive_adapter;
pub mod push_publisher_adapter;
pub mod sqlite_analytics_adapter;

#[cfg(test)]
pub(crate) mod test_support;

pub use fs_archive_adapter::FsArchiveStore;
pub use http_analytics_adapter::HttpAnalyticsSink;
pub use http_archive_adapter::HttpArchiveStore;
pub use push_publisher_adapter::HttpPushPublisher;
pub use sqlite_analytics_adapter::SqliteAnalyticsStore;
