//! 工具模块：提供通用工具函数
pub mod version_extractor;
pub mod header_converter;
pub mod detection_updater;
pub mod http_client;

pub use self::version_extractor::VersionExtractor;
pub use self::header_converter::HeaderConverter;
pub use self::detection_updater::DetectionUpdater;
pub use self::http_client::{HttpClientFactory, DEFAULT_USER_AGENT};
