//! 检测模块：技术检测核心逻辑
pub mod analyzer;
pub mod detection;
pub mod detector;
pub mod global;

// 导出核心接口
pub use self::analyzer::{match_fingerprint, SurfaceAnalyzer};
pub use self::detection::{DetectedTechnology, MatchEvent, Surface, TechnologyReport};
pub use self::detector::TechDetector;
pub use self::global::{global_detector, init_global_detector, init_global_detector_with_database};
