//! 全局检测器单例管理
use once_cell::sync::OnceCell;
use tracing::{debug, info};

use super::detector::TechDetector;
use crate::compiler::SignatureDatabase;
use crate::config::GlobalConfig;
use crate::error::{ScanError, ScanResult};

/// 全局检测器实例
static GLOBAL_DETECTOR: OnceCell<TechDetector> = OnceCell::new();

/// 带配置初始化全局检测器（幂等，已初始化直接返回）
pub async fn init_global_detector(config: &GlobalConfig) -> ScanResult<&'static TechDetector> {
    if let Some(detector) = GLOBAL_DETECTOR.get() {
        debug!("global detector already initialized, skip reinitialization");
        return Ok(detector);
    }

    let detector = TechDetector::from_config(config).await?;
    // 并发初始化时保留先完成的实例
    let detector = GLOBAL_DETECTOR.get_or_init(|| detector);
    info!("global tech detector initialized");
    Ok(detector)
}

/// 使用已编译的签名库初始化全局检测器
pub fn init_global_detector_with_database(database: SignatureDatabase) -> &'static TechDetector {
    GLOBAL_DETECTOR.get_or_init(|| TechDetector::new(database))
}

/// 获取全局检测器
pub fn global_detector() -> ScanResult<&'static TechDetector> {
    GLOBAL_DETECTOR.get().ok_or_else(|| {
        ScanError::DetectorNotInitialized(
            "call init_global_detector before using the global detector".to_string(),
        )
    })
}
