//! techscan - 网站技术栈指纹识别引擎
//! 加载 technologies.json 签名库，对页面的 URL / Header / Script / Meta / HTML / DOM 做匹配，
//! 输出检测到的技术、版本与分类

// 导出全局错误类型
pub use self::error::{ScanError, ScanResult};

// 导出配置模块
pub use self::config::{ConfigManager, CustomConfigBuilder, GlobalConfig};

// 导出规则模块核心接口
pub use self::rule::{CategoryRule, RuleCacheManager, RuleLibrary, RuleLoader, TechRule};

// 导出编译模块核心接口
pub use self::compiler::{
    Category, DomSelector, Fingerprint, Implication, Pattern, RuleCompiler, SignatureDatabase,
};

// 导出页面模块核心接口
pub use self::page::{HtmlPage, PageElement, WebPage};

// 导出提取模块核心接口
pub use self::extractor::HtmlExtractor;

// 导出工具模块核心接口
pub use self::utils::{DetectionUpdater, HeaderConverter, VersionExtractor};

// 导出检测模块核心接口
pub use self::detector::{
    global_detector, init_global_detector, init_global_detector_with_database, match_fingerprint,
    DetectedTechnology, MatchEvent, Surface, TechDetector, TechnologyReport,
};

// 声明所有子模块
pub mod config;
pub mod error;
pub mod rule;
pub mod compiler;
pub mod page;
pub mod extractor;
pub mod utils;
pub mod detector;
