//! 检测器核心：整合各类分析器，输出检测结果
//! 签名库只读共享；检测记录按 URL 分槽缓存，同一 URL 的分析串行写入同一槽位

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Instant;
use tracing::{debug, info};

use super::analyzer::match_fingerprint;
use super::detection::{DetectedTechnology, TechnologyReport};
use crate::compiler::{RuleCompiler, SignatureDatabase};
use crate::config::GlobalConfig;
use crate::error::ScanResult;
use crate::page::WebPage;
use crate::rule::{RuleLibrary, RuleLoader};
use crate::utils::DetectionUpdater;

/// 单个 URL 的检测记录：技术名 → 检测记录
type DetectionSlot = Arc<Mutex<HashMap<String, DetectedTechnology>>>;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// 技术检测器
#[derive(Debug, Clone, Default)]
pub struct TechDetector {
    database: Arc<SignatureDatabase>,
    detections: Arc<Mutex<HashMap<String, DetectionSlot>>>,
}

impl TechDetector {
    /// 使用已编译的签名库创建检测器
    pub fn new(database: SignatureDatabase) -> Self {
        Self {
            database: Arc::new(database),
            detections: Arc::default(),
        }
    }

    /// 使用内存中的规则库创建检测器
    pub fn from_rule_library(rule_lib: &RuleLibrary) -> Self {
        Self::new(RuleCompiler::compile(rule_lib))
    }

    /// 按配置加载规则库（文件 / 缓存 / 远程）并创建检测器
    pub async fn from_config(config: &GlobalConfig) -> ScanResult<Self> {
        let rule_lib = RuleLoader::latest(config).await?;
        let detector = Self::from_rule_library(&rule_lib);
        info!(
            "tech detector ready: {} technologies, {} categories",
            detector.database.technologies.len(),
            detector.database.categories.len()
        );
        Ok(detector)
    }

    pub fn database(&self) -> &SignatureDatabase {
        &self.database
    }

    /// 核心检测接口：返回检测到的技术（含 implies 推导）
    pub fn analyze(&self, page: &dyn WebPage) -> BTreeSet<String> {
        let start = Instant::now();
        let slot = self.slot(page.url());
        let mut records = lock(&slot);

        let mut detected = BTreeSet::new();
        for (tech_name, fingerprint) in &self.database.technologies {
            let (matched, events) = match_fingerprint(fingerprint, page);
            for event in &events {
                DetectionUpdater::record(&mut records, tech_name, event);
            }
            if matched {
                detected.insert(tech_name.clone());
            }
        }
        drop(records);

        let implied = DetectionUpdater::implied_technologies(&self.database, &detected);
        debug!(
            "analyzed {} in {:?}: {} detected, {} implied",
            page.url(),
            start.elapsed(),
            detected.len(),
            implied.len()
        );
        detected.extend(implied);
        detected
    }

    /// 技术名 → { versions }
    pub fn analyze_with_versions(&self, page: &dyn WebPage) -> BTreeMap<String, TechnologyReport> {
        self.analyze(page)
            .into_iter()
            .map(|tech_name| {
                let report = TechnologyReport {
                    versions: Some(self.get_versions(page.url(), &tech_name)),
                    categories: None,
                };
                (tech_name, report)
            })
            .collect()
    }

    /// 技术名 → { categories }
    pub fn analyze_with_categories(&self, page: &dyn WebPage) -> BTreeMap<String, TechnologyReport> {
        self.analyze(page)
            .into_iter()
            .map(|tech_name| {
                let report = TechnologyReport {
                    versions: None,
                    categories: Some(self.get_categories(&tech_name)),
                };
                (tech_name, report)
            })
            .collect()
    }

    /// 技术名 → { versions, categories }
    pub fn analyze_with_versions_and_categories(
        &self,
        page: &dyn WebPage,
    ) -> BTreeMap<String, TechnologyReport> {
        let mut reports = self.analyze_with_versions(page);
        for (tech_name, report) in reports.iter_mut() {
            report.categories = Some(self.get_categories(tech_name));
        }
        reports
    }

    /// 技术所属分类名（未知技术 / 未知分类 ID 跳过）
    pub fn get_categories(&self, tech_name: &str) -> Vec<String> {
        self.database
            .fingerprint(tech_name)
            .map(|fingerprint| {
                fingerprint
                    .category_ids
                    .iter()
                    .filter_map(|id| self.database.category(*id))
                    .map(|category| category.name.clone())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// 某 URL 上技术的版本列表，未检测到为空
    pub fn get_versions(&self, url: &str, tech_name: &str) -> Vec<String> {
        self.with_record(url, tech_name, |tech| tech.versions.clone())
            .unwrap_or_default()
    }

    /// 某 URL 上技术的总置信度，未检测到为 None
    pub fn get_confidence(&self, url: &str, tech_name: &str) -> Option<u32> {
        self.with_record(url, tech_name, DetectedTechnology::confidence)
    }

    /// implies 闭包
    pub fn implied_technologies<'a, I>(&self, technologies: I) -> BTreeSet<String>
    where
        I: IntoIterator<Item = &'a String>,
    {
        DetectionUpdater::implied_technologies(&self.database, technologies)
    }

    /// 某 URL 全部检测记录的快照
    pub fn detected(&self, url: &str) -> BTreeMap<String, DetectedTechnology> {
        let Some(slot) = lock(&self.detections).get(url).cloned() else {
            return BTreeMap::new();
        };
        let records = lock(&slot);
        records
            .iter()
            .map(|(name, tech)| (name.clone(), tech.clone()))
            .collect()
    }

    /// 丢弃某 URL 的检测记录
    pub fn discard(&self, url: &str) -> bool {
        lock(&self.detections).remove(url).is_some()
    }

    fn slot(&self, url: &str) -> DetectionSlot {
        lock(&self.detections)
            .entry(url.to_string())
            .or_default()
            .clone()
    }

    fn with_record<T>(&self, url: &str, tech_name: &str, f: impl FnOnce(&DetectedTechnology) -> T) -> Option<T> {
        let slot = lock(&self.detections).get(url).cloned()?;
        let records = lock(&slot);
        records.get(tech_name).map(f)
    }
}
