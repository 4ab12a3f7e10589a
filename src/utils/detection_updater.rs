//! 检测结果更新工具
//! 负责记录命中（覆盖置信度键、提取并合并版本）与 implies 关联推导

use std::collections::{BTreeSet, HashMap};
use tracing::debug;

use crate::compiler::SignatureDatabase;
use crate::detector::{DetectedTechnology, MatchEvent};
use crate::utils::VersionExtractor;

/// 检测结果更新工具
pub struct DetectionUpdater;

impl DetectionUpdater {
    /// 记录一次命中（首次命中时创建记录）
    pub fn record(
        detected: &mut HashMap<String, DetectedTechnology>,
        tech_name: &str,
        event: &MatchEvent<'_>,
    ) {
        let tech = detected
            .entry(tech_name.to_string())
            .or_insert_with(|| DetectedTechnology::new(tech_name));

        let pattern = event.pattern;
        tech.set_confidence(event.confidence_key(), pattern.confidence());

        let Some(template) = pattern.version_template() else {
            return;
        };
        let versions = VersionExtractor::extract_all(pattern.matcher(), template, &event.value);
        if !versions.is_empty() {
            debug!("{} version candidates from {}: {:?}", tech_name, event.surface, versions);
        }
        tech.add_versions(versions);
    }

    /// 推导 implies 闭包（不含输入本身，除非经由环路回到自身）
    /// 逐代推导，累积集合不再增长时终止
    pub fn implied_technologies<'a, I>(db: &SignatureDatabase, technologies: I) -> BTreeSet<String>
    where
        I: IntoIterator<Item = &'a String>,
    {
        let mut implied = Self::next_generation(db, technologies);
        let mut all_implied = BTreeSet::new();

        while !all_implied.is_superset(&implied) {
            all_implied.extend(implied);
            implied = Self::next_generation(db, &all_implied);
        }
        all_implied
    }

    /// 单代推导：无 confidence 指令直接加入，有指令需达到阈值；未知技术忽略
    fn next_generation<'a, I>(db: &SignatureDatabase, technologies: I) -> BTreeSet<String>
    where
        I: IntoIterator<Item = &'a String>,
    {
        technologies
            .into_iter()
            .filter_map(|name| db.fingerprint(name))
            .flat_map(|fingerprint| fingerprint.implies.iter())
            .filter(|implication| implication.is_certain())
            .filter(|implication| db.technologies.contains_key(&implication.name))
            .map(|implication| implication.name.clone())
            .collect()
    }
}
