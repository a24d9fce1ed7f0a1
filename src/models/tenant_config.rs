use serde::{Deserialize, Serialize};

use crate::error::{CatalogError, CatalogResult};

/// 阶段1: 匹配严格度
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchingPhase {
    pub enabled: bool,
    pub confidence_threshold: f64,
    pub auto_approve_above: f64,
    pub require_manual_review: bool,
}

impl Default for MatchingPhase {
    fn default() -> Self {
        Self {
            enabled: false,
            confidence_threshold: 0.7,
            auto_approve_above: 0.95,
            require_manual_review: false,
        }
    }
}

/// 阶段2: 新商品处理
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NewProductPhase {
    pub enabled: bool,
    pub require_approval_for_new: bool,
}

impl Default for NewProductPhase {
    fn default() -> Self {
        Self {
            enabled: false,
            require_approval_for_new: true,
        }
    }
}

/// 阶段3: 仅分析用途, 对匹配无影响
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyticsPhase {
    pub enabled: bool,
}

/// 租户匹配配置快照, 每次导入构造一次
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TenantMatchingConfig {
    pub phase1: MatchingPhase,
    pub phase2: NewProductPhase,
    pub phase3: AnalyticsPhase,
}

impl TenantMatchingConfig {
    /// 配置写入时的校验: 阶段依赖与阈值范围
    pub fn validate(&self) -> CatalogResult<()> {
        if self.phase2.enabled && !self.phase1.enabled {
            return Err(CatalogError::InvalidConfig(
                "phase 2 requires phase 1 to be enabled".to_string(),
            ));
        }
        if self.phase3.enabled && !self.phase2.enabled {
            return Err(CatalogError::InvalidConfig(
                "phase 3 requires phase 2 to be enabled".to_string(),
            ));
        }

        let p1 = &self.phase1;
        for (name, value) in [
            ("confidence_threshold", p1.confidence_threshold),
            ("auto_approve_above", p1.auto_approve_above),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(CatalogError::InvalidConfig(format!(
                    "{name} must be within [0, 1], got {value}"
                )));
            }
        }
        if p1.confidence_threshold > p1.auto_approve_above {
            return Err(CatalogError::InvalidConfig(format!(
                "confidence_threshold ({}) must not exceed auto_approve_above ({})",
                p1.confidence_threshold, p1.auto_approve_above
            )));
        }

        Ok(())
    }
}
