use rand::Rng;
use std::sync::atomic::{AtomicU64, Ordering};

/// 目录条目内部编码生成器
///
/// 每次调用都应给出新的编码, 创建冲突时引擎会再次调用.
pub trait CodeGenerator: Send + Sync {
    fn generate(&self, tenant_id: &str, normalized_description: &str) -> String;
}

/// 描述前缀: 前三个字母数字字符大写, 不足补 X
pub fn code_prefix(normalized_description: &str) -> String {
    let mut prefix: String = normalized_description
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .take(3)
        .collect::<String>()
        .to_ascii_uppercase();
    while prefix.len() < 3 {
        prefix.push('X');
    }
    prefix
}

/// 前缀 + 6 位随机数
#[derive(Debug, Default, Clone, Copy)]
pub struct RandomCodeGenerator;

impl CodeGenerator for RandomCodeGenerator {
    fn generate(&self, _tenant_id: &str, normalized_description: &str) -> String {
        let suffix: u32 = rand::rng().random_range(0..1_000_000);
        format!("{}-{:06}", code_prefix(normalized_description), suffix)
    }
}

/// 前缀 + 递增序号
#[derive(Debug)]
pub struct SequentialCodeGenerator {
    next: AtomicU64,
}

impl Default for SequentialCodeGenerator {
    fn default() -> Self {
        Self::starting_at(1)
    }
}

impl SequentialCodeGenerator {
    pub fn starting_at(first: u64) -> Self {
        Self {
            next: AtomicU64::new(first),
        }
    }
}

impl CodeGenerator for SequentialCodeGenerator {
    fn generate(&self, _tenant_id: &str, normalized_description: &str) -> String {
        let n = self.next.fetch_add(1, Ordering::Relaxed);
        format!("{}-{:06}", code_prefix(normalized_description), n)
    }
}
