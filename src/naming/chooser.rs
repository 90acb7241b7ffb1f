//! 加权随机选择
//!
//! 先把 (item, weight) 归一化成累计概率数组，再对每次抽样做二分查找：
//! 构建 O(n)，抽样 O(log n)。分布构建后不可变，需要反映新权重时重新构建。

use rand::Rng;

use crate::error::{NacosError, Result};

/// 无穷大权重被截断到的值
pub const INFINITE_WEIGHT: f64 = 10_000.0;

/// NaN 权重被替换成的值
pub const NAN_WEIGHT: f64 = 1.0;

/// 累计概率末项与 1.0 的允许误差
pub const PRECISION_DELTA: f64 = 0.0001;

/// 归一化单个权重
///
/// - `NaN` → 1.0
/// - `<= 0`（包括 `-inf`）→ 排除
/// - `+inf` → 10000.0
/// - 其余正数原样使用
pub fn normalize_weight(weight: f64) -> Option<f64> {
    if weight.is_nan() {
        Some(NAN_WEIGHT)
    } else if weight <= 0.0 {
        None
    } else if weight.is_infinite() {
        Some(INFINITE_WEIGHT)
    } else {
        Some(weight)
    }
}

/// 加权分布
#[derive(Debug, Clone)]
pub struct Distribution<T> {
    items: Vec<T>,
    cumulative: Vec<f64>,
}

impl<T> Distribution<T> {
    /// 从 (item, weight) 构建分布
    ///
    /// 输入为空或全部权重被排除时返回空分布；抽样时才报 [`NacosError::EmptyCandidateSet`]。
    /// 累计概率末项偏离 1.0 超过 [`PRECISION_DELTA`] 时返回
    /// [`NacosError::DegenerateDistribution`]，这是归一化本身的缺陷，不应重试。
    pub fn build<I>(weighted: I) -> Result<Self>
    where
        I: IntoIterator<Item = (T, f64)>,
    {
        let mut items = Vec::new();
        let mut weights = Vec::new();

        for (item, weight) in weighted {
            if let Some(weight) = normalize_weight(weight) {
                items.push(item);
                weights.push(weight);
            }
        }

        if items.is_empty() {
            return Ok(Self {
                items,
                cumulative: Vec::new(),
            });
        }

        // 先按最大权重缩放到 (0, 1]，求和不会溢出
        let max = weights.iter().copied().fold(0.0_f64, f64::max);
        for weight in &mut weights {
            *weight /= max;
        }
        let total: f64 = weights.iter().sum();

        let mut running = 0.0;
        let cumulative: Vec<f64> = weights
            .iter()
            .map(|weight| {
                running += weight / total;
                running
            })
            .collect();

        let last = cumulative.last().copied().unwrap_or_default();
        if !((last - 1.0).abs() < PRECISION_DELTA) {
            return Err(NacosError::DegenerateDistribution { total: last });
        }

        Ok(Self { items, cumulative })
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// 参与抽样的条目（已排除非正权重）
    pub fn items(&self) -> &[T] {
        &self.items
    }

    /// 累计概率数组
    pub fn cumulative(&self) -> &[f64] {
        &self.cumulative
    }

    /// 使用线程本地随机数抽样
    pub fn sample(&self) -> Result<&T> {
        self.sample_with(&mut rand::thread_rng())
    }

    /// 使用给定随机数源抽样
    pub fn sample_with<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<&T> {
        if self.items.is_empty() {
            return Err(NacosError::empty_candidates(
                "distribution has no item with positive weight",
            ));
        }
        let value: f64 = rng.r#gen();
        Ok(&self.items[self.index_for(value)])
    }

    /// 二分查找第一个 `cumulative >= value` 的位置；浮点误差导致越界时取最后一项
    fn index_for(&self, value: f64) -> usize {
        let index = self.cumulative.partition_point(|c| *c < value);
        index.min(self.items.len() - 1)
    }

    /// 取出条目，丢弃累计概率
    pub fn into_items(self) -> Vec<T> {
        self.items
    }
}
