//! 数据源插件契约
//!
//! 每个第三方数据源实现`Source` trait，在自己的任务中运行，
//! 把查询结果写入聚合器提供的通道。数据源持有私有的统计
//! 计数器和密钥池，单个实例只服务于一次枚举运行。

use async_trait::async_trait;
use rand::Rng;
use std::sync::Mutex;
use std::time::Duration;
use tokio::sync::mpsc;

use crate::session::Session;

/// 数据源产出的单条结果
#[derive(Debug, Clone)]
pub enum SourceResult {
    /// 发现的子域名候选
    Subdomain { source: String, value: String },
    /// 数据源内部错误，不影响其他数据源
    Error { source: String, error: String },
}

impl SourceResult {
    /// 产出该结果的数据源名称
    pub fn source(&self) -> &str {
        match self {
            SourceResult::Subdomain { source, .. } => source,
            SourceResult::Error { source, .. } => source,
        }
    }
}

/// 单个数据源一次运行的统计信息
#[derive(Debug, Clone, Default)]
pub struct Statistics {
    pub name: String,
    pub results: usize,
    pub errors: usize,
    pub elapsed: Duration,
    pub skipped: bool,
}

/// 数据源私有的统计计数器
///
/// 内部加锁，数据源在运行过程中更新，运行结束后由聚合器读取快照。
#[derive(Default)]
pub struct StatsCell {
    inner: Mutex<Statistics>,
}

impl StatsCell {
    /// 运行开始时清零上一次的计数
    pub fn reset(&self) {
        if let Ok(mut stats) = self.inner.lock() {
            *stats = Statistics::default();
        }
    }

    pub fn add_result(&self) {
        if let Ok(mut stats) = self.inner.lock() {
            stats.results += 1;
        }
    }

    pub fn add_error(&self) {
        if let Ok(mut stats) = self.inner.lock() {
            stats.errors += 1;
        }
    }

    /// 标记本次运行被跳过（例如未配置密钥）
    pub fn mark_skipped(&self) {
        if let Ok(mut stats) = self.inner.lock() {
            stats.skipped = true;
        }
    }

    pub fn snapshot(&self) -> Statistics {
        self.inner.lock().map(|s| s.clone()).unwrap_or_default()
    }
}

/// 数据源私有的API密钥池
///
/// 支持配置多个密钥，每次请求随机选取一个以分摊配额。
#[derive(Default)]
pub struct KeyPool {
    keys: Mutex<Vec<String>>,
}

impl KeyPool {
    pub fn set(&self, keys: &[String]) {
        if let Ok(mut pool) = self.keys.lock() {
            *pool = keys.to_vec();
        }
    }

    pub fn is_empty(&self) -> bool {
        self.keys.lock().map(|pool| pool.is_empty()).unwrap_or(true)
    }

    /// 随机选取一个密钥
    pub fn pick(&self) -> Option<String> {
        let pool = self.keys.lock().ok()?;
        if pool.is_empty() {
            return None;
        }
        let index = rand::thread_rng().gen_range(0..pool.len());
        Some(pool[index].clone())
    }
}

/// 数据源插件接口
///
/// 实现者约定：`run`开始时清零统计，结束前发送完所有结果，
/// 返回即视为流关闭；任何网络或解析错误转化为一条
/// [`SourceResult::Error`]，绝不使整个枚举过程崩溃。
#[async_trait]
pub trait Source: Send + Sync {
    /// 稳定的小写标识
    fn name(&self) -> &str;

    /// 是否属于默认启用的数据源集合
    fn is_default(&self) -> bool;

    /// 是否接受子域名（而不仅是顶级目标域名）作为查询输入
    fn has_recursive_support(&self) -> bool;

    /// 是否需要API密钥才能工作
    fn needs_key(&self) -> bool;

    /// 注入API密钥，无密钥需求的数据源忽略该调用
    fn add_api_keys(&self, _keys: &[String]) {}

    /// 针对单个域名执行查询，把每条结果写入`results`
    async fn run(&self, domain: &str, session: &Session, results: mpsc::Sender<SourceResult>);

    /// 最近一次运行的统计快照，只应在`run`返回后读取
    fn statistics(&self) -> Statistics;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stats_cell_counting() {
        let cell = StatsCell::default();
        cell.add_result();
        cell.add_result();
        cell.add_error();
        let stats = cell.snapshot();
        assert_eq!(stats.results, 2);
        assert_eq!(stats.errors, 1);
        assert!(!stats.skipped);

        cell.reset();
        assert_eq!(cell.snapshot().results, 0);
    }

    #[test]
    fn test_key_pool() {
        let pool = KeyPool::default();
        assert!(pool.is_empty());
        assert!(pool.pick().is_none());

        pool.set(&["k1".to_string(), "k2".to_string()]);
        assert!(!pool.is_empty());
        let picked = pool.pick().unwrap();
        assert!(picked == "k1" || picked == "k2");
    }
}
