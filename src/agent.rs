//! 数据源代理与被动聚合器
//!
//! Agent持有一次运行选定的数据源集合。`enumerate`为每个数据源
//! 启动一个并发任务，所有任务受同一个截止时间约束，结果汇入
//! 一条共享通道；全部任务结束后通道关闭，并收齐每个数据源的
//! 统计快照。

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::{JoinHandle, JoinSet};
use tokio::time::Instant;

use crate::resolve::CHANNEL_CAPACITY;
use crate::session::Session;
use crate::source::{Source, SourceResult, Statistics};
use crate::sources;

/// 一次枚举运行所使用的数据源集合
pub struct Agent {
    sources: HashMap<String, Arc<dyn Source>>,
}

impl Agent {
    /// 按选择规则构建数据源集合
    ///
    /// 选择顺序：`recursive_only`优先取支持递归查询的子集；
    /// 其次`use_all`取全部；否则取指定名称（为空时取默认集合）。
    /// 排除列表永远最后生效，即使名称被显式指定。未知名称忽略。
    pub fn new(
        requested: &[String],
        exclusions: &[String],
        use_all: bool,
        recursive_only: bool,
    ) -> Self {
        let registry = sources::all_sources();

        let mut selected: Vec<Box<dyn Source>> = if recursive_only {
            registry
                .into_iter()
                .filter(|s| s.has_recursive_support())
                .collect()
        } else if use_all {
            registry
        } else if !requested.is_empty() {
            let wanted: HashSet<String> = requested.iter().map(|n| n.to_lowercase()).collect();
            registry
                .into_iter()
                .filter(|s| wanted.contains(s.name()))
                .collect()
        } else {
            registry.into_iter().filter(|s| s.is_default()).collect()
        };

        let excluded: HashSet<String> = exclusions.iter().map(|n| n.to_lowercase()).collect();
        selected.retain(|s| !excluded.contains(s.name()));

        Self::with_sources(selected)
    }

    /// 从给定的数据源集合构建，库用户可以注入自定义数据源
    pub fn with_sources(list: Vec<Box<dyn Source>>) -> Self {
        let sources = list
            .into_iter()
            .map(|s| (s.name().to_string(), Arc::from(s)))
            .collect();
        Agent { sources }
    }

    /// 把配置的API密钥分发给需要密钥的数据源
    pub fn add_api_keys(&self, keys: &HashMap<String, Vec<String>>) {
        for (name, source) in &self.sources {
            if source.needs_key() {
                if let Some(list) = keys.get(name) {
                    source.add_api_keys(list);
                }
            }
        }
    }

    /// 选定数据源的名称列表（有序）
    pub fn source_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.sources.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    /// 并发运行全部数据源，把结果合并为一条流
    ///
    /// 返回合并后的接收端和统计收集任务。`max_enumeration_time`
    /// 从调用时刻起对所有数据源统一生效，与各数据源自己的单请求
    /// 超时无关；截止后尚未结束的任务在下一个等待点被终止，已经
    /// 发出的结果不会丢失。通道在全部任务结束后才关闭。
    pub fn enumerate(
        &self,
        domain: &str,
        session: Arc<Session>,
        max_enumeration_time: Duration,
    ) -> (mpsc::Receiver<SourceResult>, JoinHandle<Vec<Statistics>>) {
        let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
        let deadline = Instant::now() + max_enumeration_time;
        let mut tasks = JoinSet::new();

        for source in self.sources.values() {
            let source = Arc::clone(source);
            let session = Arc::clone(&session);
            let tx = tx.clone();
            let domain = domain.to_string();

            tasks.spawn(async move {
                let start = std::time::Instant::now();
                let _ = tokio::time::timeout_at(deadline, source.run(&domain, &session, tx)).await;
                (source, start.elapsed())
            });
        }
        drop(tx);

        // 汇合屏障：等所有数据源任务结束，收齐统计快照
        let collector = tokio::spawn(async move {
            let mut stats = Vec::new();
            while let Some(joined) = tasks.join_next().await {
                if let Ok((source, elapsed)) = joined {
                    let mut snapshot = source.statistics();
                    snapshot.name = source.name().to_string();
                    snapshot.elapsed = elapsed;
                    stats.push(snapshot);
                }
            }
            stats
        });

        (rx, collector)
    }
}
