//! 主动解析工作池
//!
//! 固定数量的worker从任务队列消费候选主机，做A记录解析并过滤
//! 泛解析误报。泛解析IP集合在池启动前检测完毕，作为冻结快照
//! 传入，worker只读。所有worker退出后结果通道才关闭。

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinSet;
use tokio::time::Instant;

use crate::dns_resolver::{lookup_with_retries, DnsClient, LookupOutcome};

/// 流水线各级通道的容量，内存占用随流水线深度而不是结果总量增长
pub const CHANNEL_CAPACITY: usize = 128;

/// 等待主动解析的候选主机
#[derive(Debug, Clone)]
pub struct HostEntry {
    pub host: String,
    pub domain: String,
    pub source: String,
}

/// 解析worker产出的结果
#[derive(Debug, Clone)]
pub enum ResolveResult {
    /// 解析成功且不属于泛解析的主机
    Subdomain {
        host: String,
        ip: String,
        source: String,
    },
    /// 重试耗尽后仍然失败的查询
    Error { host: String, error: String },
}

/// 主动解析工作池
pub struct ResolutionPool {
    client: Arc<dyn DnsClient>,
    resolvers: Vec<String>,
    workers: usize,
    remove_wildcard: bool,
    wildcard_ips: Arc<HashSet<String>>,
    max_resolution_time: Duration,
}

impl ResolutionPool {
    /// 创建工作池
    ///
    /// `wildcard_ips`是检测阶段产出的冻结快照，此后没有写入者。
    pub fn new(
        client: Arc<dyn DnsClient>,
        resolvers: Vec<String>,
        workers: usize,
        remove_wildcard: bool,
        wildcard_ips: HashSet<String>,
        max_resolution_time: Duration,
    ) -> Self {
        ResolutionPool {
            client,
            resolvers,
            workers: workers.max(1),
            remove_wildcard,
            wildcard_ips: Arc::new(wildcard_ips),
            max_resolution_time,
        }
    }

    /// 启动全部worker，返回结果通道
    ///
    /// worker在任务队列关闭取尽或解析阶段超时后退出；
    /// 等所有worker结束，最后一个发送端被丢弃，结果通道关闭。
    pub fn spawn(self: Arc<Self>, tasks: mpsc::Receiver<HostEntry>) -> mpsc::Receiver<ResolveResult> {
        let (results_tx, results_rx) = mpsc::channel(CHANNEL_CAPACITY);
        let tasks = Arc::new(Mutex::new(tasks));
        let deadline = Instant::now() + self.max_resolution_time;

        tokio::spawn(async move {
            let mut workers = JoinSet::new();

            for _ in 0..self.workers {
                let pool = Arc::clone(&self);
                let tasks = Arc::clone(&tasks);
                let results = results_tx.clone();
                workers.spawn(async move {
                    pool.worker_loop(tasks, results, deadline).await;
                });
            }
            drop(results_tx);

            while workers.join_next().await.is_some() {}
        });

        results_rx
    }

    async fn worker_loop(
        &self,
        tasks: Arc<Mutex<mpsc::Receiver<HostEntry>>>,
        results: mpsc::Sender<ResolveResult>,
        deadline: Instant,
    ) {
        loop {
            let entry = {
                let mut queue = tasks.lock().await;
                match tokio::time::timeout_at(deadline, queue.recv()).await {
                    Ok(Some(entry)) => entry,
                    // 队列已关闭且取尽
                    Ok(None) => break,
                    // 解析阶段整体超时
                    Err(_) => break,
                }
            };

            self.resolve_entry(entry, &results).await;
        }
    }

    /// 解析单个候选主机
    async fn resolve_entry(&self, entry: HostEntry, results: &mpsc::Sender<ResolveResult>) {
        if !self.remove_wildcard {
            // 不做泛解析过滤时直接放行
            let _ = results
                .send(ResolveResult::Subdomain {
                    host: entry.host,
                    ip: String::new(),
                    source: entry.source,
                })
                .await;
            return;
        }

        match lookup_with_retries(self.client.as_ref(), &self.resolvers, &entry.host).await {
            Ok(LookupOutcome::Records(ips)) => {
                // 任何一个IP命中泛解析集合，整个主机按误报丢弃
                if ips.iter().any(|ip| self.wildcard_ips.contains(ip)) {
                    return;
                }

                let _ = results
                    .send(ResolveResult::Subdomain {
                        host: entry.host,
                        ip: ips[0].clone(),
                        source: entry.source,
                    })
                    .await;
            }
            Ok(LookupOutcome::NoRecords) => {
                // 确认解析不出来，不是查询故障，静默丢弃
            }
            Err(e) => {
                let _ = results
                    .send(ResolveResult::Error {
                        host: entry.host,
                        error: e,
                    })
                    .await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::HashMap;

    /// 按主机名查表返回结果的假客户端
    struct TableClient {
        table: HashMap<String, LookupOutcome>,
    }

    #[async_trait]
    impl DnsClient for TableClient {
        async fn lookup_a(&self, _resolver: &str, host: &str) -> Result<LookupOutcome, String> {
            match self.table.get(host) {
                Some(outcome) => Ok(outcome.clone()),
                None => Err("timeout".to_string()),
            }
        }
    }

    fn pool_with(
        table: HashMap<String, LookupOutcome>,
        wildcard_ips: HashSet<String>,
        remove_wildcard: bool,
    ) -> Arc<ResolutionPool> {
        Arc::new(ResolutionPool::new(
            Arc::new(TableClient { table }),
            vec!["10.0.0.53".to_string()],
            4,
            remove_wildcard,
            wildcard_ips,
            Duration::from_secs(10),
        ))
    }

    fn entry(host: &str) -> HostEntry {
        HostEntry {
            host: host.to_string(),
            domain: "example.com".to_string(),
            source: "test".to_string(),
        }
    }

    async fn run_pool(
        pool: Arc<ResolutionPool>,
        entries: Vec<HostEntry>,
    ) -> Vec<ResolveResult> {
        let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
        let mut results_rx = pool.spawn(rx);

        for e in entries {
            tx.send(e).await.unwrap();
        }
        drop(tx);

        let mut collected = Vec::new();
        while let Some(result) = results_rx.recv().await {
            collected.push(result);
        }
        collected
    }

    #[tokio::test]
    async fn test_wildcard_filtering() {
        let mut table = HashMap::new();
        table.insert(
            "a.example.com".to_string(),
            LookupOutcome::Records(vec!["10.0.0.1".to_string()]),
        );
        table.insert(
            "b.example.com".to_string(),
            LookupOutcome::Records(vec!["10.0.0.2".to_string()]),
        );

        let mut wildcard = HashSet::new();
        wildcard.insert("10.0.0.1".to_string());

        let results = run_pool(
            pool_with(table, wildcard, true),
            vec![entry("a.example.com"), entry("b.example.com")],
        )
        .await;

        // 命中泛解析集合的a被丢弃，b保留
        assert_eq!(results.len(), 1);
        match &results[0] {
            ResolveResult::Subdomain { host, ip, .. } => {
                assert_eq!(host, "b.example.com");
                assert_eq!(ip, "10.0.0.2");
            }
            other => panic!("意外的结果: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_empty_answer_dropped_silently() {
        let mut table = HashMap::new();
        table.insert("gone.example.com".to_string(), LookupOutcome::NoRecords);

        let results = run_pool(
            pool_with(table, HashSet::new(), true),
            vec![entry("gone.example.com")],
        )
        .await;

        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn test_lookup_error_reported_per_host() {
        // 表中没有的主机一律返回I/O错误
        let results = run_pool(
            pool_with(HashMap::new(), HashSet::new(), true),
            vec![entry("x.example.com")],
        )
        .await;

        assert_eq!(results.len(), 1);
        assert!(matches!(&results[0], ResolveResult::Error { host, .. } if host == "x.example.com"));
    }

    #[tokio::test]
    async fn test_passthrough_when_filtering_disabled() {
        let results = run_pool(
            pool_with(HashMap::new(), HashSet::new(), false),
            vec![entry("a.example.com")],
        )
        .await;

        assert_eq!(results.len(), 1);
        match &results[0] {
            ResolveResult::Subdomain { host, ip, .. } => {
                assert_eq!(host, "a.example.com");
                assert!(ip.is_empty());
            }
            other => panic!("意外的结果: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_result_channel_closes_after_all_workers() {
        let mut table = HashMap::new();
        for i in 0..50 {
            table.insert(
                format!("h{}.example.com", i),
                LookupOutcome::Records(vec![format!("10.1.0.{}", i)]),
            );
        }
        let entries: Vec<HostEntry> = (0..50).map(|i| entry(&format!("h{}.example.com", i))).collect();

        let results = run_pool(pool_with(table, HashSet::new(), true), entries).await;
        // 通道关闭时50个任务的结果一个不少
        assert_eq!(results.len(), 50);
    }
}
