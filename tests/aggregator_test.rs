//! 被动聚合器的并发属性测试
//!
//! 用确定性的假数据源验证：结果不丢不重、通道在汇合屏障之后
//! 才关闭、去重与溯源行为符合约定。

use async_trait::async_trait;
use rsubfinder::{
    Agent, Session, Source, SourceResult, Statistics, StatsCell, SubdomainSearchConfig,
    SubdomainSearchEngine,
};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

/// 确定性地发出固定结果列表的假数据源，可选每条之间的延迟
struct FakeSource {
    name: String,
    hosts: Vec<String>,
    delay_ms: u64,
    stats: StatsCell,
}

impl FakeSource {
    fn new(name: &str, hosts: &[&str], delay_ms: u64) -> Box<dyn Source> {
        Box::new(FakeSource {
            name: name.to_string(),
            hosts: hosts.iter().map(|h| h.to_string()).collect(),
            delay_ms,
            stats: StatsCell::default(),
        })
    }
}

#[async_trait]
impl Source for FakeSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_default(&self) -> bool {
        true
    }

    fn has_recursive_support(&self) -> bool {
        false
    }

    fn needs_key(&self) -> bool {
        false
    }

    async fn run(&self, _domain: &str, _session: &Session, results: mpsc::Sender<SourceResult>) {
        self.stats.reset();

        for host in &self.hosts {
            if self.delay_ms > 0 {
                tokio::time::sleep(Duration::from_millis(self.delay_ms)).await;
            }
            self.stats.add_result();
            if results
                .send(SourceResult::Subdomain {
                    source: self.name.clone(),
                    value: host.clone(),
                })
                .await
                .is_err()
            {
                return;
            }
        }
    }

    fn statistics(&self) -> Statistics {
        self.stats.snapshot()
    }
}

fn test_session() -> Arc<Session> {
    Arc::new(Session::new("example.com", HashMap::new(), 0, 5).unwrap())
}

#[tokio::test]
async fn test_no_lost_or_duplicated_results() {
    // N个数据源各发k_i条结果，错开不同的延迟模拟乱序调度
    let mut sources = Vec::new();
    let mut expected_total = 0;
    for i in 0..8 {
        let count = 3 + i * 2;
        let hosts: Vec<String> = (0..count)
            .map(|j| format!("s{}h{}.example.com", i, j))
            .collect();
        let host_refs: Vec<&str> = hosts.iter().map(|h| h.as_str()).collect();
        sources.push(FakeSource::new(
            &format!("fake{}", i),
            &host_refs,
            (i % 4) as u64,
        ));
        expected_total += count;
    }

    let agent = Agent::with_sources(sources);
    let (mut rx, stats_handle) =
        agent.enumerate("example.com", test_session(), Duration::from_secs(30));

    let mut received = 0;
    while let Some(result) = rx.recv().await {
        assert!(matches!(result, SourceResult::Subdomain { .. }));
        received += 1;
    }

    // 通道关闭时恰好收到Σk_i条结果
    assert_eq!(received, expected_total);

    // 汇合屏障之后每个数据源都有统计快照
    let stats = stats_handle.await.unwrap();
    assert_eq!(stats.len(), 8);
    let reported_total: usize = stats.iter().map(|s| s.results).sum();
    assert_eq!(reported_total, expected_total);
}

#[tokio::test]
async fn test_deadline_cancels_slow_source() {
    let fast = FakeSource::new("fast", &["quick.example.com"], 0);
    // 慢数据源每条结果之间等待远超截止时间
    let slow = FakeSource::new(
        "slow",
        &["s1.example.com", "s2.example.com", "s3.example.com"],
        5_000,
    );

    let agent = Agent::with_sources(vec![fast, slow]);
    let started = std::time::Instant::now();
    let (mut rx, stats_handle) =
        agent.enumerate("example.com", test_session(), Duration::from_millis(300));

    let mut hosts = Vec::new();
    while let Some(result) = rx.recv().await {
        if let SourceResult::Subdomain { value, .. } = result {
            hosts.push(value);
        }
    }

    // 快数据源在截止前发出的结果不丢；慢数据源被及时终止
    assert!(hosts.contains(&"quick.example.com".to_string()));
    assert!(started.elapsed() < Duration::from_secs(3));

    let _ = stats_handle.await.unwrap();
}

#[tokio::test]
async fn test_dedup_and_provenance() {
    // A和B都报了shared；A还报了大小写变体和通配符前缀
    let a = FakeSource::new(
        "alpha",
        &[
            "shared.example.com",
            "Shared.EXAMPLE.com",
            "*.wild.example.com",
        ],
        0,
    );
    let b = FakeSource::new("beta", &["shared.example.com", "only-b.example.com"], 1);

    let config = SubdomainSearchConfig {
        silent: true,
        ..Default::default()
    };
    let engine =
        SubdomainSearchEngine::with_agent(config, Agent::with_sources(vec![a, b])).unwrap();
    let result = engine.enumerate_single_domain("example.com").await.unwrap();

    // 同一主机只保留一条，大小写和通配符前缀都归一
    assert_eq!(result.unique.len(), 3);
    assert!(result.unique.contains_key("shared.example.com"));
    assert!(result.unique.contains_key("wild.example.com"));
    assert!(result.unique.contains_key("only-b.example.com"));

    // 溯源集合记录了全部贡献者
    let shared_sources = &result.sources["shared.example.com"];
    assert_eq!(shared_sources.len(), 2);
    assert!(shared_sources.contains("alpha"));
    assert!(shared_sources.contains("beta"));
}

#[tokio::test]
async fn test_suffix_validation_scenario() {
    // 域外结果和主域名后缀不匹配的结果必须被丢弃
    let a = FakeSource::new("a", &["a.example.com", "A.example.com"], 0);
    let b = FakeSource::new("b", &["b.example.com", "notexample.com"], 0);

    let config = SubdomainSearchConfig {
        silent: true,
        ..Default::default()
    };
    let engine =
        SubdomainSearchEngine::with_agent(config, Agent::with_sources(vec![a, b])).unwrap();
    let result = engine.enumerate_single_domain("example.com").await.unwrap();

    let mut hosts: Vec<&String> = result.unique.keys().collect();
    hosts.sort();
    assert_eq!(hosts, vec!["a.example.com", "b.example.com"]);
    assert!(!result.unique.contains_key("notexample.com"));
}

/// 出错的数据源不影响兄弟数据源
struct FailingSource {
    stats: StatsCell,
}

#[async_trait]
impl Source for FailingSource {
    fn name(&self) -> &str {
        "failing"
    }

    fn is_default(&self) -> bool {
        true
    }

    fn has_recursive_support(&self) -> bool {
        false
    }

    fn needs_key(&self) -> bool {
        false
    }

    async fn run(&self, _domain: &str, _session: &Session, results: mpsc::Sender<SourceResult>) {
        self.stats.reset();
        self.stats.add_error();
        let _ = results
            .send(SourceResult::Error {
                source: "failing".to_string(),
                error: "decode error".to_string(),
            })
            .await;
    }

    fn statistics(&self) -> Statistics {
        self.stats.snapshot()
    }
}

#[tokio::test]
async fn test_source_error_is_non_fatal() {
    let ok = FakeSource::new("ok", &["fine.example.com"], 2);
    let bad: Box<dyn Source> = Box::new(FailingSource {
        stats: StatsCell::default(),
    });

    let config = SubdomainSearchConfig {
        silent: true,
        ..Default::default()
    };
    let engine =
        SubdomainSearchEngine::with_agent(config, Agent::with_sources(vec![ok, bad])).unwrap();
    let result = engine.enumerate_single_domain("example.com").await.unwrap();

    assert!(result.unique.contains_key("fine.example.com"));

    let failing_stats = result
        .stats
        .iter()
        .find(|s| s.name == "failing")
        .unwrap();
    assert_eq!(failing_stats.errors, 1);
    assert!(!failing_stats.skipped);
}

/// 未配置密钥时标记跳过的假数据源
struct KeyedSource {
    stats: StatsCell,
}

#[async_trait]
impl Source for KeyedSource {
    fn name(&self) -> &str {
        "keyed"
    }

    fn is_default(&self) -> bool {
        true
    }

    fn has_recursive_support(&self) -> bool {
        false
    }

    fn needs_key(&self) -> bool {
        true
    }

    async fn run(&self, _domain: &str, _session: &Session, _results: mpsc::Sender<SourceResult>) {
        self.stats.reset();
        // 没有密钥，直接标记跳过
        self.stats.mark_skipped();
    }

    fn statistics(&self) -> Statistics {
        self.stats.snapshot()
    }
}

#[tokio::test]
async fn test_keyed_source_without_key_is_skipped() {
    let ok = FakeSource::new("ok", &["x.example.com"], 0);
    let keyed: Box<dyn Source> = Box::new(KeyedSource {
        stats: StatsCell::default(),
    });

    let config = SubdomainSearchConfig {
        silent: true,
        ..Default::default()
    };
    let engine =
        SubdomainSearchEngine::with_agent(config, Agent::with_sources(vec![ok, keyed])).unwrap();
    let result = engine.enumerate_single_domain("example.com").await.unwrap();

    let keyed_stats = result.stats.iter().find(|s| s.name == "keyed").unwrap();
    assert!(keyed_stats.skipped);
    assert_eq!(keyed_stats.results, 0);
}
