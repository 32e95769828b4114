//! 枚举引擎与流水线
//!
//! 把被动聚合器、去重消费端和主动解析工作池串成一条流水线：
//! 聚合器并发运行全部数据源 → 单一消费端做校验、规范化、去重
//! 和溯源记录 → 需要时把未见过的主机转发给解析工作池过滤泛解析。
//! 各级之间用有界通道连接，内存占用随流水线深度而不是结果总量增长。

use log::warn;
use std::collections::{BTreeSet, HashMap};
use std::io::BufRead;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

use crate::agent::Agent;
use crate::config::DEFAULT_RESOLVERS;
use crate::dns_resolver::{DnsClient, TrustDnsClient};
use crate::resolve::{HostEntry, ResolutionPool, ResolveResult, CHANNEL_CAPACITY};
use crate::session::Session;
use crate::source::{SourceResult, Statistics};
use crate::util::{is_subdomain_of, normalize_host};
use crate::wildcard::WildcardDetector;

/// 子域名搜索配置
#[derive(Debug, Clone)]
pub struct SubdomainSearchConfig {
    /// 指定启用的数据源名称，为空时使用默认集合
    pub sources: Vec<String>,
    /// 排除的数据源名称，优先级最高
    pub exclude_sources: Vec<String>,
    /// 启用全部数据源
    pub use_all_sources: bool,
    /// 只启用支持递归查询的数据源
    pub recursive_only: bool,
    /// 数据源名称到API密钥列表的映射
    pub provider_keys: HashMap<String, Vec<String>>,
    /// DNS解析器列表，为空时使用内置列表
    pub resolvers: Vec<String>,
    /// 是否做主动解析并过滤泛解析误报
    pub remove_wildcard: bool,
    /// 解析worker数量
    pub threads: usize,
    /// 单个HTTP请求的超时秒数
    pub timeout_secs: u64,
    /// 被动枚举阶段的总时长上限（秒），约束所有数据源
    pub max_enumeration_time_secs: u64,
    /// 主动解析阶段的总时长上限（秒）
    pub max_resolution_time_secs: u64,
    /// 每秒HTTP请求数上限，0为不限制
    pub rate_limit: u32,
    /// 静默模式，只输出结果本身
    pub silent: bool,
}

impl Default for SubdomainSearchConfig {
    fn default() -> Self {
        SubdomainSearchConfig {
            sources: Vec::new(),
            exclude_sources: Vec::new(),
            use_all_sources: false,
            recursive_only: false,
            provider_keys: HashMap::new(),
            resolvers: Vec::new(),
            remove_wildcard: false,
            threads: 10,
            timeout_secs: 30,
            max_enumeration_time_secs: 180,
            max_resolution_time_secs: 300,
            rate_limit: 0,
            silent: false,
        }
    }
}

/// 通过主动解析确认的主机
#[derive(Debug, Clone)]
pub struct ResolvedHost {
    pub host: String,
    pub ip: String,
    pub source: String,
}

/// 一次枚举的完整产出
#[derive(Debug, Default)]
pub struct EnumerationResult {
    pub domain: String,
    /// 主机名到首个发现它的数据源
    pub unique: HashMap<String, String>,
    /// 主机名到所有贡献过它的数据源
    pub sources: HashMap<String, BTreeSet<String>>,
    /// 主动解析阶段确认的主机（未启用时为空）
    pub resolved: Vec<ResolvedHost>,
    /// 各数据源的统计快照
    pub stats: Vec<Statistics>,
    pub elapsed: Duration,
}

/// 子域名搜索引擎
pub struct SubdomainSearchEngine {
    config: SubdomainSearchConfig,
    agent: Agent,
    resolvers: Vec<String>,
}

impl SubdomainSearchEngine {
    /// 创建新的搜索引擎
    pub fn new(config: SubdomainSearchConfig) -> Result<Self, Box<dyn std::error::Error>> {
        let agent = Agent::new(
            &config.sources,
            &config.exclude_sources,
            config.use_all_sources,
            config.recursive_only,
        );

        Self::with_agent(config, agent)
    }

    /// 使用给定的数据源集合创建搜索引擎
    ///
    /// 库用户可以通过[`Agent::with_sources`]注入内置注册表之外的
    /// 自定义数据源。
    pub fn with_agent(
        config: SubdomainSearchConfig,
        agent: Agent,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        if agent.is_empty() {
            return Err("没有可用的数据源".into());
        }

        agent.add_api_keys(&config.provider_keys);

        let resolvers = if config.resolvers.is_empty() {
            DEFAULT_RESOLVERS.clone()
        } else {
            config.resolvers.clone()
        };

        Ok(SubdomainSearchEngine {
            config,
            agent,
            resolvers,
        })
    }

    /// 当前选定的数据源名称
    pub fn source_names(&self) -> Vec<String> {
        self.agent.source_names()
    }

    /// 枚举单个域名
    pub async fn enumerate_single_domain(
        &self,
        domain: &str,
    ) -> Result<EnumerationResult, Box<dyn std::error::Error>> {
        let domain = domain.trim().trim_matches('.').to_lowercase();
        let session = Arc::new(Session::new(
            &domain,
            self.config.provider_keys.clone(),
            self.config.rate_limit,
            self.config.timeout_secs,
        )?);

        let start = std::time::Instant::now();

        let (mut passive_rx, stats_handle) = self.agent.enumerate(
            &domain,
            session,
            Duration::from_secs(self.config.max_enumeration_time_secs),
        );

        // 主动解析：泛解析检测必须在worker启动之前完成，
        // 检测产出的IP集合作为冻结快照传入工作池
        let mut task_tx = None;
        let mut resolve_collector = None;
        if self.config.remove_wildcard {
            let client: Arc<dyn DnsClient> = Arc::new(TrustDnsClient::new(&self.resolvers));
            let detector = WildcardDetector::new(Arc::clone(&client), self.resolvers.clone());
            let wildcard_ips = detector.detect(&domain).await;

            let pool = Arc::new(ResolutionPool::new(
                client,
                self.resolvers.clone(),
                self.config.threads,
                true,
                wildcard_ips,
                Duration::from_secs(self.config.max_resolution_time_secs),
            ));

            let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
            let mut pool_results = pool.spawn(rx);
            task_tx = Some(tx);

            // 解析结果收集任务，与去重消费端并发运行，避免有界通道互相堵死
            resolve_collector = Some(tokio::spawn(async move {
                let mut resolved = Vec::new();
                while let Some(result) = pool_results.recv().await {
                    match result {
                        ResolveResult::Subdomain { host, ip, source } => {
                            resolved.push(ResolvedHost { host, ip, source });
                        }
                        ResolveResult::Error { host, error } => {
                            warn!("解析 {} 失败: {}", host, error);
                        }
                    }
                }
                resolved
            }));
        }

        // 去重与溯源消费端：合并流的单一所有者
        let mut unique: HashMap<String, String> = HashMap::new();
        let mut sources_map: HashMap<String, BTreeSet<String>> = HashMap::new();

        while let Some(result) = passive_rx.recv().await {
            match result {
                SourceResult::Error { source, error } => {
                    warn!("数据源 {} 出错: {}", source, error);
                }
                SourceResult::Subdomain { source, value } => {
                    let host = normalize_host(&value);
                    if host.is_empty() || !is_subdomain_of(&host, &domain) {
                        continue;
                    }

                    sources_map
                        .entry(host.clone())
                        .or_default()
                        .insert(source.clone());

                    if unique.contains_key(&host) {
                        continue;
                    }
                    unique.insert(host.clone(), source.clone());

                    if !self.config.silent {
                        println!("{} [{}]", host, source);
                    }

                    let send_failed = match &task_tx {
                        Some(tx) => {
                            let entry = HostEntry {
                                host: host.clone(),
                                domain: domain.clone(),
                                source: source.clone(),
                            };
                            tx.send(entry).await.is_err()
                        }
                        None => false,
                    };
                    if send_failed {
                        // 工作池已超时退出，剩余主机只做被动收集
                        task_tx = None;
                    }
                }
            }
        }

        // 关闭任务队列，worker取尽后退出
        drop(task_tx);

        let resolved = match resolve_collector {
            Some(handle) => handle.await.unwrap_or_default(),
            None => Vec::new(),
        };
        let stats = stats_handle.await.unwrap_or_default();

        Ok(EnumerationResult {
            domain,
            unique,
            sources: sources_map,
            resolved,
            stats,
            elapsed: start.elapsed(),
        })
    }

    /// 从reader逐行读取域名并依次枚举，跳过空行和注释
    pub async fn enumerate_multiple_domains<R: BufRead>(
        &self,
        reader: R,
    ) -> Result<Vec<EnumerationResult>, Box<dyn std::error::Error>> {
        let mut all_results = Vec::new();

        for line in reader.lines() {
            let line = line?;
            let domain = line.trim();
            if domain.is_empty() || domain.starts_with('#') {
                continue;
            }

            all_results.push(self.enumerate_single_domain(domain).await?);
        }

        Ok(all_results)
    }
}

/// 便捷的子域名搜索函数
pub async fn search_subdomains(
    domain: &str,
    remove_wildcard: bool,
) -> Result<EnumerationResult, Box<dyn std::error::Error>> {
    let config = SubdomainSearchConfig {
        remove_wildcard,
        silent: true,
        ..Default::default()
    };

    let engine = SubdomainSearchEngine::new(config)?;
    engine.enumerate_single_domain(domain).await
}
