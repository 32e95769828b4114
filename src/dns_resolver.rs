//! DNS查询模块
//!
//! 对trust-dns的封装：每个配置的上游解析器对应一个独立的
//! `TokioAsyncResolver`实例。查询策略（随机选择解析器、失败重试）
//! 由[`lookup_with_retries`]统一实现，泛解析检测和解析工作池共用。

use async_trait::async_trait;
use rand::Rng;
use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;
use trust_dns_resolver::config::{NameServerConfig, Protocol, ResolverConfig, ResolverOpts};
use trust_dns_resolver::error::ResolveErrorKind;
use trust_dns_resolver::TokioAsyncResolver;

/// 单个主机查询失败后的最大重试次数
pub const MAX_RESOLVE_RETRIES: usize = 5;

/// 单次A记录查询的结果
#[derive(Debug, Clone)]
pub enum LookupOutcome {
    /// 查询成功并返回了记录
    Records(Vec<String>),
    /// 查询成功但没有记录（含NXDOMAIN），不需要重试
    NoRecords,
}

/// DNS查询客户端接口
///
/// 生产实现基于trust-dns；测试中可以注入确定性的假实现。
/// `Err`表示可重试的I/O失败，"没有记录"不是错误。
#[async_trait]
pub trait DnsClient: Send + Sync {
    /// 使用指定的上游解析器查询host的A记录
    async fn lookup_a(&self, resolver: &str, host: &str) -> Result<LookupOutcome, String>;
}

/// 基于trust-dns的生产DNS客户端
pub struct TrustDnsClient {
    resolvers: HashMap<String, TokioAsyncResolver>,
}

impl TrustDnsClient {
    /// 为每个上游解析器地址构建一个独立的解析器实例
    ///
    /// 重试由调用方控制，这里把trust-dns自身的重试关掉。
    pub fn new(addrs: &[String]) -> Self {
        let mut resolvers = HashMap::new();

        for addr in addrs {
            if let Ok(ip) = addr.parse::<IpAddr>() {
                let mut config = ResolverConfig::new();
                config.add_name_server(NameServerConfig::new(
                    SocketAddr::new(ip, 53),
                    Protocol::Udp,
                ));

                let mut opts = ResolverOpts::default();
                opts.attempts = 1;
                opts.timeout = Duration::from_secs(3);

                let resolver = TokioAsyncResolver::tokio(config, opts);
                resolvers.insert(addr.clone(), resolver);
            }
        }

        TrustDnsClient { resolvers }
    }
}

#[async_trait]
impl DnsClient for TrustDnsClient {
    async fn lookup_a(&self, resolver: &str, host: &str) -> Result<LookupOutcome, String> {
        let resolver = self
            .resolvers
            .get(resolver)
            .ok_or_else(|| format!("未知解析器: {}", resolver))?;

        match resolver.lookup_ip(host).await {
            Ok(response) => {
                let ips: Vec<String> = response
                    .iter()
                    .filter_map(|ip| {
                        if let IpAddr::V4(ipv4) = ip {
                            Some(ipv4.to_string())
                        } else {
                            None
                        }
                    })
                    .collect();

                if ips.is_empty() {
                    Ok(LookupOutcome::NoRecords)
                } else {
                    Ok(LookupOutcome::Records(ips))
                }
            }
            Err(e) => match e.kind() {
                // 没有记录不是故障，也不值得换解析器重试
                ResolveErrorKind::NoRecordsFound { .. } => Ok(LookupOutcome::NoRecords),
                _ => Err(e.to_string()),
            },
        }
    }
}

/// 从解析器列表中随机选取一个
pub fn pick_resolver(resolvers: &[String]) -> String {
    if resolvers.is_empty() {
        return String::new();
    }
    let index = rand::thread_rng().gen_range(0..resolvers.len());
    resolvers[index].clone()
}

/// 带重试的A记录查询
///
/// 每次尝试随机选择一个解析器，I/O失败时最多重试
/// [`MAX_RESOLVE_RETRIES`]次；成功（含无记录）立即返回。
pub async fn lookup_with_retries(
    client: &dyn DnsClient,
    resolvers: &[String],
    host: &str,
) -> Result<LookupOutcome, String> {
    let mut last_error = String::from("没有可用的解析器");

    for _ in 0..MAX_RESOLVE_RETRIES {
        let resolver = pick_resolver(resolvers);
        match client.lookup_a(&resolver, host).await {
            Ok(outcome) => return Ok(outcome),
            Err(e) => last_error = e,
        }
    }

    Err(last_error)
}
