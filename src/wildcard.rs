//! 泛解析检测模块
//!
//! 有些域名配置了泛解析，任意子域名都会解析到同一个接管IP，
//! 直接做正向解析会产生大量误报。检测办法：对几个随机、几乎
//! 必然不存在的子域名做A记录查询，把返回的IP全部记入集合；
//! 解析阶段命中该集合的主机将被丢弃。

use log::warn;
use std::collections::HashSet;
use std::sync::Arc;

use crate::dns_resolver::{lookup_with_retries, DnsClient, LookupOutcome};
use crate::util::random_label;

/// 泛解析探测的随机子域名数量
pub const MAX_WILDCARD_CHECKS: usize = 3;

/// 泛解析检测器
pub struct WildcardDetector {
    client: Arc<dyn DnsClient>,
    resolvers: Vec<String>,
}

impl WildcardDetector {
    pub fn new(client: Arc<dyn DnsClient>, resolvers: Vec<String>) -> Self {
        WildcardDetector { client, resolvers }
    }

    /// 检测domain的泛解析IP，返回冻结的IP集合
    ///
    /// 必须在解析工作池启动之前运行完毕；返回的集合之后只读。
    /// 探测失败只记录警告，返回已累积的集合（可能为空，等价于
    /// 不做泛解析过滤）。
    pub async fn detect(&self, domain: &str) -> HashSet<String> {
        let mut wildcard_ips = HashSet::new();

        for _ in 0..MAX_WILDCARD_CHECKS {
            let probe = format!("{}.{}", random_label(12), domain);

            match lookup_with_retries(self.client.as_ref(), &self.resolvers, &probe).await {
                Ok(LookupOutcome::Records(ips)) => {
                    wildcard_ips.extend(ips);
                }
                Ok(LookupOutcome::NoRecords) => {
                    // 随机域名解析不出来，本次探测没有泛解析信号
                    continue;
                }
                Err(e) => {
                    warn!("泛解析探测失败 {}: {}", probe, e);
                }
            }
        }

        if !wildcard_ips.is_empty() {
            warn!("检测到泛解析域名: {} ({} 个IP)", domain, wildcard_ips.len());
        }

        wildcard_ips
    }
}
