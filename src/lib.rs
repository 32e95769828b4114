//! # rsubfinder
//!
//! 一个基于Rust实现的快速被动子域名枚举工具库。
//!
//! ## 特性
//!
//! - 🚀 **高并发**: 所有数据源并发查询，统一截止时间控制
//! - 🔌 **可插拔**: 数据源以插件形式按名称注册，支持API密钥配置
//! - 🧹 **去重溯源**: 结果规范化去重，记录每个主机的全部来源
//! - 🔍 **泛解析过滤**: 可选的主动解析阶段，自动剔除泛解析误报
//! - 📊 **统计报告**: 每个数据源的结果数、错误数和耗时
//!
//! ## 快速开始
//!
//! ```rust,no_run
//! use rsubfinder::search_subdomains;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let result = search_subdomains("example.com", false).await?;
//!
//!     println!("发现 {} 个子域名", result.unique.len());
//!     for (host, source) in result.unique.iter().take(5) {
//!         println!("  {} <- {}", host, source);
//!     }
//!
//!     Ok(())
//! }
//! ```
//!
//! ## 高级配置
//!
//! ```rust,no_run
//! use rsubfinder::{SubdomainSearchConfig, SubdomainSearchEngine};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = SubdomainSearchConfig {
//!         use_all_sources: true,
//!         remove_wildcard: true,  // 启用主动解析和泛解析过滤
//!         threads: 20,
//!         ..Default::default()
//!     };
//!
//!     let engine = SubdomainSearchEngine::new(config)?;
//!     let result = engine.enumerate_single_domain("example.com").await?;
//!
//!     for resolved in &result.resolved {
//!         println!("{} -> {}", resolved.host, resolved.ip);
//!     }
//!
//!     Ok(())
//! }
//! ```

#![cfg_attr(docsrs, feature(doc_cfg))]

// 内部模块
pub mod agent;
pub mod api;
pub mod config;
pub mod dns_resolver;
pub mod input;
pub mod output;
pub mod resolve;
pub mod session;
pub mod source;
pub mod sources;
pub mod stats;
pub mod util;
pub mod wildcard;

// 重新导出主要的公共API
pub use api::{
    search_subdomains, EnumerationResult, ResolvedHost, SubdomainSearchConfig,
    SubdomainSearchEngine,
};

// 导出其他有用的类型
pub use agent::Agent;
pub use config::{load_provider_config, load_resolver_file, ProviderConfig, DEFAULT_RESOLVERS};
pub use dns_resolver::{DnsClient, LookupOutcome, TrustDnsClient, MAX_RESOLVE_RETRIES};
pub use input::{Opts, OutputFormat};
pub use output::export_results;
pub use resolve::{HostEntry, ResolutionPool, ResolveResult};
pub use session::{RequestLimiter, Session};
pub use source::{KeyPool, Source, SourceResult, Statistics, StatsCell};
pub use stats::print_statistics;
pub use wildcard::{WildcardDetector, MAX_WILDCARD_CHECKS};
