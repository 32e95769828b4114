//! Cert Spotter证书透明度数据源
//!
//! 结果分页返回，用上一页最后一条的id作为`after`游标继续拉取，
//! 直到某页为空。聚合器的截止时间会在页与页之间的等待点生效。

use async_trait::async_trait;
use serde::Deserialize;
use tokio::sync::mpsc;

use crate::session::Session;
use crate::source::{Source, SourceResult, Statistics, StatsCell};

pub struct CertSpotter {
    stats: StatsCell,
}

impl CertSpotter {
    pub fn new() -> Self {
        CertSpotter {
            stats: StatsCell::default(),
        }
    }
}

impl Default for CertSpotter {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Deserialize)]
struct Issuance {
    id: String,
    #[serde(default)]
    dns_names: Vec<String>,
}

#[async_trait]
impl Source for CertSpotter {
    fn name(&self) -> &str {
        "certspotter"
    }

    fn is_default(&self) -> bool {
        true
    }

    fn has_recursive_support(&self) -> bool {
        true
    }

    fn needs_key(&self) -> bool {
        false
    }

    async fn run(&self, domain: &str, session: &Session, results: mpsc::Sender<SourceResult>) {
        self.stats.reset();

        let mut after = String::new();

        loop {
            let url = if after.is_empty() {
                format!(
                    "https://api.certspotter.com/v1/issuances?domain={}&include_subdomains=true&expand=dns_names",
                    domain
                )
            } else {
                format!(
                    "https://api.certspotter.com/v1/issuances?domain={}&include_subdomains=true&expand=dns_names&after={}",
                    domain, after
                )
            };

            let issuances: Vec<Issuance> = match session.get(&url).await {
                Ok(resp) if resp.status().is_success() => match resp.json().await {
                    Ok(issuances) => issuances,
                    Err(e) => {
                        self.stats.add_error();
                        let _ = results
                            .send(SourceResult::Error {
                                source: self.name().to_string(),
                                error: e.to_string(),
                            })
                            .await;
                        return;
                    }
                },
                Ok(resp) => {
                    self.stats.add_error();
                    let _ = results
                        .send(SourceResult::Error {
                            source: self.name().to_string(),
                            error: format!("意外的响应状态: {}", resp.status()),
                        })
                        .await;
                    return;
                }
                Err(e) => {
                    self.stats.add_error();
                    let _ = results
                        .send(SourceResult::Error {
                            source: self.name().to_string(),
                            error: e.to_string(),
                        })
                        .await;
                    return;
                }
            };

            if issuances.is_empty() {
                return;
            }

            for issuance in &issuances {
                for name in &issuance.dns_names {
                    for host in session.extract(name) {
                        self.stats.add_result();
                        if results
                            .send(SourceResult::Subdomain {
                                source: self.name().to_string(),
                                value: host,
                            })
                            .await
                            .is_err()
                        {
                            return;
                        }
                    }
                }
            }

            after = match issuances.last() {
                Some(last) => last.id.clone(),
                None => return,
            };
        }
    }

    fn statistics(&self) -> Statistics {
        self.stats.snapshot()
    }
}
