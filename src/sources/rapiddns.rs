//! RapidDNS数据源，从HTML页面中用会话正则直接提取子域名

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::session::Session;
use crate::source::{Source, SourceResult, Statistics, StatsCell};

pub struct RapidDns {
    stats: StatsCell,
}

impl RapidDns {
    pub fn new() -> Self {
        RapidDns {
            stats: StatsCell::default(),
        }
    }
}

impl Default for RapidDns {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Source for RapidDns {
    fn name(&self) -> &str {
        "rapiddns"
    }

    fn is_default(&self) -> bool {
        false
    }

    fn has_recursive_support(&self) -> bool {
        true
    }

    fn needs_key(&self) -> bool {
        false
    }

    async fn run(&self, domain: &str, session: &Session, results: mpsc::Sender<SourceResult>) {
        self.stats.reset();

        let url = format!("https://rapiddns.io/subdomain/{}?full=1", domain);
        let body = match session.get(&url).await {
            Ok(resp) if resp.status().is_success() => match resp.text().await {
                Ok(body) => body,
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

        for host in session.extract(&body) {
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

    fn statistics(&self) -> Statistics {
        self.stats.snapshot()
    }
}
