//! Anubis-DB数据源，返回子域名字符串数组

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::session::Session;
use crate::source::{Source, SourceResult, Statistics, StatsCell};

pub struct Anubis {
    stats: StatsCell,
}

impl Anubis {
    pub fn new() -> Self {
        Anubis {
            stats: StatsCell::default(),
        }
    }
}

impl Default for Anubis {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Source for Anubis {
    fn name(&self) -> &str {
        "anubis"
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

    async fn run(&self, domain: &str, session: &Session, results: mpsc::Sender<SourceResult>) {
        self.stats.reset();

        let url = format!("https://jldc.me/anubis/subdomains/{}", domain);
        let hosts: Vec<String> = match session.get(&url).await {
            Ok(resp) if resp.status().is_success() => match resp.json().await {
                Ok(hosts) => hosts,
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

        for host in hosts {
            for found in session.extract(&host) {
                self.stats.add_result();
                if results
                    .send(SourceResult::Subdomain {
                        source: self.name().to_string(),
                        value: found,
                    })
                    .await
                    .is_err()
                {
                    return;
                }
            }
        }
    }

    fn statistics(&self) -> Statistics {
        self.stats.snapshot()
    }
}
