//! hackertarget主机搜索数据源
//!
//! 返回CSV格式的纯文本，每行`host,ip`。

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::session::Session;
use crate::source::{Source, SourceResult, Statistics, StatsCell};

pub struct HackerTarget {
    stats: StatsCell,
}

impl HackerTarget {
    pub fn new() -> Self {
        HackerTarget {
            stats: StatsCell::default(),
        }
    }
}

impl Default for HackerTarget {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Source for HackerTarget {
    fn name(&self) -> &str {
        "hackertarget"
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

        let url = format!("https://api.hackertarget.com/hostsearch/?q={}", domain);
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

        for line in body.lines() {
            let host = match line.split_once(',') {
                Some((host, _ip)) => host,
                None => line,
            };

            for found in session.extract(host) {
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
