//! crt.sh证书透明度日志数据源

use async_trait::async_trait;
use serde::Deserialize;
use tokio::sync::mpsc;

use crate::session::Session;
use crate::source::{Source, SourceResult, Statistics, StatsCell};

pub struct CrtSh {
    stats: StatsCell,
}

impl CrtSh {
    pub fn new() -> Self {
        CrtSh {
            stats: StatsCell::default(),
        }
    }
}

impl Default for CrtSh {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Deserialize)]
struct CrtShEntry {
    name_value: String,
}

#[async_trait]
impl Source for CrtSh {
    fn name(&self) -> &str {
        "crtsh"
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

        let url = format!("https://crt.sh/?q=%25.{}&output=json", domain);
        let response = match session.get(&url).await {
            Ok(resp) => resp,
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

        if !response.status().is_success() {
            self.stats.add_error();
            let _ = results
                .send(SourceResult::Error {
                    source: self.name().to_string(),
                    error: format!("意外的响应状态: {}", response.status()),
                })
                .await;
            return;
        }

        let entries: Vec<CrtShEntry> = match response.json().await {
            Ok(entries) => entries,
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

        for entry in entries {
            // name_value里可能一行一个主机名
            for line in entry.name_value.lines() {
                for host in session.extract(line) {
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
    }

    fn statistics(&self) -> Statistics {
        self.stats.snapshot()
    }
}
