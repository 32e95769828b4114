//! Wayback Machine CDX索引数据源
//!
//! 历史URL里混着端口、路径和百分号编码，直接用会话正则从
//! 原始文本里捞主机名。

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::session::Session;
use crate::source::{Source, SourceResult, Statistics, StatsCell};

pub struct WaybackArchive {
    stats: StatsCell,
}

impl WaybackArchive {
    pub fn new() -> Self {
        WaybackArchive {
            stats: StatsCell::default(),
        }
    }
}

impl Default for WaybackArchive {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Source for WaybackArchive {
    fn name(&self) -> &str {
        "waybackarchive"
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

        let url = format!(
            "https://web.archive.org/cdx/search/cdx?url=*.{}/*&output=txt&fl=original&collapse=urlkey",
            domain
        );

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
            // URL编码的通配符前缀还原成普通前缀再提取
            let line = line.replace("%2A", "*").replace("%2a", "*");
            for host in session.extract(&line) {
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

    fn statistics(&self) -> Statistics {
        self.stats.snapshot()
    }
}
