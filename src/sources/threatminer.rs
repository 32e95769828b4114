//! ThreatMiner数据源

use async_trait::async_trait;
use serde::Deserialize;
use tokio::sync::mpsc;

use crate::session::Session;
use crate::source::{Source, SourceResult, Statistics, StatsCell};

pub struct ThreatMiner {
    stats: StatsCell,
}

impl ThreatMiner {
    pub fn new() -> Self {
        ThreatMiner {
            stats: StatsCell::default(),
        }
    }
}

impl Default for ThreatMiner {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Deserialize)]
struct ThreatMinerResponse {
    #[serde(default)]
    results: Vec<String>,
}

#[async_trait]
impl Source for ThreatMiner {
    fn name(&self) -> &str {
        "threatminer"
    }

    fn is_default(&self) -> bool {
        false
    }

    fn has_recursive_support(&self) -> bool {
        false
    }

    fn needs_key(&self) -> bool {
        false
    }

    async fn run(&self, domain: &str, session: &Session, results: mpsc::Sender<SourceResult>) {
        self.stats.reset();

        // rt=5为子域名查询
        let url = format!("https://api.threatminer.org/v2/domain.php?q={}&rt=5", domain);
        let data: ThreatMinerResponse = match session.get(&url).await {
            Ok(resp) if resp.status().is_success() => match resp.json().await {
                Ok(data) => data,
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

        for host in data.results {
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
