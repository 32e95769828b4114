//! AlienVault OTX被动DNS数据源

use async_trait::async_trait;
use serde::Deserialize;
use tokio::sync::mpsc;

use crate::session::Session;
use crate::source::{Source, SourceResult, Statistics, StatsCell};

pub struct AlienVault {
    stats: StatsCell,
}

impl AlienVault {
    pub fn new() -> Self {
        AlienVault {
            stats: StatsCell::default(),
        }
    }
}

impl Default for AlienVault {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Deserialize)]
struct OtxResponse {
    #[serde(default)]
    passive_dns: Vec<OtxRecord>,
}

#[derive(Debug, Deserialize)]
struct OtxRecord {
    #[serde(default)]
    hostname: String,
}

#[async_trait]
impl Source for AlienVault {
    fn name(&self) -> &str {
        "alienvault"
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

        let url = format!(
            "https://otx.alienvault.com/api/v1/indicators/domain/{}/passive_dns",
            domain
        );

        let data: OtxResponse = match session.get(&url).await {
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

        for record in data.passive_dns {
            for host in session.extract(&record.hostname) {
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
