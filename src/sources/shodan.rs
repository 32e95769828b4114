//! Shodan DNS数据源（需要API密钥）

use async_trait::async_trait;
use serde::Deserialize;
use tokio::sync::mpsc;

use crate::session::Session;
use crate::source::{KeyPool, Source, SourceResult, Statistics, StatsCell};

pub struct Shodan {
    stats: StatsCell,
    keys: KeyPool,
}

impl Shodan {
    pub fn new() -> Self {
        Shodan {
            stats: StatsCell::default(),
            keys: KeyPool::default(),
        }
    }
}

impl Default for Shodan {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Deserialize)]
struct ShodanResponse {
    #[serde(default)]
    subdomains: Vec<String>,
}

#[async_trait]
impl Source for Shodan {
    fn name(&self) -> &str {
        "shodan"
    }

    fn is_default(&self) -> bool {
        true
    }

    fn has_recursive_support(&self) -> bool {
        false
    }

    fn needs_key(&self) -> bool {
        true
    }

    fn add_api_keys(&self, keys: &[String]) {
        self.keys.set(keys);
    }

    async fn run(&self, domain: &str, session: &Session, results: mpsc::Sender<SourceResult>) {
        self.stats.reset();

        let key = match self.keys.pick() {
            Some(key) => key,
            None => {
                self.stats.mark_skipped();
                return;
            }
        };

        let url = format!("https://api.shodan.io/dns/domain/{}?key={}", domain, key);
        let data: ShodanResponse = match session.get(&url).await {
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

        for prefix in data.subdomains {
            let host = format!("{}.{}", prefix, domain);
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
