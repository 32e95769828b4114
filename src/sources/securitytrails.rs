//! SecurityTrails数据源（需要API密钥）

use async_trait::async_trait;
use serde::Deserialize;
use tokio::sync::mpsc;

use crate::session::Session;
use crate::source::{KeyPool, Source, SourceResult, Statistics, StatsCell};

pub struct SecurityTrails {
    stats: StatsCell,
    keys: KeyPool,
}

impl SecurityTrails {
    pub fn new() -> Self {
        SecurityTrails {
            stats: StatsCell::default(),
            keys: KeyPool::default(),
        }
    }
}

impl Default for SecurityTrails {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Deserialize)]
struct SecurityTrailsResponse {
    #[serde(default)]
    subdomains: Vec<String>,
}

#[async_trait]
impl Source for SecurityTrails {
    fn name(&self) -> &str {
        "securitytrails"
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

        let url = format!(
            "https://api.securitytrails.com/v1/domain/{}/subdomains",
            domain
        );

        let data: SecurityTrailsResponse = match session
            .get_with_headers(&url, &[("APIKEY", key.as_str())])
            .await
        {
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
            // 接口只返回前缀，拼回完整主机名
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
