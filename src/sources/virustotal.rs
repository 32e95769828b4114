//! VirusTotal数据源（需要API密钥）
//!
//! 使用v3接口分页拉取子域名，密钥通过`x-apikey`请求头传递。
//! 未配置密钥时本数据源标记为跳过，不产生任何结果。

use async_trait::async_trait;
use serde::Deserialize;
use tokio::sync::mpsc;

use crate::session::Session;
use crate::source::{KeyPool, Source, SourceResult, Statistics, StatsCell};

pub struct VirusTotal {
    stats: StatsCell,
    keys: KeyPool,
}

impl VirusTotal {
    pub fn new() -> Self {
        VirusTotal {
            stats: StatsCell::default(),
            keys: KeyPool::default(),
        }
    }
}

impl Default for VirusTotal {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Deserialize)]
struct VtResponse {
    #[serde(default)]
    data: Vec<VtObject>,
    #[serde(default)]
    links: VtLinks,
}

#[derive(Debug, Deserialize)]
struct VtObject {
    id: String,
}

#[derive(Debug, Default, Deserialize)]
struct VtLinks {
    next: Option<String>,
}

#[async_trait]
impl Source for VirusTotal {
    fn name(&self) -> &str {
        "virustotal"
    }

    fn is_default(&self) -> bool {
        true
    }

    fn has_recursive_support(&self) -> bool {
        true
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

        let mut url = format!(
            "https://www.virustotal.com/api/v3/domains/{}/subdomains?limit=40",
            domain
        );

        loop {
            let data: VtResponse = match session
                .get_with_headers(&url, &[("x-apikey", key.as_str())])
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

            for object in data.data {
                for host in session.extract(&object.id) {
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

            match data.links.next {
                Some(next) if !next.is_empty() => url = next,
                _ => return,
            }
        }
    }

    fn statistics(&self) -> Statistics {
        self.stats.snapshot()
    }
}
