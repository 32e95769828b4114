//! 枚举会话模块
//!
//! Session是一次枚举过程中所有数据源共享的只读上下文，
//! 包含HTTP客户端、子域名提取正则、API密钥和请求速率限制器。
//! 构造完成后不再修改，可以安全地在并发任务间共享。

use regex::Regex;
use reqwest::Client;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;
use std::time::{Duration, Instant};
use tokio::time::sleep;

const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0 Safari/537.36";

/// 请求速率限制器
///
/// 按秒为窗口限制并发数据源发出的HTTP请求总量，
/// 内部使用原子计数器，可安全地被多个任务同时调用。
pub struct RequestLimiter {
    max_per_sec: u32,
    sent: AtomicU32,
    window_start: Mutex<Instant>,
}

impl RequestLimiter {
    pub fn new(max_per_sec: u32) -> Self {
        RequestLimiter {
            max_per_sec,
            sent: AtomicU32::new(0),
            window_start: Mutex::new(Instant::now()),
        }
    }

    /// 获取一个发送配额，超过限额时等待下一个时间窗口
    pub async fn acquire(&self) {
        if self.max_per_sec == 0 {
            return;
        }

        loop {
            {
                let mut window_start = match self.window_start.lock() {
                    Ok(guard) => guard,
                    Err(_) => return,
                };

                // 每秒重置计数器
                if window_start.elapsed() >= Duration::from_secs(1) {
                    self.sent.store(0, Ordering::Relaxed);
                    *window_start = Instant::now();
                }

                if self.sent.load(Ordering::Relaxed) < self.max_per_sec {
                    self.sent.fetch_add(1, Ordering::Relaxed);
                    return;
                }
            }

            sleep(Duration::from_millis(100)).await;
        }
    }
}

/// 枚举会话
pub struct Session {
    /// 共享的HTTP客户端
    pub client: Client,
    /// 从响应文本中提取目标子域名的正则
    pub extractor: Regex,
    /// 数据源名称到API密钥列表的映射
    pub keys: HashMap<String, Vec<String>>,
    /// 请求速率限制器
    pub limiter: RequestLimiter,
    /// 单个请求的超时时间
    pub timeout: Duration,
}

impl Session {
    /// 创建新的会话
    ///
    /// domain必须是合法的域名片段，否则返回错误。
    pub fn new(
        domain: &str,
        keys: HashMap<String, Vec<String>>,
        rate_per_sec: u32,
        timeout_secs: u64,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        let extractor = Self::build_extractor(domain)?;

        let timeout = Duration::from_secs(timeout_secs);
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(DEFAULT_USER_AGENT)
            .danger_accept_invalid_certs(true)
            .build()?;

        Ok(Session {
            client,
            extractor,
            keys,
            limiter: RequestLimiter::new(rate_per_sec),
            timeout,
        })
    }

    /// 根据目标域名构建子域名提取正则
    fn build_extractor(domain: &str) -> Result<Regex, Box<dyn std::error::Error>> {
        if domain.is_empty()
            || !domain
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '-')
        {
            return Err(format!("无法构建子域名匹配模式: {}", domain).into());
        }

        let pattern = format!(r"(?i)[a-zA-Z0-9\*_.-]+\.{}", regex::escape(domain));
        Ok(Regex::new(&pattern)?)
    }

    /// 发送一个受速率限制的GET请求
    pub async fn get(&self, url: &str) -> Result<reqwest::Response, reqwest::Error> {
        self.limiter.acquire().await;
        self.client.get(url).send().await
    }

    /// 发送一个携带请求头的GET请求
    pub async fn get_with_headers(
        &self,
        url: &str,
        headers: &[(&str, &str)],
    ) -> Result<reqwest::Response, reqwest::Error> {
        self.limiter.acquire().await;
        let mut request = self.client.get(url);
        for (name, value) in headers {
            request = request.header(*name, *value);
        }
        request.send().await
    }

    /// 从响应文本中提取所有匹配的子域名
    pub fn extract(&self, text: &str) -> Vec<String> {
        self.extractor
            .find_iter(text)
            .map(|m| m.as_str().to_string())
            .collect()
    }

    /// 获取指定数据源配置的API密钥
    pub fn keys_for(&self, source: &str) -> &[String] {
        self.keys.get(source).map(|v| v.as_slice()).unwrap_or(&[])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_creation() {
        let session = Session::new("example.com", HashMap::new(), 0, 30);
        assert!(session.is_ok());
    }

    #[test]
    fn test_invalid_domain_pattern() {
        // 非法域名片段应该在构造阶段报错
        assert!(Session::new("", HashMap::new(), 0, 30).is_err());
        assert!(Session::new("exa mple.com", HashMap::new(), 0, 30).is_err());
    }

    #[test]
    fn test_extract() {
        let session = Session::new("example.com", HashMap::new(), 0, 30).unwrap();
        let text = r#"{"hosts":["a.example.com","*.b.example.com","evil.org"]}"#;
        let found = session.extract(text);
        assert!(found.contains(&"a.example.com".to_string()));
        assert!(found.contains(&"*.b.example.com".to_string()));
        assert!(!found.iter().any(|h| h.contains("evil.org")));
    }

    #[test]
    fn test_limiter_unlimited() {
        tokio_test::block_on(async {
            let limiter = RequestLimiter::new(0);
            for _ in 0..1000 {
                limiter.acquire().await;
            }
        });
    }

    #[tokio::test]
    async fn test_limiter_counts_within_window() {
        let limiter = RequestLimiter::new(100);
        // 未超限时不应等待
        let start = Instant::now();
        for _ in 0..50 {
            limiter.acquire().await;
        }
        assert!(start.elapsed() < Duration::from_millis(500));
    }
}
