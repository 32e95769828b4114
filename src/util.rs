use rand::{thread_rng, Rng};
use std::iter::repeat_with;

/// 生成一个长度为 n 的随机小写字母数字标签，用于泛解析探测
pub fn random_label(n: usize) -> String {
    let chars = b"abcdefghijklmnopqrstuvwxyz0123456789";
    let mut rng = thread_rng();
    repeat_with(|| chars[rng.gen_range(0..chars.len())] as char)
        .take(n)
        .collect()
}

/// 规范化主机名：转小写、去掉首尾的点和前导通配符标签
pub fn normalize_host(host: &str) -> String {
    let mut host = host.trim().trim_matches('.').to_lowercase();
    if let Some(stripped) = host.strip_prefix("*.") {
        host = stripped.to_string();
    }
    host
}

/// 判断host是否为domain的子域名（或domain本身）
pub fn is_subdomain_of(host: &str, domain: &str) -> bool {
    host == domain || host.ends_with(&format!(".{}", domain))
}
