//! 配置加载模块
//!
//! 负责读取数据源API密钥配置（YAML）和DNS解析器列表（命令行或文件）。

use lazy_static::lazy_static;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::File;
use std::io::{self, BufRead};

lazy_static! {
    /// 内置的公共DNS解析器列表
    pub static ref DEFAULT_RESOLVERS: Vec<String> = vec![
        "8.8.8.8".to_string(),
        "8.8.4.4".to_string(),
        "1.1.1.1".to_string(),
        "1.0.0.1".to_string(),
        "9.9.9.10".to_string(),
        "208.67.222.222".to_string(),
        "208.67.220.220".to_string(),
    ];
}

/// 数据源密钥配置
///
/// YAML格式：数据源名称到密钥列表的映射，例如：
///
/// ```yaml
/// virustotal:
///   - xxxxxxxxxxxxxx
/// securitytrails:
///   - yyyyyyyyyyyyyy
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProviderConfig {
    #[serde(flatten)]
    pub keys: HashMap<String, Vec<String>>,
}

/// 从YAML文件加载数据源密钥配置
pub fn load_provider_config(path: &str) -> Result<ProviderConfig, Box<dyn std::error::Error>> {
    let file = File::open(path)?;
    let config: ProviderConfig = serde_yaml::from_reader(file)?;
    Ok(config)
}

/// 从文件加载解析器列表，每行一个地址，跳过空行和注释
pub fn load_resolver_file(path: &str) -> Result<Vec<String>, Box<dyn std::error::Error>> {
    let file = File::open(path)?;
    let reader = io::BufReader::new(file);
    let mut resolvers = Vec::new();

    for line in reader.lines() {
        let line = line?;
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        resolvers.push(line.to_string());
    }

    Ok(resolvers)
}

/// 合并命令行与文件提供的解析器，都未提供时使用内置列表
pub fn build_resolver_list(
    inline: &[String],
    file: Option<&str>,
) -> Result<Vec<String>, Box<dyn std::error::Error>> {
    let mut resolvers: Vec<String> = inline.to_vec();

    if let Some(path) = file {
        resolvers.extend(load_resolver_file(path)?);
    }

    if resolvers.is_empty() {
        resolvers = DEFAULT_RESOLVERS.clone();
    }

    Ok(resolvers)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_resolvers_when_none_supplied() {
        let resolvers = build_resolver_list(&[], None).unwrap();
        assert_eq!(resolvers, *DEFAULT_RESOLVERS);
    }

    #[test]
    fn test_inline_resolvers_kept() {
        let inline = vec!["127.0.0.53".to_string()];
        let resolvers = build_resolver_list(&inline, None).unwrap();
        assert_eq!(resolvers, inline);
    }

    #[test]
    fn test_resolver_file_parsing() {
        let mut path = std::env::temp_dir();
        path.push("rsubfinder_resolvers_test.txt");
        {
            let mut file = File::create(&path).unwrap();
            writeln!(file, "# 注释行").unwrap();
            writeln!(file, "1.1.1.1").unwrap();
            writeln!(file).unwrap();
            writeln!(file, "  8.8.8.8  ").unwrap();
        }

        let resolvers = load_resolver_file(path.to_str().unwrap()).unwrap();
        assert_eq!(resolvers, vec!["1.1.1.1".to_string(), "8.8.8.8".to_string()]);
        let _ = std::fs::remove_file(path);
    }

    #[test]
    fn test_provider_config_yaml() {
        let yaml = "virustotal:\n  - key1\n  - key2\nshodan:\n  - key3\n";
        let config: ProviderConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.keys["virustotal"].len(), 2);
        assert_eq!(config.keys["shodan"], vec!["key3".to_string()]);
    }
}
