//! 内置数据源注册表
//!
//! 每个子模块是一个独立的数据源实现，按名称注册。
//! 新数据源只需实现[`Source`](crate::source::Source)并加入
//! [`all_sources`]的列表。

pub mod alienvault;
pub mod anubis;
pub mod certspotter;
pub mod crtsh;
pub mod hackertarget;
pub mod rapiddns;
pub mod securitytrails;
pub mod shodan;
pub mod threatminer;
pub mod virustotal;
pub mod waybackarchive;

use crate::source::Source;

/// 构建全部内置数据源的新实例
pub fn all_sources() -> Vec<Box<dyn Source>> {
    vec![
        Box::new(alienvault::AlienVault::new()),
        Box::new(anubis::Anubis::new()),
        Box::new(certspotter::CertSpotter::new()),
        Box::new(crtsh::CrtSh::new()),
        Box::new(hackertarget::HackerTarget::new()),
        Box::new(rapiddns::RapidDns::new()),
        Box::new(securitytrails::SecurityTrails::new()),
        Box::new(shodan::Shodan::new()),
        Box::new(threatminer::ThreatMiner::new()),
        Box::new(virustotal::VirusTotal::new()),
        Box::new(waybackarchive::WaybackArchive::new()),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_registry_names_unique_and_lowercase() {
        let sources = all_sources();
        let mut seen = HashSet::new();
        for source in &sources {
            let name = source.name();
            assert_eq!(name, name.to_lowercase());
            assert!(seen.insert(name.to_string()), "重复的数据源名称: {}", name);
        }
    }

    #[test]
    fn test_keyed_sources_declare_needs_key() {
        for source in all_sources() {
            match source.name() {
                "virustotal" | "securitytrails" | "shodan" => assert!(source.needs_key()),
                _ => assert!(!source.needs_key()),
            }
        }
    }
}
