use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Write;

use crate::api::EnumerationResult;
use crate::input::OutputFormat;

/// 可序列化的发现主机结构
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SerializableHost {
    pub host: String,
    pub sources: Vec<String>,
}

/// 可序列化的解析确认主机结构
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SerializableResolvedHost {
    pub host: String,
    pub ip: String,
    pub source: String,
}

/// 完整的导出数据结构
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportData {
    pub domain: String,
    pub total: usize,
    pub hosts: Vec<SerializableHost>,
    pub resolved: Vec<SerializableResolvedHost>,
    pub export_time: String,
}

impl From<&EnumerationResult> for ExportData {
    fn from(result: &EnumerationResult) -> Self {
        let mut hosts: Vec<SerializableHost> = result
            .sources
            .iter()
            .map(|(host, sources)| SerializableHost {
                host: host.clone(),
                sources: sources.iter().cloned().collect(),
            })
            .collect();
        hosts.sort_by(|a, b| a.host.cmp(&b.host));

        let mut resolved: Vec<SerializableResolvedHost> = result
            .resolved
            .iter()
            .map(|r| SerializableResolvedHost {
                host: r.host.clone(),
                ip: r.ip.clone(),
                source: r.source.clone(),
            })
            .collect();
        resolved.sort_by(|a, b| a.host.cmp(&b.host));

        ExportData {
            domain: result.domain.clone(),
            total: hosts.len(),
            hosts,
            resolved,
            export_time: chrono::Utc::now().format("%Y-%m-%d %H:%M:%S UTC").to_string(),
        }
    }
}

/// 导出枚举结果到文件
pub fn export_results(
    results: &[EnumerationResult],
    output_path: &str,
    format: &OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    let export_data: Vec<ExportData> = results.iter().map(ExportData::from).collect();
    let mut file = File::create(output_path)?;

    match format {
        OutputFormat::Json => {
            let json_data = serde_json::to_string_pretty(&export_data)?;
            file.write_all(json_data.as_bytes())?;
        }
        OutputFormat::Csv => {
            let csv_data = export_to_csv(&export_data);
            file.write_all(csv_data.as_bytes())?;
        }
        OutputFormat::Txt => {
            let txt_data = export_to_txt(&export_data);
            file.write_all(txt_data.as_bytes())?;
        }
    }

    Ok(())
}

/// 导出为CSV格式：每行 域名,主机,IP,数据源列表
fn export_to_csv(data: &[ExportData]) -> String {
    let mut out = String::from("domain,host,ip,sources\n");

    for export in data {
        for host in &export.hosts {
            let ip = export
                .resolved
                .iter()
                .find(|r| r.host == host.host)
                .map(|r| r.ip.as_str())
                .unwrap_or("");
            out.push_str(&format!(
                "{},{},{},{}\n",
                export.domain,
                host.host,
                ip,
                host.sources.join(";")
            ));
        }
    }

    out
}

/// 导出为纯文本：每行一个主机名
fn export_to_txt(data: &[ExportData]) -> String {
    let mut out = String::new();

    for export in data {
        for host in &export.hosts {
            out.push_str(&host.host);
            out.push('\n');
        }
    }

    out
}
