use clap::Parser;

/// 输出格式枚举
#[derive(Debug, Clone)]
pub enum OutputFormat {
    Json,
    Csv,
    Txt,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "json" => Ok(OutputFormat::Json),
            "csv" => Ok(OutputFormat::Csv),
            "txt" => Ok(OutputFormat::Txt),
            _ => Err(format!("不支持的输出格式: {}。支持的格式: json, csv, txt", s)),
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "rsubfinder")]
#[command(version = "1.1")]
#[command(about = "A fast passive subdomain enumeration tool", long_about = None)]
pub struct Opts {
    /// target domain to enumerate
    #[arg(short, long)]
    pub domain: Vec<String>,

    /// file with list of domains, one per line
    #[arg(short, long)]
    pub file: Option<String>,

    /// sources to use, comma separated
    #[arg(short, long, value_delimiter = ',')]
    pub sources: Vec<String>,

    /// sources to exclude, comma separated
    #[arg(long, value_delimiter = ',')]
    pub exclude_sources: Vec<String>,

    /// use all sources
    #[arg(long)]
    pub all: bool,

    /// use only sources that accept subdomains as input
    #[arg(long)]
    pub recursive: bool,

    /// resolve candidates and remove wildcard false positives
    #[arg(short = 'w', long)]
    pub active: bool,

    /// number of resolver workers
    #[arg(short, long, default_value = "10")]
    pub threads: usize,

    /// timeout in seconds for a single request
    #[arg(long, default_value = "30")]
    pub timeout: u64,

    /// max time in seconds for the passive enumeration phase
    #[arg(short, long, default_value = "180")]
    pub max_time: u64,

    /// max time in seconds for the resolution phase
    #[arg(long, default_value = "300")]
    pub resolution_time: u64,

    /// dns resolvers, comma separated
    #[arg(short, long, value_delimiter = ',')]
    pub resolvers: Vec<String>,

    /// file with dns resolvers, one per line
    #[arg(long)]
    pub resolver_file: Option<String>,

    /// provider api keys config file (yaml)
    #[arg(short = 'c', long)]
    pub provider_config: Option<String>,

    /// max http requests per second, 0 for unlimited
    #[arg(long, default_value = "0")]
    pub rate_limit: u32,

    /// output file path
    #[arg(short, long)]
    pub output: Option<String>,

    /// output format (json, csv, txt)
    #[arg(long, default_value = "txt")]
    pub format: String,

    /// silent mode, print found subdomains only
    #[arg(long)]
    pub silent: bool,

    /// list available sources
    #[arg(short, long)]
    pub list_sources: bool,

    /// show per-source statistics after the run
    #[arg(long)]
    pub stats: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_output_format_parsing() {
        assert!(matches!(OutputFormat::from_str("json"), Ok(OutputFormat::Json)));
        assert!(matches!(OutputFormat::from_str("CSV"), Ok(OutputFormat::Csv)));
        assert!(matches!(OutputFormat::from_str("txt"), Ok(OutputFormat::Txt)));
        assert!(OutputFormat::from_str("xml").is_err());
    }
}
