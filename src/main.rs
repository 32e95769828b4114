use std::collections::HashMap;
use std::fs::File;
use std::io::{self, BufReader};
use std::process;

use clap::Parser;
use rsubfinder::config;
use rsubfinder::input::{Opts, OutputFormat};
use rsubfinder::output::export_results;
use rsubfinder::sources;
use rsubfinder::stats::print_statistics;
use rsubfinder::{EnumerationResult, SubdomainSearchConfig, SubdomainSearchEngine};

#[tokio::main]
async fn main() {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Warn)
        .init();

    let opts = Opts::parse();

    // 数据源列表
    if opts.list_sources {
        list_sources();
        return;
    }

    if opts.domain.is_empty() && opts.file.is_none() {
        eprintln!("未提供目标域名。使用 -d <domain> 或 -f <file>");
        process::exit(1);
    }

    // 执行枚举
    if let Err(e) = run_enumeration(opts).await {
        eprintln!("枚举失败: {}", e);
        process::exit(1);
    }
}

/// 列出可用数据源
fn list_sources() {
    println!("可用数据源:");
    let mut default_sources = Vec::new();
    let mut extra_sources = Vec::new();

    for source in sources::all_sources() {
        let marker = if source.needs_key() { " *" } else { "" };
        let line = format!("  {}{}", source.name(), marker);
        if source.is_default() {
            default_sources.push(line);
        } else {
            extra_sources.push(line);
        }
    }

    println!("\n默认数据源 ({}):", default_sources.len());
    for line in default_sources {
        println!("{}", line);
    }

    println!("\n附加数据源 ({}):", extra_sources.len());
    for line in extra_sources {
        println!("{}", line);
    }

    println!("\n* = 需要API密钥");
}

/// 执行枚举主逻辑
async fn run_enumeration(opts: Opts) -> Result<(), Box<dyn std::error::Error>> {
    // 数据源密钥配置
    let provider_keys: HashMap<String, Vec<String>> = match &opts.provider_config {
        Some(path) => config::load_provider_config(path)?.keys,
        None => HashMap::new(),
    };

    // 解析器列表
    let resolvers = config::build_resolver_list(&opts.resolvers, opts.resolver_file.as_deref())?;

    let search_config = SubdomainSearchConfig {
        sources: opts.sources.clone(),
        exclude_sources: opts.exclude_sources.clone(),
        use_all_sources: opts.all,
        recursive_only: opts.recursive,
        provider_keys,
        resolvers,
        remove_wildcard: opts.active,
        threads: opts.threads,
        timeout_secs: opts.timeout,
        max_enumeration_time_secs: opts.max_time,
        max_resolution_time_secs: opts.resolution_time,
        rate_limit: opts.rate_limit,
        silent: opts.silent,
    };

    let engine = SubdomainSearchEngine::new(search_config)?;

    if !opts.silent {
        println!("目标域名: {:?}", opts.domain);
        println!("启用数据源: {}", engine.source_names().join(", "));
    }

    let mut all_results = Vec::new();

    for domain in &opts.domain {
        all_results.push(engine.enumerate_single_domain(domain).await?);
    }

    if let Some(path) = &opts.file {
        let mut file_results = if path == "-" {
            let stdin = io::stdin();
            engine.enumerate_multiple_domains(stdin.lock()).await?
        } else {
            let reader = BufReader::new(File::open(path)?);
            engine.enumerate_multiple_domains(reader).await?
        };
        all_results.append(&mut file_results);
    }

    print_results(&all_results, &opts);

    // 导出结果
    if let Some(output_path) = &opts.output {
        let format = opts.format.parse::<OutputFormat>().unwrap_or_else(|e| {
            eprintln!("输出格式解析错误: {}, 使用默认TXT格式", e);
            OutputFormat::Txt
        });
        export_results(&all_results, output_path, &format)?;

        if !opts.silent {
            println!("结果已导出到: {}", output_path);
        }
    }

    Ok(())
}

/// 打印最终结果和统计
fn print_results(results: &[EnumerationResult], opts: &Opts) {
    for result in results {
        if opts.silent {
            // 静默模式只输出主机名本身
            let mut hosts: Vec<&String> = result.unique.keys().collect();
            hosts.sort();
            for host in hosts {
                println!("{}", host);
            }
            continue;
        }

        if result.resolved.is_empty() {
            println!(
                "\n[{}] 发现 {} 个子域名，耗时 {:.2}s",
                result.domain,
                result.unique.len(),
                result.elapsed.as_secs_f64()
            );
        } else {
            println!(
                "\n[{}] 发现 {} 个子域名，其中 {} 个通过解析确认，耗时 {:.2}s",
                result.domain,
                result.unique.len(),
                result.resolved.len(),
                result.elapsed.as_secs_f64()
            );
            for resolved in &result.resolved {
                println!("{:<40} {:<16} {}", resolved.host, resolved.ip, resolved.source);
            }
        }

        if opts.stats {
            print_statistics(&result.stats);
        }
    }
}
