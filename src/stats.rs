//! 运行统计报告

use colored::Colorize;
use itertools::Itertools;

use crate::source::Statistics;

/// 打印各数据源的统计表格
///
/// 正常运行的数据源按名称排序列出结果数、错误数和耗时；
/// 被跳过的数据源（未配置密钥）单独列出。
pub fn print_statistics(stats: &[Statistics]) {
    let (skipped, ran): (Vec<&Statistics>, Vec<&Statistics>) =
        stats.iter().partition(|s| s.skipped);

    println!();
    println!(
        "{:<18} {:>8} {:>8} {:>10}",
        "数据源", "结果数", "错误数", "耗时"
    );
    println!("{}", "-".repeat(50));

    for stat in ran.iter().sorted_by(|a, b| a.name.cmp(&b.name)) {
        let errors = if stat.errors > 0 {
            stat.errors.to_string().red().to_string()
        } else {
            stat.errors.to_string()
        };

        println!(
            "{:<18} {:>8} {:>8} {:>9.2}s",
            stat.name,
            stat.results,
            errors,
            stat.elapsed.as_secs_f64()
        );
    }

    if !skipped.is_empty() {
        println!();
        println!("跳过的数据源 (未配置密钥):");
        for stat in skipped.iter().sorted_by(|a, b| a.name.cmp(&b.name)) {
            println!("  {}", stat.name.yellow());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_print_statistics_does_not_panic() {
        let stats = vec![
            Statistics {
                name: "crtsh".to_string(),
                results: 42,
                errors: 0,
                elapsed: Duration::from_millis(1500),
                skipped: false,
            },
            Statistics {
                name: "virustotal".to_string(),
                results: 0,
                errors: 0,
                elapsed: Duration::ZERO,
                skipped: true,
            },
        ];
        print_statistics(&stats);
    }
}
