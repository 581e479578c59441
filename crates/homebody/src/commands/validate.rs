use crate::utils;
use colored::Colorize;
use std::collections::BTreeMap;
use std::path::Path;

pub async fn handle(project_root: &Path) -> anyhow::Result<()> {
    println!("{}", "スタックを検証中...".blue());

    let (config, context) = match utils::load_project(project_root).await {
        Ok(loaded) => loaded,
        Err(e) => {
            eprintln!();
            eprintln!("{}", "✗ 設定エラー".red().bold());
            eprintln!("  {}", e);
            std::process::exit(1);
        }
    };
    utils::print_config_source(&config);

    let stacks = match utils::build_stacks(&config, &context, None) {
        Ok(stacks) => stacks,
        Err(e) => {
            eprintln!();
            eprintln!("{}", "✗ スタックの構築に失敗しました".red().bold());
            eprintln!("  {}", e);
            std::process::exit(1);
        }
    };

    let mut missing_total = 0;
    let mut summaries = Vec::with_capacity(stacks.len());
    for infra in &stacks {
        let template = match infra.synthesize() {
            Ok(template) => template,
            Err(e) => {
                eprintln!();
                eprintln!(
                    "{}",
                    format!("✗ {} の合成に失敗しました", infra.stack().id())
                        .red()
                        .bold()
                );
                eprintln!("  {}", e);
                std::process::exit(1);
            }
        };
        missing_total += infra.stack().missing_context().len();
        summaries.push((infra, template.resources.len()));
    }

    println!("{}", "✓ スタックは正常です！".green().bold());
    println!();
    println!("サマリー:");
    for (infra, resource_count) in summaries {
        let stack = infra.stack();
        println!(
            "  {} ({}個のリソース, {})",
            stack.id().cyan(),
            resource_count,
            stack.env().to_uri()
        );

        let mut counts: BTreeMap<String, usize> = BTreeMap::new();
        for construct in stack.constructs() {
            *counts.entry(construct.kind.to_string()).or_default() += 1;
        }
        for (kind, count) in counts {
            println!("    - {}: {}個", kind, count);
        }

        for missing in stack.missing_context() {
            println!("    {} {}", "⚠ 未解決:".yellow(), missing.key);
        }
    }

    if missing_total > 0 {
        println!();
        println!(
            "{}",
            format!(
                "{}個のルックアップが未解決です（合成時はダミー値を使用）",
                missing_total
            )
            .yellow()
        );
    }

    Ok(())
}
