use crate::utils;
use colored::Colorize;
use homebody_cloud::{CloudAssembly, Stack};
use std::path::Path;

pub async fn handle(
    project_root: &Path,
    stack_id: Option<&str>,
    output: &Path,
    quiet: bool,
) -> anyhow::Result<()> {
    let (config, context) = utils::load_project(project_root).await?;

    let stacks = match utils::build_stacks(&config, &context, stack_id) {
        Ok(stacks) => stacks,
        Err(e) => {
            eprintln!("{}", "✗ スタックの構築に失敗しました".red().bold());
            eprintln!("  {}", e);
            std::process::exit(1);
        }
    };

    let out_dir = project_root.join(output);
    let assembly = CloudAssembly::new(&out_dir);
    let refs: Vec<&Stack> = stacks.iter().map(|s| s.stack()).collect();

    let manifest = match assembly.write(&refs).await {
        Ok(manifest) => manifest,
        Err(e) => {
            eprintln!("{}", "✗ 合成に失敗しました".red().bold());
            eprintln!("  {}", e);
            std::process::exit(1);
        }
    };

    // ステータスはstderrへ（stdoutはテンプレート用）
    for id in manifest.artifacts.keys() {
        eprintln!(
            "{} {}",
            "✓".green().bold(),
            format!("{} を合成しました", id).green()
        );
    }
    eprintln!(
        "  出力先: {}",
        assembly.out_dir().display().to_string().cyan()
    );

    if !manifest.missing.is_empty() {
        eprintln!();
        eprintln!("{}", "⚠ 未解決のルックアップ（ダミー値を使用）:".yellow());
        for missing in &manifest.missing {
            eprintln!("  • {}", missing.key.yellow());
        }
        eprintln!("  homebody context --set '<KEY>=<VALUE>' で値を設定できます");
    }

    // 単一スタックの場合のみテンプレートを表示
    if !quiet && let [stack] = stacks.as_slice() {
        println!("{}", stack.synthesize()?.to_json_pretty()?);
    }

    Ok(())
}
