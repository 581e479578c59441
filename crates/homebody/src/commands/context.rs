use colored::Colorize;
use homebody_cloud::ContextStore;
use serde_json::Value;
use std::path::Path;

pub enum Action {
    List,
    Set(String),
    Reset(String),
    Clear,
}

pub async fn handle(project_root: &Path, action: Action) -> anyhow::Result<()> {
    let store = ContextStore::new(project_root);
    let mut context = store.load().await?;

    match action {
        Action::List => {
            println!("📄 {}", store.path().display().to_string().cyan());
            if context.is_empty() {
                println!("{}", "コンテキストは空です".dimmed());
            }
            for (key, value) in context.iter() {
                println!("  {} = {}", key.cyan(), value);
            }
        }
        Action::Set(assignment) => {
            // ルックアップのキー自体が = を含むため最後の = で分割
            let Some((key, raw)) = assignment.rsplit_once('=') else {
                eprintln!("{}", "✗ KEY=VALUE の形式で指定してください".red().bold());
                std::process::exit(1);
            };
            let key = key.trim();
            if key.is_empty() {
                eprintln!("{}", "✗ キーが空です".red().bold());
                std::process::exit(1);
            }
            // JSONとして解釈できなければ文字列として保存
            let value =
                serde_json::from_str::<Value>(raw).unwrap_or_else(|_| Value::String(raw.to_string()));
            context.set(key, value);
            store.save(&context).await?;
            println!("{}", format!("✓ 設定しました: {}", key).green().bold());
        }
        Action::Reset(key) => {
            if context.remove(&key).is_none() {
                println!("{}", format!("⚠ キーが見つかりません: {}", key).yellow());
                return Ok(());
            }
            store.save(&context).await?;
            println!("{}", format!("✓ 削除しました: {}", key).green().bold());
        }
        Action::Clear => {
            let count = context.len();
            context.clear();
            store.save(&context).await?;
            println!(
                "{}",
                format!("✓ {}個の値を削除しました", count).green().bold()
            );
        }
    }

    Ok(())
}
