use colored::Colorize;
use homebody_cloud::{Context, ContextStore};
use homebody_config::HomebodyConfig;
use homebody_stack::InfraStack;
use std::path::Path;

/// 設定とコンテキストを読み込む
pub async fn load_project(project_root: &Path) -> anyhow::Result<(HomebodyConfig, Context)> {
    let config = homebody_config::load_config()?;
    tracing::debug!(source = ?config.source, stacks = config.stacks.len(), "Loaded config");
    let store = ContextStore::new(project_root);
    let context = store.load().await?;
    let path = store.path();
    tracing::debug!(path = %path.display(), entries = context.len(), "Loaded context");
    Ok((config, context))
}

/// 設定に記述されたスタックを構築する（`only` 指定時はそのスタックのみ）
pub fn build_stacks(
    config: &HomebodyConfig,
    context: &Context,
    only: Option<&str>,
) -> anyhow::Result<Vec<InfraStack>> {
    if let Some(id) = only
        && config.stack(id).is_none()
    {
        return Err(anyhow::anyhow!(
            "スタックが見つかりません: {}\n利用可能なスタック: {}",
            id,
            config.stack_ids().collect::<Vec<_>>().join(", ")
        ));
    }

    Ok(config
        .stacks
        .iter()
        .filter(|(id, _)| only.is_none_or(|o| o == id.as_str()))
        .map(|(id, options)| InfraStack::build(id, options.to_stack_props(), context))
        .collect())
}

/// 読み込んだ設定ファイル情報を表示
pub fn print_config_source(config: &HomebodyConfig) {
    match &config.source {
        Some(path) => println!("📄 設定ファイル: {}", path.display().to_string().cyan()),
        None => println!("📄 設定ファイル: {}", "(なし、デフォルト設定)".dimmed()),
    }
}
