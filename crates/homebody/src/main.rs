mod commands;
mod utils;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "homebody")]
#[command(about = "おうちサーバーのインフラを宣言し、デプロイ用に合成する", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// スタックを合成してクラウドアセンブリを出力
    Synth {
        /// スタックID（省略時は全スタック）
        stack: Option<String>,
        /// 出力ディレクトリ
        #[arg(short, long, env = "HOMEBODY_OUTDIR", default_value = "homebody.out")]
        output: PathBuf,
        /// テンプレートを標準出力に表示しない
        #[arg(short, long)]
        quiet: bool,
    },
    /// スタックと宣言されたリソースの一覧を表示
    Ls,
    /// スタックを合成して検証
    Validate,
    /// ルックアップ用コンテキストを管理
    Context {
        /// 値を設定 (KEY=VALUE、最後の = で分割。VALUE は JSON または文字列)
        #[arg(long, value_name = "KEY=VALUE", conflicts_with_all = ["reset", "clear"])]
        set: Option<String>,
        /// 値を削除
        #[arg(long, value_name = "KEY", conflicts_with = "clear")]
        reset: Option<String>,
        /// 全ての値を削除
        #[arg(long)]
        clear: bool,
    },
    /// バージョン情報を表示
    Version,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // ログはstderrへ（stdoutはテンプレート出力に使う）
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();

    // Versionコマンドは設定ファイル不要
    if matches!(cli.command, Commands::Version) {
        println!("homebody {}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }

    let project_root = std::env::current_dir()?;

    match cli.command {
        Commands::Synth {
            stack,
            output,
            quiet,
        } => {
            commands::synth::handle(&project_root, stack.as_deref(), &output, quiet).await?;
        }
        Commands::Ls => {
            commands::ls::handle(&project_root).await?;
        }
        Commands::Validate => {
            commands::validate::handle(&project_root).await?;
        }
        Commands::Context { set, reset, clear } => {
            let action = if let Some(assignment) = set {
                commands::context::Action::Set(assignment)
            } else if let Some(key) = reset {
                commands::context::Action::Reset(key)
            } else if clear {
                commands::context::Action::Clear
            } else {
                commands::context::Action::List
            };
            commands::context::handle(&project_root, action).await?;
        }
        Commands::Version => {
            unreachable!("Version is handled before project loading");
        }
    }

    Ok(())
}
