pub mod error;
pub mod model;
pub mod parser;

pub use error::*;
pub use model::{
    DEFAULT_ACCOUNT_ENV, DEFAULT_REGION_ENV, DEFAULT_STACK_ID, HomebodyConfig, StackOptions,
};
pub use parser::{parse_config_file, parse_config_str};

use std::path::PathBuf;

/// 設定ファイルのパスを直接指定する環境変数
pub const CONFIG_PATH_ENV: &str = "HOMEBODY_CONFIG_PATH";

const CANDIDATES: [&str; 4] = [
    "homebody.local.kdl",
    ".homebody.local.kdl",
    "homebody.kdl",
    ".homebody.kdl",
];

/// グローバル設定ファイルのパス (~/.config/homebody/homebody.kdl)
pub fn global_config_path() -> Result<PathBuf> {
    let config_dir = dirs::config_dir().ok_or(ConfigError::ConfigDirNotFound)?;
    Ok(config_dir.join("homebody").join("homebody.kdl"))
}

/// homebody.kdl を探す
///
/// 以下の優先順位で設定ファイルを検索:
/// 1. 環境変数 HOMEBODY_CONFIG_PATH (直接パス指定)
/// 2. カレントディレクトリ: homebody.local.kdl, .homebody.local.kdl, homebody.kdl, .homebody.kdl
/// 3. ./.homebody/ ディレクトリ内: 同様の順序
/// 4. ~/.config/homebody/homebody.kdl (グローバル設定)
///
/// どこにもなければ `None`（設定ファイルは任意）
pub fn find_config_file() -> Result<Option<PathBuf>> {
    // 1. 環境変数で直接指定
    if let Ok(config_path) = std::env::var(CONFIG_PATH_ENV) {
        let path = PathBuf::from(config_path);
        if path.exists() {
            return Ok(Some(path));
        }
        tracing::warn!("{} が存在しません: {}", CONFIG_PATH_ENV, path.display());
    }

    let current_dir = std::env::current_dir()?;

    // 2. カレントディレクトリで検索
    for filename in &CANDIDATES {
        let path = current_dir.join(filename);
        if path.exists() {
            return Ok(Some(path));
        }
    }

    // 3. ./.homebody/ ディレクトリで検索
    let project_dir = current_dir.join(".homebody");
    if project_dir.is_dir() {
        for filename in &CANDIDATES {
            let path = project_dir.join(filename);
            if path.exists() {
                return Ok(Some(path));
            }
        }
    }

    // 4. グローバル設定ファイル
    if let Ok(global_config) = global_config_path()
        && global_config.exists()
    {
        return Ok(Some(global_config));
    }

    Ok(None)
}

/// 設定を読み込む（ファイルがなければデフォルト設定）
pub fn load_config() -> Result<HomebodyConfig> {
    match find_config_file()? {
        Some(path) => parse_config_file(&path),
        None => {
            tracing::debug!("設定ファイルなし、デフォルト設定を使用します");
            Ok(HomebodyConfig::default())
        }
    }
}
