#![allow(deprecated)]

use assert_cmd::Command;
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

/// 一時ディレクトリ上のプロジェクト
pub struct TestProject {
    pub root: TempDir,
    home: TempDir,
}

impl TestProject {
    pub fn new() -> Self {
        let root = tempfile::tempdir().unwrap();
        let home = tempfile::tempdir().unwrap();
        Self { root, home }
    }

    pub fn write_config(&self, content: &str) {
        let path = self.root.path().join("homebody.kdl");
        fs::write(path, content).unwrap();
    }

    pub fn path(&self) -> PathBuf {
        self.root.path().to_path_buf()
    }

    #[allow(dead_code)]
    pub fn read_json(&self, relative: &str) -> serde_json::Value {
        let content = fs::read_to_string(self.root.path().join(relative)).unwrap();
        serde_json::from_str(&content).unwrap()
    }

    /// プロジェクトをカレントにした homebody コマンド
    ///
    /// ホーム側のグローバル設定や環境変数の影響を受けないようにする
    pub fn cmd(&self) -> Command {
        let mut cmd = Command::cargo_bin("homebody").unwrap();
        cmd.current_dir(self.root.path())
            .env("HOME", self.home.path())
            .env("XDG_CONFIG_HOME", self.home.path())
            .env_remove("HOMEBODY_CONFIG_PATH")
            .env_remove("HOMEBODY_DEFAULT_ACCOUNT")
            .env_remove("HOMEBODY_DEFAULT_REGION")
            .env_remove("HOMEBODY_OUTDIR")
            .env_remove("RUST_LOG");
        cmd
    }
}
