//! 設定モデル

use homebody_cloud::{Environment, StackProps};
use indexmap::IndexMap;
use std::collections::BTreeMap;
use std::path::PathBuf;

/// 設定ファイルがない場合のスタックID
pub const DEFAULT_STACK_ID: &str = "InfraStack";

/// account 未指定時に参照する環境変数
pub const DEFAULT_ACCOUNT_ENV: &str = "HOMEBODY_DEFAULT_ACCOUNT";

/// region 未指定時に参照する環境変数
pub const DEFAULT_REGION_ENV: &str = "HOMEBODY_DEFAULT_REGION";

/// 1スタック分のデプロイオプション
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StackOptions {
    pub account: Option<String>,
    pub region: Option<String>,
    pub description: Option<String>,
    pub termination_protection: bool,
    pub tags: BTreeMap<String, String>,
}

impl StackOptions {
    /// StackPropsに変換（未指定の account/region は環境変数で補完）
    pub fn to_stack_props(&self) -> StackProps {
        let account = self.account.clone().or_else(|| env_value(DEFAULT_ACCOUNT_ENV));
        let region = self.region.clone().or_else(|| env_value(DEFAULT_REGION_ENV));

        StackProps {
            env: Environment { account, region },
            description: self.description.clone(),
            tags: self.tags.clone(),
            termination_protection: self.termination_protection,
        }
    }
}

fn env_value(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// homebody.kdl 全体
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HomebodyConfig {
    /// スタックID → オプション（記述順）
    pub stacks: IndexMap<String, StackOptions>,

    /// 読み込んだファイル（デフォルト設定の場合は None）
    pub source: Option<PathBuf>,
}

impl Default for HomebodyConfig {
    fn default() -> Self {
        let mut stacks = IndexMap::new();
        stacks.insert(DEFAULT_STACK_ID.to_string(), StackOptions::default());
        Self {
            stacks,
            source: None,
        }
    }
}

impl HomebodyConfig {
    pub fn stack(&self, id: &str) -> Option<&StackOptions> {
        self.stacks.get(id)
    }

    pub fn stack_ids(&self) -> impl Iterator<Item = &str> {
        self.stacks.keys().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn test_default_config() {
        let config = HomebodyConfig::default();
        assert_eq!(config.stack_ids().collect::<Vec<_>>(), vec!["InfraStack"]);
        assert!(config.source.is_none());
    }

    #[test]
    #[serial]
    fn test_env_fallback() {
        temp_env::with_vars(
            [
                (DEFAULT_ACCOUNT_ENV, Some("111122223333")),
                (DEFAULT_REGION_ENV, Some("eu-west-1")),
            ],
            || {
                let props = StackOptions::default().to_stack_props();
                assert_eq!(props.env, Environment::new("111122223333", "eu-west-1"));
            },
        );
    }

    #[test]
    #[serial]
    fn test_explicit_values_win_over_env() {
        temp_env::with_var(DEFAULT_REGION_ENV, Some("eu-west-1"), || {
            let options = StackOptions {
                region: Some("ap-northeast-1".to_string()),
                ..Default::default()
            };
            let props = options.to_stack_props();
            assert_eq!(props.env.region.as_deref(), Some("ap-northeast-1"));
        });
    }

    #[test]
    #[serial]
    fn test_blank_env_is_ignored() {
        temp_env::with_vars(
            [(DEFAULT_ACCOUNT_ENV, Some("  ")), (DEFAULT_REGION_ENV, None)],
            || {
                let props = StackOptions::default().to_stack_props();
                assert!(props.env.is_agnostic());
            },
        );
    }
}
