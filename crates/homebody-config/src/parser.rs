//! KDLパーサー
//!
//! ```kdl
//! stack "InfraStack" {
//!     account "123456789012"
//!     region "ap-northeast-1"
//!     termination-protection #true
//!     tags {
//!         project "homebody"
//!     }
//! }
//! ```

use crate::error::{ConfigError, Result};
use crate::model::{HomebodyConfig, StackOptions};
use indexmap::IndexMap;
use kdl::{KdlDocument, KdlNode};
use std::fs;
use std::path::Path;

/// KDLファイルをパース
#[tracing::instrument]
pub fn parse_config_file(path: &Path) -> Result<HomebodyConfig> {
    let content = fs::read_to_string(path)?;
    let mut config = parse_config_str(&content)?;
    config.source = Some(path.to_path_buf());
    tracing::debug!(stacks = config.stacks.len(), "設定ファイルを読み込みました");
    Ok(config)
}

/// KDL文字列をパース
///
/// `stack` ノードが1つもない場合はデフォルト設定を返す。
pub fn parse_config_str(content: &str) -> Result<HomebodyConfig> {
    let doc: KdlDocument = content.parse()?;
    let mut stacks = IndexMap::new();

    for node in doc.nodes() {
        match node.name().value() {
            "stack" => {
                let (id, options) = parse_stack(node)?;
                if stacks.contains_key(&id) {
                    return Err(ConfigError::InvalidConfig(format!(
                        "スタック '{}' が重複しています",
                        id
                    )));
                }
                stacks.insert(id, options);
            }
            other => {
                tracing::warn!("不明なノードをスキップします: {}", other);
            }
        }
    }

    if stacks.is_empty() {
        return Ok(HomebodyConfig::default());
    }

    Ok(HomebodyConfig {
        stacks,
        source: None,
    })
}

fn parse_stack(node: &KdlNode) -> Result<(String, StackOptions)> {
    let id = node
        .entries()
        .first()
        .and_then(|e| e.value().as_string())
        .ok_or_else(|| ConfigError::InvalidConfig("stack ノードには名前が必要です".to_string()))?
        .to_string();
    validate_stack_id(&id)?;

    let mut options = StackOptions::default();
    let Some(children) = node.children() else {
        return Ok((id, options));
    };

    for child in children.nodes() {
        match child.name().value() {
            "account" => {
                let account = string_value(child)?;
                if account.len() != 12 || !account.chars().all(|c| c.is_ascii_digit()) {
                    return Err(ConfigError::InvalidConfig(format!(
                        "account は12桁の数字で指定してください: {}",
                        account
                    )));
                }
                options.account = Some(account);
            }
            "region" => options.region = Some(string_value(child)?),
            "description" => options.description = Some(string_value(child)?),
            "termination-protection" => {
                options.termination_protection = child
                    .entries()
                    .first()
                    .and_then(|e| e.value().as_bool())
                    .ok_or_else(|| {
                        ConfigError::InvalidConfig(
                            "termination-protection には #true または #false を指定してください"
                                .to_string(),
                        )
                    })?;
            }
            "tags" => {
                if let Some(tags) = child.children() {
                    for tag in tags.nodes() {
                        let key = tag.name().value().to_string();
                        options.tags.insert(key, string_value(tag)?);
                    }
                }
            }
            other => {
                tracing::warn!(stack = %id, "不明な設定項目をスキップします: {}", other);
            }
        }
    }

    Ok((id, options))
}

fn string_value(node: &KdlNode) -> Result<String> {
    node.entries()
        .first()
        .and_then(|e| e.value().as_string())
        .map(str::to_string)
        .ok_or_else(|| {
            ConfigError::InvalidConfig(format!(
                "'{}' には文字列を指定してください",
                node.name().value()
            ))
        })
}

/// 英字で始まり、英数字とハイフンのみ
fn validate_stack_id(id: &str) -> Result<()> {
    let mut chars = id.chars();
    let valid = chars.next().is_some_and(|c| c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '-');
    if valid {
        Ok(())
    } else {
        Err(ConfigError::InvalidConfig(format!(
            "無効なスタックID: '{}'",
            id
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_stack() {
        let kdl = r#"
            stack "InfraStack" {
                account "123456789012"
                region "ap-northeast-1"
                description "HomeBody web server"
                termination-protection #true
                tags {
                    project "homebody"
                    owner "frank"
                }
            }
        "#;

        let config = parse_config_str(kdl).unwrap();
        let stack = config.stack("InfraStack").unwrap();
        assert_eq!(stack.account.as_deref(), Some("123456789012"));
        assert_eq!(stack.region.as_deref(), Some("ap-northeast-1"));
        assert_eq!(stack.description.as_deref(), Some("HomeBody web server"));
        assert!(stack.termination_protection);
        assert_eq!(stack.tags.len(), 2);
        assert_eq!(stack.tags["project"], "homebody");
    }

    #[test]
    fn test_parse_multiple_stacks_keeps_order() {
        let kdl = r#"
            stack "Staging" {
                region "us-west-2"
            }
            stack "Production"
        "#;

        let config = parse_config_str(kdl).unwrap();
        assert_eq!(
            config.stack_ids().collect::<Vec<_>>(),
            vec!["Staging", "Production"]
        );
        assert_eq!(config.stack("Production").unwrap(), &StackOptions::default());
    }

    #[test]
    fn test_empty_document_gives_default() {
        let config = parse_config_str("// nothing here").unwrap();
        assert_eq!(config, HomebodyConfig::default());
    }

    #[test]
    fn test_duplicate_stack_error() {
        let kdl = r#"
            stack "InfraStack"
            stack "InfraStack"
        "#;
        assert!(matches!(
            parse_config_str(kdl),
            Err(ConfigError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_invalid_values() {
        assert!(parse_config_str(r#"stack"#).is_err());
        assert!(parse_config_str(r#"stack "1bad""#).is_err());
        assert!(parse_config_str(r#"stack "S" { account "12345" }"#).is_err());
        assert!(parse_config_str(r#"stack "S" { region 42 }"#).is_err());
        assert!(parse_config_str(r#"stack "S" { termination-protection "yes" }"#).is_err());
    }

    #[test]
    fn test_kdl_syntax_error() {
        let result = parse_config_str(r#"stack "S" {"#);
        assert!(matches!(result, Err(ConfigError::KdlParse(_))));
    }

    #[test]
    fn test_unknown_nodes_are_skipped() {
        let kdl = r#"
            project "homebody"
            stack "InfraStack" {
                color "blue"
            }
        "#;
        let config = parse_config_str(kdl).unwrap();
        assert_eq!(config.stacks.len(), 1);
    }

    #[test]
    fn test_parse_config_file_sets_source() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("homebody.kdl");
        fs::write(&path, r#"stack "InfraStack""#).unwrap();

        let config = parse_config_file(&path).unwrap();
        assert_eq!(config.source.as_deref(), Some(path.as_path()));
    }
}
