use crate::utils;
use colored::Colorize;
use std::path::Path;

pub async fn handle(project_root: &Path) -> anyhow::Result<()> {
    let (config, context) = utils::load_project(project_root).await?;
    let stacks = utils::build_stacks(&config, &context, None)?;

    for infra in &stacks {
        let stack = infra.stack();
        println!(
            "{} ({})",
            stack.id().cyan().bold(),
            stack.env().to_uri().dimmed()
        );
        for construct in stack.constructs() {
            println!("  {:<20} {}", construct.kind.to_string(), construct.path);
        }
    }

    Ok(())
}
