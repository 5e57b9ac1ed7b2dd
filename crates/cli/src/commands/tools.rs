//! `steward tools`: list the built-in tool catalog.

use steward_config::AppConfig;
use steward_core::ToolDefinition;

pub fn run(config: &AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    let registry = steward_tools::default_registry(&config.tools)?;
    println!("Built-in tools ({})", registry.len());
    println!();
    print!("{}", render_catalog(&registry.definitions()));
    println!();
    println!("   Workspace: {}", config.tools.workspace_dir.display());
    Ok(())
}

fn render_catalog(tools: &[ToolDefinition]) -> String {
    let width = tools.iter().map(|t| t.name.len()).max().unwrap_or(0);
    tools
        .iter()
        .map(|t| {
            let required = t.parameters["required"]
                .as_array()
                .map(|r| r.iter().filter_map(|v| v.as_str()).collect::<Vec<_>>().join(", "))
                .unwrap_or_default();
            format!("  {:<width$}  {}\n  {:<width$}  required: [{required}]\n", t.name, t.description, "")
        })
        .collect()
}
