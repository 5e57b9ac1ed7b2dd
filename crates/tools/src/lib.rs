//! Built-in tool implementations for Steward.
//!
//! Tools give the agent the ability to interact with the world:
//! read/write/list workspace files, check the weather, scrape web pages
//! and search what was scraped.

pub mod create_workspace;
pub mod file_list;
pub mod file_read;
pub mod file_write;
pub mod path_guard;
pub mod retrieval_store;
pub mod scrape_url;
pub mod search_information;
pub mod weather_lookup;

use std::sync::Arc;
use steward_config::ToolsConfig;
use steward_core::error::RegistryError;
use steward_core::tool::ToolRegistry;

pub use retrieval_store::RetrievalStore;

/// Create the default tool registry with all built-in tools.
///
/// File tools are confined to `workspace_dir`; retrieval workspaces live
/// under `workspace_dir/rag`.
pub fn default_registry(config: &ToolsConfig) -> Result<ToolRegistry, RegistryError> {
    let workspace = config.workspace_dir.clone();
    let forbidden = config.forbidden_paths.clone();
    let store = Arc::new(RetrievalStore::new(workspace.join("rag")));

    ToolRegistry::from_tools(vec![
        Box::new(file_write::WriteFileTool::new(&workspace).with_forbidden_paths(forbidden.clone())),
        Box::new(file_read::ReadFileTool::new(&workspace).with_forbidden_paths(forbidden.clone())),
        Box::new(file_list::ListFilesTool::new(&workspace).with_forbidden_paths(forbidden)),
        Box::new(weather_lookup::WeatherLookupTool::new(
            config.openweathermap_api_key.clone(),
        )),
        Box::new(scrape_url::ScrapeUrlTool::new(store.clone())),
        Box::new(create_workspace::CreateWorkspaceTool::new(store.clone())),
        Box::new(search_information::SearchInformationTool::new(store)),
    ])
}
