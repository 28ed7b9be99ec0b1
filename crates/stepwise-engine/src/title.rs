//! Display titles for tool steps.

use std::collections::HashMap;

/// Name used when an event does not say which tool it is about.
pub const UNKNOWN_TOOL: &str = "Unknown Tool";

fn builtin_title(tool_name: &str) -> Option<&'static str> {
    let title = match tool_name {
        "search_web" => "Searching the web",
        "execute_step" => "Executing step",
        "draft_plan" => "Drafting plan",
        "read_file" => "Reading file",
        "write_file" => "Writing file",
        "list_dir" => "Listing directory",
        "random_number" => "Generating random number",
        "code_interpreter" => "Running code",
        _ => return None,
    };
    Some(title)
}

/// Resolve a tool's display title.
///
/// Lookup order: caller overrides, the built-in table, then any name
/// containing "search" (case-insensitive), then `Executing <tool_name>`.
pub fn resolve_tool_title(tool_name: &str, overrides: &HashMap<String, String>) -> String {
    if let Some(title) = overrides.get(tool_name) {
        return title.clone();
    }
    if let Some(title) = builtin_title(tool_name) {
        return title.to_string();
    }
    if tool_name.to_lowercase().contains("search") {
        return "Searching the web".to_string();
    }
    format!("Executing {tool_name}")
}
