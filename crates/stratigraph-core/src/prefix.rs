//! Graph-code prefixes for names shared across graphs
//!
//! When several graphs are loaded side by side, node names are made unique by
//! prefixing them with the owning graph's code: `VDL16.US001`.

/// Separator between graph code and base name
pub const PREFIX_SEPARATOR: char = '.';

/// Prefix `name` with `graph_code`, replacing any prefix already present.
/// Empty names and empty codes leave the name unchanged.
pub fn add_graph_prefix(name: &str, graph_code: &str) -> String {
    if name.trim().is_empty() || graph_code.trim().is_empty() {
        return name.to_string();
    }
    format!("{}{}{}", graph_code, PREFIX_SEPARATOR, strip_graph_prefix(name))
}

/// Base name without its graph code; names without a separator are returned as is
pub fn strip_graph_prefix(name: &str) -> &str {
    name.split_once(PREFIX_SEPARATOR)
        .map(|(_, base)| base)
        .unwrap_or(name)
}

/// The graph code of a prefixed name
pub fn graph_code_of(name: &str) -> Option<&str> {
    name.split_once(PREFIX_SEPARATOR).map(|(code, _)| code)
}
