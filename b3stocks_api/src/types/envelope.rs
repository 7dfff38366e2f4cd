use serde::{Deserialize, Serialize};

/// Error object the provider embeds in a response envelope instead of a result.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct UpstreamError {
    pub code: String,
    #[serde(default)]
    pub description: Option<String>,
}

impl UpstreamError {
    /// Whether the provider is reporting an unknown or delisted symbol.
    pub fn is_not_found(&self) -> bool {
        self.code.eq_ignore_ascii_case("not found")
    }
}
