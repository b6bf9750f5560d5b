/// Placeholder in tool arguments replaced with the artifact path.
pub const ARTIFACT_PLACEHOLDER: &str = "{artifact}";

/// Placeholder in tool arguments replaced with the source root.
pub const ROOT_PLACEHOLDER: &str = "{root}";
