//! File extensions recognized by the script runner (lowercase, no dot).

/// Python scripts (variables passed as one JSON argument).
pub const EXT_PYTHON: &str = "py";

/// Node.js scripts (variables passed as one JSON argument).
pub const EXT_NODE: &str = "js";

/// PowerShell scripts (ticket context and variables bound as named values).
pub const EXT_POWERSHELL: &str = "ps1";
