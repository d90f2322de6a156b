//! Core domain types for compile requests and their results.

use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// RequestId
// ---------------------------------------------------------------------------

/// A UUID v7 wrapper used to correlate log lines of one compile request.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestId(pub Uuid);

impl RequestId {
    /// Generate a new time-sortable request identifier.
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// CompileRequest
// ---------------------------------------------------------------------------

/// Compiler flags selected by the caller.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompileOptions {
    /// Emit the single-file optimization flag.
    #[serde(default)]
    pub optimize: bool,
    /// Emit the whole-module optimization flag.
    #[serde(default)]
    pub module_optimize: bool,
    /// Parse the input as a library with a fixed module name.
    #[serde(default)]
    pub parse_as_library: bool,
}

/// Body of `POST /api/compile`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompileRequest {
    /// Source text fed to every program on stdin.
    pub source: String,
    /// Run every program's output through the demangler.
    #[serde(default)]
    pub demangle: bool,
    #[serde(flatten)]
    pub options: CompileOptions,
}

impl CompileRequest {
    /// Build a request with all options off.
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            demangle: false,
            options: CompileOptions::default(),
        }
    }

    /// Whether the source is empty or whitespace-only.
    pub fn is_blank(&self) -> bool {
        self.source.trim().is_empty()
    }
}

// ---------------------------------------------------------------------------
// CommandResult
// ---------------------------------------------------------------------------

/// Outcome of one registry entry: what ran and what it printed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandResult {
    /// Human-readable stage label.
    pub label: String,
    /// Shell-quoted invocation, for display only.
    pub command: String,
    /// Process exit code, or a synthetic code when the program never ran to completion.
    pub exit_code: i32,
    /// Selected output stream, possibly demangled.
    pub output: String,
}

impl CommandResult {
    /// Whether the program exited with status 0.
    pub fn succeeded(&self) -> bool {
        self.exit_code == 0
    }
}

// ---------------------------------------------------------------------------
// ResultBundle
// ---------------------------------------------------------------------------

/// Per-stage results keyed by registry key, in registry order.
///
/// Serializes as a JSON object whose member order matches insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResultBundle {
    entries: Vec<(String, CommandResult)>,
}

impl ResultBundle {
    /// Create an empty bundle sized for `capacity` entries.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Vec::with_capacity(capacity),
        }
    }

    /// Append a result. A repeated key replaces the earlier result in place.
    pub fn insert(&mut self, key: impl Into<String>, result: CommandResult) {
        let key = key.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some((_, existing)) => *existing = result,
            None => self.entries.push((key, result)),
        }
    }

    /// Look up a result by registry key.
    pub fn get(&self, key: &str) -> Option<&CommandResult> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, result)| result)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Keys in insertion order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    /// `(key, result)` pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &CommandResult)> {
        self.entries.iter().map(|(k, r)| (k.as_str(), r))
    }
}

impl Serialize for ResultBundle {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (key, result) in &self.entries {
            map.serialize_entry(key, result)?;
        }
        map.end()
    }
}

/// Response body of `POST /api/compile`.
#[derive(Debug, Clone, Serialize)]
pub struct CompileResponse {
    pub results: ResultBundle,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(label: &str, exit_code: i32) -> CommandResult {
        CommandResult {
            label: label.into(),
            command: "swiftc - -emit-sil".into(),
            exit_code,
            output: String::new(),
        }
    }

    #[test]
    fn compile_request_defaults_missing_flags() {
        let req: CompileRequest = serde_json::from_str(r#"{"source":"print(1)"}"#).unwrap();
        assert_eq!(req.source, "print(1)");
        assert!(!req.demangle);
        assert_eq!(req.options, CompileOptions::default());
    }

    #[test]
    fn compile_request_reads_camel_case_flags() {
        let json = r#"{
            "source": "let x = 1",
            "demangle": true,
            "optimize": true,
            "moduleOptimize": true,
            "parseAsLibrary": true
        }"#;
        let req: CompileRequest = serde_json::from_str(json).unwrap();
        assert!(req.demangle);
        assert!(req.options.optimize);
        assert!(req.options.module_optimize);
        assert!(req.options.parse_as_library);
    }

    #[test]
    fn compile_request_requires_source() {
        let parsed = serde_json::from_str::<CompileRequest>(r#"{"demangle":true}"#);
        assert!(parsed.is_err());
    }

    #[test]
    fn blank_detection_trims_whitespace() {
        assert!(CompileRequest::new("").is_blank());
        assert!(CompileRequest::new("  \n\t ").is_blank());
        assert!(!CompileRequest::new(" print(1) ").is_blank());
    }

    #[test]
    fn command_result_uses_exit_code_camel_case() {
        let json = serde_json::to_string(&result("SIL Raw", 1)).unwrap();
        assert!(json.contains(r#""exitCode":1"#));
        assert!(json.contains(r#""label":"SIL Raw""#));
    }

    #[test]
    fn bundle_serializes_in_insertion_order() {
        let mut bundle = ResultBundle::default();
        bundle.insert("silRaw", result("SIL Raw", 0));
        bundle.insert("ast", result("AST", 0));
        bundle.insert("assembly", result("Assembly", 0));

        let json = serde_json::to_string(&CompileResponse { results: bundle }).unwrap();
        let sil = json.find(r#""silRaw""#).unwrap();
        let ast = json.find(r#""ast""#).unwrap();
        let asm = json.find(r#""assembly""#).unwrap();
        assert!(json.starts_with(r#"{"results":{"#));
        assert!(sil < ast && ast < asm);
    }

    #[test]
    fn bundle_insert_replaces_existing_key() {
        let mut bundle = ResultBundle::with_capacity(2);
        bundle.insert("ir", result("IR", 1));
        bundle.insert("parse", result("Parse", 0));
        bundle.insert("ir", result("IR", 0));

        assert_eq!(bundle.len(), 2);
        assert_eq!(bundle.keys().collect::<Vec<_>>(), vec!["ir", "parse"]);
        assert!(bundle.get("ir").unwrap().succeeded());
        assert!(bundle.get("missing").is_none());
    }
}
