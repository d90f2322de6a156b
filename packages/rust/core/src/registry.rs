//! The fixed set of compiler invocations run for every request.

use std::collections::HashSet;

use silinspector_shared::{Result, SilInspectorError};

/// Stages emitted by the Swift front end: `(key, label, mode flag)`.
const SWIFT_STAGES: [(&str, &str, &str); 6] = [
    ("silRaw", "SIL Raw", "-emit-silgen"),
    ("silCanonical", "SIL Canonical", "-emit-sil"),
    ("ast", "AST", "-dump-ast"),
    ("parse", "Parse", "-dump-parse"),
    ("ir", "IR", "-emit-ir"),
    ("assembly", "Assembly", "-emit-assembly"),
];

/// Argument telling the compiler to read its source from stdin.
const STDIN_INPUT: &str = "-";

/// One named program invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgramSpec {
    key: String,
    label: String,
    base_args: Vec<String>,
}

impl ProgramSpec {
    /// `base_args[0]` is the executable; the rest are its fixed arguments.
    pub fn new(key: impl Into<String>, label: impl Into<String>, base_args: Vec<String>) -> Self {
        Self {
            key: key.into(),
            label: label.into(),
            base_args,
        }
    }

    /// Stable key used in the result bundle.
    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// Full template, executable first.
    pub fn base_args(&self) -> &[String] {
        &self.base_args
    }
}

/// Read-only, ordered collection of [`ProgramSpec`]s.
#[derive(Debug, Clone)]
pub struct ProgramRegistry {
    specs: Vec<ProgramSpec>,
}

impl ProgramRegistry {
    /// Build a registry, checking that keys are non-empty and unique and
    /// that every template names an executable.
    pub fn new(specs: Vec<ProgramSpec>) -> Result<Self> {
        let mut seen = HashSet::new();
        for spec in &specs {
            if spec.key.is_empty() {
                return Err(SilInspectorError::registry("program key must not be empty"));
            }
            if !seen.insert(spec.key.as_str()) {
                return Err(SilInspectorError::registry(format!(
                    "duplicate program key '{}'",
                    spec.key
                )));
            }
            if spec.base_args.first().is_none_or(|program| program.is_empty()) {
                return Err(SilInspectorError::registry(format!(
                    "program '{}' has no executable",
                    spec.key
                )));
            }
        }
        Ok(Self { specs })
    }

    /// The six Swift front-end stages, all invoking `compiler`.
    pub fn swift(compiler: &str) -> Self {
        let specs = SWIFT_STAGES
            .iter()
            .map(|(key, label, flag)| {
                ProgramSpec::new(
                    *key,
                    *label,
                    vec![compiler.to_string(), STDIN_INPUT.to_string(), flag.to_string()],
                )
            })
            .collect();
        Self { specs }
    }

    /// Specs in registry order.
    pub fn specs(&self) -> &[ProgramSpec] {
        &self.specs
    }

    pub fn get(&self, key: &str) -> Option<&ProgramSpec> {
        self.specs.iter().find(|s| s.key == key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.specs.iter().map(|s| s.key.as_str())
    }

    pub fn len(&self) -> usize {
        self.specs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn swift_registry_order_and_templates() {
        let registry = ProgramRegistry::swift("swiftc");
        assert_eq!(
            registry.keys().collect::<Vec<_>>(),
            vec!["silRaw", "silCanonical", "ast", "parse", "ir", "assembly"]
        );
        let ir = registry.get("ir").expect("ir stage");
        assert_eq!(ir.label(), "IR");
        assert_eq!(ir.base_args(), args(&["swiftc", "-", "-emit-ir"]).as_slice());
    }

    #[test]
    fn swift_registry_passes_validation() {
        let registry = ProgramRegistry::swift("/opt/swift/bin/swiftc");
        let validated = ProgramRegistry::new(registry.specs().to_vec()).expect("valid");
        assert_eq!(validated.len(), 6);
        assert!(
            validated
                .specs()
                .iter()
                .all(|s| s.base_args()[0] == "/opt/swift/bin/swiftc")
        );
    }

    #[test]
    fn duplicate_keys_rejected() {
        let specs = vec![
            ProgramSpec::new("ast", "AST", args(&["swiftc", "-", "-dump-ast"])),
            ProgramSpec::new("ast", "AST again", args(&["swiftc", "-", "-dump-ast"])),
        ];
        let err = ProgramRegistry::new(specs).unwrap_err();
        assert!(err.to_string().contains("duplicate program key 'ast'"));
    }

    #[test]
    fn empty_template_rejected() {
        let err = ProgramRegistry::new(vec![ProgramSpec::new("ir", "IR", vec![])]).unwrap_err();
        assert!(err.to_string().contains("no executable"));

        let err = ProgramRegistry::new(vec![ProgramSpec::new("", "IR", args(&["swiftc"]))])
            .unwrap_err();
        assert!(err.to_string().contains("must not be empty"));
    }

    #[test]
    fn unknown_key_lookup() {
        assert!(ProgramRegistry::swift("swiftc").get("bitcode").is_none());
    }
}
