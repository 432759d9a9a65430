//! Compiler configuration.

/// Options controlling binding and emission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompilerOptions {
    /// Replace virtual calls with direct calls when the reaching-class
    /// analysis proves a single target.
    pub devirtualize: bool,
    /// Functions treated as program entry points. They get no per-call
    /// exception tests and check the exception code before every return.
    pub entry_functions: Vec<String>,
    /// Emit exception tests and landing pads after fallible calls.
    pub exception_checks: bool,
}

impl Default for CompilerOptions {
    fn default() -> Self {
        Self {
            devirtualize: true,
            entry_functions: vec!["main".to_string()],
            exception_checks: true,
        }
    }
}

impl CompilerOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_devirtualize(mut self, enabled: bool) -> Self {
        self.devirtualize = enabled;
        self
    }

    pub fn with_entry_functions<S: Into<String>>(
        mut self,
        names: impl IntoIterator<Item = S>,
    ) -> Self {
        self.entry_functions = names.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_exception_checks(mut self, enabled: bool) -> Self {
        self.exception_checks = enabled;
        self
    }

    /// Whether `name` (simple or qualified) names an entry function.
    pub fn is_entry(&self, name: &str, qualified: &str) -> bool {
        self.entry_functions
            .iter()
            .any(|entry| entry == name || entry == qualified)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let options = CompilerOptions::default();
        assert!(options.devirtualize);
        assert!(options.exception_checks);
        assert!(options.is_entry("main", "main"));
        assert!(!options.is_entry("helper", "helper"));
    }

    #[test]
    fn builder_overrides() {
        let options = CompilerOptions::new()
            .with_devirtualize(false)
            .with_entry_functions(["start", "app::run"])
            .with_exception_checks(false);
        assert!(!options.devirtualize);
        assert!(!options.exception_checks);
        assert!(options.is_entry("run", "app::run"));
        assert!(!options.is_entry("main", "main"));
    }
}
