//! Search traces and remedy suggestions for resolution and construction failures.
//!
//! A [`DiagnosticContext`] accumulates every place the resolver or the instance manager looked,
//! then renders one multi-line message:
//!
//! ```text
//! Cannot construct OrderService
//!
//! Searched:
//!   ✗ OrderService::test_factory (not registered)
//!   ✗ babel/factories/example/payment.json (nested structure) (file not found)
//!
//! Suggestions:
//!   1. ...
//! ```

use std::path::Path;

use babeltest_core::TypeInfo;
use babeltest_core::naming;
use serde_json::Value;

/// One place that was searched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchAttempt {
    pub location: String,
    pub found: bool,
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiagnosticContext {
    pub target: String,
    pub searches: Vec<SearchAttempt>,
    pub suggestions: Vec<String>,
}

impl DiagnosticContext {
    pub fn new(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            searches: Vec::new(),
            suggestions: Vec::new(),
        }
    }

    pub fn add_search(&mut self, location: impl Into<String>, found: bool, reason: Option<&str>) {
        self.searches.push(SearchAttempt {
            location: location.into(),
            found,
            reason: reason.map(str::to_string),
        });
    }

    pub fn add_suggestion(&mut self, suggestion: impl Into<String>) {
        let suggestion = suggestion.into();
        if !self.suggestions.contains(&suggestion) {
            self.suggestions.push(suggestion);
        }
    }

    /// Append another context's trace (nested construction inside resolution).
    pub fn absorb(&mut self, other: DiagnosticContext) {
        self.searches.extend(other.searches);
        for suggestion in other.suggestions {
            self.add_suggestion(suggestion);
        }
    }

    pub fn first_suggestion(&self) -> Option<String> {
        self.suggestions.first().cloned()
    }

    pub fn format_error(&self, summary: &str) -> String {
        let mut lines = vec![summary.to_string(), String::new()];

        if !self.searches.is_empty() {
            lines.push("Searched:".to_string());
            for attempt in &self.searches {
                let icon = if attempt.found { '✓' } else { '✗' };
                let mut line = format!("  {icon} {}", attempt.location);
                if let Some(reason) = &attempt.reason {
                    line.push_str(&format!(" ({reason})"));
                }
                lines.push(line);
            }
            lines.push(String::new());
        }

        if !self.suggestions.is_empty() {
            lines.push("Suggestions:".to_string());
            for (i, suggestion) in self.suggestions.iter().enumerate() {
                lines.push(format!("  {}. {suggestion}", i + 1));
            }
        }

        while lines.last().is_some_and(String::is_empty) {
            lines.pop();
        }
        lines.join("\n")
    }
}

/// Example factory file that would make `info` constructible.
pub fn suggest_factory_creation(info: &TypeInfo, factories_dir: &Path) -> String {
    let factory_name = naming::lower_camel(info.name());
    let file_stem = match info.module_path().rsplit('.').next() {
        Some(last) if !last.is_empty() => last.to_string(),
        _ => factory_name.clone(),
    };
    let file = factories_dir.join(format!("{file_stem}.json"));

    let params = info
        .constructors
        .iter()
        .max_by_key(|c| c.params.len())
        .map(|c| c.params.as_slice())
        .unwrap_or_default();
    let args: Vec<String> = params
        .iter()
        .map(|p| match p.ty.capability_name() {
            Some(capability) => format!(r#""{}": {{"$type": "{capability}"}}"#, p.name),
            None => format!(r#""{}": <{}>"#, p.name, p.ty),
        })
        .collect();

    format!(
        "Create a factory file:\n\n  // {}\n  {{\n    \"{factory_name}\": {{ \"args\": {{ {} }} }}\n  }}",
        file.display(),
        args.join(", ")
    )
}

/// Compact JSON rendering, truncated to `max_len` characters.
pub fn render_value(value: &Value, max_len: usize) -> String {
    let rendered = value.to_string();
    if rendered.chars().count() <= max_len {
        return rendered;
    }
    let mut out: String = rendered.chars().take(max_len.saturating_sub(3)).collect();
    out.push_str("...");
    out
}
