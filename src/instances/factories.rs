//! Declarative factory files.
//!
//! A factory file is a JSON object mapping factory names to construction recipes:
//!
//! ```json
//! {
//!   "orderService": {
//!     "args": { "payment_gateway": { "$type": "example.payment.PaymentGateway" } }
//!   },
//!   "greeter": { "builder": "test_factory" }
//! }
//! ```
//!
//! For a type `example.payment.OrderService` the files searched, in order, are
//! `<dir>/example/payment.json`, `<dir>/payment.json` and `<dir>/orderService.json`. The factory
//! name is the lower-camel type name; the snake_case spelling is accepted too.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use babeltest_core::lang::conventions::{FACTORY_FILE_EXTENSION, FACTORY_TYPE_REF_KEY};
use babeltest_core::{TypeInfo, naming};
use serde_json::{Map, Value};
use tracing::debug;

use crate::diagnostics::DiagnosticContext;

/// One recipe found in a factory file.
#[derive(Debug, Clone, PartialEq)]
pub struct FactoryEntry {
    pub file: PathBuf,
    pub name: String,
    pub args: Map<String, Value>,
    pub builder: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layout {
    Nested,
    Flat,
    FactoryNamed,
}

impl Layout {
    fn describe(self) -> &'static str {
        match self {
            Layout::Nested => "nested structure",
            Layout::Flat => "flat structure",
            Layout::FactoryNamed => "factory-named file",
        }
    }
}

/// Parsed factory files, keyed by path. Parse failures are cached too.
#[derive(Debug, Default)]
pub struct FactoryFiles {
    parsed: HashMap<PathBuf, Result<Map<String, Value>, String>>,
}

impl FactoryFiles {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.parsed.clear();
    }

    pub fn cached_files(&self) -> usize {
        self.parsed.len()
    }

    /// Candidate files for `info`, in search order.
    pub fn candidates(info: &TypeInfo, dir: &Path) -> Vec<(PathBuf, Layout)> {
        let module: Vec<&str> = info.module_path().split('.').filter(|s| !s.is_empty()).collect();
        let mut out = Vec::new();
        if let Some((last, parents)) = module.split_last() {
            if !parents.is_empty() {
                let nested = parents.iter().fold(dir.to_path_buf(), |path, part| path.join(part));
                out.push((nested.join(file_name(last)), Layout::Nested));
            }
            out.push((dir.join(file_name(last)), Layout::Flat));
        }
        out.push((dir.join(file_name(&naming::lower_camel(info.name()))), Layout::FactoryNamed));
        out.dedup_by(|a, b| a.0 == b.0);
        out
    }

    /// Accepted factory names for `info`, preferred spelling first.
    pub fn factory_names(info: &TypeInfo) -> Vec<String> {
        let mut names = vec![naming::lower_camel(info.name())];
        let snake = naming::to_snake_case(info.name());
        if !names.contains(&snake) {
            names.push(snake);
        }
        names
    }

    /// First recipe for `info`, recording every file looked at in `ctx`.
    pub fn find(&mut self, info: &TypeInfo, dir: &Path, ctx: &mut DiagnosticContext) -> Option<FactoryEntry> {
        let names = Self::factory_names(info);
        for (path, layout) in Self::candidates(info, dir) {
            let location = format!("{} ({})", path.display(), layout.describe());
            if !path.is_file() {
                ctx.add_search(location, false, Some("file not found"));
                continue;
            }
            let document = match self.load(&path) {
                Ok(document) => document,
                Err(reason) => {
                    ctx.add_search(location, false, Some(&reason));
                    continue;
                }
            };

            let found = names
                .iter()
                .find_map(|name| document.get(name).map(|entry| (name.clone(), entry.clone())))
                .or_else(|| {
                    // A factory-named file may hold the recipe itself.
                    let bare = layout == Layout::FactoryNamed
                        && (document.contains_key("args") || document.contains_key("builder"));
                    bare.then(|| (names[0].clone(), Value::Object(document.clone())))
                });
            let Some((name, entry)) = found else {
                ctx.add_search(location, false, Some(&format!("no factory '{}'", names[0])));
                continue;
            };
            match parse_entry(&path, &name, &entry) {
                Ok(entry) => {
                    ctx.add_search(location, true, None);
                    debug!(type_path = %info.path, file = %path.display(), factory = %name, "factory file matched");
                    return Some(entry);
                }
                Err(reason) => ctx.add_search(location, false, Some(&reason)),
            }
        }
        None
    }

    fn load(&mut self, path: &Path) -> Result<Map<String, Value>, String> {
        self.parsed
            .entry(path.to_path_buf())
            .or_insert_with(|| read_document(path))
            .clone()
    }
}

fn file_name(stem: &str) -> String {
    format!("{stem}.{FACTORY_FILE_EXTENSION}")
}

fn read_document(path: &Path) -> Result<Map<String, Value>, String> {
    let text = fs::read_to_string(path).map_err(|e| format!("unreadable: {e}"))?;
    match serde_json::from_str::<Value>(&text) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err("top level must be a JSON object".to_string()),
        Err(e) => Err(format!("invalid JSON: {e}")),
    }
}

fn parse_entry(file: &Path, name: &str, entry: &Value) -> Result<FactoryEntry, String> {
    let Value::Object(fields) = entry else {
        return Err(format!("factory '{name}' must be an object"));
    };
    let args = match fields.get("args") {
        None | Some(Value::Null) => Map::new(),
        Some(Value::Object(args)) => args.clone(),
        Some(_) => return Err(format!("factory '{name}': 'args' must be an object")),
    };
    let builder = match fields.get("builder") {
        None | Some(Value::Null) => None,
        Some(Value::String(builder)) => Some(builder.clone()),
        Some(_) => return Err(format!("factory '{name}': 'builder' must be a string")),
    };
    Ok(FactoryEntry {
        file: file.to_path_buf(),
        name: name.to_string(),
        args,
        builder,
    })
}

/// The type path of a `{"$type": "..."}` argument.
pub fn type_ref(value: &Value) -> Option<&str> {
    match value {
        Value::Object(map) if map.len() == 1 => map.get(FACTORY_TYPE_REF_KEY)?.as_str(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn order_service() -> TypeInfo {
        TypeInfo::class("example.payment.OrderService")
    }

    #[test]
    fn test_candidate_order() {
        let dir = Path::new("/p/babel/factories");
        let candidates: Vec<(String, Layout)> = FactoryFiles::candidates(&order_service(), dir)
            .into_iter()
            .map(|(p, l)| (p.display().to_string(), l))
            .collect();
        assert_eq!(
            candidates,
            vec![
                ("/p/babel/factories/example/payment.json".to_string(), Layout::Nested),
                ("/p/babel/factories/payment.json".to_string(), Layout::Flat),
                ("/p/babel/factories/orderService.json".to_string(), Layout::FactoryNamed),
            ]
        );
    }

    #[test]
    fn test_single_segment_module_has_no_nested_candidate() {
        let info = TypeInfo::class("services.Greeter");
        let layouts: Vec<Layout> = FactoryFiles::candidates(&info, Path::new("f")).into_iter().map(|(_, l)| l).collect();
        assert_eq!(layouts, vec![Layout::Flat, Layout::FactoryNamed]);
    }

    #[test]
    fn test_factory_names() {
        assert_eq!(FactoryFiles::factory_names(&order_service()), vec!["orderService", "order_service"]);
    }

    #[test]
    fn test_missing_dir_records_every_candidate() {
        let mut files = FactoryFiles::new();
        let mut ctx = DiagnosticContext::new("example.payment.OrderService");
        assert!(files.find(&order_service(), Path::new("/definitely/not/here"), &mut ctx).is_none());
        assert_eq!(ctx.searches.len(), 3);
        assert!(ctx.searches.iter().all(|s| s.reason.as_deref() == Some("file not found")));
    }

    #[test]
    fn test_parse_entry_shapes() {
        let entry = parse_entry(Path::new("f.json"), "greeter", &json!({"builder": "test_factory"})).unwrap();
        assert_eq!(entry.builder.as_deref(), Some("test_factory"));
        assert!(entry.args.is_empty());
        assert!(parse_entry(Path::new("f.json"), "g", &json!({"args": [1]})).is_err());
        assert!(parse_entry(Path::new("f.json"), "g", &json!("nope")).is_err());
    }

    #[test]
    fn test_type_ref() {
        assert_eq!(type_ref(&json!({"$type": "example.payment.PaymentGateway"})), Some("example.payment.PaymentGateway"));
        assert_eq!(type_ref(&json!({"$type": "X", "other": 1})), None);
        assert_eq!(type_ref(&json!("X")), None);
    }
}
