use std::fs;
use std::sync::Arc;
use std::path::Path;

use crate::error::{Chainable, Result};
use crate::path::{keyname, relative_path_array};
use crate::reader::get_files;
use crate::templating::Engine;
use crate::tree::{Collection, Namespace, Pattern, PatternTree};
use crate::value::{Dict, Value};

/// Template bodies addressable by dot-path: one key per file (ordering
/// prefixes stripped), one nesting level per subdirectory.
#[derive(Debug, Clone, Default)]
pub struct TemplateTree {
    tree: Dict,
}

impl TemplateTree {
    pub fn new() -> TemplateTree {
        TemplateTree::default()
    }

    /// Loads every file under `dir`, keyed by [`keyname`] and nested by
    /// subdirectory. Later files silently win colliding keys.
    pub fn load(dir: impl AsRef<Path>) -> Result<TemplateTree> {
        let dir = dir.as_ref();
        let dir_name = match dir.file_name() {
            Some(name) => name.to_string_lossy().into_owned(),
            None => return err!("template directory has no name", "path" => dir.display()),
        };

        let glob = format!("{}/**/*", dir.to_string_lossy().replace('\\', "/"));
        let mut templates = TemplateTree::new();
        for path in get_files([glob])? {
            let body: Arc<str> = fs::read_to_string(&path)
                .chain_with(|| error! {
                    "failed to read template",
                    "file path" => path.display(),
                })?
                .into();

            // Segments after the template root, then the file's own key.
            let mut segments = relative_path_array(&path, &dir_name);
            if !segments.is_empty() {
                segments.remove(0);
            }
            segments.push(keyname(&path, true));
            templates.insert(&segments.join("."), body);
        }

        Ok(templates)
    }

    pub fn insert(&mut self, dotted: &str, body: impl Into<Arc<str>>) {
        let mut dict = &mut self.tree;
        let mut parts = dotted.split('.').peekable();
        while let Some(part) = parts.next() {
            if parts.peek().is_none() {
                dict.insert(part.into(), Value::String(body.into()));
                return;
            }

            let entry = dict.entry(part.into())
                .or_insert_with(|| Value::Dict(Dict::new()));
            dict = match entry {
                Value::Dict(nested) => nested,
                // A file and a directory competing for one key: the
                // directory wins and the file body is discarded.
                other => {
                    *other = Value::Dict(Dict::new());
                    match other {
                        Value::Dict(nested) => nested,
                        _ => unreachable!(),
                    }
                }
            };
        }
    }

    /// Follows a dot-path to a template body.
    pub fn lookup(&self, dotted: &str) -> Option<&str> {
        let mut dict = &self.tree;
        let mut parts = dotted.split('.').peekable();
        while let Some(part) = parts.next() {
            let value = dict.get(part)?;
            if parts.peek().is_none() {
                return value.as_str();
            }

            dict = value.as_dict()?;
        }

        None
    }

    pub fn is_empty(&self) -> bool {
        self.tree.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct RenderOptions {
    /// Dot-path of the collection layout within the template tree.
    pub layout: Arc<str>,
    /// Ambient build-wide data merged into every render context.
    pub globals: Dict,
}

impl Default for RenderOptions {
    fn default() -> Self {
        RenderOptions { layout: "collection".into(), globals: Dict::new() }
    }
}

/// Renders an index page for every collection in the tree, depth-first
/// in pre-order, storing each result in the collection's `contents`.
///
/// Patterns are left untouched: the collection page aggregates them,
/// and their own `contents` remain available to later stages. A layout
/// path that resolves to nothing in `templates` fails the whole pass
/// up front.
pub fn render_tree(
    mut tree: PatternTree,
    templates: &TemplateTree,
    engine: &dyn Engine,
    options: &RenderOptions,
) -> Result<PatternTree> {
    let layout = templates.lookup(&options.layout).ok_or_else(|| error! {
        "collection layout is missing from the template tree",
        "layout path" => options.layout,
    })?;

    render_namespace(&mut tree.namespace, layout, engine, options)?;
    Ok(tree)
}

fn render_namespace(
    namespace: &mut Namespace,
    layout: &str,
    engine: &dyn Engine,
    options: &RenderOptions,
) -> Result<()> {
    if let Some(collection) = &mut namespace.collection {
        let context = collection_context(collection, &options.globals);
        let rendered = engine.render(Some(&collection.id), layout, &context)
            .chain_with(|| error! {
                "failed to render collection index",
                "collection" => collection.id,
                "layout path" => options.layout,
            })?;

        collection.contents = Some(rendered);
    }

    for child in namespace.children.values_mut() {
        render_namespace(child, layout, engine, options)?;
    }

    Ok(())
}

/// The context a collection layout is applied to: the collection's
/// identity and data, its ordered `patterns` expanded to full pattern
/// objects, the complete `items` map, and the build globals.
fn collection_context(collection: &Collection, globals: &Dict) -> Dict {
    let mut context = globals.clone();
    context.insert("id".into(), collection.id.clone().into());
    context.insert("name".into(), collection.name.clone().into());
    context.insert("data".into(), Value::Dict(collection.data.clone()));

    let patterns: Vec<Value> = collection.patterns.iter()
        .map(|key| pattern_context(&collection.items[key]))
        .collect();
    context.insert("patterns".into(), patterns.into());

    let items: Dict = collection.items.iter()
        .map(|(key, pattern)| (key.clone(), pattern_context(pattern)))
        .collect();
    context.insert("items".into(), Value::Dict(items));

    context
}

fn pattern_context(pattern: &Pattern) -> Value {
    let mut dict = Dict::new();
    dict.insert("id".into(), pattern.id.clone().into());
    dict.insert("name".into(), pattern.name.clone().into());
    dict.insert("path".into(), pattern.path.to_string_lossy().into_owned().into());
    dict.insert("data".into(), Value::Dict(pattern.data.clone()));
    if let Some(contents) = &pattern.contents {
        dict.insert("contents".into(), contents.clone().into());
    }

    Value::Dict(dict)
}


#[cfg(test)]
mod render_tests {
    use super::*;
    use crate::error::Error;
    use crate::reader::FileRecord;
    use crate::tree::{build_tree, BuildOptions};
    use crate::value::Format;
    use crate::value::Toml;

    /// Deterministic engine: lists the context's pattern names.
    #[derive(Debug)]
    struct StubEngine;

    impl Engine for StubEngine {
        fn render(&self, name: Option<&str>, template: &str, context: &Dict) -> Result<String> {
            let patterns = context.get("patterns").and_then(Value::as_slice).unwrap_or(&[]);
            let names: Vec<&str> = patterns.iter()
                .filter_map(|p| p.as_dict()?.get("name")?.as_str())
                .collect();

            Ok(format!("{}|{}|{}", name.unwrap_or(""), template, names.join(",")))
        }
    }

    fn record(path: &str, front_matter: &str) -> FileRecord {
        FileRecord {
            path: Arc::from(Path::new(path)),
            key: crate::path::keyname(path, true).into(),
            data: Toml::parse_dict(front_matter).unwrap(),
        }
    }

    fn sample_tree() -> PatternTree {
        build_tree(vec![
            record("src/patterns/components/orange.html", ""),
            record("src/patterns/components/apple.html", ""),
            record("src/patterns/elements/pink.html", ""),
        ], &BuildOptions::default()).unwrap()
    }

    #[test]
    fn test_collections_gain_contents() {
        let mut templates = TemplateTree::new();
        templates.insert("collection", "layout");

        let tree = render_tree(sample_tree(), &templates, &StubEngine, &RenderOptions::default())
            .unwrap();

        let components = tree.namespace.children["components"].collection.as_ref().unwrap();
        assert_eq!(components.contents.as_deref(), Some("patterns.components|layout|Apple,Orange"));

        let elements = tree.namespace.children["elements"].collection.as_ref().unwrap();
        assert_eq!(elements.contents.as_deref(), Some("patterns.elements|layout|Pink"));
    }

    #[test]
    fn test_patterns_are_untouched() {
        let mut templates = TemplateTree::new();
        templates.insert("collection", "layout");

        let before = sample_tree();
        let after = render_tree(before.clone(), &templates, &StubEngine, &RenderOptions::default())
            .unwrap();

        let pattern_before = before.pattern("patterns.components.orange").unwrap();
        let pattern_after = after.pattern("patterns.components.orange").unwrap();
        assert_eq!(pattern_before, pattern_after);
    }

    #[test]
    fn test_missing_layout_fails_fast() {
        let templates = TemplateTree::new();
        let error: Error = render_tree(
            sample_tree(),
            &templates,
            &StubEngine,
            &RenderOptions { layout: "collections.special".into(), globals: Dict::new() },
        ).unwrap_err();

        assert!(error.mentions("layout"));
        assert!(error.mentions("collections.special"));
    }
}
