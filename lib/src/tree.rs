use std::sync::Arc;
use std::path::Path;
use std::collections::BTreeMap;

use rustc_hash::FxHashSet;
use serde::Serialize;

use crate::error::Result;
use crate::path::{natural_cmp, relative_path_array, title_case};
use crate::reader::{FileRecord, CONTENTS_KEY};
use crate::value::{Dict, Value};

/// Property names assigned by the builder; source data may not declare
/// them.
pub const RESERVED_PATTERN_KEYS: &[&str] = &["id"];
pub const RESERVED_COLLECTION_KEYS: &[&str] = &["items", "patterns"];

/// The record key that addresses a collection itself rather than a
/// pattern inside it.
pub const COLLECTION_KEY: &str = "collection";

const NAME_KEY: &str = "name";
const ORDER_KEY: &str = "order";
const HIDDEN_KEY: &str = "hidden";

/// A leaf content fragment with a derived dotted identity.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Pattern {
    pub id: Arc<str>,
    pub name: Arc<str>,
    pub path: Arc<Path>,
    pub data: Dict,
    pub contents: Option<Arc<str>>,
}

/// A per-directory container aggregating the patterns found directly
/// within that directory.
///
/// `items` always holds every discovered pattern; `patterns` is the
/// ordered, hidden-filtered view over `items` the renderer presents.
/// `contents` stays `None` until the render pass stores the collection's
/// index page in it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Collection {
    pub id: Arc<str>,
    pub name: Arc<str>,
    pub data: Dict,
    pub items: BTreeMap<Arc<str>, Pattern>,
    pub patterns: Vec<Arc<str>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contents: Option<String>,
}

/// A directory node: at most one collection of its own plus nested
/// namespaces, one per subdirectory.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Namespace {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub collection: Option<Collection>,
    #[serde(flatten)]
    pub children: BTreeMap<Arc<str>, Namespace>,
}

/// The built pattern tree: a root key (the first segment of every id)
/// and the namespace hierarchy under it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PatternTree {
    pub root: Arc<str>,
    pub namespace: Namespace,
}

#[derive(Debug, Clone)]
pub struct BuildOptions {
    /// The source-root directory name; doubles as the root id segment.
    pub root: Arc<str>,
}

impl Default for BuildOptions {
    fn default() -> Self {
        BuildOptions { root: "patterns".into() }
    }
}

impl Collection {
    fn stub(id: Arc<str>, dir_name: &str) -> Collection {
        Collection {
            id,
            name: title_case(dir_name).into(),
            data: Dict::new(),
            items: BTreeMap::new(),
            patterns: vec![],
            contents: None,
        }
    }
}

impl Namespace {
    /// Depth-first pre-order traversal over every collection.
    pub fn collections(&self) -> Vec<&Collection> {
        let mut found = vec![];
        fn walk<'a>(ns: &'a Namespace, found: &mut Vec<&'a Collection>) {
            if let Some(collection) = &ns.collection {
                found.push(collection);
            }

            for child in ns.children.values() {
                walk(child, found);
            }
        }

        walk(self, &mut found);
        found
    }
}

impl PatternTree {
    /// The pattern with the given dotted id, if any.
    pub fn pattern(&self, id: &str) -> Option<&Pattern> {
        self.namespace.collections().into_iter()
            .flat_map(|c| c.items.values())
            .find(|p| &*p.id == id)
    }
}

/// Folds parsed file records into a [`PatternTree`].
///
/// The resulting tree depends only on each record's path, key, and
/// data, never on the order records arrive in. Reserved properties and
/// colliding keys abort the whole build.
pub fn build_tree(records: Vec<FileRecord>, options: &BuildOptions) -> Result<PatternTree> {
    let mut tree = PatternTree {
        root: options.root.clone(),
        namespace: Namespace::default(),
    };

    let mut seen_ids = FxHashSet::default();
    for record in records {
        place(&mut tree, record, options, &mut seen_ids)?;
    }

    finalize(&mut tree.namespace);
    Ok(tree)
}

fn place(
    tree: &mut PatternTree,
    record: FileRecord,
    options: &BuildOptions,
    seen_ids: &mut FxHashSet<Arc<str>>,
) -> Result<()> {
    let mut segments = relative_path_array(&record.path, &options.root);
    if segments.is_empty() {
        segments.push(options.root.to_string());
    }

    // "mkdir -p": create intermediate namespaces, never overwriting.
    let mut namespace = &mut tree.namespace;
    for segment in &segments[1..] {
        namespace = namespace.children.entry(segment.as_str().into()).or_default();
    }

    let collection_id: Arc<str> = segments.join(".").into();
    let dir_name = segments.last().expect("at least the root segment");
    let collection = namespace.collection
        .get_or_insert_with(|| Collection::stub(collection_id.clone(), dir_name));

    if &*record.key == COLLECTION_KEY {
        merge_collection(collection, record)
    } else {
        insert_pattern(collection, record, seen_ids)
    }
}

fn check_reserved(data: &Dict, reserved: &[&str], record: &FileRecord, target: &str) -> Result<()> {
    for &key in reserved {
        if data.contains_key(key) {
            return err! {
                format!("reserved property declared in {target} source data"),
                "property" => key,
                "file path" => record.path.display(),
            };
        }
    }

    Ok(())
}

fn merge_collection(collection: &mut Collection, record: FileRecord) -> Result<()> {
    check_reserved(&record.data, RESERVED_COLLECTION_KEYS, &record, "collection")?;

    for (key, value) in record.data {
        if &*key == NAME_KEY {
            if let Some(name) = value.as_str() {
                collection.name = name.into();
            }

            continue;
        }

        collection.data.insert(key, value);
    }

    Ok(())
}

fn insert_pattern(
    collection: &mut Collection,
    record: FileRecord,
    seen_ids: &mut FxHashSet<Arc<str>>,
) -> Result<()> {
    check_reserved(&record.data, RESERVED_PATTERN_KEYS, &record, "pattern")?;

    if let Some(existing) = collection.items.get(&record.key) {
        return err! {
            "duplicate pattern key within a collection",
            "key" => record.key,
            "collection" => collection.id,
            "first file" => existing.path.display(),
            "second file" => record.path.display(),
        };
    }

    let id: Arc<str> = format!("{}.{}", collection.id, record.key).into();
    if !seen_ids.insert(id.clone()) {
        return err! {
            "derived pattern id is not unique",
            "id" => id,
            "file path" => record.path.display(),
        };
    }

    let FileRecord { path, key, mut data } = record;
    let contents = match data.remove(CONTENTS_KEY) {
        Some(Value::String(contents)) => Some(contents),
        Some(other) => {
            data.insert(CONTENTS_KEY.into(), other);
            None
        }
        None => None,
    };

    let name: Arc<str> = match data.get(NAME_KEY).and_then(Value::as_str) {
        Some(name) => name.into(),
        None => title_case(&key).into(),
    };

    collection.items.insert(key, Pattern { id, name, path, data, contents });
    Ok(())
}

/// Computes every collection's `patterns` view: explicitly ordered keys
/// first, the rest in natural key order, hidden items excluded.
fn finalize(namespace: &mut Namespace) {
    if let Some(collection) = &mut namespace.collection {
        collection.patterns = ordered_view(collection);
    }

    for child in namespace.children.values_mut() {
        finalize(child);
    }
}

fn ordered_view(collection: &Collection) -> Vec<Arc<str>> {
    let declared: Vec<&str> = collection.data.get(ORDER_KEY)
        .and_then(Value::as_slice)
        .map(|entries| entries.iter().filter_map(Value::as_str).collect())
        .unwrap_or_default();

    let mut view: Vec<Arc<str>> = vec![];
    for &name in &declared {
        // Unknown names in the order list address nothing; skip them.
        if let Some((key, _)) = collection.items.get_key_value(name) {
            if !view.contains(key) {
                view.push(key.clone());
            }
        }
    }

    let mut rest: Vec<Arc<str>> = collection.items.keys()
        .filter(|key| !declared.contains(&&***key))
        .cloned()
        .collect();

    rest.sort_by(|a, b| natural_cmp(a, b));
    view.extend(rest);

    view.retain(|key| {
        collection.items[key].data.get(HIDDEN_KEY).and_then(Value::as_bool) != Some(true)
    });

    view
}
