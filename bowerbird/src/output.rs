use std::fs;
use std::path::Path;

use swatch::error::{Chainable, Result};
use swatch::path::resource_path;
use swatch::tree::PatternTree;

/// Persists every node carrying contents (rendered collection index
/// pages and raw pattern fragments alike) at the output path derived
/// from its id. Returns the number of files written.
pub fn write_tree(tree: &PatternTree, dest: &Path) -> Result<usize> {
    let mut written = 0;
    for collection in tree.namespace.collections() {
        if let Some(contents) = &collection.contents {
            write_node(&collection.id, contents, dest)?;
            written += 1;
        }

        for pattern in collection.items.values() {
            if let Some(contents) = &pattern.contents {
                write_node(&pattern.id, contents, dest)?;
                written += 1;
            }
        }
    }

    Ok(written)
}

fn write_node(id: &str, contents: &str, dest: &Path) -> Result<()> {
    let path = resource_path(id, dest);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    fs::write(&path, contents).chain_with(|| swatch::error! {
        "failed to write output file",
        "resource id" => id,
        "output path" => path.display(),
    })
}

#[cfg(test)]
mod output_tests {
    use super::*;
    use std::sync::Arc;
    use swatch::reader::{FileRecord, CONTENTS_KEY};
    use swatch::tree::{build_tree, BuildOptions};
    use swatch::value::Dict;

    fn record(path: &str, contents: &str) -> FileRecord {
        FileRecord {
            path: Arc::from(Path::new(path)),
            key: swatch::path::keyname(path, true).into(),
            data: Dict::from([(CONTENTS_KEY.into(), contents.into())]),
        }
    }

    #[test]
    fn test_nodes_land_at_resource_paths() {
        let mut tree = build_tree(vec![
            record("src/patterns/components/orange.html", "<b>orange</b>"),
            record("src/patterns/pink.html", "<i>pink</i>"),
        ], &BuildOptions::default()).unwrap();

        let components = tree.namespace.children.get_mut("components").unwrap();
        components.collection.as_mut().unwrap().contents = Some("<ul>index</ul>".into());

        let dir = tempfile::tempdir().unwrap();
        let written = write_tree(&tree, dir.path()).unwrap();
        assert_eq!(written, 3);

        let index = fs::read_to_string(dir.path().join("components.html")).unwrap();
        assert_eq!(index, "<ul>index</ul>");
        let orange = fs::read_to_string(dir.path().join("components/orange.html")).unwrap();
        assert_eq!(orange, "<b>orange</b>");
        assert!(dir.path().join("pink.html").is_file());
    }
}
