// Copyright 2025 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! File explorer walkthrough: lazy loading, collapse, filtering, and moves.
//!
//! This example drives an `IdentityTreeModel` keyed by path from an in-memory
//! file system, mirrors the flattened rows into a `Vec<NodeId>`, and prints the
//! visible rows after every step the way a virtualized list would show them.
//!
//! Run:
//! - `cargo run -p canopy_demos --example file_explorer`

use canopy_tree::{
    ChildrenProvider, FilterResult, IdentityTreeModel, IdentityTreeModelOptions, NodeId,
    SelfIdentity, SpliceOptions, TreeElement, TreeModelOptions, TreeVisibility,
};

/// Paths of an in-memory file system; directories end in `/`.
struct MemoryFs {
    paths: Vec<&'static str>,
}

impl ChildrenProvider<String> for MemoryFs {
    fn has_children(&self, path: &String) -> bool {
        path.ends_with('/')
    }

    fn children(&self, parent: Option<&String>) -> Vec<String> {
        let prefix = parent.map_or("", String::as_str);
        self.paths
            .iter()
            .filter(|path| {
                let Some(rest) = path.strip_prefix(prefix) else {
                    return false;
                };
                !rest.is_empty() && !rest.trim_end_matches('/').contains('/')
            })
            .map(|path| (*path).to_owned())
            .collect()
    }
}

type Explorer = IdentityTreeModel<String, SelfIdentity, Vec<NodeId>>;

fn print_rows(title: &str, explorer: &Explorer) {
    println!("-- {title} ({} rows)", explorer.list().len());
    for &id in explorer.list() {
        let Some(node) = explorer.node(id) else {
            continue;
        };
        let marker = match (node.is_collapsible(), node.is_collapsed()) {
            (false, _) => ' ',
            (true, true) => '+',
            (true, false) => '-',
        };
        let name = node
            .data()
            .trim_end_matches('/')
            .rsplit('/')
            .next()
            .unwrap_or_default();
        println!("{:indent$}{marker} {name}", "", indent = (node.depth() - 1) * 2);
    }
}

fn main() -> Result<(), canopy_tree::TreeError> {
    let fs = MemoryFs {
        paths: vec![
            "Cargo.toml",
            "README.md",
            "src/",
            "src/lib.rs",
            "src/model/",
            "src/model/index.rs",
            "src/model/identity.rs",
            "tests/",
            "tests/tree.rs",
        ],
    };

    let options = IdentityTreeModelOptions {
        model: TreeModelOptions {
            collapse_by_default: true,
            auto_expand_single_children: true,
            ..TreeModelOptions::default()
        },
        // Directories first, then by name.
        sorter: Some(Box::new(|a: &String, b: &String| {
            b.ends_with('/').cmp(&a.ends_with('/')).then_with(|| a.cmp(b))
        })),
    };
    let mut explorer = Explorer::with_options(Vec::new(), SelfIdentity, options);
    explorer.on_did_splice(|event| {
        println!(
            "   splice at {:?}: -{} +{}",
            event.location,
            event.delete_count,
            event.inserted.len()
        );
    });

    explorer.load_children(None, &fs)?;
    print_rows("root loaded", &explorer);

    // Opening a folder loads it on demand, then expands it.
    let src = String::from("src/");
    explorer.load_children(Some(&src), &fs)?;
    explorer.set_collapsed(Some(&src), Some(false), false)?;
    print_rows("src expanded", &explorer);

    // Revealing a deep file loads and expands every folder on the way.
    let model_dir = String::from("src/model/");
    explorer.load_children(Some(&model_dir), &fs)?;
    let target = String::from("src/model/index.rs");
    explorer.expand_to(&target)?;
    println!("   {target} is row {:?}", explorer.get_list_index(&target)?);
    print_rows("revealed index.rs", &explorer);

    // Reloading the root keeps the state of the folders it already knew.
    explorer.load_children(None, &fs)?;
    explorer.load_children(Some(&src), &fs)?;
    print_rows("root reloaded", &explorer);

    // README.md is deleted and re-inserted in one splice, so its key keeps resolving.
    let readme = String::from("README.md");
    let at = explorer.get_node_location(&readme)?[0];
    explorer.splice_at(
        None,
        at,
        1,
        [TreeElement::new(String::from("LICENSE")), TreeElement::new(String::from("README.md"))],
        SpliceOptions::default(),
    )?;
    print_rows("LICENSE added next to README.md", &explorer);
    println!("   README.md is row {:?}", explorer.get_list_index(&readme)?);

    // Filter down to Rust sources and the folders holding them.
    explorer.set_filter(Some(Box::new(
        |path: &String, _parent: TreeVisibility| -> FilterResult<()> {
            if path.ends_with(".rs") {
                FilterResult::visible()
            } else {
                FilterResult::recurse()
            }
        },
    )));
    explorer.refilter();
    print_rows("only .rs files", &explorer);

    explorer.set_filter(None);
    explorer.refilter();
    explorer.set_collapsed(None, Some(true), true)?;
    print_rows("everything collapsed", &explorer);
    println!("{} items tracked", explorer.len());
    Ok(())
}
