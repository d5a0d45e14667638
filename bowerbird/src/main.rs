use std::path::{Path, PathBuf};
use std::time::SystemTime;

use swatch::error::Result;
use swatch::reader::{read_files, ParserSet};
use swatch::render::{render_tree, RenderOptions, TemplateTree};
use swatch::templating::minijinja::MiniJinjaEngine;
use swatch::tree::{build_tree, BuildOptions};

mod config;
mod output;

fn run(input: &Path, dest: &Path) -> Result<()> {
    let start = SystemTime::now();
    let settings = config::Settings::load(input)?;

    let glob = format!(
        "{}/{}",
        input.to_string_lossy().replace('\\', "/"),
        settings.patterns,
    );

    let records = read_files([glob], &ParserSet::standard())?;
    println!("read time: {}ms ({} files)", elapsed(&start), records.len());

    let build = SystemTime::now();
    let tree = build_tree(records, &BuildOptions { root: settings.root.as_str().into() })?;
    println!("build time: {}ms", elapsed(&build));

    let render = SystemTime::now();
    let templates = TemplateTree::load(input.join(&settings.templates))?;
    let engine = MiniJinjaEngine::with_globals(&settings.globals);
    let options = RenderOptions {
        layout: settings.layout.as_str().into(),
        globals: settings.globals,
    };

    let tree = render_tree(tree, &templates, &engine, &options)?;
    println!("render time: {}ms", elapsed(&render));

    let write = SystemTime::now();
    let written = output::write_tree(&tree, dest)?;
    println!("write time: {}ms ({} pages)", elapsed(&write), written);
    println!("total time: {}ms", elapsed(&start));
    Ok(())
}

fn elapsed(since: &SystemTime) -> u128 {
    since.elapsed().map(|d| d.as_millis()).unwrap_or(0)
}

fn main() {
    let mut args = std::env::args().skip(1);
    let input = PathBuf::from(args.next().expect("<input>"));
    let dest = PathBuf::from(args.next().expect("<output>"));

    if let Err(e) = run(&input, &dest) {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
