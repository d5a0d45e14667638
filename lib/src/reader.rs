use std::fs;
use std::sync::Arc;
use std::collections::BTreeMap;
use std::path::{Component, Path, PathBuf};

use derive_more::Debug;
use rayon::prelude::*;
use regex::Regex;

use crate::error::{Chainable, Result};
use crate::path::keyname;
use crate::value::{Dict, Format, Json, Toml};

/// The data key under which a file's body content is recorded.
pub const CONTENTS_KEY: &str = "contents";

/// A compiled source selector: `**` crosses directories, `*` and `?`
/// match within one path segment. Resolution walks the longest literal
/// prefix of the pattern.
#[derive(Debug, Clone)]
pub struct Glob {
    pattern: String,
    root: PathBuf,
    regex: Regex,
}

impl Glob {
    pub fn new(pattern: &str) -> Result<Glob> {
        Ok(Glob {
            pattern: pattern.to_string(),
            root: literal_prefix(pattern),
            regex: Regex::new(&glob_to_regex(pattern))?,
        })
    }

    /// The parent-directory form of this glob: the final path segment
    /// replaced with `*`, matching the directories that hold candidate
    /// files rather than the files themselves.
    pub fn to_parent(&self) -> Result<Glob> {
        let parent = match self.pattern.rsplit_once('/') {
            Some((parent, _)) => format!("{parent}/*"),
            None => "*".to_string(),
        };

        Glob::new(&parent)
    }

    pub fn matches(&self, path: impl AsRef<Path>) -> bool {
        self.regex.is_match(&normalize(path.as_ref()))
    }

    fn resolve(&self, want_dirs: bool) -> Vec<PathBuf> {
        jwalk::WalkDir::new(&self.root)
            .follow_links(true)
            .into_iter()
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_type.is_dir() == want_dirs)
            .map(|entry| entry.path())
            .filter(|path| self.matches(path))
            .collect()
    }
}

fn normalize(path: &Path) -> String {
    let normalized = path.to_string_lossy().replace('\\', "/");
    match normalized.strip_prefix("./") {
        Some(stripped) => stripped.to_string(),
        None => normalized,
    }
}

/// Path components of `pattern` before the first wildcard.
fn literal_prefix(pattern: &str) -> PathBuf {
    let mut root = PathBuf::new();
    for component in Path::new(pattern).components() {
        match component {
            Component::Normal(name) if name.to_string_lossy().contains(['*', '?']) => break,
            Component::Normal(name) => root.push(name),
            other => root.push(other),
        }
    }

    // Never walk the pattern's filename itself.
    if root == Path::new(pattern) {
        root.pop();
    }

    if root.as_os_str().is_empty() {
        root.push(".");
    }

    root
}

fn glob_to_regex(pattern: &str) -> String {
    let mut regex = String::from("^");
    let mut chars = pattern.chars().peekable();
    while let Some(ch) = chars.next() {
        match ch {
            '*' if chars.peek() == Some(&'*') => {
                chars.next();
                if chars.peek() == Some(&'/') {
                    chars.next();
                    // `**/` also matches zero directories.
                    regex.push_str("(?:[^/]+/)*");
                } else {
                    regex.push_str(".*");
                }
            }
            '*' => regex.push_str("[^/]*"),
            '?' => regex.push_str("[^/]"),
            other => regex.push_str(&regex::escape(&other.to_string())),
        }
    }

    regex.push('$');
    regex
}

/// Resolves one or more globs to matching file paths. Match order
/// follows directory traversal and is not meaningful; callers must
/// derive any ordering from the paths themselves.
pub fn get_files<I, S>(patterns: I) -> Result<Vec<PathBuf>>
    where I: IntoIterator<Item = S>, S: AsRef<str>
{
    let mut files = vec![];
    for pattern in patterns {
        files.extend(Glob::new(pattern.as_ref())?.resolve(false));
    }

    Ok(files)
}

/// Resolves one or more globs to the directories holding their
/// candidate files, via each glob's parent-directory form.
pub fn get_dirs<I, S>(patterns: I) -> Result<Vec<PathBuf>>
    where I: IntoIterator<Item = S>, S: AsRef<str>
{
    let mut dirs = vec![];
    for pattern in patterns {
        dirs.extend(Glob::new(pattern.as_ref())?.to_parent()?.resolve(true));
    }

    Ok(dirs)
}

/// A content parser's result: raw text (normalized into a dict with a
/// [`CONTENTS_KEY`] entry) or an already-structured data object.
pub enum Parsed {
    Text(String),
    Data(Dict),
}

pub type ParseFn = Arc<dyn Fn(&str, &Path) -> Result<Parsed> + Send + Sync>;

/// One parser-dispatch rule: a path pattern and the parser to apply.
#[derive(Debug, Clone)]
pub struct ParserRule {
    pub name: Arc<str>,
    pub pattern: Regex,
    #[debug(ignore)]
    pub parse: ParseFn,
}

/// An ordered parser-rule list. Rules are evaluated top-to-bottom
/// against each file path and the first match wins; unmatched paths
/// fall back to the default rule, or to raw text when none is set.
#[derive(Debug, Clone, Default)]
pub struct ParserSet {
    rules: Vec<ParserRule>,
    #[debug(ignore)]
    default: Option<ParseFn>,
}

impl ParserSet {
    pub fn new() -> Self {
        ParserSet::default()
    }

    /// The built-in rule set: front-mattered `.html`, front-mattered
    /// `.md`/`.markdown` (bodies rendered to HTML), `.toml` and `.json`
    /// data files.
    pub fn standard() -> ParserSet {
        fn build() -> Result<ParserSet> {
            Ok(ParserSet::new()
                .rule("html", r"\.html?$", Arc::new(parse_html))?
                .rule("markdown", r"\.(md|markdown)$", Arc::new(parse_markdown))?
                .rule("toml", r"\.toml$", Arc::new(|text, _: &Path| {
                    Ok(Parsed::Data(Toml::parse_dict(text)?))
                }))?
                .rule("json", r"\.json$", Arc::new(|text, _: &Path| {
                    Ok(Parsed::Data(Json::parse_dict(text)?))
                }))?)
        }

        build().expect("built-in parser patterns are valid")
    }

    pub fn rule(mut self, name: &str, pattern: &str, parse: ParseFn) -> Result<Self> {
        self.rules.push(ParserRule {
            name: name.into(),
            pattern: Regex::new(pattern)?,
            parse,
        });

        Ok(self)
    }

    pub fn default_rule(mut self, parse: ParseFn) -> Self {
        self.default = Some(parse);
        self
    }

    /// The parser for `path`: the first rule whose pattern matches,
    /// else the default rule, else the identity parser.
    pub fn select(&self, path: &Path) -> ParseFn {
        let normalized = normalize(path);
        for rule in &self.rules {
            if rule.pattern.is_match(&normalized) {
                return rule.parse.clone();
            }
        }

        match &self.default {
            Some(parse) => parse.clone(),
            None => Arc::new(|text, _| Ok(Parsed::Text(text.to_string()))),
        }
    }
}

/// One source file, read and parsed: its path, its derived key, and its
/// parsed data (front matter plus a [`CONTENTS_KEY`] body entry).
#[derive(Debug, Clone)]
pub struct FileRecord {
    pub path: Arc<Path>,
    pub key: Arc<str>,
    pub data: Dict,
}

/// Reads and parses every file matched by `patterns`, in parallel. The
/// returned order mirrors resolution order and carries no meaning.
pub fn read_files<I, S>(patterns: I, parsers: &ParserSet) -> Result<Vec<FileRecord>>
    where I: IntoIterator<Item = S>, S: AsRef<str>
{
    let files = get_files(patterns)?;
    files.into_par_iter()
        .map(|path| read_one(path, parsers))
        .collect()
}

/// As [`read_files`], but keyed by each record's [`keyname`]. When two
/// files derive the same key, the later one in resolution order wins
/// silently; resolution order is platform-dependent, so colliding keys
/// are an authoring hazard, not a supported feature.
pub fn read_files_keyed<I, S>(
    patterns: I,
    parsers: &ParserSet,
    strip_numbers: bool,
) -> Result<BTreeMap<Arc<str>, FileRecord>>
    where I: IntoIterator<Item = S>, S: AsRef<str>
{
    let files = get_files(patterns)?;
    let records: Vec<FileRecord> = files.into_par_iter()
        .map(|path| read_one_with(path, parsers, strip_numbers))
        .collect::<Result<_>>()?;

    Ok(records.into_iter().map(|r| (r.key.clone(), r)).collect())
}

fn read_one(path: PathBuf, parsers: &ParserSet) -> Result<FileRecord> {
    read_one_with(path, parsers, true)
}

fn read_one_with(path: PathBuf, parsers: &ParserSet, strip_numbers: bool) -> Result<FileRecord> {
    let text = fs::read_to_string(&path).chain_with(|| error! {
        "failed to read source file",
        "file path" => path.display(),
    })?;

    let parse = parsers.select(&path);
    let data = match parse(&text, &path).chain_with(|| error! {
        "content parser failed",
        "file path" => path.display(),
    })? {
        Parsed::Text(text) => Dict::from([(CONTENTS_KEY.into(), text.into())]),
        Parsed::Data(data) => data,
    };

    Ok(FileRecord {
        key: keyname(&path, strip_numbers).into(),
        path: Arc::from(path.into_boxed_path()),
        data,
    })
}

const FRONT_MATTER_OPEN: &str = "+++\n";
const FRONT_MATTER_CLOSE: &str = "\n+++\n";

/// Splits a leading `+++`-delimited TOML front-matter block from the
/// body. Returns `(None, input)` when no block is present.
pub fn split_front_matter(input: &str) -> (Option<&str>, &str) {
    if !input.starts_with(FRONT_MATTER_OPEN) {
        return (None, input);
    }

    match input[FRONT_MATTER_OPEN.len()..].split_once(FRONT_MATTER_CLOSE) {
        Some((matter, body)) => (Some(matter), body),
        None => (None, input),
    }
}

fn parse_html(text: &str, _: &Path) -> Result<Parsed> {
    let (matter, body) = split_front_matter(text);
    let mut data = match matter {
        Some(matter) => Toml::parse_dict(matter).chain("invalid front matter")?,
        None => Dict::new(),
    };

    data.insert(CONTENTS_KEY.into(), body.into());
    Ok(Parsed::Data(data))
}

fn parse_markdown(text: &str, _: &Path) -> Result<Parsed> {
    use pulldown_cmark::{html, Options, Parser};

    let (matter, body) = split_front_matter(text);
    let mut data = match matter {
        Some(matter) => Toml::parse_dict(matter).chain("invalid front matter")?,
        None => Dict::new(),
    };

    let options = Options::all().difference(Options::ENABLE_SMART_PUNCTUATION);
    let mut rendered = String::with_capacity(body.len());
    html::push_html(&mut rendered, Parser::new_ext(body, options));
    data.insert(CONTENTS_KEY.into(), rendered.into());
    Ok(Parsed::Data(data))
}

#[cfg(test)]
mod glob_tests {
    use super::*;

    #[test]
    fn test_glob_matching() {
        let glob = Glob::new("src/patterns/**/*.html").unwrap();
        assert!(glob.matches("src/patterns/orange.html"));
        assert!(glob.matches("src/patterns/components/button/base.html"));
        assert!(!glob.matches("src/patterns/components/base.css"));
        assert!(!glob.matches("src/other/base.html"));

        let flat = Glob::new("src/patterns/*.html").unwrap();
        assert!(flat.matches("src/patterns/orange.html"));
        assert!(!flat.matches("src/patterns/components/orange.html"));
    }

    #[test]
    fn test_literal_prefix() {
        assert_eq!(literal_prefix("src/patterns/**/*.html"), Path::new("src/patterns"));
        assert_eq!(literal_prefix("*.html"), Path::new("."));
        assert_eq!(literal_prefix("src/patterns/pink.html"), Path::new("src/patterns"));
    }

    #[test]
    fn test_parent_form() {
        let dirs = Glob::new("src/patterns/**/*.html").unwrap().to_parent().unwrap();
        assert!(dirs.matches("src/patterns/components"));
        assert!(dirs.matches("src/patterns/components/button"));
        assert!(!dirs.matches("src/elsewhere"));
    }
}

#[cfg(test)]
mod parser_tests {
    use super::*;

    fn text_of(parsed: Parsed) -> Dict {
        match parsed {
            Parsed::Text(text) => Dict::from([(CONTENTS_KEY.into(), text.into())]),
            Parsed::Data(data) => data,
        }
    }

    #[test]
    fn test_front_matter_split() {
        let (matter, body) = split_front_matter("+++\nname = \"X\"\n+++\n<p>hi</p>\n");
        assert_eq!(matter, Some("name = \"X\""));
        assert_eq!(body, "<p>hi</p>\n");

        let (matter, body) = split_front_matter("<p>no matter</p>");
        assert_eq!(matter, None);
        assert_eq!(body, "<p>no matter</p>");
    }

    #[test]
    fn test_html_rule() {
        let parsed = parse_html("+++\nname = \"Base\"\n+++\n<button></button>", Path::new("x.html")).unwrap();
        let data = text_of(parsed);
        assert_eq!(data.get("name").and_then(|v| v.as_str()), Some("Base"));
        assert_eq!(data.get(CONTENTS_KEY).and_then(|v| v.as_str()), Some("<button></button>"));
    }

    #[test]
    fn test_markdown_body_is_rendered() {
        let parsed = parse_markdown("+++\nname = \"Doc\"\n+++\n# Title", Path::new("x.md")).unwrap();
        let data = text_of(parsed);
        let contents = data.get(CONTENTS_KEY).and_then(|v| v.as_str()).unwrap();
        assert!(contents.contains("<h1"));
        assert!(contents.contains("Title"));
    }

    #[test]
    fn test_first_matching_rule_wins() {
        let parsers = ParserSet::new()
            .rule("first", r"\.html$", Arc::new(|_, _: &Path| Ok(Parsed::Text("first".into())))).unwrap()
            .rule("second", r"\.html$", Arc::new(|_, _: &Path| Ok(Parsed::Text("second".into())))).unwrap();

        let parse = parsers.select(Path::new("a.html"));
        match parse("ignored", Path::new("a.html")).unwrap() {
            Parsed::Text(text) => assert_eq!(text, "first"),
            Parsed::Data(_) => panic!("expected text"),
        }
    }

    #[test]
    fn test_identity_fallback() {
        let parsers = ParserSet::new();
        let parse = parsers.select(Path::new("a.xyz"));
        match parse("raw text", Path::new("a.xyz")).unwrap() {
            Parsed::Text(text) => assert_eq!(text, "raw text"),
            Parsed::Data(_) => panic!("expected text"),
        }
    }
}

#[cfg(test)]
mod read_tests {
    use super::*;
    use std::fs;

    fn fixture() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        let base = dir.path().join("patterns");
        fs::create_dir_all(base.join("components")).unwrap();
        fs::write(base.join("pink.html"), "+++\nname = \"Pink\"\n+++\n<i>pink</i>").unwrap();
        fs::write(base.join("components/01-orange.html"), "<b>orange</b>").unwrap();
        fs::write(base.join("components/notes.txt"), "plain").unwrap();
        dir
    }

    fn pattern(dir: &tempfile::TempDir, glob: &str) -> String {
        format!("{}/{}", dir.path().join("patterns").to_string_lossy().replace('\\', "/"), glob)
    }

    #[test]
    fn test_get_files_and_dirs() {
        let dir = fixture();
        let files = get_files([pattern(&dir, "**/*.html")]).unwrap();
        assert_eq!(files.len(), 2);

        let dirs = get_dirs([pattern(&dir, "**/*.html")]).unwrap();
        assert!(dirs.iter().any(|d| d.ends_with("components")));
    }

    #[test]
    fn test_read_files_records() {
        let dir = fixture();
        let records = read_files([pattern(&dir, "**/*.html")], &ParserSet::standard()).unwrap();
        assert_eq!(records.len(), 2);

        let pink = records.iter().find(|r| &*r.key == "pink").unwrap();
        assert_eq!(pink.data.get("name").and_then(|v| v.as_str()), Some("Pink"));
        assert_eq!(pink.data.get(CONTENTS_KEY).and_then(|v| v.as_str()), Some("<i>pink</i>"));

        let orange = records.iter().find(|r| &*r.key == "orange").unwrap();
        assert_eq!(orange.data.get(CONTENTS_KEY).and_then(|v| v.as_str()), Some("<b>orange</b>"));
    }

    #[test]
    fn test_read_files_keyed_strips_numbers() {
        let dir = fixture();
        let keyed = read_files_keyed([pattern(&dir, "**/*.html")], &ParserSet::standard(), true).unwrap();
        assert!(keyed.contains_key("orange"));
        assert!(keyed.contains_key("pink"));

        let kept = read_files_keyed([pattern(&dir, "**/*.html")], &ParserSet::standard(), false).unwrap();
        assert!(kept.contains_key("01-orange"));
    }

    #[test]
    fn test_unreadable_parse_fails_batch() {
        let dir = fixture();
        fs::write(dir.path().join("patterns/bad.html"), "+++\nnot toml ===\n+++\nbody").unwrap();
        let result = read_files([pattern(&dir, "**/*.html")], &ParserSet::standard());
        assert!(result.unwrap_err().mentions("bad.html"));
    }
}
