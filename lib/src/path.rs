use std::cmp::Ordering;
use std::path::{Path, PathBuf};

use once_cell::sync::Lazy;
use regex::Regex;

/// Leading ordering prefixes on file keys: `01-intro`, `2.3-forms`.
static ORDER_PREFIX: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[0-9.\-]+").unwrap());

/// Derives the output path for a dotted resource id.
///
/// The first segment of a multi-segment id names the resource-type root
/// and is discarded; the final segment becomes an `.html` filename; any
/// segments in between become directories under `dest`.
///
/// ```rust
/// use std::path::Path;
/// use swatch::path::resource_path;
///
/// assert_eq!(resource_path("components.button.base", ""), Path::new("button/base.html"));
/// assert_eq!(resource_path("patterns.components.orange", "out"), Path::new("out/components/orange.html"));
/// assert_eq!(resource_path("pink", ""), Path::new("pink.html"));
/// ```
pub fn resource_path(resource_id: &str, dest: impl AsRef<Path>) -> PathBuf {
    let mut segments: Vec<&str> = resource_id.split('.').collect();
    if segments.len() > 1 {
        segments.remove(0);
    }

    let mut path = dest.as_ref().to_path_buf();
    let (filename, dirs) = segments.split_last().unwrap();
    for dir in dirs {
        path.push(dir);
    }

    path.push(format!("{filename}.html"));
    path
}

/// Derives a stable key from a file path: the file stem, transliterated
/// to ASCII, whitespace collapsed to `-`, and (unless `strip_numbers`
/// is false) any leading ordering prefix removed.
pub fn keyname(path: impl AsRef<Path>, strip_numbers: bool) -> String {
    let stem = path.as_ref()
        .file_stem()
        .map(|s| s.to_string_lossy())
        .unwrap_or_default();

    let mut key = String::with_capacity(stem.len());
    for ch in stem.chars() {
        if ch.is_whitespace() {
            key.push('-');
        } else {
            key.push_str(deunicode::deunicode_char(ch).unwrap_or("-"));
        }
    }

    if strip_numbers {
        let stripped = ORDER_PREFIX.replace(&key, "");
        if !stripped.is_empty() {
            return stripped.into_owned();
        }
    }

    key
}

/// Returns the directory-name segments from the `from` component through
/// the containing directory of `file_path`, inclusive of both. Empty when
/// no directory component of `file_path` is named `from`.
///
/// ```rust
/// use swatch::path::relative_path_array;
///
/// assert_eq!(relative_path_array("/a/b/baz/c/d/f.txt", "baz"), ["baz", "c", "d"]);
/// assert_eq!(relative_path_array("/a/b/f.txt", "zzz"), Vec::<String>::new());
/// ```
pub fn relative_path_array(file_path: impl AsRef<Path>, from: &str) -> Vec<String> {
    let dir = match file_path.as_ref().parent() {
        Some(dir) => dir,
        None => return vec![],
    };

    let components: Vec<String> = dir.components()
        .filter_map(|c| match c {
            std::path::Component::Normal(name) => Some(name.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect();

    match components.iter().position(|c| c == from) {
        Some(i) => components[i..].to_vec(),
        None => vec![],
    }
}

/// Default display name for a key: lower-cased, `-`/`_` converted to
/// spaces, each word capitalized.
///
/// ```rust
/// use swatch::path::title_case;
///
/// assert_eq!(title_case("hello-world"), "Hello World");
/// assert_eq!(title_case("form_fields"), "Form Fields");
/// ```
pub fn title_case(string: &str) -> String {
    let mut output = String::with_capacity(string.len());

    let mut word_start = true;
    for ch in string.chars() {
        match ch {
            '-' | '_' | ' ' => {
                if !word_start {
                    output.push(' ');
                }

                word_start = true;
            }
            _ => {
                for lower in ch.to_lowercase() {
                    if word_start {
                        output.extend(lower.to_uppercase());
                        word_start = false;
                    } else {
                        output.push(lower);
                    }
                }
            }
        }
    }

    while output.ends_with(' ') {
        output.pop();
    }

    output
}

/// Convert to lowercase ASCII, collapsing any run of non-alphanumeric
/// characters into a single `-`.
pub fn slugify(string: &str) -> String {
    let mut output = String::with_capacity(string.len());

    let mut need_dash = false;
    for ch in string.chars() {
        for b in deunicode::deunicode_char(ch).unwrap_or("-").bytes() {
            match b {
                b'a'..=b'z' | b'A'..=b'Z' | b'0'..=b'9' => {
                    if need_dash {
                        output.push('-');
                        need_dash = false;
                    }

                    output.push(b.to_ascii_lowercase() as char);
                }
                _ => need_dash = !output.is_empty(),
            }
        }
    }

    output
}

/// Alphanumeric ordering: runs of digits compare by numeric value, the
/// rest byte-wise. Total and stable for any fixed key set.
///
/// ```rust
/// use swatch::path::natural_cmp;
///
/// assert!(natural_cmp("a2", "a10").is_lt());
/// assert!(natural_cmp("a", "b").is_lt());
/// assert!(natural_cmp("10-b", "9-a").is_gt());
/// ```
pub fn natural_cmp(a: &str, b: &str) -> Ordering {
    let (mut a, mut b) = (a.as_bytes(), b.as_bytes());

    fn digit_run<'a>(s: &mut &'a [u8]) -> &'a [u8] {
        let end = s.iter().position(|b| !b.is_ascii_digit()).unwrap_or(s.len());
        let (run, rest) = s.split_at(end);
        *s = rest;
        run
    }

    loop {
        match (a.first(), b.first()) {
            (None, None) => return Ordering::Equal,
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(&x), Some(&y)) if x.is_ascii_digit() && y.is_ascii_digit() => {
                let (run_a, run_b) = (digit_run(&mut a), digit_run(&mut b));
                let (trim_a, trim_b) = (trim_zeros(run_a), trim_zeros(run_b));
                let ordering = trim_a.len().cmp(&trim_b.len())
                    .then_with(|| trim_a.cmp(trim_b))
                    .then_with(|| run_a.cmp(run_b));
                if ordering != Ordering::Equal {
                    return ordering;
                }
            }
            (Some(&x), Some(&y)) => {
                if x != y {
                    return x.cmp(&y);
                }

                a = &a[1..];
                b = &b[1..];
            }
        }
    }
}

fn trim_zeros(run: &[u8]) -> &[u8] {
    let start = run.iter().position(|&b| b != b'0').unwrap_or(run.len());
    &run[start..]
}


#[cfg(test)]
mod resource_path_tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn test_single_segment_is_kept() {
        assert_eq!(resource_path("pink", ""), Path::new("pink.html"));
        assert_eq!(resource_path("pink", "dist"), Path::new("dist/pink.html"));
    }

    #[test]
    fn test_root_segment_is_discarded() {
        assert_eq!(resource_path("components.button.base", ""), Path::new("button/base.html"));
        assert_eq!(resource_path("patterns.orange", ""), Path::new("orange.html"));
    }
}

#[cfg(test)]
mod natural_cmp_tests {
    use super::*;
    use std::cmp::Ordering;

    #[test]
    fn test_numeric_runs() {
        assert_eq!(natural_cmp("a2", "a10"), Ordering::Less);
        assert_eq!(natural_cmp("a02", "a2"), Ordering::Less);
        assert_eq!(natural_cmp("a2", "a2"), Ordering::Equal);
        assert_eq!(natural_cmp("10", "9"), Ordering::Greater);
    }

    #[test]
    fn test_sorted_keys() {
        let mut keys = vec!["button-10", "button-2", "alert", "button-2b"];
        keys.sort_by(|a, b| natural_cmp(a, b));
        assert_eq!(keys, ["alert", "button-2", "button-2b", "button-10"]);
    }
}
