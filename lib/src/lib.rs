#![doc = svgbobdoc::transform!(
//! A toolkit for assembling pattern libraries from directory trees.
//!
//! # Overview
//!
//! Swatch turns a source directory of front-mattered content fragments
//! into an addressable tree of patterns, then renders an index page for
//! every directory-level collection in that tree. It does not prescribe
//! an output layout or a template dialect beyond the seam in
//! [`templating`].
//!
//! Content is organized as follows:
//!
//! ```svgbob
//!                      +--------------+
//!                      | pattern tree |
//!                      +------+-------+
//!                             |
//!      +----------------------+----------------------+
//!      |                                             |
//!      |  +-----------+       +-----------+          |
//!      |  | namespace | . . . | namespace |          |
//!      |  +-----+-----+       +-----------+          |
//!      |        |                                    |
//!      |  +-----+------------------------------+     |
//!      |  |      +------------+                |     |
//!      |  |      | collection |                |     |
//!      |  |      +------------+                |     |
//!      |  |  +---------+     +---------+       |     |
//!      |  |  | pattern | ... | pattern |       |     |
//!      |  |  +---------+     +---------+       |     |
//!      |  +------------------------------------+     |
//!      +---------------------------------------------+
//! ```
//!
//! In words, a **pattern tree** consists of:
//!
//!   * **Namespaces**, one per source directory, holding further
//!     namespaces and at most one collection of their own.
//!
//!   * **Collections**, aggregating the _patterns_ parsed from the
//!     files directly inside one directory, along with display
//!     metadata and an ordered, hidden-filtered view over those
//!     patterns.
//!
//!   * **Patterns**, leaf fragments whose dotted id mirrors the path
//!     from the tree root down to the file's derived key.
//!
//! ## Building
//!
//! A library is typically produced via the following set of operations:
//!
//! 1. Files matching a glob are read in parallel and parsed by the
//!    first matching parser rule ([`reader`]).
//! 2. The parsed records are folded into a [`tree::PatternTree`];
//!    identity and ordering derive from paths and declared order alone,
//!    so the tree is identical however the reads raced ([`tree`]).
//! 3. A render pass walks the tree and stores an index page on every
//!    collection ([`render`]), applying a layout resolved by dot-path
//!    from a [`render::TemplateTree`].
//! 4. Nodes carrying rendered contents are persisted at the output
//!    path derived from their id ([`path::resource_path`]).
)]

#[macro_use]
pub mod error;
pub mod value;
pub mod path;
pub mod reader;
pub mod tree;
pub mod render;
pub mod templating;

pub use tree::*;
pub use render::{render_tree, RenderOptions, TemplateTree};

pub use rayon;
