pub mod minijinja;

use std::fmt::Debug;

use crate::error::Result;
use crate::value::Dict;

/// The template-application seam: applies a layout body to a render
/// context. `name` labels the template in diagnostics only.
pub trait Engine: Send + Sync + Debug {
    fn render(&self, name: Option<&str>, template: &str, context: &Dict) -> Result<String>;
}
