use minijinja::Environment;
use serde::Serialize;

use crate::error::Result;
use crate::path::{keyname, slugify, title_case};
use crate::templating::Engine;
use crate::value::Dict;

/// A minijinja-backed [`Engine`]. Build-wide globals are exposed to
/// templates under `G`; the path utilities are exposed as filters.
#[derive(Debug)]
pub struct MiniJinjaEngine {
    env: Environment<'static>,
}

impl MiniJinjaEngine {
    pub fn new() -> MiniJinjaEngine {
        MiniJinjaEngine::with_globals(Dict::new())
    }

    pub fn with_globals<G: Serialize>(globals: G) -> MiniJinjaEngine {
        let mut env = Environment::new();
        env.add_global("G", minijinja::Value::from_serialize(&globals));
        env.add_filter("titlecase", |s: String| title_case(&s));
        env.add_filter("slug", |s: String| slugify(&s));
        env.add_filter("keyname", |s: String| keyname(&s, true));
        MiniJinjaEngine { env }
    }
}

impl Default for MiniJinjaEngine {
    fn default() -> Self {
        MiniJinjaEngine::new()
    }
}

impl Engine for MiniJinjaEngine {
    fn render(&self, name: Option<&str>, template: &str, context: &Dict) -> Result<String> {
        let context = minijinja::Value::from_serialize(context);
        let rendered = match name {
            Some(name) => self.env.render_named_str(name, template, context)?,
            None => self.env.render_str(template, context)?,
        };

        Ok(rendered)
    }
}
