//! HTML pages, rendered with [upon] from templates embedded at compile time.
//!
//! Every value is HTML-escaped on output; templates have no way to opt out.

use crate::error::{ErrorKind, Result};
use axum::response::Html;
use exn::{OptionExt, ResultExt};
use rust_embed::Embed;
use serde::Serialize;
use upon::Engine;

pub const FILES: &str = "files.html";
pub const WALLETS: &str = "wallets.html";
pub const LOGS: &str = "logs.html";
pub const CONFIG: &str = "config.html";

#[derive(Embed)]
#[folder = "templates/"]
struct Templates;

/// Compiled page templates.
pub struct Pages {
    engine: Engine<'static>,
}

impl Pages {
    /// Compile every bundled template, failing on the first syntax error.
    pub fn load() -> Result<Self> {
        let mut engine = Engine::new();
        engine.set_default_formatter(&escape_html);
        for name in Templates::iter() {
            let file = Templates::get(&name).ok_or_raise(|| ErrorKind::Template(name.to_string()))?;
            let source = String::from_utf8(file.data.into_owned()).or_raise(|| ErrorKind::Template(name.to_string()))?;
            engine
                .add_template(name.to_string(), source)
                .or_raise(|| ErrorKind::Template(name.to_string()))?;
        }
        Ok(Self { engine })
    }

    pub fn render(&self, name: &str, page: &impl Serialize) -> Result<Html<String>> {
        self.engine
            .template(name)
            .render(page)
            .to_string()
            .map(Html)
            .or_raise(|| ErrorKind::Template(name.to_string()))
    }
}

fn escape_html(f: &mut upon::fmt::Formatter<'_>, value: &upon::Value) -> upon::fmt::Result {
    use std::fmt::Write;
    match value {
        upon::Value::String(s) => {
            for c in s.chars() {
                match c {
                    '&' => f.write_str("&amp;")?,
                    '<' => f.write_str("&lt;")?,
                    '>' => f.write_str("&gt;")?,
                    '"' => f.write_str("&quot;")?,
                    '\'' => f.write_str("&#x27;")?,
                    c => f.write_char(c)?,
                }
            }
        },
        v => upon::fmt::default(f, v)?,
    };
    Ok(())
}
