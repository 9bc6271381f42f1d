// mode_prompt.rs

use chrono::{Local, NaiveDate};
use include_dir::{include_dir, Dir};
use lazy_static::lazy_static;
use regex::Regex;
use serde::Serialize;
use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;
use tera::{Context, Error as TeraError, Tera};

/// System prompt used when no prompt can be found for a mode
pub const FALLBACK_PROMPT: &str = "You are a helpful AWS technical assistant.";

static EMBEDDED_PROMPTS: Dir = include_dir!("$CARGO_MANIFEST_DIR/prompts");

lazy_static! {
    static ref MODE_NAME: Regex = Regex::new(r"^[A-Za-z0-9_-]+$").unwrap();
}

#[derive(Serialize)]
struct PromptContext<'a> {
    mode: &'a str,
    current_date: String,
}

pub fn render_prompt<T: Serialize>(template: &str, context_data: &T) -> Result<String, TeraError> {
    let mut tera = Tera::default();
    tera.add_raw_template("inline_template", template)?;
    let context = Context::from_serialize(context_data)?;
    tera.render("inline_template", &context)
}

/// Mode name to system prompt lookup.
///
/// Prompts in the override directory (`<dir>/<mode>.md`) shadow the ones embedded
/// in the binary. Unknown or invalid modes get [`FALLBACK_PROMPT`].
#[derive(Debug, Clone, Default)]
pub struct ModePrompts {
    override_dir: Option<PathBuf>,
}

impl ModePrompts {
    pub fn new(override_dir: Option<PathBuf>) -> Self {
        Self { override_dir }
    }

    pub fn load(&self, mode: &str) -> String {
        self.load_at(mode, Local::now().date_naive())
    }

    fn load_at(&self, mode: &str, date: NaiveDate) -> String {
        if !MODE_NAME.is_match(mode) {
            tracing::warn!(mode, "Invalid mode name, using fallback prompt");
            return FALLBACK_PROMPT.to_string();
        }

        let Some(template) = self.read_template(mode) else {
            tracing::error!(mode, "Failed to load mode prompt, using fallback prompt");
            return FALLBACK_PROMPT.to_string();
        };

        let context = PromptContext {
            mode,
            current_date: date.format("%Y-%m-%d").to_string(),
        };
        let prompt = match render_prompt(&template, &context) {
            Ok(rendered) => rendered,
            Err(e) => {
                tracing::warn!(mode, error = %e, "Failed to render mode prompt, using raw text");
                template
            }
        };
        tracing::info!(mode, chars = prompt.len(), "Loaded mode prompt");
        prompt
    }

    fn read_template(&self, mode: &str) -> Option<String> {
        let file_name = format!("{}.md", mode);

        if let Some(dir) = &self.override_dir {
            let path = dir.join(&file_name);
            match fs::read_to_string(&path) {
                Ok(content) => return Some(content),
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "Failed to read prompt override");
                }
            }
        }

        EMBEDDED_PROMPTS
            .get_file(&file_name)
            .and_then(|file| file.contents_utf8())
            .map(String::from)
    }
}
