use std::{
    borrow::Cow,
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result, bail};
use itertools::Itertools;
use once_cell::sync::OnceCell;
use regex::{Captures, Regex};

use crate::{level::Standard, tuning::EncodeParams};

fn placeholder_pattern() -> &'static Regex {
    static PATTERN: OnceCell<Regex> = OnceCell::new();
    PATTERN.get_or_init(|| Regex::new(r"\{\{\s*([A-Za-z_]+)\s*\}\}").expect("Valid regex"))
}

/// A preset template with `{{ field }}` placeholders.
#[derive(Debug, Clone)]
pub struct Template {
    name: String,
    source: String,
}

impl Template {
    pub fn new(name: &str, source: String) -> Self {
        Template {
            name: name.to_string(),
            source,
        }
    }

    /// Loads `<dir>/<encoder>.xml`.
    pub fn load_for(dir: &Path, standard: Standard) -> Result<Self> {
        let path = dir.join(format!("{}.xml", standard.encoder_name()));
        Self::load(&path)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let source = fs::read_to_string(path)
            .with_context(|| format!("Failed to read template {}", path.display()))?;
        let name = path
            .file_name()
            .map_or_else(|| path.to_string_lossy(), |name| name.to_string_lossy());
        Ok(Self::new(&name, source))
    }

    /// Field names referenced by the template, in order of first use.
    pub fn placeholders(&self) -> Vec<&str> {
        placeholder_pattern()
            .captures_iter(&self.source)
            .filter_map(|caps| caps.get(1))
            .map(|field| field.as_str())
            .unique()
            .collect()
    }

    pub fn render(&self, params: &EncodeParams) -> Result<String> {
        let fields = params.fields();
        let unknown = self
            .placeholders()
            .into_iter()
            .filter(|placeholder| !fields.iter().any(|(name, _)| name == placeholder))
            .collect::<Vec<_>>();
        if !unknown.is_empty() {
            bail!(
                "Template {} references fields not available for {}: {}",
                self.name,
                params.standard.encoder_name(),
                unknown.join(", ")
            );
        }

        let rendered = placeholder_pattern().replace_all(&self.source, |caps: &Captures| {
            let field = caps.get(1).map_or("", |field| field.as_str());
            fields
                .iter()
                .find(|(name, _)| *name == field)
                .map_or_else(String::new, |(_, value)| escape_xml(value).into_owned())
        });
        Ok(rendered.into_owned())
    }
}

fn escape_xml(value: &str) -> Cow<'_, str> {
    if !value.contains(['&', '<', '>', '"', '\'']) {
        return Cow::Borrowed(value);
    }
    let mut escaped = String::with_capacity(value.len() + 8);
    for c in value.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            c => escaped.push(c),
        }
    }
    Cow::Owned(escaped)
}

/// `"<encoder> <name>.xml"`
pub fn output_file_name(params: &EncodeParams) -> String {
    format!("{} {}.xml", params.standard.encoder_name(), params.name)
}

/// Renders one preset and writes it into `output_dir`, replacing any existing file.
pub fn save_setting(
    template: &Template,
    params: &EncodeParams,
    output_dir: &Path,
) -> Result<PathBuf> {
    if params.name.contains(['/', '\\']) {
        bail!("Profile name '{}' contains a path separator", params.name);
    }
    let rendered = template.render(params)?;
    let path = output_dir.join(output_file_name(params));
    fs::write(&path, rendered).with_context(|| format!("Cannot write to file {}", path.display()))?;
    Ok(path)
}
