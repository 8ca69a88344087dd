use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use log::{info, warn};
use thiserror::Error;

/// A literal token in an sbatch template that is replaced per sample
///
/// There is no escaping syntax: every occurrence of the token text is replaced.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Placeholder {
    ProjectId,
    SampleId,
    Reference,
}

impl Placeholder {
    /// Every known placeholder, in the order substitutions are applied
    pub const ALL: [Placeholder; 3] = [Placeholder::ProjectId, Placeholder::SampleId, Placeholder::Reference];

    pub fn token(&self) -> &'static str {
        match self {
            Placeholder::ProjectId => "PROJECT_ID",
            Placeholder::SampleId => "SAMPLE_ID",
            Placeholder::Reference => "REFERENCE",
        }
    }
}

impl fmt::Display for Placeholder {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.token())
    }
}

/// Placeholder -> value mapping for a single render
#[derive(Debug, Default, Clone)]
pub struct Substitutions {
    values: BTreeMap<Placeholder, String>,
}

impl Substitutions {
    pub fn new() -> Substitutions {
        Substitutions::default()
    }

    pub fn with(mut self, placeholder: Placeholder, value: impl Into<String>) -> Substitutions {
        self.values.insert(placeholder, value.into());
        self
    }

    pub fn get(&self, placeholder: Placeholder) -> Option<&str> {
        self.values.get(&placeholder).map(String::as_str)
    }

    fn placeholders(&self) -> impl Iterator<Item = &Placeholder> {
        self.values.keys()
    }
}

#[derive(Debug, Error)]
pub enum TemplateError {
    #[error("can't read sbatch template {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("can't write sbatch script {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("sbatch template {} uses {} but no value was supplied", .path.display(), join(.missing))]
    Unresolved {
        path: PathBuf,
        missing: Vec<Placeholder>,
    },
}

fn join(placeholders: &[Placeholder]) -> String {
    placeholders.iter().map(Placeholder::token).collect::<Vec<_>>().join(", ")
}

/// An sbatch template read from disk, shared read-only by every sample in a run
#[derive(Debug, Clone)]
pub struct ScriptTemplate {
    path: PathBuf,
    content: String,
}

impl ScriptTemplate {
    pub fn load(path: &Path) -> Result<ScriptTemplate, TemplateError> {
        info!("Reading sbatch template {}", path.display());
        let content = fs::read_to_string(path)
            .map_err(|source| TemplateError::Read { path: path.to_path_buf(), source })?;
        Ok(ScriptTemplate { path: path.to_path_buf(), content })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Known placeholders that occur somewhere in the template
    pub fn placeholders(&self) -> Vec<Placeholder> {
        Placeholder::ALL
            .into_iter()
            .filter(|p| self.content.contains(p.token()))
            .collect()
    }

    /// Substitute every placeholder, line by line
    ///
    /// Fails if the template uses a placeholder that has no value. Values for placeholders the
    /// template never mentions are ignored with a warning.
    pub fn render(&self, substitutions: &Substitutions) -> Result<String, TemplateError> {
        let used = self.placeholders();
        let missing: Vec<Placeholder> = used
            .iter()
            .copied()
            .filter(|p| substitutions.get(*p).is_none())
            .collect();
        if !missing.is_empty() {
            return Err(TemplateError::Unresolved { path: self.path.clone(), missing });
        }
        for unused in substitutions.placeholders().filter(|p| !used.contains(*p)) {
            warn!("Placeholder {} does not occur in {}, value ignored", unused, self.path.display());
        }

        let mut rendered = String::with_capacity(self.content.len());
        for line in self.content.split_inclusive('\n') {
            let mut line = line.to_string();
            for placeholder in Placeholder::ALL {
                if let Some(value) = substitutions.get(placeholder) {
                    line = line.replace(placeholder.token(), value);
                }
            }
            rendered.push_str(&line);
        }
        Ok(rendered)
    }

    /// Render and write the script to `out_path`, overwriting any previous script
    pub fn write(&self, substitutions: &Substitutions, out_path: &Path) -> Result<(), TemplateError> {
        let script = self.render(substitutions)?;
        fs::write(out_path, script)
            .map_err(|source| TemplateError::Write { path: out_path.to_path_buf(), source })?;
        info!("Writing sbatch script {}", out_path.display());
        Ok(())
    }
}

/// Read `template_path`, substitute and write the result to `output_path`
pub fn render(template_path: &Path, substitutions: &Substitutions, output_path: &Path) -> Result<(), TemplateError> {
    ScriptTemplate::load(template_path)?.write(substitutions, output_path)
}
