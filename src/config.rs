//! Site configuration: the NGI YAML config plus Charon settings from the environment
//!
//! ```yaml
//! start_sarek:
//!   project_base_path: /proj/ngi2016004/nobackup/NGI
//!   sbatch_template: /vulpes/ngi/production/latest/conf/sarek_germline.sbatch
//!   workflow: sarek_ngi          # optional
//!   sbatch: /usr/bin/sbatch      # optional
//!   ledger: /path/launches.db    # optional
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use log::info;
use serde::Deserialize;
use url::Url;

use crate::layout::DEFAULT_WORKFLOW;

#[derive(Debug, Deserialize)]
pub struct NgiConfig {
    pub start_sarek: StartSarekConfig,
}

#[derive(Debug, Deserialize)]
pub struct StartSarekConfig {
    pub project_base_path: PathBuf,
    pub sbatch_template: PathBuf,
    #[serde(default = "default_workflow")]
    pub workflow: String,
    #[serde(default = "default_sbatch")]
    pub sbatch: PathBuf,
    #[serde(default)]
    pub ledger: Option<PathBuf>,
}

fn default_workflow() -> String {
    DEFAULT_WORKFLOW.to_string()
}

fn default_sbatch() -> PathBuf {
    PathBuf::from("sbatch")
}

/// Find the NGI config: an explicit path, then `$NGI_CONFIG`, then `~/.ngipipeline/ngi_config.yaml`
pub fn locate_ngi_config(explicit: Option<&Path>, env: impl Fn(&str) -> Option<String>) -> Result<PathBuf> {
    if let Some(path) = explicit {
        return Ok(path.to_path_buf());
    }
    if let Some(path) = env("NGI_CONFIG") {
        return Ok(PathBuf::from(path));
    }
    let home = env("HOME").ok_or_else(|| anyhow!("NGI_CONFIG is not set and HOME is unknown"))?;
    let path = Path::new(&home).join(".ngipipeline").join("ngi_config.yaml");
    match path.is_file() {
        true => Ok(path),
        false => Err(anyhow!("No NGI config found: set NGI_CONFIG or create {}", path.display())),
    }
}

pub fn load_ngi_config(path: &Path) -> Result<NgiConfig> {
    info!("Reading NGI config {}", path.display());
    let yaml = fs::read_to_string(path).with_context(|| format!("Can't read NGI config {}", path.display()))?;
    parse_ngi_config(&yaml).with_context(|| format!("Invalid NGI config {}", path.display()))
}

pub fn parse_ngi_config(yaml: &str) -> Result<NgiConfig> {
    Ok(serde_yaml::from_str(yaml)?)
}

/// Sample ids from a plain text file, one per line
///
/// Blank lines are ignored and repeated ids are kept only once, first occurrence wins.
pub fn read_sample_list(path: &Path) -> Result<Vec<String>> {
    let text = fs::read_to_string(path).with_context(|| format!("Can't read sample list {}", path.display()))?;
    let mut samples: Vec<String> = Vec::new();
    for id in text.lines().map(str::trim).filter(|line| !line.is_empty()) {
        if !samples.iter().any(|seen| seen == id) {
            samples.push(id.to_string());
        }
    }
    info!("Read {} sample ids from {}", samples.len(), path.display());
    Ok(samples)
}

/// Where Charon lives and how to authenticate against it
#[derive(Debug, Clone)]
pub struct CharonSettings {
    pub base_url: Url,
    pub api_token: String,
}

impl CharonSettings {
    /// Read `CHARON_BASE_URL` and `CHARON_API_TOKEN`
    pub fn from_env(env: impl Fn(&str) -> Option<String>) -> Result<CharonSettings> {
        let base = env("CHARON_BASE_URL").ok_or_else(|| anyhow!("CHARON_BASE_URL is not set"))?;
        let api_token = env("CHARON_API_TOKEN").ok_or_else(|| anyhow!("CHARON_API_TOKEN is not set"))?;
        let base_url = Url::parse(&base).with_context(|| format!("CHARON_BASE_URL is not a valid url: {base}"))?;
        Ok(CharonSettings { base_url, api_token })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use tempfile::TempDir;

    use super::*;

    fn env_of(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn optional_keys_have_defaults() {
        let config = parse_ngi_config(
            "start_sarek:\n  project_base_path: /proj/ngi\n  sbatch_template: /conf/sarek.sbatch\nother_section:\n  x: 1\n",
        )
        .unwrap();

        assert_eq!(config.start_sarek.project_base_path, PathBuf::from("/proj/ngi"));
        assert_eq!(config.start_sarek.sbatch_template, PathBuf::from("/conf/sarek.sbatch"));
        assert_eq!(config.start_sarek.workflow, "sarek_ngi");
        assert_eq!(config.start_sarek.sbatch, PathBuf::from("sbatch"));
        assert_eq!(config.start_sarek.ledger, None);
    }

    #[test]
    fn missing_section_is_an_error() {
        assert!(parse_ngi_config("piper:\n  threads: 16\n").is_err());
    }

    #[test]
    fn explicit_path_wins_over_environment() {
        let env = env_of(&[("NGI_CONFIG", "/etc/ngi.yaml")]);
        assert_eq!(locate_ngi_config(Some(Path::new("/tmp/mine.yaml")), &env).unwrap(), PathBuf::from("/tmp/mine.yaml"));
        assert_eq!(locate_ngi_config(None, &env).unwrap(), PathBuf::from("/etc/ngi.yaml"));
    }

    #[test]
    fn home_config_is_used_when_present() {
        let home = TempDir::new().unwrap();
        let env = env_of(&[("HOME", home.path().to_str().unwrap())]);
        assert!(locate_ngi_config(None, &env).is_err());

        let dir = home.path().join(".ngipipeline");
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("ngi_config.yaml"), "start_sarek: {}\n").unwrap();
        assert_eq!(locate_ngi_config(None, &env).unwrap(), dir.join("ngi_config.yaml"));
    }

    #[test]
    fn sample_list_skips_blanks_and_repeats() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("samples.txt");
        fs::write(&path, "P0001_102\n\n  P0001_101 \nP0001_102\n").unwrap();
        assert_eq!(read_sample_list(&path).unwrap(), vec!["P0001_102", "P0001_101"]);
    }

    #[test]
    fn charon_settings_need_url_and_token() {
        let env = env_of(&[("CHARON_BASE_URL", "https://charon.scilifelab.se"), ("CHARON_API_TOKEN", "abc")]);
        let settings = CharonSettings::from_env(env).unwrap();
        assert_eq!(settings.base_url.as_str(), "https://charon.scilifelab.se/");
        assert_eq!(settings.api_token, "abc");

        assert!(CharonSettings::from_env(env_of(&[("CHARON_API_TOKEN", "abc")])).is_err());
        assert!(CharonSettings::from_env(env_of(&[("CHARON_BASE_URL", "not a url"), ("CHARON_API_TOKEN", "abc")])).is_err());
    }
}
