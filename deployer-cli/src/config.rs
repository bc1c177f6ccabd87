//! Configuration module
//!
//! Settings come from a YAML file and the environment. Environment variables
//! are the upper-cased keys (`GITLAB_PROJECT_ID`, ...) and win over the file.
//! The configuration is built once at startup and passed down by reference.

use anyhow::{Context, Result, bail};
use deployer_client::{DEFAULT_REF, GitlabSettings};
use deployer_core::domain::manifest::DEFAULT_MANIFEST;
use deployer_orchestrator::JobLink;
use serde_yaml_ng::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use url::Url;

/// Config file looked up when `--config` is not given
pub const DEFAULT_CONFIG_FILE: &str = ".deployer.yaml";

const DEFAULT_GITLAB_URL: &str = "https://gitlab.com";

const GITLAB_URL: &str = "gitlab_url";
const PROJECT_ID: &str = "gitlab_project_id";
const PRIVATE_TOKEN: &str = "gitlab_private_token";
const PRIVATE_TOKEN_ALIAS: &str = "gitlab_token";
const PIPELINE_TOKEN: &str = "gitlab_pipeline_token";
const PROJECT_NAME: &str = "gitlab_project_name";
const GIT_REF: &str = "gitlab_ref";
const CLIENT_FILE: &str = "client_file";

/// Keys that may be overridden from the environment
const KEYS: [&str; 8] = [
    GITLAB_URL,
    PROJECT_ID,
    PRIVATE_TOKEN,
    PRIVATE_TOKEN_ALIAS,
    PIPELINE_TOKEN,
    PROJECT_NAME,
    GIT_REF,
    CLIENT_FILE,
];

/// CLI configuration
#[derive(Clone)]
pub struct Config {
    /// GitLab instance (e.g., "https://gitlab.com")
    pub gitlab_url: String,
    /// Project holding the deployment pipeline
    pub project_id: String,
    /// Access token for the jobs API
    pub private_token: String,
    /// Pipeline trigger token
    pub pipeline_token: String,
    /// Project path shown in job links
    pub project_name: String,
    /// Ref pipelines are triggered on
    pub git_ref: String,
    /// Client manifest
    pub client_file: PathBuf,
    /// Config file the values were read from, if any
    pub source: Option<PathBuf>,
}

impl Config {
    /// Loads configuration from the file and the process environment
    ///
    /// Without `path`, `.deployer.yaml` is looked up next to the executable,
    /// then in the working directory. A missing default file is not an error
    /// as long as the environment provides the required keys.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        Self::load_with(path, default_locations(), |key| std::env::var(key).ok())
    }

    /// Loads configuration with explicit lookup locations and environment
    pub fn load_with(
        path: Option<&Path>,
        defaults: Vec<PathBuf>,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self> {
        let source = match path {
            Some(path) => Some(path.to_path_buf()),
            None => defaults.into_iter().find(|p| p.is_file()),
        };

        let mut values = match &source {
            Some(file) => {
                info!("Using config file: {}", file.display());
                read_file(file)?
            }
            None => {
                debug!("No config file found, reading the environment only");
                BTreeMap::new()
            }
        };

        for key in KEYS {
            if let Some(value) = env(&key.to_uppercase()).filter(|v| !v.trim().is_empty()) {
                values.insert(key.to_string(), value);
            }
        }

        let config = Self::from_values(values, source)?;
        config.validate()?;
        Ok(config)
    }

    /// Builds a configuration from flat key/value pairs
    fn from_values(mut values: BTreeMap<String, String>, source: Option<PathBuf>) -> Result<Self> {
        let origin = source
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "your config file or environment".to_string());

        let mut required = |key: &str| -> Result<String> {
            match values.remove(key).filter(|v| !v.trim().is_empty()) {
                Some(value) => Ok(value),
                None => bail!(
                    "Can't access mandatory information, please set '{}' in {}",
                    key,
                    origin
                ),
            }
        };

        let project_id = required(PROJECT_ID)?;
        let private_token = match required(PRIVATE_TOKEN) {
            Ok(token) => token,
            Err(err) => required(PRIVATE_TOKEN_ALIAS).map_err(|_| err)?,
        };
        let pipeline_token = required(PIPELINE_TOKEN)?;
        let project_name = required(PROJECT_NAME)?;

        Ok(Self {
            gitlab_url: values
                .remove(GITLAB_URL)
                .unwrap_or_else(|| DEFAULT_GITLAB_URL.to_string()),
            project_id,
            private_token,
            pipeline_token,
            project_name,
            git_ref: values
                .remove(GIT_REF)
                .unwrap_or_else(|| DEFAULT_REF.to_string()),
            client_file: values
                .remove(CLIENT_FILE)
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_MANIFEST)),
            source,
        })
    }

    /// Validates the configuration
    pub fn validate(&self) -> Result<()> {
        let url = Url::parse(&self.gitlab_url)
            .with_context(|| format!("gitlab_url is not a valid URL: '{}'", self.gitlab_url))?;
        if !matches!(url.scheme(), "http" | "https") {
            bail!("gitlab_url must use http or https: '{}'", self.gitlab_url);
        }
        if url.cannot_be_a_base() || url.host_str().is_none_or(str::is_empty) {
            bail!("gitlab_url has no host: '{}'", self.gitlab_url);
        }

        if self.git_ref.trim().is_empty() {
            bail!("gitlab_ref cannot be empty");
        }

        if self.client_file.as_os_str().is_empty() {
            bail!("client_file cannot be empty");
        }

        Ok(())
    }

    /// Settings for the GitLab client
    pub fn gitlab_settings(&self) -> GitlabSettings {
        GitlabSettings::new(
            &self.gitlab_url,
            &self.project_id,
            &self.private_token,
            &self.pipeline_token,
        )
        .with_ref(&self.git_ref)
    }

    /// Link format for started jobs
    pub fn job_link(&self) -> JobLink {
        JobLink::new(&self.gitlab_url, &self.project_name)
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("gitlab_url", &self.gitlab_url)
            .field("project_id", &self.project_id)
            .field("private_token", &"<redacted>")
            .field("pipeline_token", &"<redacted>")
            .field("project_name", &self.project_name)
            .field("git_ref", &self.git_ref)
            .field("client_file", &self.client_file)
            .field("source", &self.source)
            .finish()
    }
}

/// Places `.deployer.yaml` is looked for, in order
fn default_locations() -> Vec<PathBuf> {
    let mut locations = Vec::new();
    if let Some(dir) = std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf))
    {
        locations.push(dir.join(DEFAULT_CONFIG_FILE));
    }
    locations.push(PathBuf::from(DEFAULT_CONFIG_FILE));
    locations
}

/// Reads a YAML mapping of scalar values
fn read_file(path: &Path) -> Result<BTreeMap<String, String>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    if content.trim().is_empty() {
        return Ok(BTreeMap::new());
    }

    let raw: BTreeMap<String, Value> = serde_yaml_ng::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

    Ok(raw
        .into_iter()
        .filter_map(|(key, value)| scalar_to_string(value).map(|v| (key.to_lowercase(), v)))
        .collect())
}

fn scalar_to_string(value: Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    const FULL: &str = "\
gitlab_project_id: 1234
gitlab_private_token: glpat-secret
gitlab_pipeline_token: trigger-secret
gitlab_project_name: mysocialapp/k8s-deployer
";

    fn write_config(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    fn no_env(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn test_load_file_with_defaults() {
        let file = write_config(FULL);
        let config = Config::load_with(Some(file.path()), Vec::new(), no_env).unwrap();

        assert_eq!(config.project_id, "1234");
        assert_eq!(config.private_token, "glpat-secret");
        assert_eq!(config.pipeline_token, "trigger-secret");
        assert_eq!(config.project_name, "mysocialapp/k8s-deployer");
        assert_eq!(config.gitlab_url, "https://gitlab.com");
        assert_eq!(config.git_ref, "master");
        assert_eq!(config.client_file, PathBuf::from("clients.csv"));
        assert_eq!(config.source.as_deref(), Some(file.path()));
    }

    #[test]
    fn test_environment_overrides_file() {
        let file = write_config(FULL);
        let env: HashMap<&str, &str> = [
            ("GITLAB_PROJECT_ID", "5678"),
            ("GITLAB_REF", "deployer"),
            ("CLIENT_FILE", "/etc/deployer/clients.csv"),
        ]
        .into_iter()
        .collect();

        let config = Config::load_with(Some(file.path()), Vec::new(), |key| {
            env.get(key).map(|v| v.to_string())
        })
        .unwrap();

        assert_eq!(config.project_id, "5678");
        assert_eq!(config.git_ref, "deployer");
        assert_eq!(
            config.client_file,
            PathBuf::from("/etc/deployer/clients.csv")
        );
    }

    #[test]
    fn test_environment_only() {
        let dir = tempfile::tempdir().unwrap();
        let env: HashMap<&str, &str> = [
            ("GITLAB_PROJECT_ID", "42"),
            ("GITLAB_TOKEN", "glpat-alias"),
            ("GITLAB_PIPELINE_TOKEN", "trigger"),
            ("GITLAB_PROJECT_NAME", "acme/infra"),
            ("GITLAB_URL", "https://gitlab.example.org"),
        ]
        .into_iter()
        .collect();

        let config = Config::load_with(None, vec![dir.path().join(DEFAULT_CONFIG_FILE)], |key| {
            env.get(key).map(|v| v.to_string())
        })
        .unwrap();

        assert!(config.source.is_none());
        assert_eq!(config.private_token, "glpat-alias");
        assert_eq!(
            config.job_link().job_url(9),
            "https://gitlab.example.org/acme/infra/-/jobs/9"
        );
    }

    #[test]
    fn test_missing_required_key() {
        let file = write_config("gitlab_project_id: 1234\ngitlab_private_token: x\n");
        let err = Config::load_with(Some(file.path()), Vec::new(), no_env).unwrap_err();

        let message = err.to_string();
        assert!(message.contains("gitlab_pipeline_token"), "{message}");
        assert!(message.contains(&file.path().display().to_string()));
    }

    #[test]
    fn test_missing_private_token_names_the_key() {
        let file = write_config(
            "gitlab_project_id: 1\ngitlab_pipeline_token: t\ngitlab_project_name: a/b\n",
        );
        let err = Config::load_with(Some(file.path()), Vec::new(), no_env).unwrap_err();
        assert!(err.to_string().contains("'gitlab_private_token'"));
    }

    #[test]
    fn test_empty_value_counts_as_missing() {
        let file = write_config(&FULL.replace("1234", "\"\""));
        assert!(Config::load_with(Some(file.path()), Vec::new(), no_env).is_err());
    }

    #[test]
    fn test_explicit_missing_file_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nope.yaml");
        let err = Config::load_with(Some(&path), Vec::new(), no_env).unwrap_err();
        assert!(err.to_string().contains("Failed to read config file"));
    }

    #[test]
    fn test_default_location_is_used() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(DEFAULT_CONFIG_FILE);
        std::fs::write(&path, FULL).unwrap();

        let config = Config::load_with(None, vec![path.clone()], no_env).unwrap();
        assert_eq!(config.source, Some(path));
    }

    #[test]
    fn test_invalid_url() {
        for url in [
            "gitlab.com",
            "https://",
            "http://gitlab example.com",
            "https://:::",
            "ftp://gitlab.com",
        ] {
            let file = write_config(&format!("{FULL}gitlab_url: \"{url}\"\n"));
            let err = Config::load_with(Some(file.path()), Vec::new(), no_env).unwrap_err();
            assert!(err.to_string().contains("gitlab_url"), "{url}: {err}");
        }
    }

    #[test]
    fn test_url_with_path_is_accepted() {
        let file = write_config(&format!("{FULL}gitlab_url: https://example.org/gitlab\n"));
        let config = Config::load_with(Some(file.path()), Vec::new(), no_env).unwrap();
        assert_eq!(config.gitlab_url, "https://example.org/gitlab");
    }

    #[test]
    fn test_settings_conversion() {
        let file = write_config(&format!("{FULL}gitlab_ref: main\n"));
        let config = Config::load_with(Some(file.path()), Vec::new(), no_env).unwrap();

        let settings = config.gitlab_settings();
        assert_eq!(settings.project_id, "1234");
        assert_eq!(settings.trigger_token, "trigger-secret");
        assert_eq!(settings.git_ref, "main");
        assert!(!format!("{:?}", config).contains("glpat-secret"));
    }
}
