use crate::classifier::{TableHeuristics, GENERIC_NOISE_TAGS, WORD_NOISE_TAGS};
use crate::error::{CleanError, CleanResult};
use crate::parsers::ParserKind;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use tracing::warn;

/// Prefix for environment overrides, e.g. `HTMLSLIM_KEEP_ATTR=true`
pub const ENV_PREFIX: &str = "HTMLSLIM_";

// Default value functions for serde
fn default_true() -> bool {
    true
}

fn default_max_iterations() -> usize {
    1000
}

/// Which cleaning pipeline to run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Profile {
    /// Generic web/RAG cleaning, no table awareness
    #[default]
    Generic,
    /// Word-exported HTML: unwraps layout tables, keeps data tables
    Word,
}

impl Profile {
    pub fn as_str(self) -> &'static str {
        match self {
            Profile::Generic => "generic",
            Profile::Word => "word",
        }
    }
}

impl std::fmt::Display for Profile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Profile {
    type Err = CleanError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "generic" | "html" | "htmlrag" => Ok(Profile::Generic),
            "word" | "docx" | "office" => Ok(Profile::Word),
            other => Err(CleanError::UnknownProfile(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CleaningConfig {
    pub profile: Profile,
    /// Keep element attributes instead of stripping them
    #[serde(default)]
    pub keep_attr: bool,
    /// Attributes that survive attribute stripping
    #[serde(default)]
    pub preserved_attributes: Vec<String>,
    /// Elements removed together with their content
    #[serde(default)]
    pub noise_tags: Vec<String>,
    /// Never collapse or prune table, tbody, thead, tr, td, th
    #[serde(default)]
    pub preserve_table_structure: bool,
    #[serde(default)]
    pub table_heuristics: TableHeuristics,
    /// Pipeline configuration - which passes run and in what order
    pub pipeline: PipelineConfig,
    /// Cap for every fixed-point loop
    #[serde(default = "default_max_iterations")]
    pub max_iterations: usize,
    /// Re-run the whole pipeline until a round changes nothing
    #[serde(default = "default_true")]
    pub converge: bool,
    #[serde(default)]
    pub parser: ParserKind,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// List of passes to run in order
    pub passes: Vec<PassConfig>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PassConfig {
    /// Name of the pass
    pub name: String,
    /// Whether this pass is enabled
    #[serde(default = "default_true")]
    pub enabled: bool,
}

impl PassConfig {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            enabled: true,
        }
    }
}

impl PipelineConfig {
    fn from_names(names: &[&str]) -> Self {
        Self {
            passes: names.iter().map(|name| PassConfig::new(name)).collect(),
        }
    }

    /// HtmlRAG ordering: attributes go before pruning, comments late
    pub fn generic() -> Self {
        Self::from_names(&[
            "StripNoise",
            "StripAttributes",
            "PruneEmpty",
            "StripHref",
            "StripComments",
            "CollapseWrappers",
        ])
    }

    pub fn word() -> Self {
        Self::from_names(&[
            "StripNoise",
            "StripComments",
            "UnwrapWrapperTables",
            "StripHref",
            "StripAttributes",
            "CollapseWrappers",
            "PruneEmpty",
        ])
    }

    pub fn enabled_passes(&self) -> impl Iterator<Item = &PassConfig> {
        self.passes.iter().filter(|pass| pass.enabled)
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self::generic()
    }
}

impl CleaningConfig {
    pub fn generic() -> Self {
        Self {
            profile: Profile::Generic,
            keep_attr: false,
            preserved_attributes: Vec::new(),
            noise_tags: GENERIC_NOISE_TAGS.iter().map(|t| t.to_string()).collect(),
            preserve_table_structure: false,
            table_heuristics: TableHeuristics::default(),
            pipeline: PipelineConfig::generic(),
            max_iterations: default_max_iterations(),
            converge: true,
            parser: ParserKind::Html,
        }
    }

    pub fn word() -> Self {
        Self {
            profile: Profile::Word,
            keep_attr: true,
            preserved_attributes: vec!["colspan".to_string(), "rowspan".to_string()],
            noise_tags: WORD_NOISE_TAGS.iter().map(|t| t.to_string()).collect(),
            preserve_table_structure: true,
            table_heuristics: TableHeuristics::default(),
            pipeline: PipelineConfig::word(),
            max_iterations: default_max_iterations(),
            converge: true,
            parser: ParserKind::Html,
        }
    }

    pub fn for_profile(profile: Profile) -> Self {
        match profile {
            Profile::Generic => Self::generic(),
            Profile::Word => Self::word(),
        }
    }

    pub fn with_keep_attr(mut self, keep_attr: bool) -> Self {
        self.keep_attr = keep_attr;
        self
    }

    pub fn validate(&self) -> CleanResult<()> {
        if self.max_iterations == 0 {
            return Err(CleanError::InvalidConfig(
                "max_iterations must be at least 1".to_string(),
            ));
        }
        if self.pipeline.enabled_passes().next().is_none() {
            warn!(profile = %self.profile, "pipeline has no enabled passes");
        }
        Ok(())
    }

    /// Load config from file path. Fields missing from the file fall back to
    /// the built-in config of the profile named in the file.
    pub fn load_from_file(path: impl AsRef<Path>) -> CleanResult<Self> {
        Self::load_from_file_with_profile(path, None)
    }

    /// Like [`load_from_file`](Self::load_from_file), but `profile`, when
    /// given, picks the base config instead of the file's `profile` key.
    pub fn load_from_file_with_profile(
        path: impl AsRef<Path>,
        profile: Option<Profile>,
    ) -> CleanResult<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)?;
        let overlay: ConfigOverlay = serde_yaml::from_str(&content)?;
        if let (Some(chosen), Some(in_file)) = (profile, overlay.profile) {
            if chosen != in_file {
                warn!(path = %path.display(), profile = %chosen, file_profile = %in_file, "profile replaces the config file's profile");
            }
        }
        let base = Self::for_profile(profile.or(overlay.profile).unwrap_or_default());
        let config = overlay.apply_to(base);
        config.validate()?;
        Ok(config)
    }

    /// Load config with fallback to the built-in profile
    pub fn load_with_fallback(path: Option<&Path>, profile: Profile) -> Self {
        match path {
            Some(p) => Self::load_from_file(p).unwrap_or_else(|e| {
                warn!(path = %p.display(), error = %e, "failed to load config, using defaults");
                Self::for_profile(profile)
            }),
            None => Self::for_profile(profile),
        }
    }

    /// Full layering: the profile (explicit, then `HTMLSLIM_PROFILE`, then the
    /// file's own, then `fallback`) selects the built-in base, the config file
    /// is laid over it, then the remaining `HTMLSLIM_*` variables. An
    /// unreadable file is logged and skipped.
    pub fn layered<F>(
        path: Option<&Path>,
        profile: Option<Profile>,
        fallback: Profile,
        lookup: F,
    ) -> CleanResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env_profile = lookup(&format!("{ENV_PREFIX}PROFILE"))
            .map(|value| value.parse::<Profile>())
            .transpose()?;
        let profile = profile.or(env_profile);

        let base = match path {
            Some(p) => Self::load_from_file_with_profile(p, profile).unwrap_or_else(|e| {
                warn!(path = %p.display(), error = %e, "failed to load config, using defaults");
                Self::for_profile(profile.unwrap_or(fallback))
            }),
            None => Self::for_profile(profile.unwrap_or(fallback)),
        };
        base.apply_env_settings(&lookup)
    }

    /// Apply `HTMLSLIM_*` overrides. `lookup` maps a full variable name to
    /// its value. A differing `HTMLSLIM_PROFILE` starts over from that
    /// profile's built-in config.
    pub fn apply_env_overrides<F>(mut self, lookup: F) -> CleanResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(profile) = lookup(&format!("{ENV_PREFIX}PROFILE")) {
            let profile: Profile = profile.parse()?;
            if profile != self.profile {
                self = Self::for_profile(profile);
            }
        }
        self.apply_env_settings(&lookup)
    }

    fn apply_env_settings<F>(mut self, lookup: &F) -> CleanResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(&format!("{ENV_PREFIX}{name}"));

        if let Some(keep_attr) = var("KEEP_ATTR") {
            self.keep_attr = parse_bool(&keep_attr).ok_or_else(|| {
                CleanError::InvalidConfig(format!("{ENV_PREFIX}KEEP_ATTR: not a boolean: {keep_attr}"))
            })?;
        }
        if let Some(max) = var("MAX_ITERATIONS") {
            self.max_iterations = max.trim().parse().map_err(|_| {
                CleanError::InvalidConfig(format!("{ENV_PREFIX}MAX_ITERATIONS: not a number: {max}"))
            })?;
        }
        self.validate()?;
        Ok(self)
    }

    /// YAML in the same shape `load_from_file` accepts
    pub fn to_yaml(&self) -> CleanResult<String> {
        Ok(serde_yaml::to_string(self)?)
    }
}

impl Default for CleaningConfig {
    fn default() -> Self {
        Self::generic()
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Partial config as written in YAML files
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigOverlay {
    profile: Option<Profile>,
    keep_attr: Option<bool>,
    preserved_attributes: Option<Vec<String>>,
    noise_tags: Option<Vec<String>>,
    preserve_table_structure: Option<bool>,
    table_heuristics: Option<TableHeuristics>,
    pipeline: Option<PipelineConfig>,
    max_iterations: Option<usize>,
    converge: Option<bool>,
    parser: Option<ParserKind>,
}

impl ConfigOverlay {
    fn apply_to(self, mut base: CleaningConfig) -> CleaningConfig {
        if let Some(v) = self.keep_attr {
            base.keep_attr = v;
        }
        if let Some(v) = self.preserved_attributes {
            base.preserved_attributes = v.into_iter().map(|a| a.to_ascii_lowercase()).collect();
        }
        if let Some(v) = self.noise_tags {
            base.noise_tags = v.into_iter().map(|t| t.to_ascii_lowercase()).collect();
        }
        if let Some(v) = self.preserve_table_structure {
            base.preserve_table_structure = v;
        }
        if let Some(v) = self.table_heuristics {
            base.table_heuristics = v;
        }
        if let Some(v) = self.pipeline {
            base.pipeline = v;
        }
        if let Some(v) = self.max_iterations {
            base.max_iterations = v;
        }
        if let Some(v) = self.converge {
            base.converge = v;
        }
        if let Some(v) = self.parser {
            base.parser = v;
        }
        base
    }
}

/// Built-in configs per profile, plus any loaded from files
#[derive(Debug, Clone)]
pub struct ConfigManager {
    configs: HashMap<Profile, CleaningConfig>,
}

impl ConfigManager {
    pub fn new() -> Self {
        let mut configs = HashMap::new();
        configs.insert(Profile::Generic, CleaningConfig::generic());
        configs.insert(Profile::Word, CleaningConfig::word());
        Self { configs }
    }

    pub fn get_config(&self, profile: Profile) -> &CleaningConfig {
        // Both profiles are inserted in new() and never removed
        &self.configs[&profile]
    }

    /// Load a config file and register it for its profile, replacing the
    /// built-in one. Returns the profile it was registered under.
    pub fn load_config_from_file(&mut self, path: impl AsRef<Path>) -> CleanResult<Profile> {
        let config = CleaningConfig::load_from_file(path)?;
        let profile = config.profile;
        self.configs.insert(profile, config);
        Ok(profile)
    }

    /// All known configs in a stable order
    pub fn configs(&self) -> Vec<&CleaningConfig> {
        [Profile::Generic, Profile::Word]
            .iter()
            .map(|profile| self.get_config(*profile))
            .collect()
    }
}

impl Default for ConfigManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn builtin_profiles_differ_where_expected() {
        let generic = CleaningConfig::generic();
        let word = CleaningConfig::word();

        assert!(!generic.keep_attr);
        assert!(word.keep_attr);
        assert!(generic.preserved_attributes.is_empty());
        assert_eq!(word.preserved_attributes, vec!["colspan", "rowspan"]);
        assert!(word.noise_tags.contains(&"meta".to_string()));
        assert!(!generic.noise_tags.contains(&"meta".to_string()));
        assert!(word.preserve_table_structure);
        assert_eq!(word.table_heuristics, TableHeuristics::default());
    }

    #[test]
    fn yaml_overlay_keeps_profile_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "profile: word\nkeep_attr: false\ntable_heuristics:\n  min_data_cells: 6").unwrap();

        let config = CleaningConfig::load_from_file(file.path()).unwrap();
        assert_eq!(config.profile, Profile::Word);
        assert!(!config.keep_attr);
        assert_eq!(config.pipeline, PipelineConfig::word());
        assert_eq!(config.table_heuristics.min_data_cells, 6);
        assert_eq!(config.table_heuristics.numeric_token_threshold, 5);
    }

    #[test]
    fn unknown_yaml_fields_are_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "profile: generic\nkeep_attrs: true").unwrap();

        let err = CleaningConfig::load_from_file(file.path()).unwrap_err();
        assert!(matches!(err, CleanError::InvalidConfig(_)));
    }

    #[test]
    fn dumped_config_loads_back() {
        let mut config = CleaningConfig::word().with_keep_attr(false);
        config.max_iterations = 50;

        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{}", config.to_yaml().unwrap()).unwrap();
        assert_eq!(CleaningConfig::load_from_file(file.path()).unwrap(), config);
    }

    #[test]
    fn missing_file_falls_back_to_profile() {
        let config =
            CleaningConfig::load_with_fallback(Some(Path::new("/nonexistent/htmlslim.yaml")), Profile::Word);
        assert_eq!(config, CleaningConfig::word());
    }

    #[test]
    fn env_overrides() {
        let env: HashMap<&str, &str> = [
            ("HTMLSLIM_PROFILE", "word"),
            ("HTMLSLIM_KEEP_ATTR", "false"),
            ("HTMLSLIM_MAX_ITERATIONS", "25"),
        ]
        .into_iter()
        .collect();

        let config = CleaningConfig::generic()
            .apply_env_overrides(|name| env.get(name).map(|v| v.to_string()))
            .unwrap();
        assert_eq!(config.profile, Profile::Word);
        assert!(!config.keep_attr);
        assert_eq!(config.max_iterations, 25);
    }

    #[test]
    fn profile_is_chosen_before_file_and_env_layers() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "profile: generic\nconverge: false\nmax_iterations: 40").unwrap();
        let env: HashMap<&str, &str> = [("HTMLSLIM_KEEP_ATTR", "false")].into_iter().collect();
        let lookup = |name: &str| env.get(name).map(|v| v.to_string());

        let config =
            CleaningConfig::layered(Some(file.path()), Some(Profile::Word), Profile::Generic, lookup)
                .unwrap();
        assert_eq!(config.profile, Profile::Word);
        assert_eq!(config.pipeline, PipelineConfig::word());
        assert!(!config.converge);
        assert_eq!(config.max_iterations, 40);
        assert!(!config.keep_attr);

        let config =
            CleaningConfig::layered(Some(file.path()), None, Profile::Word, lookup).unwrap();
        assert_eq!(config.profile, Profile::Generic);
        assert_eq!(config.max_iterations, 40);
    }

    #[test]
    fn env_profile_keeps_file_settings() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "max_iterations: 12").unwrap();
        let env: HashMap<&str, &str> = [("HTMLSLIM_PROFILE", "word")].into_iter().collect();

        let config = CleaningConfig::layered(Some(file.path()), None, Profile::Generic, |name| {
            env.get(name).map(|v| v.to_string())
        })
        .unwrap();
        assert_eq!(config.profile, Profile::Word);
        assert_eq!(config.max_iterations, 12);

        let config =
            CleaningConfig::layered(None, None, Profile::Word, |_| None).unwrap();
        assert_eq!(config, CleaningConfig::word());
    }

    #[test]
    fn bad_env_values_are_errors() {
        let err = CleaningConfig::generic()
            .apply_env_overrides(|name| (name == "HTMLSLIM_PROFILE").then(|| "pdf".to_string()))
            .unwrap_err();
        assert!(matches!(err, CleanError::UnknownProfile(p) if p == "pdf"));

        let err = CleaningConfig::generic()
            .apply_env_overrides(|name| (name == "HTMLSLIM_MAX_ITERATIONS").then(|| "0".to_string()))
            .unwrap_err();
        assert!(matches!(err, CleanError::InvalidConfig(_)));
    }

    #[test]
    fn manager_replaces_builtin_with_loaded_config() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "profile: generic\nconverge: false").unwrap();

        let mut manager = ConfigManager::new();
        let profile = manager.load_config_from_file(file.path()).unwrap();
        assert_eq!(profile, Profile::Generic);
        assert!(!manager.get_config(Profile::Generic).converge);
        assert!(manager.get_config(Profile::Word).converge);
        assert_eq!(manager.configs().len(), 2);
    }
}
