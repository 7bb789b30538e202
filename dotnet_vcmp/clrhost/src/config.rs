use log::trace;
use std::fmt;
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::{Path, PathBuf};

/// Where the VC:MP server keeps its configuration, relative to its working directory.
pub const SERVER_CONFIG_FILE: &str = "./server.cfg";

/// The two server.cfg directives this plugin consumes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Directive {
    RuntimeConfig,
    Assembly,
}

impl Directive {
    pub fn key(self) -> &'static str {
        match self {
            Directive::RuntimeConfig => "dotnetrtc",
            Directive::Assembly => "dotnetasm",
        }
    }

    fn from_key(key: &str) -> Option<Self> {
        match key {
            "dotnetrtc" => Some(Directive::RuntimeConfig),
            "dotnetasm" => Some(Directive::Assembly),
            _ => None,
        }
    }

    /// Diagnostic shown when the directive is absent or empty.
    pub fn missing_message(self) -> &'static str {
        match self {
            Directive::RuntimeConfig => {
                "No dotnet *.runtimeconfig.json path specified; use 'dotnetrtc' directive in server.cfg to specify."
            }
            Directive::Assembly => {
                "No dotnet *.dll assembly path specified; use 'dotnetasm' directive in server.cfg to specify."
            }
        }
    }
}

impl fmt::Display for Directive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to open server configuration file {}.", .path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Failed to read server configuration file: {0}")]
    Read(#[from] io::Error),
    #[error("Missing server.cfg directive(s): {}", keys(.0))]
    MissingDirectives(Vec<Directive>),
}

fn keys(directives: &[Directive]) -> String {
    directives
        .iter()
        .map(Directive::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Paths read from server.cfg. Both are guaranteed non-empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PluginConfig {
    pub runtime_config_path: String,
    pub assembly_path: String,
}

impl PluginConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let file = File::open(path).map_err(|source| ConfigError::Open {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(BufReader::new(file))
    }

    /// Reads `key value` lines. The key ends at the first space; unknown keys are
    /// skipped and a repeated directive overwrites the earlier one.
    pub fn parse<R: BufRead>(reader: R) -> Result<Self, ConfigError> {
        let mut runtime_config_path = String::new();
        let mut assembly_path = String::new();

        for raw in reader.split(b'\n') {
            let raw = raw?;
            let text = String::from_utf8_lossy(&raw);
            let line = text.strip_suffix('\r').unwrap_or(&text);
            let (key, value) = line.split_once(' ').unwrap_or((line, ""));

            match Directive::from_key(key) {
                Some(Directive::RuntimeConfig) => runtime_config_path = value.to_string(),
                Some(Directive::Assembly) => assembly_path = value.to_string(),
                None => trace!("Ignoring server.cfg directive {:?}", key),
            }
        }

        // Both are checked so a single run reports every missing directive.
        let missing: Vec<Directive> = [
            (Directive::RuntimeConfig, &runtime_config_path),
            (Directive::Assembly, &assembly_path),
        ]
        .into_iter()
        .filter(|(_, value)| value.is_empty())
        .map(|(directive, _)| directive)
        .collect();

        if !missing.is_empty() {
            return Err(ConfigError::MissingDirectives(missing));
        }

        Ok(Self {
            runtime_config_path,
            assembly_path,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn parse(text: &str) -> Result<PluginConfig, ConfigError> {
        PluginConfig::parse(Cursor::new(text.as_bytes()))
    }

    fn missing(result: Result<PluginConfig, ConfigError>) -> Vec<Directive> {
        match result {
            Err(ConfigError::MissingDirectives(missing)) => missing,
            other => panic!("expected missing directives, got {:?}", other),
        }
    }

    #[test]
    fn reads_both_directives_among_server_settings() {
        let config = parse(
            "gamemode Default\nmaxplayers 50\ndotnetrtc config.json\nport 8192\ndotnetasm plugin.dll\n",
        )
        .unwrap();
        assert_eq!(config.runtime_config_path, "config.json");
        assert_eq!(config.assembly_path, "plugin.dll");
    }

    #[test]
    fn last_directive_wins() {
        let config =
            parse("dotnetrtc config.json\ndotnetasm old.dll\ndotnetasm new.dll\n").unwrap();
        assert_eq!(config.assembly_path, "new.dll");
    }

    #[test]
    fn value_keeps_everything_after_first_space() {
        let config =
            parse("dotnetrtc dotnet/My Server.runtimeconfig.json\ndotnetasm dotnet/My Server.dll")
                .unwrap();
        assert_eq!(
            config.runtime_config_path,
            "dotnet/My Server.runtimeconfig.json"
        );
        assert_eq!(config.assembly_path, "dotnet/My Server.dll");
    }

    #[test]
    fn reports_every_missing_directive() {
        let result = parse("gamemode Default\nport 8192\n");
        assert_eq!(
            missing(result),
            vec![Directive::RuntimeConfig, Directive::Assembly]
        );
    }

    #[test]
    fn bare_key_is_treated_as_missing() {
        let result = parse("dotnetrtc\ndotnetasm plugin.dll\n");
        assert_eq!(missing(result), vec![Directive::RuntimeConfig]);

        let result = parse("dotnetrtc config.json\ndotnetasm \n");
        assert_eq!(missing(result), vec![Directive::Assembly]);
    }

    #[test]
    fn later_empty_directive_clears_earlier_value() {
        let result = parse("dotnetrtc config.json\ndotnetasm plugin.dll\ndotnetasm\n");
        assert_eq!(missing(result), vec![Directive::Assembly]);
    }

    #[test]
    fn strips_windows_line_endings() {
        let config = parse("dotnetrtc config.json\r\ndotnetasm plugin.dll\r\n").unwrap();
        assert_eq!(config.runtime_config_path, "config.json");
        assert_eq!(config.assembly_path, "plugin.dll");
    }

    #[test]
    fn keys_are_case_sensitive() {
        let result = parse("DOTNETRTC config.json\ndotnetasm plugin.dll\n");
        assert_eq!(missing(result), vec![Directive::RuntimeConfig]);
    }

    #[test]
    fn missing_file_is_an_open_error() {
        let path = std::env::temp_dir().join("clrhost-does-not-exist/server.cfg");
        match PluginConfig::load(&path) {
            Err(ConfigError::Open { path: reported, .. }) => assert_eq!(reported, path),
            other => panic!("expected open error, got {:?}", other),
        }
    }

    #[test]
    fn missing_directive_messages_name_the_directive() {
        assert!(Directive::RuntimeConfig.missing_message().contains("'dotnetrtc'"));
        assert!(Directive::Assembly.missing_message().contains("'dotnetasm'"));
        let err = ConfigError::MissingDirectives(vec![Directive::RuntimeConfig, Directive::Assembly]);
        assert_eq!(
            err.to_string(),
            "Missing server.cfg directive(s): dotnetrtc, dotnetasm"
        );
    }
}
