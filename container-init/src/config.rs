use std::path::{Path, PathBuf};

use serde::Deserialize;
use supervisor::{Signal, SignalMapping, parse_signal};

use crate::cli::Cli;
use crate::error::{InitError, InitResult};

pub(crate) const DEFAULT_SIDECAR_BINARY: &str = "/usr/bin/consul";
pub(crate) const DEFAULT_SIDECAR_CONFIG_DIR: &str = "/etc/consul";
pub(crate) const DEFAULT_SIDECAR_DATA_DIR: &str = "/var/lib/consul/data";

/// Optional YAML config file. Every field has a default.
#[derive(Debug, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub sidecar: SidecarConfig,
    pub signal_map: Vec<SignalMapEntry>,
    pub shutdown_signal: Option<String>,
    pub init_command: Option<Vec<String>>,
}

#[derive(Debug, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SidecarConfig {
    pub enabled: bool,
    pub binary: PathBuf,
    pub config_dir: PathBuf,
    pub data_dir: PathBuf,
    /// Full argument list after the binary. Defaults to a consul agent
    /// invocation pointing at `config_dir` and `data_dir`.
    pub args: Option<Vec<String>>,
}

impl Default for SidecarConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            binary: PathBuf::from(DEFAULT_SIDECAR_BINARY),
            config_dir: PathBuf::from(DEFAULT_SIDECAR_CONFIG_DIR),
            data_dir: PathBuf::from(DEFAULT_SIDECAR_DATA_DIR),
            args: None,
        }
    }
}

impl SidecarConfig {
    /// Sidecar command line: binary followed by its arguments.
    pub fn argv(&self) -> Vec<String> {
        let mut argv = vec![self.binary.display().to_string()];
        match &self.args {
            Some(args) => argv.extend(args.iter().cloned()),
            None => argv.extend([
                "agent".to_string(),
                "-config-dir".to_string(),
                self.config_dir.display().to_string(),
                "-data-dir".to_string(),
                self.data_dir.display().to_string(),
            ]),
        }
        argv
    }
}

#[derive(Debug, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SignalMapEntry {
    pub from: String,
    pub to: String,
}

/// Fully merged startup settings.
#[derive(Debug)]
pub struct Settings {
    pub program: Vec<String>,
    pub mapping: SignalMapping,
    pub shutdown_signal: Option<Signal>,
    pub init_command: Option<Vec<String>>,
    /// `None` when the sidecar is disabled by flag or config. Directory
    /// preconditions are checked later.
    pub sidecar: Option<SidecarConfig>,
}

/// Load a config file.
///
/// Relative sidecar paths are resolved against the config file's parent directory.
pub fn load(path: &Path) -> InitResult<FileConfig> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| InitError::Config(format!("read {}: {e}", path.display())))?;
    let mut config: FileConfig = serde_yaml_ng::from_str(&content)
        .map_err(|e| InitError::Config(format!("parse {}: {e}", path.display())))?;
    if let Some(config_dir) = path.parent() {
        config.resolve_relative_paths(config_dir);
    }
    Ok(config)
}

impl FileConfig {
    fn resolve_relative_paths(&mut self, config_dir: &Path) {
        let resolve = |p: &mut PathBuf| {
            if p.is_relative() {
                *p = config_dir.join(&*p);
            }
        };
        resolve(&mut self.sidecar.binary);
        resolve(&mut self.sidecar.config_dir);
        resolve(&mut self.sidecar.data_dir);
    }

    fn mapping(&self) -> InitResult<Vec<(Signal, Signal)>> {
        self.signal_map
            .iter()
            .enumerate()
            .map(|(i, entry)| {
                let from = parse_signal(&entry.from)
                    .map_err(|e| InitError::Config(format!("signal_map[{i}].from: {e}")))?;
                let to = parse_signal(&entry.to)
                    .map_err(|e| InitError::Config(format!("signal_map[{i}].to: {e}")))?;
                Ok((from, to))
            })
            .collect()
    }
}

/// Merge command-line flags over the config file.
///
/// Command-line mappings are placed first so they win on first match.
pub fn resolve(cli: Cli, file: FileConfig) -> InitResult<Settings> {
    let mut mapping: SignalMapping = cli.signal_map().into_iter().collect();
    mapping.extend(file.mapping()?);

    let shutdown_signal = match (cli.shutdown_signal, &file.shutdown_signal) {
        (Some(signal), _) => Some(signal),
        (None, Some(name)) => Some(
            parse_signal(name).map_err(|e| InitError::Config(format!("shutdown_signal: {e}")))?,
        ),
        (None, None) => None,
    };

    let init_command = cli.init_argv().or(file.init_command);
    if init_command.as_ref().is_some_and(Vec::is_empty) {
        return Err(InitError::Config("init_command must not be empty".into()));
    }

    let mut sidecar = file.sidecar;
    if let Some(binary) = cli.sidecar_binary {
        sidecar.binary = binary;
    }
    let sidecar = (sidecar.enabled && !cli.no_sidecar).then_some(sidecar);

    Ok(Settings {
        program: cli.program,
        mapping,
        shutdown_signal,
        init_command,
        sidecar,
    })
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::*;

    fn cli(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("container-init").chain(args.iter().copied())).unwrap()
    }

    fn write_config(dir: &Path, yaml: &str) -> PathBuf {
        let path = dir.join("init.yaml");
        std::fs::write(&path, yaml).unwrap();
        path
    }

    #[test]
    fn load_full_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(
            dir.path(),
            r#"
sidecar:
  enabled: true
  binary: /opt/agent/bin/agent
  config_dir: /etc/agent
  data_dir: /var/lib/agent
  args: [run, --quiet]
signal_map:
  - { from: TERM, to: QUIT }
  - { from: "2", to: SIGUSR1 }
shutdown_signal: USR2
init_command: [/bin/setup, --fast]
"#,
        );

        let config = load(&path).unwrap();
        assert_eq!(config.sidecar.binary, PathBuf::from("/opt/agent/bin/agent"));
        assert_eq!(
            config.sidecar.argv(),
            ["/opt/agent/bin/agent", "run", "--quiet"]
        );
        assert_eq!(
            config.mapping().unwrap(),
            vec![
                (Signal::SIGTERM, Signal::SIGQUIT),
                (Signal::SIGINT, Signal::SIGUSR1)
            ]
        );
        assert_eq!(config.shutdown_signal.as_deref(), Some("USR2"));
        assert_eq!(
            config.init_command,
            Some(vec!["/bin/setup".to_string(), "--fast".to_string()])
        );
    }

    #[test]
    fn empty_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(dir.path(), "{}\n");
        let config = load(&path).unwrap();
        assert_eq!(config, FileConfig::default());
        assert_eq!(
            config.sidecar.argv(),
            [
                DEFAULT_SIDECAR_BINARY,
                "agent",
                "-config-dir",
                DEFAULT_SIDECAR_CONFIG_DIR,
                "-data-dir",
                DEFAULT_SIDECAR_DATA_DIR
            ]
        );
    }

    #[test]
    fn load_resolves_relative_sidecar_paths() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(
            dir.path(),
            r#"
sidecar:
  binary: bin/agent
  config_dir: conf
  data_dir: /abs/data
"#,
        );
        let config = load(&path).unwrap();
        assert_eq!(config.sidecar.binary, dir.path().join("bin/agent"));
        assert_eq!(config.sidecar.config_dir, dir.path().join("conf"));
        assert_eq!(config.sidecar.data_dir, PathBuf::from("/abs/data"));
    }

    #[test]
    fn load_rejects_unknown_fields() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(dir.path(), "sidecar:\n  bogus: 1\n");
        let err = load(&path).unwrap_err();
        assert!(err.to_string().contains("parse"), "got: {err}");
    }

    #[test]
    fn load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = load(&dir.path().join("absent.yaml")).unwrap_err();
        assert!(err.to_string().contains("read"), "got: {err}");
    }

    #[test]
    fn cli_mappings_take_precedence() {
        let file = FileConfig {
            signal_map: vec![
                SignalMapEntry {
                    from: "TERM".into(),
                    to: "INT".into(),
                },
                SignalMapEntry {
                    from: "HUP".into(),
                    to: "USR1".into(),
                },
            ],
            ..FileConfig::default()
        };
        let settings = resolve(cli(&["--map", "TERM", "QUIT", "app"]), file).unwrap();
        assert_eq!(settings.mapping.translate(Signal::SIGTERM), Signal::SIGQUIT);
        assert_eq!(settings.mapping.translate(Signal::SIGHUP), Signal::SIGUSR1);
        assert_eq!(settings.mapping.len(), 3);
        assert_eq!(settings.program, ["app"]);
    }

    #[test]
    fn invalid_file_signal_is_a_config_error() {
        let file = FileConfig {
            signal_map: vec![SignalMapEntry {
                from: "TERM".into(),
                to: "NOPE".into(),
            }],
            ..FileConfig::default()
        };
        let err = resolve(cli(&["app"]), file).unwrap_err();
        assert!(err.to_string().contains("signal_map[0].to"), "got: {err}");
    }

    #[test]
    fn cli_overrides_scalar_settings() {
        let file = FileConfig {
            shutdown_signal: Some("USR2".into()),
            init_command: Some(vec!["/bin/false".into()]),
            ..FileConfig::default()
        };
        let settings = resolve(
            cli(&[
                "--shutdown-signal",
                "HUP",
                "--init-command",
                "true",
                "--sidecar-binary",
                "/bin/agent",
                "app",
            ]),
            file,
        )
        .unwrap();
        assert_eq!(settings.shutdown_signal, Some(Signal::SIGHUP));
        assert_eq!(
            settings.init_command.unwrap(),
            ["/bin/sh", "-c", "true"]
        );
        assert_eq!(settings.sidecar.unwrap().binary, PathBuf::from("/bin/agent"));
    }

    #[test]
    fn file_settings_apply_without_flags() {
        let file = FileConfig {
            shutdown_signal: Some("SIGUSR2".into()),
            init_command: Some(vec!["/bin/setup".into()]),
            ..FileConfig::default()
        };
        let settings = resolve(cli(&["app"]), file).unwrap();
        assert_eq!(settings.shutdown_signal, Some(Signal::SIGUSR2));
        assert_eq!(settings.init_command.unwrap(), ["/bin/setup"]);
        assert!(settings.sidecar.is_some());
    }

    #[test]
    fn sidecar_can_be_disabled_by_flag_or_file() {
        let settings = resolve(cli(&["--no-sidecar", "app"]), FileConfig::default()).unwrap();
        assert!(settings.sidecar.is_none());

        let file = FileConfig {
            sidecar: SidecarConfig {
                enabled: false,
                ..SidecarConfig::default()
            },
            ..FileConfig::default()
        };
        let settings = resolve(cli(&["app"]), file).unwrap();
        assert!(settings.sidecar.is_none());
    }

    #[test]
    fn empty_init_command_is_rejected() {
        let file = FileConfig {
            init_command: Some(vec![]),
            ..FileConfig::default()
        };
        let err = resolve(cli(&["app"]), file).unwrap_err();
        assert!(err.to_string().contains("init_command"), "got: {err}");
    }
}
