use std::path::PathBuf;

use clap::{ArgAction, Parser};
use supervisor::{Signal, parse_signal};

#[derive(Parser, Debug)]
#[command(
    name = "container-init",
    version,
    about = "Run a program (and an optional sidecar agent) as PID 1 with signal remapping",
    after_help = "Example: container-init --map TERM QUIT -- /usr/sbin/nginx -g 'daemon off;'"
)]
pub struct Cli {
    /// Remap signal FROM to TO before relaying it to the program (repeatable)
    #[arg(
        long,
        short,
        num_args = 2,
        value_names = ["FROM", "TO"],
        value_parser = parse_signal,
        action = ArgAction::Append
    )]
    pub map: Vec<Signal>,

    /// Do not start the sidecar agent
    #[arg(long, alias = "no-consul")]
    pub no_sidecar: bool,

    /// Additional signal that starts a graceful shutdown (TERM and INT always do)
    #[arg(long, value_name = "SIGNAL", value_parser = parse_signal)]
    pub shutdown_signal: Option<Signal>,

    /// Shell command run to completion before anything else is started
    #[arg(long, value_name = "CMD")]
    pub init_command: Option<String>,

    /// Path to a YAML config file
    #[arg(long, short, env = "CONTAINER_INIT_CONFIG")]
    pub config: Option<PathBuf>,

    /// Sidecar executable (overrides config)
    #[arg(long, env = "CONTAINER_INIT_SIDECAR_BINARY")]
    pub sidecar_binary: Option<PathBuf>,

    /// Program to run, followed by its arguments
    #[arg(
        required = true,
        num_args = 1..,
        trailing_var_arg = true,
        allow_hyphen_values = true,
        value_name = "PROGRAM"
    )]
    pub program: Vec<String>,
}

impl Cli {
    /// `--map` values as `(from, to)` pairs in command-line order.
    pub fn signal_map(&self) -> Vec<(Signal, Signal)> {
        self.map
            .chunks_exact(2)
            .filter_map(|pair| match pair {
                [from, to] => Some((*from, *to)),
                _ => None,
            })
            .collect()
    }

    /// The init command as an argument vector.
    pub fn init_argv(&self) -> Option<Vec<String>> {
        self.init_command
            .as_ref()
            .map(|cmd| vec!["/bin/sh".to_string(), "-c".to_string(), cmd.clone()])
    }
}
