//! CLI argument parsing using clap
//!
//! The flag set mirrors the classic single-letter interface of disk exercise
//! tools: access mode (-R/-S/-W), multiplexing (-M/-A), I/O shape
//! (-b/-s/-e/-c), OS-dependent open flags (-d/-p) and general options
//! (-v/-V), followed by one or more device or file paths.

use clap::{ArgAction, Parser};
use std::path::PathBuf;

/// ioprobe - I/O device and file measurement tool
///
/// clap's built-in version flag already answers to -V, matching the
/// original interface; it prints the version and exits 0.
#[derive(Parser, Debug)]
#[command(name = "ioprobe")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Random access
    #[arg(short = 'R')]
    pub random: bool,

    /// Sequential access
    #[arg(short = 'S')]
    pub sequential: bool,

    /// Write operations; unless set, read operations
    #[arg(short = 'W')]
    pub write: bool,

    /// Multiplex degree (number of I/O threads)
    #[arg(short = 'M', value_name = "N", default_value_t = 1)]
    pub threads: usize,

    /// Per-thread async concurrency; 0 selects blocking I/O
    #[arg(short = 'A', value_name = "N", default_value_t = 0)]
    pub concurrency: usize,

    /// Access block size in bytes
    #[arg(short = 'b', value_name = "N", default_value_t = 65536)]
    pub block_size: usize,

    /// Block offset to start with
    #[arg(short = 's', value_name = "N", default_value_t = 0)]
    pub start: u64,

    /// Block offset to end with; unless set, the size of the device or file
    #[arg(short = 'e', value_name = "N", default_value_t = 0)]
    pub end: u64,

    /// Number of I/O operations per thread; sequential mode defaults to the
    /// full access range
    #[arg(short = 'c', value_name = "N", default_value_t = 0)]
    pub count: u64,

    /// Direct mode (O_DIRECT), bypassing the page cache
    #[arg(short = 'd')]
    pub direct: bool,

    /// Synchronous mode (O_SYNC), physically persisting data
    #[arg(short = 'p')]
    pub sync: bool,

    /// Verbose output (repeat for more detail)
    #[arg(short = 'v', action = ArgAction::Count)]
    pub verbose: u8,

    /// Devices or files to exercise
    #[arg(value_name = "DEVICE", required = true)]
    pub devices: Vec<PathBuf>,
}

impl Cli {
    /// Parse command-line arguments.
    ///
    /// Usage errors terminate the process with status 1 (clap's default is
    /// 2); `-V` and `--help` keep clap's status 0.
    pub fn parse_args() -> Self {
        match Self::try_parse() {
            Ok(cli) => cli,
            Err(err) => {
                if err.use_stderr() {
                    eprint!("{}", err);
                    std::process::exit(1);
                }
                // --help and -V print to stdout and exit successfully
                err.exit()
            }
        }
    }
}
