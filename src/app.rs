use clap::Parser;
use std::path::PathBuf;

/// Live summary of attached USB devices, redrawn when devices are plugged or unplugged
#[derive(Parser, Debug, Default)]
#[command(author, version, about, long_about = None, max_term_width = 80)]
pub struct Args {
    /// Print the device menu once and exit rather than watching
    #[arg(short, long, default_value_t = false)]
    pub once: bool,

    /// Print parsed device records as JSON and exit
    #[arg(long, default_value_t = false)]
    pub json: bool,

    /// Print the attached device identifiers from sysfs and exit
    #[arg(long, default_value_t = false)]
    pub probe: bool,

    /// Seconds between checks for device changes
    #[arg(short, long)]
    pub interval: Option<u64>,

    /// Command printing `usb-devices` format output
    #[arg(long)]
    pub command: Option<String>,

    /// Seconds the command may run before it is killed
    #[arg(long)]
    pub command_timeout: Option<u64>,

    /// Directory listing attached devices
    #[arg(long)]
    pub sysfs_path: Option<PathBuf>,

    /// Mask serial numbers with random characters
    #[arg(long, default_value_t = false)]
    pub mask_serials: bool,

    /// Only show device labels
    #[arg(long, default_value_t = false)]
    pub hide_details: bool,

    /// Disable coloured output, can also use NO_COLOR environment variable
    #[arg(long, default_value_t = false)]
    pub no_colour: bool,

    /// Path to user config file to use rather than the system one
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Turn debugging information on. Alternatively can use RUST_LOG env: INFO, DEBUG, TRACE
    #[arg(short = 'z', long, action = clap::ArgAction::Count)]
    pub debug: u8,
}
