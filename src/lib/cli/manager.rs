use std::sync::Arc;

use clap::Parser;

#[derive(Parser, Debug)]
#[command(version, about, author)]
struct Args {
    /// Sets the settings file path
    #[arg(long, value_name = "PATH")]
    settings_file: Option<String>,

    /// Deletes the settings file before starting
    #[arg(long)]
    reset: bool,

    /// Turns all log categories up to Debug, for more information check RUST_LOG env variable
    #[arg(short, long)]
    verbose: bool,

    /// Sets the log folder path
    #[arg(long, value_name = "PATH", default_value = "./logs")]
    log_path: String,

    /// Runs a single sampling pass, prints the snapshot as JSON and exits
    #[arg(long)]
    once: bool,

    /// Character device delivering the physical button events
    #[arg(long, value_name = "PATH", default_value = "/dev/input/event0")]
    button_device: String,

    /// Root of the power-supply sysfs tree
    #[arg(long, value_name = "PATH", default_value = "/sys/class/power_supply")]
    power_supply_root: String,

    /// Root of the backlight sysfs tree
    #[arg(long, value_name = "PATH", default_value = "/sys/class/backlight")]
    backlight_root: String,
}

#[derive(Debug)]
struct Manager {
    args: Args,
}

lazy_static! {
    static ref MANAGER: Arc<Manager> = Arc::new(Manager::new());
}

impl Manager {
    fn new() -> Self {
        Self {
            args: Args::parse(),
        }
    }
}

// Construct our manager, should be done inside main
pub fn init() {
    MANAGER.as_ref();
}

pub fn is_verbose() -> bool {
    MANAGER.args.verbose
}

pub fn is_reset() -> bool {
    MANAGER.args.reset
}

pub fn is_once() -> bool {
    MANAGER.args.once
}

pub fn settings_file() -> Option<&'static str> {
    MANAGER.args.settings_file.as_deref()
}

pub fn log_path() -> &'static str {
    &MANAGER.args.log_path
}

pub fn button_device() -> &'static str {
    &MANAGER.args.button_device
}

pub fn power_supply_root() -> &'static str {
    &MANAGER.args.power_supply_root
}

pub fn backlight_root() -> &'static str {
    &MANAGER.args.backlight_root
}

// Return the command line used to start this application
pub fn command_line_string() -> String {
    std::env::args().collect::<Vec<String>>().join(" ")
}
