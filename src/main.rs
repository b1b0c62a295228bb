//! Where the magic happens for `usbwatch` binary!
use clap::Parser;
use std::io::stdout;

use usbwatch::config::Config;
use usbwatch::display::{self, PrintSettings};
use usbwatch::error::Result;
use usbwatch::presence::{DeviceId, PresenceSource};

mod app;
mod live;

use app::Args;

/// Merge command line args over the loaded config
fn merge_config(config: &mut Config, args: &Args) {
    if let Some(i) = args.interval {
        config.interval = i;
    }
    if let Some(c) = args.command.as_ref() {
        config.command = c.to_owned();
    }
    if let Some(t) = args.command_timeout {
        config.command_timeout = t;
    }
    if let Some(p) = args.sysfs_path.as_ref() {
        config.sysfs_path = p.to_owned();
    }
    config.mask_serials |= args.mask_serials;
}

fn run(args: Args) -> Result<()> {
    usbwatch::set_log_level(args.debug)?;

    let mut config = match args.config.as_ref() {
        Some(p) => Config::from_file(p)?,
        None => Config::sys_config()?,
    };
    merge_config(&mut config, &args);
    log::debug!("Running with {:?}", config);

    if args.no_colour {
        colored::control::set_override(false);
    }

    if args.probe {
        let mut ids: Vec<DeviceId> = config.prober().probe().into_iter().collect();
        ids.sort();
        for id in ids {
            println!("{}", id);
        }
        return Ok(());
    }

    let print_settings = PrintSettings {
        colours: if args.no_colour {
            None
        } else {
            Some(config.colours.clone())
        },
        hide_details: args.hide_details,
        ..Default::default()
    };

    if args.json || args.once {
        let mut records = config.enumerator().parse_all();
        if config.mask_serials {
            display::mask_serials(&mut records);
        }
        if args.json {
            println!("{}", serde_json::to_string_pretty(&records)?);
        } else {
            display::print_menu(&mut stdout(), &display::menu_items(&records), &print_settings)?;
        }
        return Ok(());
    }

    live::watch_usb_devices(&config, print_settings)
}

fn main() {
    let args = Args::parse();

    if let Err(e) = run(args) {
        eprintln!("{}", e);
        std::process::exit(1);
    }
}
