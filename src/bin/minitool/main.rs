//! minitool command line interface.

mod commands;
mod keyboard;

use std::{path::Path, process, time::Duration};

use clap::{
    crate_authors, crate_description, crate_version, value_t, App, AppSettings::*, Arg,
    ArgMatches, SubCommand,
};
use console::{style, Term};
use log::{debug, trace, LevelFilter};
use simplelog::*;

use minipad::{Endpoint, SettingsBuilder};

fn main() {
    ctrlc::set_handler(move || {
        let _ = Term::stdout().show_cursor();
        println!("🛑 received Ctrl+C!");
        process::exit(0);
    })
    .expect("Failed to install my Ctrl-C handler!");

    let matches = App::new("minitool")
        .version(format!("v{}", crate_version!()).as_str())
        .author(crate_authors!())
        .about(crate_description!())
        .long_about(
            "\n\
            minitool talks to minipad keypads over their USB serial port. \
            Keypads are addressed by the number of their serial port, e.g. \
            `3` for COM3 on Windows or /dev/ttyACM3 elsewhere. Use `devices` \
            to find out which numbers are in use.\n\
            \n\
            Every command opens the port only for as long as it needs it, so \
            other programs can talk to the keypad in between.\
        ",
        )
        .max_term_width(80)
        .setting(ColoredHelp)
        .setting(NextLineHelp)
        .setting(SubcommandRequiredElseHelp)
        .setting(VersionlessSubcommands)
        .arg(
            Arg::with_name("PORT_PREFIX")
                .help("serial port name prefix the port number is appended to")
                .long_help(
                    "serial port name prefix the port number is appended to; \
                     defaults to `COM` on Windows and `/dev/ttyACM` elsewhere.",
                )
                .long("--port-prefix")
                .takes_value(true)
                .require_equals(true),
        )
        .arg(
            Arg::with_name("BOOTLOADER_TIMEOUT")
                .help("seconds to wait for the bootloader volume, 0 waits forever")
                .long("--bootloader-timeout")
                .takes_value(true)
                .default_value("30")
                .require_equals(true),
        )
        .arg(Arg::with_name("v").short("v").multiple(true).help(
            "Sets the logging level of verbosity, repeat several times for \
                higher verbosity",
        ))
        .subcommand(
            SubCommand::with_name("devices")
                .about("Lists the minipads plugged into this machine")
                .arg(
                    Arg::with_name("ALL")
                        .help("also list unreachable minipads and probe errors")
                        .long_help(
                            "also list unreachable minipads and probe errors; only \
                             serial ports present right now are looked at, so an \
                             unplugged minipad is not listed at all.",
                        )
                        .short("-a")
                        .long("--all"),
                ),
        )
        .subcommand(
            SubCommand::with_name("info")
                .about("Prints the configuration of a minipad")
                .arg(port_arg()),
        )
        .subcommand(
            SubCommand::with_name("boot")
                .about("Reboots a minipad into its bootloader")
                .arg(port_arg()),
        )
        .subcommand(
            SubCommand::with_name("send")
                .about("Sends a raw command to a minipad")
                .arg(port_arg())
                .arg(
                    Arg::with_name("COMMAND")
                        .help("the command to send, e.g. `hkey1.rt 1`")
                        .required(true)
                        .multiple(true)
                        .index(2),
                ),
        )
        .subcommand(
            SubCommand::with_name("calibrate")
                .about("Measures and stores the rest and down positions of the hall effect keys")
                .arg(port_arg()),
        )
        .subcommand(
            SubCommand::with_name("visualize")
                .about("Shows the travel of the hall effect keys live")
                .arg(port_arg()),
        )
        .subcommand(
            SubCommand::with_name("flash")
                .about("Flashes a .uf2 firmware image onto a minipad")
                .arg(port_arg())
                .arg(
                    Arg::with_name("FIRMWARE")
                        .help("path to the .uf2 firmware image")
                        .required(true)
                        .index(2),
                ),
        )
        .subcommand(
            SubCommand::with_name("console")
                .about("Opens a raw command console on a minipad")
                .arg(port_arg()),
        )
        .get_matches();

    // Vary the output based on how many times the user used the "verbose" flag
    // (i.e. 'minitool -v -v -v' or 'minitool -vvv' vs 'minitool -v'
    let log_level = match matches.occurrences_of("v") {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };

    if let Err(e) = TermLogger::init(
        log_level,
        Config::default(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    ) {
        eprintln!("{}: {}", style("warning").yellow(), e);
    }

    trace!("{:#?}", matches);

    let bootloader_timeout = value_t!(matches.value_of("BOOTLOADER_TIMEOUT"), u64)
        .unwrap_or_else(|_| {
            invalid_value("bootloader-timeout", matches.value_of("BOOTLOADER_TIMEOUT"))
        });

    let mut builder = SettingsBuilder::new().bootloader_timeout(match bootloader_timeout {
        0 => None,
        seconds => Some(Duration::from_secs(seconds)),
    });
    if let Some(prefix) = matches.value_of("PORT_PREFIX") {
        builder = builder.port_prefix(prefix);
    }
    let settings = builder.finalize();

    let exit_code = match matches.subcommand() {
        ("devices", Some(sub)) => commands::devices(&settings, sub.is_present("ALL")),
        ("info", Some(sub)) => commands::info(&settings, endpoint(sub)),
        ("boot", Some(sub)) => commands::boot(&settings, endpoint(sub)),
        ("send", Some(sub)) => {
            let command = sub
                .values_of("COMMAND")
                .map(|words| words.collect::<Vec<_>>().join(" "))
                .unwrap_or_default();
            commands::send(&settings, endpoint(sub), &command)
        }
        ("calibrate", Some(sub)) => commands::calibrate(&settings, endpoint(sub)),
        ("visualize", Some(sub)) => commands::visualize(&settings, endpoint(sub)),
        ("flash", Some(sub)) => commands::flash(
            &settings,
            endpoint(sub),
            Path::new(sub.value_of("FIRMWARE").unwrap_or_default()),
        ),
        ("console", Some(sub)) => commands::console(&settings, endpoint(sub)),
        _ => unreachable!(),
    };

    debug!("exit code: {}", exit_code);
    process::exit(exit_code);
}

fn port_arg() -> Arg<'static, 'static> {
    Arg::with_name("PORT")
        .help("the port number of the minipad")
        .required(true)
        .index(1)
}

fn endpoint(matches: &ArgMatches) -> Endpoint {
    let number = value_t!(matches.value_of("PORT"), u32)
        .unwrap_or_else(|_| invalid_value("PORT", matches.value_of("PORT")));
    Endpoint(number)
}

fn invalid_value(name: &str, value: Option<&str>) -> ! {
    println!(
        "{}: `{}` needs to be a numeric value",
        style("error").red(),
        style(name).cyan()
    );
    println!(
        "   {} `{}` is not a valid value",
        style("-->").cyan(),
        style(value.unwrap_or_default()).on_red()
    );
    process::exit(-1);
}
