//! xwin - Main entry point
//!
//! Connects to an X server, performs the connection setup and reports the
//! parameters the server handed out.

use std::env;
use std::process;

use xwin::{ByteOrder, Client};

/// Version
const VERSION: &str = env!("CARGO_PKG_VERSION");

fn print_usage() {
    println!("xwin v{}", VERSION);
    println!("X11 connection setup client");
    println!();
    println!("Usage: xwin [OPTIONS]");
    println!();
    println!("Options:");
    println!("  -display <name>       Display to connect to (default: $DISPLAY, then :0)");
    println!("  -lsb                  Announce LSB-first byte order (default)");
    println!("  -msb                  Announce MSB-first byte order");
    println!("  -h, --help            Show this help message");
    println!();
    println!("Examples:");
    println!("  xwin -display :0");
    println!("  xwin -display localhost:1 -msb");
    println!();
}

#[derive(Debug)]
struct Config {
    display: String,
    byte_order: ByteOrder,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            display: env::var("DISPLAY").unwrap_or_else(|_| ":0".to_string()),
            byte_order: ByteOrder::default(),
        }
    }
}

fn parse_args() -> Result<Config, String> {
    let mut config = Config::default();
    let args: Vec<String> = env::args().collect();
    let mut i = 1;

    while i < args.len() {
        match args[i].as_str() {
            "-h" | "--help" => {
                print_usage();
                process::exit(0);
            }
            "-display" => {
                i += 1;
                if i >= args.len() {
                    return Err("Missing value for -display".to_string());
                }
                config.display = args[i].clone();
            }
            "-lsb" => {
                config.byte_order = ByteOrder::LSBFirst;
            }
            "-msb" => {
                config.byte_order = ByteOrder::MSBFirst;
            }
            arg => {
                return Err(format!("Unknown option: {}", arg));
            }
        }
        i += 1;
    }

    Ok(config)
}

fn main() {
    // Initialize logger
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = match parse_args() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("Error: {}", err);
            eprintln!();
            print_usage();
            process::exit(1);
        }
    };

    log::info!("xwin v{}", VERSION);
    log::info!("Display: {}", config.display);
    log::info!("Byte order: {}", config.byte_order);

    let client = match Client::connect(&config.display, config.byte_order) {
        Ok(client) => client,
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    };

    let setup = client.setup();
    println!("vendor: {}", setup.vendor);
    println!("release: {}", setup.release_number);
    println!("resource id base: 0x{:x}", setup.resource_id_base);
    println!("resource id mask: 0x{:x}", setup.resource_id_mask);
    println!("screens: {}", setup.number_of_screens);
    println!("pixmap formats: {}", setup.pixmap_formats.len());
    println!("root window: {}", client.root_window().id());
    println!("root visual: {}", client.root_visual());
    println!(
        "screen size: {}x{}",
        setup.screen.width_in_pixels, setup.screen.height_in_pixels
    );
}
