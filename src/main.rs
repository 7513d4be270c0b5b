pub mod audio;
pub mod model;
pub mod negotiate;
pub mod peer;
pub mod registry;
pub mod server;
pub mod signaling;

use std::env;

mod util;

fn main() {
    let args: Vec<String> = env::args().collect();

    if args.len() > 1 {
        match args[1].as_str() {
            "server" => {
                println!("Starting signaling relay...");
                if let Err(e) = server::main() {
                    println!("Server error:\n{}", e);
                }
            }
            "peer" => {
                println!("Starting WebRTC peer...");
                match peer::main() {
                    Ok(_) => println!("Peer completed successfully"),
                    Err(e) => println!("Peer error:\n{}", e),
                }
            }
            _ => {
                print_usage();
            }
        }
    } else {
        print_usage();
    }
}

fn print_usage() {
    println!("Relay RTC");
    println!("Usage:");
    println!("  cargo run server  - Start the signaling relay");
    println!("  cargo run peer    - Start a WebRTC peer");
}
