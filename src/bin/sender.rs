//! Entry point for the sending endpoint.
//!
//! Reads a byte stream from standard input and delivers it reliably to the
//! receiver at `<host> <port>`.  Exits 0 once every segment has been
//! acknowledged; any startup or I/O failure exits nonzero with a message on
//! stderr.  All protocol work is delegated to the library; this file owns
//! only process setup (logging, argument parsing, name resolution).

use std::io;
use std::net::SocketAddr;
use std::process::ExitCode;

use clap::Parser;

use rdt_over_udp::endpoint;
use rdt_over_udp::socket::Socket;

/// Reliable byte-stream sender over UDP.
#[derive(Parser)]
#[command(author, version, about)]
struct Cli {
    /// Receiver host (IPv4 address or name).
    host: String,

    /// Receiver port.
    #[arg(value_parser = clap::value_parser!(u16).range(1..))]
    port: u16,
}

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::init();
    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("sender: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let peer = resolve(&cli.host, cli.port).await?;
    let socket = Socket::bind(SocketAddr::from(([0, 0, 0, 0], 0))).await?;
    log::info!("bound {} — sending to {peer}", socket.local_addr);

    endpoint::run_sender(socket, peer, tokio::io::stdin()).await?;
    Ok(())
}

/// Resolve `<host> <port>` to the first matching socket address.
async fn resolve(host: &str, port: u16) -> io::Result<SocketAddr> {
    tokio::net::lookup_host((host, port))
        .await?
        .next()
        .ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::NotFound,
                format!("no address found for {host}"),
            )
        })
}
