//! Entry point for the receiving endpoint.
//!
//! Binds an ephemeral UDP port, announces it on stderr, and writes the
//! reassembled byte stream to standard output.  The receiver has no natural
//! end: its parent terminates it once the sender reports completion.

use std::net::SocketAddr;
use std::process::ExitCode;

use rdt_over_udp::endpoint;
use rdt_over_udp::socket::Socket;

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::init();

    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("receiver: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let socket = Socket::bind(SocketAddr::from(([0, 0, 0, 0], 0))).await?;

    // The parent process parses this exact line to learn the port.
    eprintln!("Bound to port {}", socket.local_addr.port());

    endpoint::run_receiver(socket, tokio::io::stdout()).await?;
    Ok(())
}
