//! Connects through a SOCKS4 or SOCKS5 proxy and prints the bound endpoint.
//!
//! ```text
//! connect <socks4|socks5> <proxy-host>:<proxy-port> <target-host>:<target-port>
//! ```

use std::env;
use std::process::ExitCode;

use tokio::net::TcpStream;

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt::init();

    let args: Vec<String> = env::args().collect();
    let [_, version, proxy_addr, target] = args.as_slice() else {
        eprintln!("usage: connect <socks4|socks5> <proxy-host>:<proxy-port> <target-host>:<target-port>");
        return ExitCode::FAILURE;
    };

    let Some((target_host, target_port)) = target.rsplit_once(':') else {
        eprintln!("target must be host:port");
        return ExitCode::FAILURE;
    };
    let Ok(target_port) = target_port.parse::<u16>() else {
        eprintln!("target port must be numeric");
        return ExitCode::FAILURE;
    };

    let mut stream = match TcpStream::connect(proxy_addr.as_str()).await {
        Ok(stream) => stream,
        Err(err) => {
            eprintln!("failed to reach proxy {proxy_addr}: {err}");
            return ExitCode::FAILURE;
        }
    };

    let token = tokio_util::sync::CancellationToken::new();
    let result = match version.as_str() {
        "socks4" => {
            socks_connect::socks4::connect_host_async(
                &mut stream,
                target_host,
                target_port,
                socks_connect::Socks4Auth::anonymous(),
                &token,
            )
            .await
        }
        "socks5" => {
            socks_connect::socks5::connect_host_async(
                &mut stream,
                target_host,
                target_port,
                socks_connect::NoAuth,
                &token,
            )
            .await
        }
        other => {
            eprintln!("unknown proxy version {other:?}, expected socks4 or socks5");
            return ExitCode::FAILURE;
        }
    };

    match result {
        Ok(bound) => {
            println!("connected, proxy reports bound endpoint {bound}");
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("connect failed ({}): {err}", err.condition());
            ExitCode::FAILURE
        }
    }
}
