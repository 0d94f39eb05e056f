use std::{env, io, process};

use log::LevelFilter;
use salut::service::ServiceConfig;
use salut::Mdns;

fn main() -> io::Result<()> {
    env_logger::Builder::new()
        .filter_module(env!("CARGO_PKG_NAME"), LevelFilter::Debug)
        .filter_module(env!("CARGO_CRATE_NAME"), LevelFilter::Debug)
        .init();

    let args = env::args().skip(1).collect::<Vec<_>>();
    let (service_type, port) = match &*args {
        [] => ("http".to_string(), 8080),
        [ty] => (ty.clone(), 8080),
        [ty, port] => match port.parse() {
            Ok(port) => (ty.clone(), port),
            Err(_) => {
                eprintln!("invalid port: {port}");
                process::exit(1);
            }
        },
        _ => {
            eprintln!("usage: advertise [servicetype] [port]");
            process::exit(1);
        }
    };

    let mut mdns = Mdns::new()?;
    let service = mdns.publish(ServiceConfig {
        name: "My Service Instance".into(),
        service_type,
        port,
        ..ServiceConfig::default()
    })?;
    println!("announced {}", service);

    // Answer queries until interrupted.
    loop {
        mdns.poll(&mut [], None)?;
    }
}
