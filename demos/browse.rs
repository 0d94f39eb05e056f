use std::{env, io, time::Duration};

use log::LevelFilter;
use salut::browser::{BrowseConfig, ServiceEvent};
use salut::Mdns;

fn main() -> io::Result<()> {
    env_logger::Builder::new()
        .filter_module(env!("CARGO_PKG_NAME"), LevelFilter::Debug)
        .filter_module(env!("CARGO_CRATE_NAME"), LevelFilter::Debug)
        .init();

    // With no argument, enumerate every service type on the link.
    let config = match env::args().nth(1) {
        Some(service_type) => BrowseConfig::service(service_type),
        None => BrowseConfig::wildcard(),
    };

    let mut mdns = Mdns::new()?;
    let mut browser = mdns.browse(config)?;

    loop {
        mdns.poll(&mut [&mut browser], Some(Duration::from_secs(5)))?;
        while let Some(event) = browser.poll_event() {
            match event {
                ServiceEvent::Up(service) => {
                    print!("up: {} -> {}:{}", service.fqdn(), service.host(), service.port());
                    for addr in service.addrs() {
                        print!(" {addr}");
                    }
                    println!();
                }
                ServiceEvent::Down(service) => println!("down: {}", service.fqdn()),
            }
        }
    }
}
