// This example demonstrates a blocking reverse (address-to-name) lookup.
use std::net::IpAddr;
use std::str::FromStr;

use netresolve::{Context, Request};

fn main() {
    env_logger::init();

    let address = IpAddr::from_str("93.184.216.34").expect("bad address literal");
    let mut context = Context::new().expect("failed to create context");
    let response = context.resolve(Request::reverse(address, 0, 0)).expect("query failed");

    match response.canonical_name() {
        Some(name) => println!("{address} -> {name}"),
        None => println!("{address} has no PTR record"),
    }
}
