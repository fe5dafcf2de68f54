// This example demonstrates a raw DNS query, bypassing the local-lookup
// backends entirely via an explicit single-entry chain.
use netresolve::{Context, Request};

const DNS_CLASS_IN: u16 = 1;
const DNS_TYPE_TXT: u16 = 16;

fn main() {
    env_logger::init();

    let mut context = Context::new()
        .expect("failed to create context")
        .with_backend_chain("+dns");
    let response = context
        .resolve(Request::dns("example.com", DNS_CLASS_IN, DNS_TYPE_TXT))
        .expect("query failed");

    match response.dns_answer() {
        Some(answer) => println!("got a {}-byte wire answer", answer.len()),
        None => println!("no answer"),
    }
}
