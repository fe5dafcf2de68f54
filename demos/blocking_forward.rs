// This example demonstrates a blocking forward lookup.
use netresolve::Context;
use netresolve::Request;

fn main() {
    env_logger::init();

    let mut context = Context::new().expect("failed to create context");
    let response = context
        .resolve(Request::forward(Some("example.com"), Some("80")))
        .expect("query failed");

    for path in response.paths() {
        println!("{}%{} port {}", path.address, path.ifindex, path.port);
    }
}
