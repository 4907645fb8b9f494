use flowline::executor::Executor;
use flowline::flow;
use std::env;
use std::fs;
use std::process;

fn main() {
    env_logger::init();

    // Parse command line arguments
    let args: Vec<String> = env::args().collect();
    if args.len() != 3 {
        let program = args.first().map(String::as_str).unwrap_or("flowline");
        eprintln!("Usage: {} <flow-file> <action>", program);
        process::exit(2);
    }
    let flow_path = &args[1];
    let action = &args[2];

    let text = match fs::read_to_string(flow_path) {
        Ok(text) => text,
        Err(e) => {
            eprintln!("flowline: failed to read '{}': {}", flow_path, e);
            process::exit(1);
        }
    };

    let store = match flow::load(&text) {
        Ok(store) => store,
        Err(e) => {
            eprintln!("flowline: {}", e);
            process::exit(1);
        }
    };

    let executor = Executor::new(&store);
    match executor.run(action) {
        Ok(code) => process::exit(code),
        Err(e) => {
            eprintln!("flowline: {}", e);
            process::exit(1);
        }
    }
}
