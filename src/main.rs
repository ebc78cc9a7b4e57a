use std::env;

use datacron::cli::run_with_args;

fn main() {
    let args: Vec<String> = env::args().collect();
    std::process::exit(run_with_args(&args));
}
