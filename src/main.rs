//! Binary entrypoint for the Flowtusk server.

use std::process::ExitCode;

use flowtusk::start_flowtusk;

fn main() -> ExitCode {
    start_flowtusk::run()
}
