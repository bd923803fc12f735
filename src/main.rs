use std::process::ExitCode;

fn main() -> ExitCode {
    jarlink_lib::run()
}
