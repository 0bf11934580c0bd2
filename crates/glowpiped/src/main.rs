use std::process::ExitCode;

fn main() -> ExitCode {
    match glowpiped::run_daemon() {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            eprintln!("glowpiped: {error}");
            ExitCode::FAILURE
        }
    }
}
