use std::process::ExitCode;

fn main() -> ExitCode {
    match aihub::cli::main() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("❌ Error: {err}");
            ExitCode::FAILURE
        }
    }
}
