use std::process::ExitCode;

mod app;

fn main() -> ExitCode {
    let config = app::bootstrap::build_app();
    app::loop_runner::run(config)
}
