use human_panic::{metadata, setup_panic};
use log::error;
use powerplan::cli::run_cli;
use powerplan::log::is_logger_initialised;

fn main() {
    setup_panic!(metadata!().support(
        "Please report the problem to the powerplan maintainers, attaching the report above"
    ));

    if let Err(err) = run_cli() {
        if is_logger_initialised() {
            error!("{err:?}");
        } else {
            eprintln!("Error: {err:?}");
        }

        // Terminate program, signalling an error
        std::process::exit(1);
    }
}
