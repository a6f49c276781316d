use qaharness::signals;
use qaharness::status::ExitStatus;

fn main() -> ExitStatus {
    let stop = signals::install_handler();
    let args: Vec<String> = std::env::args().collect();

    let status = qaharness::cli::run(args, stop);

    if signals::was_interrupted() {
        return ExitStatus::Interrupted;
    }
    status
}
