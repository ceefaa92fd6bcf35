use quickbot::uci::Session;

fn main() {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let mut session = Session::new();

    if args.is_empty() {
        session.run();
    } else {
        // Command-line arguments are a one-shot command.
        session.run_once(&args.join(" "));
    }
}
