use homefin::cli::run_cli;

fn main() {
    if let Err(err) = run_cli() {
        homefin::init();
        tracing::error!(error = %err, "homefin_cli exited with an error");
        eprintln!("Error: {err}");
        std::process::exit(1);
    }
}
