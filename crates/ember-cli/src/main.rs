//! Entry point for the `ember` binary. Prepares the environment (panic
//! reports) and delegates everything else to `ember_cli::run()`.

fn main() {
    if let Err(err) = color_eyre::install() {
        eprintln!("warning: could not install color-eyre: {err}");
    }

    match ember_cli::run() {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("error: {err}");
            std::process::exit(1);
        }
    }
}
