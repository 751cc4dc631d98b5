use env_logger::Env;

/// Initialise `env_logger`. `RUST_LOG` wins over the level picked from the command line.
pub fn init(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(Env::default().default_filter_or(default_level))
        .format_target(false)
        .init();
}
