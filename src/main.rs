use log::LevelFilter;

fn main() {
    let args: Vec<String> = std::env::args().skip(1).collect();

    // The logger has to exist before the option walk can complain about bad
    // arguments, so the debug flag is picked out of argv up front.
    let debug = args.iter().any(|a| a == "-D" || a == "--debug");
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("error"));
    if debug {
        builder.filter_level(LevelFilter::Debug);
    }
    builder.format_timestamp(None).format_target(false).init();

    std::process::exit(qperf::run(&args));
}
