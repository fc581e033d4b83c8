use clap::Parser;
use log::{debug, error, info};

mod args;
mod plot;

fn main() {
    let args = args::Args::parse();

    let mut builder = env_logger::Builder::from_default_env();
    if args.verbose {
        builder.filter_level(log::LevelFilter::Debug);
    }
    builder.init();
    debug!("args: {:?}", args);

    match plot::run_report(&args) {
        Ok(_) => {
            info!("Done");
        }
        Err(e) => {
            error!("Error: {}", e);
            eprintln!("An error occured {}", e);
            std::process::exit(1);
        }
    }
}
