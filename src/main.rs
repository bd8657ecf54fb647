use std::process::ExitCode;

use clap::Parser;

use studio_canvas::cli::{self, CliArgs};
use studio_canvas::logger;
use studio_canvas::settings::EditorSettings;

fn main() -> ExitCode {
    let args = CliArgs::parse();
    let settings = EditorSettings::load();

    // Session log (overwrites previous session log)
    logger::init(&settings.log_level, args.verbose);

    cli::run(args, &settings)
}
