use clap::Parser;
use grayzip::{Cli, GrayZip, GrayZipError, OutputFormatter, OutputMode, UserFriendlyError};
use std::process;

#[tokio::main]
async fn main() {
    let exit_code = run().await;
    process::exit(exit_code);
}

async fn run() -> i32 {
    let cli = Cli::parse();

    setup_logging(cli.verbosity_level(), cli.quiet);

    // Handle special commands first
    if cli.generate_config {
        return handle_generate_config(&cli);
    }

    let grayzip = match GrayZip::from_cli(&cli) {
        Ok(grayzip) => grayzip,
        Err(e) => {
            print_startup_error(&e);
            return e.exit_code();
        }
    };

    if cli.dry_run {
        return handle_dry_run(&grayzip);
    }

    match grayzip.run().await {
        Ok(report) => {
            grayzip.output_formatter().print_pipeline_report(&report);
            0
        }
        Err(e) => {
            grayzip.handle_error(&e);
            e.exit_code()
        }
    }
}

fn handle_generate_config(cli: &Cli) -> i32 {
    let config_path = cli
        .config
        .as_ref()
        .map(|p| p.to_string_lossy().to_string())
        .unwrap_or_else(|| "grayzip.toml".to_string());

    match GrayZip::generate_sample_config(&config_path) {
        Ok(()) => {
            println!("Generated sample configuration file: {}", config_path);
            println!("\nTo use this configuration:");
            println!("  grayzip --config {}", config_path);
            0
        }
        Err(e) => {
            eprintln!("Failed to generate configuration file: {}", e.user_message());
            if let Some(suggestion) = e.suggestion() {
                eprintln!("Suggestion: {}", suggestion);
            }
            e.exit_code()
        }
    }
}

fn handle_dry_run(grayzip: &GrayZip) -> i32 {
    let formatter = grayzip.output_formatter();
    let config = grayzip.config();

    formatter.warning("DRY RUN MODE - nothing will be extracted or written");
    formatter.print_separator();

    if config.archive.path.is_file() {
        formatter.success(&format!("Archive found: {}", config.archive.path.display()));
    } else {
        formatter.warning(&format!("Archive not found: {}", config.archive.path.display()));
    }

    println!("  Extract into:   {}", config.archive.extract_dir.display());
    println!("  Extension:      .{}", config.scan.extension);
    println!("  Write into:     {}", config.convert.output_dir.display());
    println!("  Mode:           {}", config.convert.mode);
    println!("  Jobs:           {}", config.convert.jobs);
    println!("  On collision:   {}", config.convert.on_collision);

    formatter.print_separator();
    0
}

fn print_startup_error(error: &GrayZipError) {
    let formatter = OutputFormatter::new(OutputMode::Human, 0, false);
    formatter.print_user_friendly_error(error);
}

fn setup_logging(verbosity: u8, quiet: bool) {
    let default_filter = match (quiet, verbosity) {
        (true, _) => "grayzip=error",
        (false, 0) => "grayzip=warn",
        (false, 1) => "grayzip=info",
        _ => "grayzip=debug",
    };

    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .format_timestamp(None)
        .try_init();
}
