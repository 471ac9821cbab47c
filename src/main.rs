use clap::Parser;
use kp2bw::{app, logging, AppErrorKind, Cli};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    logging::init_logging(cli.verbose, cli.log_json);

    match app::run(&cli).await {
        Ok(report) => {
            if report.has_failures() {
                tracing::warn!("Some entries were not migrated, see the log above");
            }
            println!("{}", report);
            println!("All done.");
        }
        Err(e) => {
            if e.kind == AppErrorKind::Cancelled {
                println!("{}", e);
            } else {
                tracing::error!("{}", e);
            }
            std::process::exit(e.exit_code());
        }
    }
}
