use std::process::ExitCode;

use clap::Parser;

use socialgraph::cli::{execute, resolve_config, Cli};
use socialgraph::observability::init_logging;
use socialgraph::response::Response;

fn main() -> ExitCode {
    let cli = Cli::parse();

    let (response, pretty) = match resolve_config(&cli) {
        Ok(config) => {
            init_logging(&config.logging.filter);
            tracing::debug!("using database {}", config.database_path());
            (execute(&config, &cli.command), config.output.pretty)
        }
        Err(err) => {
            init_logging("socialgraph=info");
            (Response::failure(&err), cli.pretty)
        }
    };

    match response.to_json(pretty) {
        Ok(json) => println!("{json}"),
        Err(err) => {
            tracing::error!("could not serialize response: {err}");
            return ExitCode::FAILURE;
        }
    }

    if response.error {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}
