use clap::Parser;
use handoff_cli::{
	cli::Cli,
	commands,
	error::CliError,
	logging,
	output::{self, HandoffView, OutputFormat, ResultBuilder},
};

#[tokio::main]
async fn main() {
	let cli = Cli::parse();
	logging::init_logging(cli.verbose);

	let format = cli.format;
	let builder = ResultBuilder::<HandoffView>::new(cli.command.name());

	match commands::dispatch(&cli).await {
		Ok(outcome) => {
			let mut builder = builder.data(outcome.view);
			if let Some(ref error) = outcome.error {
				builder = builder.error(error.code, &error.message);
			}
			output::print_result(&builder.build(), format);

			if let Some(error) = outcome.error {
				output::print_error_stderr(&error);
				std::process::exit(1);
			}
		}
		Err(err) => {
			handle_error(err, builder, format);
			std::process::exit(1);
		}
	}
}

fn handle_error(err: CliError, builder: ResultBuilder<HandoffView>, format: OutputFormat) {
	let cmd_error = err.to_command_error();

	// Always print to stderr for humans
	output::print_error_stderr(&cmd_error);

	// Also emit the JSON envelope to stdout with ok=false
	if format == OutputFormat::Json {
		let result = builder.error(cmd_error.code, &cmd_error.message).build();
		output::print_result(&result, format);
	}
}
