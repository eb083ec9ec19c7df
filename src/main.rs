// SerTerm - Line-oriented serial and TCP terminal
use clap::Parser;
use serterm::cli::{execute_command, Args, ConsoleWriter};

#[tokio::main]
async fn main() {
    let args = Args::parse();
    let writer = ConsoleWriter::new(args.output);

    let code = match execute_command(args).await {
        Ok(()) => 0,
        Err(e) => {
            if let Err(output_error) = writer.write_error(&e.to_string()) {
                eprintln!("Error: {} ({})", e, output_error);
            }
            e.exit_code()
        }
    };

    // The runtime would otherwise wait for the blocking stdin reader
    std::process::exit(code);
}
