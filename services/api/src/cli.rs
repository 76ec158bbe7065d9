use crate::demo::{run_demo, DemoArgs};
use crate::server;
use clap::{Args, Parser, Subcommand};
use union_registry::error::AppError;

#[derive(Parser, Debug)]
#[command(
    name = "Union Registry",
    about = "Run the trade-union membership registry or walk through its workflows",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service (default command)
    Serve(ServeArgs),
    /// Run an end-to-end demo: hierarchy, application, document package and a protocol
    Demo(DemoArgs),
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Demo(args) => run_demo(args),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn serve_is_the_default_command() {
        let cli = Cli::try_parse_from(["union-registry-api"]).expect("parses");
        assert!(cli.command.is_none());

        let cli = Cli::try_parse_from(["union-registry-api", "serve", "--port", "9090"])
            .expect("parses");
        assert!(matches!(
            cli.command,
            Some(Command::Serve(ServeArgs { port: Some(9090), host: None }))
        ));
    }

    #[test]
    fn demo_accepts_an_output_directory() {
        let cli = Cli::try_parse_from(["union-registry-api", "demo", "--output-dir", "out"])
            .expect("parses");
        match cli.command {
            Some(Command::Demo(args)) => assert_eq!(args.output_dir, Some(PathBuf::from("out"))),
            other => panic!("unexpected command: {other:?}"),
        }
    }
}
