use clap::Parser;
use edited::commands::Commands;

#[derive(Parser)]
#[command(version)]
#[command(term_width = 80)]
/// edited finds RNA editing sites in stranded pileup data
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

fn main() {
    let cli = Cli::parse();
    if let Err(err) = cli.command.run() {
        eprintln!("> Error! {err}");
        for cause in err.chain().skip(1) {
            eprintln!(" caused by {cause}")
        }
        std::process::exit(1);
    }
}
