pub mod cli;
pub mod codegen;
pub mod ctype;
pub mod emit;
pub mod error;
pub mod resolver;
pub mod settings;

use colored::Colorize;

fn main() {
    let command_line_interface = cli::CommandLineInterface::load();
    if let Err(error) = command_line_interface.run() {
        eprintln!("{} {error:#}", "error:".red().bold());
        std::process::exit(1);
    }
}
