//! XStudio command line.

use clap::Parser;

mod cli;
mod commands;
mod logging;

use crate::cli::{CatalogCommand, Cli, Command, ProjectCommand, VfsCommand};
use crate::logging::{init_logging, level_from_flags};

fn main() {
    let cli = Cli::parse();
    init_logging(level_from_flags(cli.verbose, cli.quiet));

    let exit_code = match run(&cli) {
        Ok(()) => 0,
        Err(error) => {
            eprintln!("error: {error:#}");
            1
        }
    };
    std::process::exit(exit_code);
}

fn run(cli: &Cli) -> anyhow::Result<()> {
    let mut config = commands::load_config(cli.config.as_deref())?;

    match &cli.command {
        Command::Project(ProjectCommand::Show { project }) => commands::run_project_show(&config, project),
        Command::Project(ProjectCommand::Import { legacy, output }) => {
            commands::run_project_import(&config, legacy, output)
        }
        Command::Project(ProjectCommand::Add { project, files }) => {
            commands::run_project_add(&config, project, files)?;
            commands::remember_project(cli.config.as_deref(), &mut config, project);
            Ok(())
        }
        Command::History(args) => commands::run_history(&config, &args.project, &args.file, args.show),
        Command::Commit(args) => {
            commands::run_commit(&config, &args.project, &args.file, &args.title)?;
            commands::remember_project(cli.config.as_deref(), &mut config, &args.project);
            Ok(())
        }
        Command::Catalog(CatalogCommand::List { catalog }) => commands::run_catalog_list(catalog),
        Command::Vfs(VfsCommand::Load { game }) => commands::run_vfs_load(&config, game),
        Command::Vfs(VfsCommand::Cat { path, game }) => commands::run_vfs_cat(&config, path, game),
    }
}
