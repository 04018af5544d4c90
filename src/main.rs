mod cli;
mod db;
mod error;
mod fmt;
mod importer;
mod models;
mod notify;
mod parser;
mod rules;
mod settings;
mod store;
mod uploads;
mod validator;

use clap::Parser;

use cli::{Cli, Commands, PushCommands};
use models::EntryInput;

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Init { data_dir } => cli::init::run(data_dir),
        Commands::Import {
            path,
            owner,
            notify,
            json,
        } => cli::import::run(&path, &owner, notify, json),
        Commands::Add {
            owner,
            data,
            valor,
            forma_pag,
            origem,
            descricao,
        } => cli::entries::add(
            &owner,
            &EntryInput {
                data,
                valor,
                forma_pag,
                origem,
                descricao,
            },
        ),
        Commands::List {
            owner,
            inicio,
            fim,
            formas,
            origens,
        } => cli::entries::list(
            &owner,
            inicio.as_deref(),
            fim.as_deref(),
            formas.as_deref(),
            origens.as_deref(),
        ),
        Commands::Push { command } => match command {
            PushCommands::Register { owner, body } => cli::push::register(&owner, &body),
            PushCommands::RuleAdd {
                owner,
                subscription,
                tipo,
                operador,
                valor,
            } => cli::push::rule_add(&owner, subscription, &tipo, operador.as_deref(), &valor),
            PushCommands::Rules { owner, subscription } => cli::push::rules(&owner, subscription),
            PushCommands::Send { owner, entry } => cli::push::send(&owner, entry),
        },
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
