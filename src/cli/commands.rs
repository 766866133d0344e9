//! Command dispatch: clap arguments to service calls and terminal output

use std::path::Path;

use clap::CommandFactory;
use clap_complete::generate;
use tracing::{debug, instrument};

use crate::application::commands::Command;
use crate::application::parser::Params;
use crate::application::services::{CorefileService, Revision, UpdateOutcome, UNCHANGED};
use crate::cli::args::{Cli, Commands, ConfigCommands};
use crate::cli::output;
use crate::cli::{CliError, CliResult};
use crate::config::{global_config_path, Settings};
use crate::domain::Record;
use crate::infrastructure::di::ServiceContainer;
use crate::infrastructure::traits::{FileSystem, RealFileSystem};
use crate::infrastructure::InfraError;

/// Local config file created by `config init` without `--global`.
const LOCAL_CONFIG_FILE: &str = "corefile.toml";

pub fn execute_command(cli: &Cli) -> CliResult<()> {
    let Some(command) = &cli.command else {
        return Err(CliError::Usage(
            "no command given, see `corefile --help`".to_string(),
        ));
    };

    match command {
        Commands::Completion { shell } => {
            let mut cmd = Cli::command();
            let name = cmd.get_name().to_string();
            generate(*shell, &mut cmd, name, &mut std::io::stdout());
            Ok(())
        }
        Commands::Config { command } => execute_config(cli.config.as_deref(), command),
        other => {
            let settings = Settings::load(cli.config.as_deref())?;
            debug!(?settings, "loaded settings");
            let container = ServiceContainer::new(settings);
            execute_with(&container.corefile_service(), other)
        }
    }
}

/// Run an operator command against `service`.
#[instrument(level = "debug", skip(service))]
pub fn execute_with(service: &CorefileService, command: &Commands) -> CliResult<()> {
    match command {
        Commands::Start => {
            for status in service.start()? {
                output::status(&status);
            }
            Ok(())
        }
        Commands::AddZone {
            name,
            port,
            no_replace,
        } => {
            let mut params = Params::from([("name", name.as_str())]);
            if let Some(port) = port {
                params.insert("port", *port);
            }
            params.insert("replace", !no_replace);
            apply(service, Command::AddZone, params)
        }
        Commands::RemoveZone { name } => apply(
            service,
            Command::RemoveZone,
            Params::from([("name", name.as_str())]),
        ),
        Commands::AddPlugin {
            name,
            zone,
            args,
            no_replace,
        } => {
            let mut params = Params::from([("name", name.as_str()), ("zone", zone.as_str())]);
            insert_args(&mut params, args.as_deref(), *no_replace);
            apply(service, Command::AddPlugin, params)
        }
        Commands::RemovePlugin { name, zone } => apply(
            service,
            Command::RemovePlugin,
            Params::from([("name", name.as_str()), ("zone", zone.as_str())]),
        ),
        Commands::AddProperty {
            name,
            zone,
            plugin,
            args,
            no_replace,
        } => {
            let mut params = Params::from([
                ("name", name.as_str()),
                ("zone", zone.as_str()),
                ("plugin", plugin.as_str()),
            ]);
            insert_args(&mut params, args.as_deref(), *no_replace);
            apply(service, Command::AddProperty, params)
        }
        Commands::RemoveProperty { name, zone, plugin } => apply(
            service,
            Command::RemoveProperty,
            Params::from([
                ("name", name.as_str()),
                ("zone", zone.as_str()),
                ("plugin", plugin.as_str()),
            ]),
        ),
        Commands::Exec { script } => {
            let executed = service.exec_script(script)?;
            output::success(&format!(
                "{} command(s) applied from {}",
                executed,
                script.display()
            ));
            Ok(())
        }
        Commands::PrintCorefile { current } => {
            output::info(&service.print_corefile(Revision::from_current(*current))?);
            Ok(())
        }
        Commands::PrintZone { zone, current } => {
            output::info(&service.print_zone(zone, Revision::from_current(*current))?);
            Ok(())
        }
        Commands::PrintZonefile { zonefile } => {
            output::info(&service.print_zonefile(zonefile)?);
            Ok(())
        }
        Commands::AddRecord {
            zonefile,
            hostname,
            record_type,
            args,
            name,
            no_replace,
        } => {
            let record = Record::new(hostname.as_str(), record_type.as_str(), args.iter());
            let result = service.add_record(zonefile, name.as_deref(), record, !no_replace)?;
            output::action("result", &result);
            Ok(())
        }
        Commands::RemoveRecord { zonefile, name } => {
            output::action("result", &service.remove_record(zonefile, name)?);
            Ok(())
        }
        Commands::Update => {
            match service.update()? {
                UpdateOutcome::Unchanged => output::action("result", UNCHANGED),
                UpdateOutcome::Deployed(statuses) => {
                    for status in &statuses {
                        output::status(status);
                    }
                }
            }
            Ok(())
        }
        Commands::Config { .. } | Commands::Completion { .. } => Err(CliError::Usage(
            "not an operator command".to_string(),
        )),
    }
}

fn insert_args(params: &mut Params, args: Option<&str>, no_replace: bool) {
    if let Some(args) = args {
        params.insert("args", args);
    }
    params.insert("replace", !no_replace);
}

fn apply(service: &CorefileService, command: Command, params: Params) -> CliResult<()> {
    let result = service.apply(command, params)?;
    output::action("result", &result);
    Ok(())
}

fn execute_config(config_file: Option<&Path>, command: &ConfigCommands) -> CliResult<()> {
    match command {
        ConfigCommands::Show => {
            let settings = Settings::load(config_file)?;
            output::info(&settings.to_toml()?);
            Ok(())
        }
        ConfigCommands::Path => {
            match global_config_path() {
                Some(path) => output::action("global", &path.display()),
                None => output::warning("no global config directory on this platform"),
            }
            if let Some(path) = config_file {
                output::action("explicit", &path.display());
            }
            Ok(())
        }
        ConfigCommands::Init { global } => {
            let path = if *global {
                global_config_path().ok_or_else(|| {
                    CliError::Usage("no global config directory on this platform".to_string())
                })?
            } else {
                Path::new(LOCAL_CONFIG_FILE).to_path_buf()
            };

            let fs = RealFileSystem;
            if fs.exists(&path) {
                return Err(CliError::Usage(format!(
                    "config already exists: {}",
                    path.display()
                )));
            }
            fs.ensure_parent(&path)
                .and_then(|_| fs.write(&path, &Settings::template()))
                .map_err(|e| InfraError::io(format!("write {}", path.display()), e))?;

            output::success(&format!("Created {}", path.display()));
            Ok(())
        }
    }
}
