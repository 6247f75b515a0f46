//! Command dispatch: load the definition, run one operation, save it back

use std::io;
use std::path::{Path, PathBuf};

use clap::CommandFactory;
use clap_complete::generate;
use tracing::{debug, instrument};

use crate::application::DataFormController;
use crate::cli::args::{Cli, Commands, ConfigCommands};
use crate::cli::output;
use crate::cli::render::render_tree;
use crate::cli::{CliError, CliResult};
use crate::config::{global_config_path, Settings};
use crate::domain::{BindingSheetInfo, CellRange, DataType, NodeId, NodeRecord, Position};
use crate::infrastructure::di::ServiceContainer;
use crate::infrastructure::InfraError;

/// Entry point for the binary: load settings, then dispatch.
pub fn run(cli: &Cli) -> CliResult<()> {
    let settings = Settings::load()?;
    let container = ServiceContainer::new(settings);
    execute_command(cli, &container)
}

#[instrument(level = "debug", skip_all, fields(command = ?cli.command))]
pub fn execute_command(cli: &Cli, container: &ServiceContainer) -> CliResult<()> {
    let file = container.definition_file(cli.file.as_deref());
    debug!("definition file: {}", file.display());

    match &cli.command {
        Commands::Init => cmd_init(container, &file),
        Commands::Tree { ids } => cmd_tree(container, &file, *ids),
        Commands::Add {
            name,
            data_type,
            parent,
            before,
            after,
        } => cmd_add(
            container,
            &file,
            name,
            data_type.unwrap_or(container.settings.default_node_type),
            parent.as_deref(),
            before.as_deref(),
            after.as_deref(),
        ),
        Commands::Rename { path, name } => cmd_rename(container, &file, path, name),
        Commands::Retype { path, data_type } => cmd_retype(container, &file, path, *data_type),
        Commands::Mv { paths, to, index } => {
            cmd_move(container, &file, paths, to.as_deref(), *index)
        }
        Commands::Rm { path } => cmd_remove(container, &file, path),
        Commands::Bind {
            path,
            unit,
            sheet,
            range,
        } => cmd_bind(container, &file, path, unit, sheet, *range),
        Commands::Unbind { name } => cmd_unbind(container, &file, name),
        Commands::Bindings { path } => cmd_bindings(container, &file, path.as_deref()),
        Commands::Export { output } => cmd_export(container, &file, output.as_deref()),
        Commands::Config { command } => cmd_config(container, command),
        Commands::Completion { shell } => {
            let mut cmd = Cli::command();
            let name = cmd.get_name().to_string();
            generate(*shell, &mut cmd, name, &mut io::stdout());
            Ok(())
        }
    }
}

/// Resolve a separator-joined name path to the node's id.
fn resolve(settings: &Settings, controller: &DataFormController, path: &str) -> CliResult<NodeId> {
    let segments = settings.split_path(path);
    if segments.is_empty() {
        return Err(CliError::InvalidArgs("empty node path".into()));
    }
    controller
        .source()
        .find_by_path(segments.as_slice())
        .map(|node| node.id.clone())
        .ok_or_else(|| CliError::UnknownPath(path.to_string()))
}

/// Names must not contain the path separator, or their node could not be addressed again.
fn check_name(settings: &Settings, name: &str) -> CliResult<()> {
    if name.contains(settings.path_separator.as_str()) {
        return Err(CliError::InvalidArgs(format!(
            "node name '{}' contains the path separator '{}'",
            name, settings.path_separator
        )));
    }
    Ok(())
}

fn display_path(settings: &Settings, controller: &DataFormController, id: &NodeId) -> String {
    controller
        .source()
        .path(id)
        .map(|p| p.join(&settings.path_separator))
        .unwrap_or_else(|| id.to_string())
}

/// Load, apply `f`, save. Nothing is written if `f` fails.
fn modify<T>(
    container: &ServiceContainer,
    file: &Path,
    f: impl FnOnce(&mut DataFormController) -> CliResult<T>,
) -> CliResult<T> {
    let mut controller = container.load_controller(file)?;
    let result = f(&mut controller)?;
    container.documents.save_controller(file, &controller)?;
    Ok(result)
}

fn cmd_init(container: &ServiceContainer, file: &Path) -> CliResult<()> {
    container.documents.create(file)?;
    output::action("Created", &file.display());
    Ok(())
}

fn cmd_tree(container: &ServiceContainer, file: &Path, show_ids: bool) -> CliResult<()> {
    let controller = container.load_controller(file)?;
    let title = file.display().to_string();
    output::info(&render_tree(&controller, &title, show_ids));
    Ok(())
}

fn cmd_add(
    container: &ServiceContainer,
    file: &Path,
    name: &str,
    data_type: DataType,
    parent: Option<&str>,
    before: Option<&str>,
    after: Option<&str>,
) -> CliResult<()> {
    let settings = &container.settings;
    check_name(settings, name)?;
    let added = modify(container, file, |controller| {
        let (anchor, position) = match (before, after) {
            (Some(path), _) => (Some(resolve(settings, controller, path)?), Position::Before),
            (None, Some(path)) => (Some(resolve(settings, controller, path)?), Position::After),
            (None, None) => (None, Position::Before),
        };
        let parent_id = match (parent, &anchor) {
            (Some(path), _) => Some(resolve(settings, controller, path)?),
            (None, Some(anchor)) => controller.source().parent(anchor).map(|p| p.id.clone()),
            (None, None) => None,
        };
        let id = controller.source_mut().add_node(
            NodeRecord::new(name, data_type),
            parent_id.as_ref(),
            anchor.as_ref(),
            position,
        )?;
        Ok(display_path(settings, controller, &id))
    })?;
    output::action("Added", &format!("{} [{}]", added, data_type));
    Ok(())
}

fn cmd_rename(container: &ServiceContainer, file: &Path, path: &str, name: &str) -> CliResult<()> {
    let settings = &container.settings;
    check_name(settings, name)?;
    modify(container, file, |controller| {
        let id = resolve(settings, controller, path)?;
        controller.source_mut().rename(&id, name)?;
        Ok(())
    })?;
    output::action("Renamed", &format!("{} -> {}", path, name));
    Ok(())
}

fn cmd_retype(
    container: &ServiceContainer,
    file: &Path,
    path: &str,
    data_type: DataType,
) -> CliResult<()> {
    let settings = &container.settings;
    let dropped = modify(container, file, |controller| {
        let id = resolve(settings, controller, path)?;
        Ok(controller.switch_node_type(&id, data_type)?)
    })?;
    output::action("Retyped", &format!("{} [{}]", path, data_type));
    if !dropped.is_empty() {
        output::warning(&format!(
            "{} node(s) no longer fit and were removed",
            dropped.len()
        ));
    }
    Ok(())
}

fn cmd_move(
    container: &ServiceContainer,
    file: &Path,
    paths: &[String],
    to: Option<&str>,
    index: Option<usize>,
) -> CliResult<()> {
    let settings = &container.settings;
    modify(container, file, |controller| {
        let ids = paths
            .iter()
            .map(|p| resolve(settings, controller, p))
            .collect::<CliResult<Vec<_>>>()?;
        let target = to
            .map(|p| resolve(settings, controller, p))
            .transpose()?;
        let index = match (index, &target) {
            (Some(i), _) => i,
            (None, Some(parent)) => controller.source().children(parent).len(),
            (None, None) => controller.source().get_nodes().len(),
        };
        controller.move_nodes(&ids, index, target.as_ref())?;
        Ok(())
    })?;
    output::action(
        "Moved",
        &format!("{} -> {}", paths.join(", "), to.unwrap_or("<root>")),
    );
    Ok(())
}

fn cmd_remove(container: &ServiceContainer, file: &Path, path: &str) -> CliResult<()> {
    let settings = &container.settings;
    let removed = modify(container, file, |controller| {
        let id = resolve(settings, controller, path)?;
        Ok(controller.remove_node(&id)?)
    })?;
    output::action("Removed", &format!("{} ({} node(s))", path, removed.len()));
    Ok(())
}

fn cmd_bind(
    container: &ServiceContainer,
    file: &Path,
    path: &str,
    unit: &str,
    sheet: &str,
    range: CellRange,
) -> CliResult<()> {
    let settings = &container.settings;
    let binding = modify(container, file, |controller| {
        let id = resolve(settings, controller, path)?;
        let info = BindingSheetInfo {
            unit_id: unit.to_string(),
            sub_unit_id: sheet.to_string(),
            range,
        };
        Ok(controller.bind_node(&id, info)?)
    })?;
    output::action(
        "Bound",
        &format!("{} -> {}!{} as {}", path, binding.sub_unit_id, binding.range, binding.name),
    );
    Ok(())
}

fn cmd_unbind(container: &ServiceContainer, file: &Path, name: &str) -> CliResult<()> {
    modify(container, file, |controller| Ok(controller.unbind(name)?))?;
    output::action("Unbound", &name);
    Ok(())
}

fn cmd_bindings(container: &ServiceContainer, file: &Path, path: Option<&str>) -> CliResult<()> {
    let settings = &container.settings;
    let controller = container.load_controller(file)?;
    let bindings = match path {
        Some(p) => {
            let id = resolve(settings, &controller, p)?;
            controller.get_bindings_by_node_id(&id)
        }
        None => controller.bindings().bindings().iter().collect(),
    };
    if bindings.is_empty() {
        output::info(&"no bindings");
        return Ok(());
    }
    output::header(&"Bindings");
    for binding in bindings {
        output::detail(&format!(
            "{}: {} -> {}/{}!{}",
            binding.name,
            display_path(settings, &controller, &binding.node_id),
            binding.unit_id,
            binding.sub_unit_id,
            binding.range
        ));
    }
    Ok(())
}

fn cmd_export(container: &ServiceContainer, file: &Path, out: Option<&Path>) -> CliResult<()> {
    let controller = container.load_controller(file)?;
    let document = controller.to_document();
    match out {
        Some(target) => {
            container.documents.save(target, &document)?;
            output::action("Exported", &target.display());
        }
        None => {
            let json = serde_json::to_string_pretty(&document)
                .map_err(|e| InfraError::json("export", e))?;
            output::info(&json);
        }
    }
    Ok(())
}

fn cmd_config(container: &ServiceContainer, command: &ConfigCommands) -> CliResult<()> {
    match command {
        ConfigCommands::Show => {
            output::info(&container.settings.to_toml()?);
        }
        ConfigCommands::Template => {
            output::info(&Settings::template());
        }
        ConfigCommands::Path => {
            let path: Option<PathBuf> = global_config_path();
            match path {
                Some(p) => output::info(&p.display()),
                None => output::warning(&"no config directory on this platform"),
            }
        }
    }
    Ok(())
}
