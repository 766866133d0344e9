//! Mutation command table and script runner.
//!
//! Scripts hold one command per line:
//!
//! ```text
//! # comments and blank lines are skipped
//! add_zone name=example.io port=69
//! add_plugin name=log zone=example.io
//! add_property name=fallthrough args='in-addr.arpa ip6.arpa' zone=. plugin=kubernetes
//! ```

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use tracing::{debug, info, instrument, warn};

use crate::application::parser::{
    default_params, parse_args, require, validate_plugin_exists, validate_zone_exists, Conversion,
    Params,
};
use crate::application::{ApplicationError, ApplicationResult, IoResultExt};
use crate::domain::{Corefile, Node, DEFAULT_PORT};
use crate::infrastructure::traits::FileSystem;

/// Marker for a comment line in scripts.
pub const COMMENT_MARKER: char = '#';

/// Outcome of an add or remove that changed nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoChange {
    /// Add without replace hit an existing entry.
    NotReplaced,
    /// Remove of an absent entry.
    NotFound,
}

impl NoChange {
    pub fn message(self) -> &'static str {
        match self {
            NoChange::NotReplaced => "Not replacing, nothing changed",
            NoChange::NotFound => "Not found, nothing changed",
        }
    }
}

impl fmt::Display for NoChange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

/// Render the touched node, or the sentinel text if there was none.
pub fn render_or<N: Node>(node: Option<&N>, no_change: NoChange) -> String {
    match node {
        Some(node) => node.render(),
        None => no_change.message().to_string(),
    }
}

/// Closed set of mutation commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
    Reset,
    AddZone,
    RemoveZone,
    AddPlugin,
    RemovePlugin,
    AddProperty,
    RemoveProperty,
}

impl Command {
    pub const ALL: [Command; 7] = [
        Command::Reset,
        Command::AddZone,
        Command::RemoveZone,
        Command::AddPlugin,
        Command::RemovePlugin,
        Command::AddProperty,
        Command::RemoveProperty,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Command::Reset => "reset",
            Command::AddZone => "add_zone",
            Command::RemoveZone => "remove_zone",
            Command::AddPlugin => "add_plugin",
            Command::RemovePlugin => "remove_plugin",
            Command::AddProperty => "add_property",
            Command::RemoveProperty => "remove_property",
        }
    }

    /// Parameters that must be present.
    pub fn required(self) -> &'static [&'static str] {
        match self {
            Command::Reset => &[],
            Command::AddZone | Command::RemoveZone => &["name"],
            Command::AddPlugin | Command::RemovePlugin => &["name", "zone"],
            Command::AddProperty | Command::RemoveProperty => &["name", "plugin", "zone"],
        }
    }

    /// Apply to `corefile` and return the result text.
    #[instrument(level = "debug", skip(corefile, params), fields(command = %self))]
    pub fn apply(self, corefile: &mut Corefile, params: &mut Params) -> ApplicationResult<String> {
        require(params, self.required())?;
        let result = match self {
            Command::Reset => reset(corefile),
            Command::AddZone => add_zone(corefile, params)?,
            Command::RemoveZone => remove_zone(corefile, params)?,
            Command::AddPlugin => add_plugin(corefile, params)?,
            Command::RemovePlugin => remove_plugin(corefile, params)?,
            Command::AddProperty => add_property(corefile, params)?,
            Command::RemoveProperty => remove_property(corefile, params)?,
        };
        debug!(%result, "applied");
        Ok(result)
    }
}

impl FromStr for Command {
    type Err = ApplicationError;

    /// Unknown names report line 0; `exec` substitutes the real line.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Command::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| ApplicationError::UnknownCommand {
                command: s.to_string(),
                line: 0,
            })
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================
// Operations
// ============================================================

fn reset(corefile: &mut Corefile) -> String {
    corefile.reset();
    String::new()
}

fn add_zone(corefile: &mut Corefile, params: &mut Params) -> ApplicationResult<String> {
    let default_port = DEFAULT_PORT.to_string();
    default_params(
        params,
        &[("port", default_port.as_str())],
        &[("port", Conversion::Integer)],
    )?;
    let name = params.text("name")?;
    let port = params.integer("port")?;
    let replace = params.flag("replace")?;

    let added = corefile.add_zone(name, port, replace)?;
    Ok(render_or(added, NoChange::NotReplaced))
}

fn remove_zone(corefile: &mut Corefile, params: &Params) -> ApplicationResult<String> {
    let removed = corefile.remove_zone(params.text("name")?);
    Ok(render_or(removed.as_ref(), NoChange::NotFound))
}

fn add_plugin(corefile: &mut Corefile, params: &Params) -> ApplicationResult<String> {
    let name = params.text("name")?;
    let zone = params.text("zone")?;
    let args = params.list("args")?.to_vec();
    let replace = params.flag("replace")?;

    validate_zone_exists(corefile, zone)?;
    let added = corefile
        .zone_mut(zone)
        .and_then(|z| z.add_plugin(name, args, replace));
    Ok(render_or(added, NoChange::NotReplaced))
}

fn remove_plugin(corefile: &mut Corefile, params: &Params) -> ApplicationResult<String> {
    let name = params.text("name")?;
    let zone = params.text("zone")?;

    validate_zone_exists(corefile, zone)?;
    let removed = corefile.zone_mut(zone).and_then(|z| z.remove_plugin(name));
    Ok(render_or(removed.as_ref(), NoChange::NotFound))
}

fn add_property(corefile: &mut Corefile, params: &Params) -> ApplicationResult<String> {
    let name = params.text("name")?;
    let zone = params.text("zone")?;
    let plugin = params.text("plugin")?;
    let args = params.list("args")?.to_vec();
    let replace = params.flag("replace")?;

    validate_plugin_exists(corefile, plugin, zone)?;
    let added = corefile
        .plugin_mut(zone, plugin)
        .and_then(|p| p.add_property(name, args, replace));
    Ok(render_or(added, NoChange::NotReplaced))
}

fn remove_property(corefile: &mut Corefile, params: &Params) -> ApplicationResult<String> {
    let name = params.text("name")?;
    let zone = params.text("zone")?;
    let plugin = params.text("plugin")?;

    validate_plugin_exists(corefile, plugin, zone)?;
    let removed = corefile
        .plugin_mut(zone, plugin)
        .and_then(|p| p.remove_property(name));
    Ok(render_or(removed.as_ref(), NoChange::NotFound))
}

// ============================================================
// Scripts
// ============================================================

/// Run every command line of `source` against `corefile`, in order.
///
/// There is no rollback: when a line fails, earlier lines stay applied.
/// Returns the number of commands executed.
#[instrument(level = "debug", skip_all)]
pub fn exec(corefile: &mut Corefile, source: &str) -> ApplicationResult<usize> {
    let mut executed = 0;

    for (index, line) in source.lines().enumerate() {
        let line_number = index + 1;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with(COMMENT_MARKER) {
            continue;
        }

        let (name, raw) = trimmed
            .split_once(char::is_whitespace)
            .unwrap_or((trimmed, ""));
        let command: Command = name.parse().map_err(|_| ApplicationError::UnknownCommand {
            command: name.to_string(),
            line: line_number,
        })?;

        let mut params = parse_args(raw).inspect_err(|e| warn!(line = line_number, "{}", e))?;
        command
            .apply(corefile, &mut params)
            .inspect_err(|e| warn!(line = line_number, "{}", e))?;
        executed += 1;
    }

    info!(executed, "script applied");
    Ok(executed)
}

/// Read a script through `fs` and run it with `exec`.
pub fn exec_file(
    corefile: &mut Corefile,
    fs: &dyn FileSystem,
    path: &Path,
) -> ApplicationResult<usize> {
    let source = fs
        .read_to_string(path)
        .with_path_context("read script", path)?;
    exec(corefile, &source)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::parser::ParamValue;
    use crate::domain::{Plugin, Property, Zone};

    fn root_corefile() -> Corefile {
        Corefile::new([Zone::with_port(".", 53)]).unwrap()
    }

    #[test]
    fn given_every_command_when_round_tripping_name_then_same_command() {
        for command in Command::ALL {
            assert_eq!(command.as_str().parse::<Command>().unwrap(), command);
        }
        assert!("drop_zone".parse::<Command>().is_err());
    }

    #[test]
    fn given_none_when_render_or_then_sentinel_text() {
        assert_eq!(
            render_or::<Plugin>(None, NoChange::NotFound),
            "Not found, nothing changed"
        );
        assert_eq!(
            render_or(Some(&Plugin::new("plugin")), NoChange::NotReplaced),
            "\tplugin"
        );
    }

    #[test]
    fn given_corefile_when_reset_then_no_zones() {
        let mut corefile = root_corefile();
        let result = Command::Reset.apply(&mut corefile, &mut Params::new()).unwrap();
        assert_eq!(result, "");
        assert!(corefile.is_empty());
    }

    #[test]
    fn given_add_zone_without_port_when_applied_then_port_53() {
        let mut corefile = root_corefile();
        let mut params = parse_args("name=example.io").unwrap();

        let result = Command::AddZone.apply(&mut corefile, &mut params).unwrap();

        assert_eq!(result, "example.io:53");
        assert_eq!(corefile.zone("example.io").unwrap().port(), 53);
    }

    #[test]
    fn given_existing_zone_when_add_zone_without_replace_then_sentinel() {
        let mut corefile = root_corefile();
        let mut params = parse_args("name=. port=54 replace=false").unwrap();

        let result = Command::AddZone.apply(&mut corefile, &mut params).unwrap();

        assert_eq!(result, NoChange::NotReplaced.message());
        assert_eq!(corefile.zone(".").unwrap().port(), 53);
    }

    #[test]
    fn given_negative_port_when_add_zone_then_domain_error() {
        let mut corefile = root_corefile();
        let mut params = parse_args("name=z port=-5").unwrap();

        let err = Command::AddZone.apply(&mut corefile, &mut params).unwrap_err();
        assert!(matches!(err, ApplicationError::Domain(_)));
    }

    #[test]
    fn given_missing_zone_when_add_plugin_then_validation_error() {
        let mut corefile = root_corefile();
        let mut params = parse_args("name=log zone=nowhere").unwrap();

        let err = Command::AddPlugin.apply(&mut corefile, &mut params).unwrap_err();
        assert!(matches!(err, ApplicationError::Validation(_)));
    }

    #[test]
    fn given_action_params_when_add_property_then_rendered_property() {
        let mut corefile = Corefile::new([Zone::with_port(".", 53)
            .plugin(Plugin::with_args("kubernetes", ["cluster.local"]))])
        .unwrap();
        let mut params = Params::from([
            ("name", ParamValue::from("pods")),
            ("zone", ParamValue::from(".")),
            ("plugin", ParamValue::from("kubernetes")),
            ("args", ParamValue::from(vec!["insecure".to_string()])),
            ("replace", ParamValue::from(true)),
        ]);

        let result = Command::AddProperty.apply(&mut corefile, &mut params).unwrap();

        assert_eq!(result, "\t\tpods insecure");
        assert_eq!(
            corefile.zone(".").unwrap().get_plugin("kubernetes").unwrap().properties()["pods"],
            Property::with_args("pods", ["insecure"])
        );
    }

    #[test]
    fn given_absent_property_when_remove_property_then_not_found_sentinel() {
        let mut corefile =
            Corefile::new([Zone::with_port(".", 53).plugin(Plugin::new("p"))]).unwrap();
        let mut params = parse_args("name=missing plugin=p zone=.").unwrap();

        let result = Command::RemoveProperty.apply(&mut corefile, &mut params).unwrap();

        assert_eq!(result, "Not found, nothing changed");
    }

    #[test]
    fn given_missing_required_when_applied_then_required_error_lists_all() {
        let mut corefile = root_corefile();
        let mut params = parse_args("name=x").unwrap();

        let err = Command::RemoveProperty.apply(&mut corefile, &mut params).unwrap_err();

        match err {
            ApplicationError::RequiredFieldsMissing(missing) => {
                assert_eq!(missing, vec!["plugin".to_string(), "zone".to_string()])
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn given_script_with_comments_when_exec_then_counts_commands() {
        let mut corefile = root_corefile();
        let script = "# setup\n\nadd_zone name=example.io port=69\n  # indented comment\nadd_plugin name=log zone=example.io\n";

        let executed = exec(&mut corefile, script).unwrap();

        assert_eq!(executed, 2);
        assert_eq!(
            corefile.zone("example.io").unwrap().render(),
            "example.io:69 {\n\tlog\n}"
        );
    }

    #[test]
    fn given_bare_reset_line_when_exec_then_applied() {
        let mut corefile = root_corefile();
        exec(&mut corefile, "reset\nadd_zone name=a\n").unwrap();
        assert_eq!(corefile.zones().keys().collect::<Vec<_>>(), ["a"]);
    }
}
