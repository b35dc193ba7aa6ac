use std::ffi::OsString;

use argh::FromArgs;

use crate::errors::SwitcherError;

#[derive(FromArgs, PartialEq, Debug)]
/// Stream Deck plugin for switching the default audio devices
pub struct TopLevelCmd {
    #[argh(option)]
    /// port of the Stream Deck application's WebSocket server
    pub port: Option<u16>,
    #[argh(option)]
    /// identifier to register this plugin instance with
    pub plugin_uuid: Option<String>,
    #[argh(option)]
    /// name of the registration event
    pub register_event: Option<String>,
    #[argh(option)]
    /// JSON describing the Stream Deck application and attached devices
    pub info: Option<String>,
    #[argh(subcommand)]
    pub subcommand: Option<SubCommands>,
}

#[derive(FromArgs, PartialEq, Debug)]
#[argh(subcommand)]
pub enum SubCommands {
    List(ListSubcommand),
}

#[derive(FromArgs, PartialEq, Debug)]
/// Get list of audio devices and their IDs
#[argh(subcommand, name = "list")]
pub struct ListSubcommand {
    #[argh(switch, short = 'p')]
    /// show playback devices
    pub playback: bool,
    #[argh(switch, short = 'r')]
    /// show recording devices
    pub recording: bool,
    #[argh(switch, short = 's')]
    /// print devices in the format used in button settings
    pub settings_format: bool,
}

/// What the Stream Deck application tells us on launch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchArgs {
    pub port: u16,
    pub plugin_uuid: String,
    pub register_event: String,
    pub info: Option<String>,
}

impl TryFrom<TopLevelCmd> for LaunchArgs {
    type Error = SwitcherError;
    fn try_from(value: TopLevelCmd) -> Result<Self, Self::Error> {
        Ok(Self {
            port: value.port.ok_or(SwitcherError::MissingLaunchArg("port"))?,
            plugin_uuid: value
                .plugin_uuid
                .ok_or(SwitcherError::MissingLaunchArg("pluginUUID"))?,
            register_event: value
                .register_event
                .ok_or(SwitcherError::MissingLaunchArg("registerEvent"))?,
            info: value.info,
        })
    }
}

/// The Stream Deck application passes single-dash camelCase flags, argh wants
/// double-dash kebab-case ones.
const LAUNCH_FLAGS: [(&str, &str); 4] = [
    ("-port", "--port"),
    ("-pluginUUID", "--plugin-uuid"),
    ("-registerEvent", "--register-event"),
    ("-info", "--info"),
];

/// Rewrites the Stream Deck's launch flags so argh understands them.
///
/// Only flag positions are touched, so a flag-shaped value (say, inside `-info`'s
/// JSON) is left alone.
pub fn normalize_launch_args<I>(args: I) -> Vec<String>
where
    I: IntoIterator<Item = OsString>,
{
    let mut normalized = Vec::new();
    let mut expecting_value = false;
    for arg in args {
        let arg = arg.to_string_lossy().into_owned();
        if expecting_value {
            expecting_value = false;
            normalized.push(arg);
            continue;
        }
        match LAUNCH_FLAGS.iter().find(|(flag, _)| *flag == arg) {
            Some((_, long)) => {
                expecting_value = true;
                normalized.push((*long).to_owned());
            }
            None => {
                expecting_value = LAUNCH_FLAGS.iter().any(|(_, long)| *long == arg);
                normalized.push(arg);
            }
        }
    }
    normalized
}
