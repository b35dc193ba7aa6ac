use audio_switcher::{
    app::{self, App},
    args::{normalize_launch_args, LaunchArgs, SubCommands, TopLevelCmd},
    logging::initialize_logging,
    panic_handler::{initialize_ctrl_c_handler, initialize_panic_handler},
    platform::native_collaborators,
    settings::{config_dir, Settings, CONFIG_FILE_NAME},
};
use argh::FromArgs;
use color_eyre::eyre::Result;
use tracing::*;

fn main() -> Result<()> {
    let args = normalize_launch_args(std::env::args_os());
    let Some((command, rest)) = args.split_first() else {
        return Ok(());
    };
    let rest: Vec<&str> = rest.iter().map(String::as_str).collect();
    let args: TopLevelCmd = match TopLevelCmd::from_args(&[command.as_str()], &rest) {
        Ok(args) => args,
        Err(early_exit) if early_exit.status.is_ok() => {
            println!("{}", early_exit.output);
            return Ok(());
        }
        Err(early_exit) => {
            eprintln!("{}", early_exit.output);
            std::process::exit(libc::EXIT_FAILURE);
        }
    };

    // Only matters when someone runs us from a terminal.
    let _ = enable_ansi_support::enable_ansi_support();
    initialize_panic_handler()?;

    let config_dir = config_dir()?;
    let settings = Settings::load(&config_dir.join(CONFIG_FILE_NAME))?;
    let _logging_guard = initialize_logging(&settings, &config_dir);

    if let Some(SubCommands::List(categories)) = args.subcommand {
        let (audio, _hotkeys) = native_collaborators()?;
        app::print_devices(audio.as_ref(), categories)?;
        return Ok(());
    }

    let launch = LaunchArgs::try_from(args)?;
    debug!("Launched with {launch:?}");

    let (event_tx, events) = app::event_channel();
    initialize_ctrl_c_handler(event_tx.clone())?;

    let app =
        App::build(&launch, event_tx, events).inspect_err(|e| error!("Startup failed: {e}"))?;
    app.run()?;

    info!("Exiting");
    Ok(())
}
