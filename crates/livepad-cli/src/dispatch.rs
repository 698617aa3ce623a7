use super::{Cli, Commands, SettingsArgs, console_command, export_command, fmt_command};
use super::{open_command, rewrite_command, serve_command, share_command};
use anyhow::Result;

pub(crate) fn execute(cli: Cli) -> Result<()> {
    match cli.command {
        Some(Commands::Rewrite {
            file,
            output,
            settings,
        }) => rewrite_command(file, output, settings),
        Some(Commands::Export {
            file,
            out_dir,
            settings,
        }) => export_command(file, out_dir, settings),
        Some(Commands::Fmt {
            check,
            paths,
            settings,
        }) => fmt_command(paths, check, settings),
        Some(Commands::Share {
            file,
            preview,
            shorten,
            base_url,
            settings,
        }) => share_command(file, preview, shorten, base_url, settings),
        Some(Commands::Open { link, settings }) => open_command(link, settings),
        Some(Commands::Serve {
            file,
            host,
            port,
            open,
            settings,
        }) => serve_command(file, host, port, open, settings),
        Some(Commands::Console { settings }) => console_command(settings),
        None => console_command(SettingsArgs::default()),
    }
}
