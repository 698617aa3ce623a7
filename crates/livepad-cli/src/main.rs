mod cli_defaults;
mod console_repl;
mod dispatch;
mod runtime_context;
mod serve;
mod share;

use anyhow::{Context, Result, anyhow};
use clap::{Args, Parser, Subcommand};
use livepad_config::CliOverrides;
use livepad_core::{
    EXPORT_MIME, Launch, ShareLinks, export_document, format_document, read_source, rewrite_file,
};
use livepad_engine::BoaContext;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

#[derive(Debug, Parser)]
#[command(
    name = "livepad",
    version,
    about = "Live HTML preview with CDN-resolved imports and a console bridge"
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

/// Flags every command accepts on top of `livepad.json` and `LIVEPAD_*`.
#[derive(Debug, Clone, Default, Args)]
struct SettingsArgs {
    #[arg(long)]
    config: Option<PathBuf>,
    /// Base URL bare imports resolve against.
    #[arg(long)]
    cdn_origin: Option<String>,
    #[arg(long)]
    ui_package: Option<String>,
    #[arg(long)]
    ui_global: Option<String>,
    #[arg(long)]
    verbose: bool,
}

impl SettingsArgs {
    fn overrides(&self) -> CliOverrides {
        CliOverrides {
            cdn_origin: self.cdn_origin.clone(),
            ui_package: self.ui_package.clone(),
            ui_global: self.ui_global.clone(),
            verbose: self.verbose.then_some(true),
            ..CliOverrides::default()
        }
    }
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Rewrite an HTML document for preview.
    Rewrite {
        file: PathBuf,
        #[arg(short = 'o', long)]
        output: Option<PathBuf>,
        #[command(flatten)]
        settings: SettingsArgs,
    },
    /// Write the rewritten document as index.html.
    Export {
        file: PathBuf,
        #[arg(long, default_value = ".")]
        out_dir: PathBuf,
        #[command(flatten)]
        settings: SettingsArgs,
    },
    /// Re-print inline scripts.
    Fmt {
        #[arg(long)]
        check: bool,
        #[arg(value_name = "PATH", required = true)]
        paths: Vec<PathBuf>,
        #[command(flatten)]
        settings: SettingsArgs,
    },
    /// Print shareable links for a document.
    Share {
        file: PathBuf,
        /// Only print the preview-only link.
        #[arg(long)]
        preview: bool,
        #[arg(long)]
        shorten: bool,
        #[arg(long)]
        base_url: Option<String>,
        #[command(flatten)]
        settings: SettingsArgs,
    },
    /// Decode a share link or fragment.
    Open {
        link: String,
        #[command(flatten)]
        settings: SettingsArgs,
    },
    /// Serve the rewritten document over HTTP.
    Serve {
        file: PathBuf,
        #[arg(long)]
        host: Option<String>,
        #[arg(long)]
        port: Option<u16>,
        #[arg(long)]
        open: bool,
        #[command(flatten)]
        settings: SettingsArgs,
    },
    /// Start an interactive console.
    Console {
        #[command(flatten)]
        settings: SettingsArgs,
    },
}

fn rewrite_command(file: PathBuf, output: Option<PathBuf>, settings: SettingsArgs) -> Result<()> {
    let resolved = runtime_context::resolve_config(settings.config.clone(), &settings.overrides())?;
    let compiler = runtime_context::build_compiler(&resolved)?;

    let report = rewrite_file(&compiler, &file)
        .with_context(|| format!("failed rewriting {}", file.display()))?;
    let kept = report.failed().count();
    if kept > 0 {
        eprintln!(
            "[livepad] warning: {kept} of {} scripts kept as written",
            report.scripts.len()
        );
    }

    match output {
        Some(target) => {
            write_with_parents(&target, &report.html)?;
            eprintln!("[livepad] wrote {}", target.display());
        }
        None => println!("{}", report.html),
    }
    Ok(())
}

fn write_with_parents(target: &Path, contents: &str) -> Result<()> {
    if let Some(parent) = target.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed creating output dir {}", parent.display()))?;
        }
    }
    fs::write(target, contents).with_context(|| format!("failed writing {}", target.display()))
}

fn export_command(file: PathBuf, out_dir: PathBuf, settings: SettingsArgs) -> Result<()> {
    let resolved = runtime_context::resolve_config(settings.config.clone(), &settings.overrides())?;
    let compiler = runtime_context::build_compiler(&resolved)?;

    let source = read_source(&file)?;
    let (target, _) = export_document(&compiler, &source, &out_dir)
        .with_context(|| format!("failed exporting {}", file.display()))?;
    eprintln!("[livepad] wrote {} ({EXPORT_MIME})", target.display());
    println!("{}", target.display());
    Ok(())
}

fn fmt_command(paths: Vec<PathBuf>, check: bool, settings: SettingsArgs) -> Result<()> {
    let resolved = runtime_context::resolve_config(settings.config.clone(), &settings.overrides())?;
    let compiler = runtime_context::build_compiler(&resolved)?;

    let mut unformatted = 0usize;
    for path in &paths {
        let original = read_source(path)?;
        let formatted = format_document(&original, &compiler);
        if formatted == original {
            continue;
        }
        if check {
            eprintln!("[livepad] would reformat {}", path.display());
            unformatted += 1;
        } else {
            write_with_parents(path, &formatted)?;
            eprintln!("[livepad] formatted {}", path.display());
        }
    }

    if unformatted > 0 {
        return Err(anyhow!("{unformatted} file(s) need formatting"));
    }
    Ok(())
}

fn share_command(
    file: PathBuf,
    preview_only: bool,
    shorten: bool,
    base_url: Option<String>,
    settings: SettingsArgs,
) -> Result<()> {
    let overrides = CliOverrides {
        share_base_url: base_url,
        ..settings.overrides()
    };
    let resolved = runtime_context::resolve_config(settings.config.clone(), &overrides)?;

    let source = read_source(&file)?;
    let links = ShareLinks::new(&resolved.share_base_url, &source);
    let shortener = shorten.then(|| share::Shortener::new(resolved.shortener_url.clone()));
    for line in share::share_lines(&links, preview_only, shortener.as_ref()) {
        println!("{line}");
    }
    Ok(())
}

/// Accepts a full link or just its fragment.
fn fragment_of(link: &str) -> &str {
    match link.split_once('#') {
        Some((_, fragment)) => fragment,
        None => link,
    }
}

fn open_command(link: String, settings: SettingsArgs) -> Result<()> {
    let resolved = runtime_context::resolve_config(settings.config.clone(), &settings.overrides())?;
    let compiler = runtime_context::build_compiler(&resolved)?;

    match Launch::from_fragment(fragment_of(&link), &compiler) {
        Launch::Editor(source) => {
            eprintln!("[livepad] editor source");
            println!("{source}");
        }
        Launch::Preview(html) => {
            eprintln!("[livepad] preview document");
            println!("{html}");
        }
    }
    Ok(())
}

fn serve_command(
    file: PathBuf,
    host: Option<String>,
    port: Option<u16>,
    open: bool,
    settings: SettingsArgs,
) -> Result<()> {
    let overrides = CliOverrides {
        host,
        port,
        ..settings.overrides()
    };
    let resolved = runtime_context::resolve_config(settings.config.clone(), &overrides)?;
    let compiler = runtime_context::build_compiler(&resolved)?;

    let handle = serve::start_preview_server(
        &serve::ServeConfig {
            host: resolved.host.clone(),
            port: resolved.port,
            file: file.clone(),
        },
        compiler,
    )?;
    eprintln!("[livepad] serving {} at {}", file.display(), handle.url);
    println!("{}", handle.url);
    if open {
        if let Err(err) = serve::open_url_in_default_browser(&handle.url) {
            eprintln!("[livepad] warning: {err:#}");
        }
    }
    handle.wait();
    Ok(())
}

fn console_command(settings: SettingsArgs) -> Result<()> {
    let resolved = runtime_context::resolve_config(settings.config.clone(), &settings.overrides())?;
    let compiler = runtime_context::build_compiler(&resolved)?;

    let stdin = io::stdin();
    let mut stdout = io::stdout();
    console_repl::run_console(BoaContext::new, &compiler, stdin.lock(), &mut stdout)
}

#[cfg(test)]
mod tests {
    use super::{SettingsArgs, fragment_of};

    #[test]
    fn fragments_are_taken_from_full_links() {
        assert_eq!(fragment_of("http://x/#~abc"), "~abc");
        assert_eq!(fragment_of("#abc"), "abc");
        assert_eq!(fragment_of("abc"), "abc");
    }

    #[test]
    fn only_given_flags_override() {
        let overrides = SettingsArgs {
            cdn_origin: Some("https://cdn.example".to_string()),
            ..SettingsArgs::default()
        }
        .overrides();
        assert_eq!(overrides.cdn_origin.as_deref(), Some("https://cdn.example"));
        assert_eq!(overrides.verbose, None);
        assert_eq!(overrides.ui_package, None);
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse_from(cli_defaults::normalize_cli_args(std::env::args_os()));
    dispatch::execute(cli)
}
