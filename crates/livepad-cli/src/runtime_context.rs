use anyhow::{Context, Result};
use livepad_compiler::{CdnOrigin, ScriptCompiler, UiLibrary};
use livepad_config::{CliOverrides, EnvConfig, Settings, load_file_config, resolve_settings};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

pub(crate) fn resolve_config(config: Option<PathBuf>, cli: &CliOverrides) -> Result<Settings> {
    let cwd = std::env::current_dir().context("failed resolving current directory")?;
    let file_cfg = load_file_config(config.as_deref(), &cwd)?;
    let env_cfg = EnvConfig::from_current_env();
    let settings = resolve_settings(cli, &env_cfg, file_cfg.as_ref());
    init_tracing(settings.verbose);
    Ok(settings)
}

pub(crate) fn build_compiler(settings: &Settings) -> Result<ScriptCompiler> {
    let origin = CdnOrigin::parse(&settings.cdn_origin)
        .context("failed resolving the CDN origin setting")?;
    let ui = UiLibrary::new(settings.ui_package.clone(), settings.ui_global.clone());
    Ok(ScriptCompiler::new(origin, ui))
}

/// `RUST_LOG` wins; otherwise warnings only, or debug output with `--verbose`.
fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::build_compiler;
    use livepad_config::Settings;

    #[test]
    fn compiler_follows_settings() {
        let settings = Settings {
            cdn_origin: "https://cdn.example/esm".to_string(),
            ui_package: "preact".to_string(),
            ui_global: "h".to_string(),
            ..Settings::default()
        };
        let compiler = build_compiler(&settings).expect("compiler should build");
        assert_eq!(compiler.origin.as_str(), "https://cdn.example/esm/");
        assert_eq!(compiler.ui.package, "preact");
        assert_eq!(compiler.ui.global, "h");
    }

    #[test]
    fn relative_origin_is_a_configuration_error() {
        let settings = Settings {
            cdn_origin: "cdn.example".to_string(),
            ..Settings::default()
        };
        let err = build_compiler(&settings).expect_err("origin should be rejected");
        assert!(format!("{err:#}").contains("invalid CDN origin"));
    }
}
