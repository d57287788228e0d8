//! The install command: walk the layers manifest and install every layer.
use anyhow::Result;
use std::sync::Arc;

use crate::cli::Cli;
use crate::config::{Config, manifest};
use crate::exec::SystemExecutor;
use crate::layers::context::{RunContext, RunReport};
use crate::layers::{self, InstallOpts, InstallOrigin};
use crate::logging::Logger;
use crate::resources::conflict::TerminalPrompter;

/// Run the install command.
///
/// Returns the run's [`RunReport`]; directive failures are counted there
/// rather than returned as errors.
///
/// # Errors
///
/// Returns an error if the manifest is missing or unreadable, a directive
/// file cannot be read, or the layer dependencies form a cycle.
pub fn run(cli: &Cli, log: &Arc<Logger>) -> Result<RunReport> {
    let version = option_env!("CARAVAN_VERSION").unwrap_or(env!("CARGO_PKG_VERSION"));
    log.info(&format!("caravan {version}"));

    let config = Config::from_cli(cli)?;
    log.debug(&format!("root: {}", config.root.display()));
    log.debug(&format!("backups: {}", config.backup_dir.display()));

    let opts = InstallOpts {
        run: cli.run,
        link: cli.link,
    };
    if !opts.run && !opts.link {
        log.warn("Neither --run nor --link given; only dependencies will be resolved");
    }

    let mut ctx = RunContext::new(
        config,
        log.clone(),
        Arc::new(SystemExecutor),
        Arc::new(TerminalPrompter),
    );
    let result = install_manifest(&mut ctx, opts);
    log.print_summary();
    result?;
    Ok(ctx.report)
}

/// Install every layer named in the manifest, in manifest order.
///
/// Logs the installed set, in install order, once every layer has been
/// processed.
///
/// # Errors
///
/// Returns an error if the manifest cannot be loaded or a layer install
/// fails fatally.
pub fn install_manifest(ctx: &mut RunContext, opts: InstallOpts) -> Result<()> {
    ctx.log.stage("Loading manifest");
    let manifest = manifest::load(&ctx.config.manifest)?;
    ctx.log.debug(&format!(
        "{} layers in {}",
        manifest.layers.len(),
        ctx.config.manifest.display()
    ));

    for layer in &manifest.layers {
        layers::install(ctx, layer, opts, InstallOrigin::TopLevel)?;
    }

    ctx.log.info(&format!(
        "Installed layers: {{{}}}",
        ctx.layers.installed().join(", ")
    ));
    Ok(())
}
