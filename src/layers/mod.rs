//! Layer installation.
//!
//! A layer is installed by walking its directive file in order.  `depends`
//! directives install the named layer first (depth-first, each layer at most
//! once per run), `link` directives place symlinks and `run` directives run
//! install scripts.  Failures of individual directives are logged and
//! counted; the walk continues.  Only a dependency cycle or an unreadable
//! directive file stops the run.
pub mod context;
pub mod tracker;

use anyhow::Result;
use std::sync::Arc;

use crate::config::directives::{Directive, DirectiveKind, parse_directives};
use crate::config::paths;
use crate::logging::LayerStatus;
use crate::resources::conflict::{ConflictAction, ConflictResolver};
use crate::resources::fs as mutate;
use crate::resources::script::{ScriptRun, run_install_script};
use crate::resources::symlink::SymlinkResource;
use crate::resources::{Resource, ResourceChange, ResourceState};

use context::RunContext;
use tracker::LayerState;

/// Which directive kinds are executed.  `depends` is always followed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InstallOpts {
    /// Execute `run` directives.
    pub run: bool,
    /// Execute `link` directives.
    pub link: bool,
}

/// Why a layer is being installed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstallOrigin {
    /// Listed in the manifest.
    TopLevel,
    /// Named by another layer's `depends` directive.
    Dependency,
}

/// Result of [`install`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayerOutcome {
    /// The layer has no directive file (or an empty one); nothing was done.
    NoDirectives,
    /// The layer was already installed earlier in the run.
    AlreadyInstalled,
    /// Every directive was processed.
    Installed {
        /// Directives that failed, were malformed or were aborted.
        failures: usize,
    },
}

/// Result of one directive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DirectiveOutcome {
    /// The directive changed something.
    Applied,
    /// Already in the desired state.
    Unchanged,
    /// Deliberately not applied.
    Skipped(String),
    /// The directive kind is not enabled for this run.
    Disabled,
    /// Dry run; the would-be action was reported.
    Previewed,
    /// Unrecognised directive kind.
    Ignored,
    /// The user declined to create a missing link source.
    Aborted,
    /// The directive's arguments are malformed.
    Malformed(String),
    /// Applying the directive failed.
    Failed(String),
}

/// Install `layer` and, through its `depends` directives, its dependencies.
///
/// A layer without directives (no directive file, or one holding only blank
/// lines and comments) is reported and skipped without being marked
/// installed.  A layer already installed in this run, under any spelling of
/// its path, is not installed again.
///
/// # Errors
///
/// Returns [`LayerError::DependencyCycle`](crate::error::LayerError::DependencyCycle)
/// if `layer` is reached while it is still being installed, and
/// [`LayerError::Io`](crate::error::LayerError::Io) if a directive file
/// cannot be read.  Either aborts the run.
pub fn install(
    ctx: &mut RunContext,
    layer: &str,
    opts: InstallOpts,
    origin: InstallOrigin,
) -> Result<LayerOutcome> {
    let dir = ctx.config.layer_dir(layer);
    let directive_file = ctx.config.directive_file(layer);
    if !directive_file.is_file() {
        ctx.log.warn(&format!("No caravan file in {layer} layer, skipping."));
        ctx.log.record_layer(layer, LayerStatus::Skipped, Some("no caravan file"));
        return Ok(LayerOutcome::NoDirectives);
    }

    if ctx.layers.state(&dir) == LayerState::Done {
        ctx.log.info(&format!("{layer} already installed"));
        return Ok(LayerOutcome::AlreadyInstalled);
    }

    let parsed = parse_directives(layer, &directive_file)?;
    if parsed.directives.is_empty() && parsed.error.is_none() {
        ctx.log.warn(&format!("Empty caravan file in {layer} layer, skipping."));
        ctx.log.record_layer(layer, LayerStatus::Skipped, Some("empty caravan file"));
        return Ok(LayerOutcome::NoDirectives);
    }

    ctx.layers.begin(&dir, layer)?;
    match origin {
        InstallOrigin::TopLevel => ctx.log.stage(&format!("Layer: {layer}")),
        InstallOrigin::Dependency => ctx.log.stage(&format!("Dependent layer: {layer}")),
    }

    let mut failures = 0;
    for directive in &parsed.directives {
        match execute(ctx, directive, opts)? {
            DirectiveOutcome::Failed(reason) => {
                ctx.log.error(&format!(
                    "{layer}: {} {}: {reason}",
                    directive.kind, directive.argument
                ));
                ctx.report.failed_directives += 1;
                failures += 1;
            }
            DirectiveOutcome::Malformed(reason) => {
                ctx.log.error(&format!("{layer}: line {}: {reason}", directive.line));
                ctx.report.parse_errors += 1;
                failures += 1;
            }
            DirectiveOutcome::Aborted => {
                ctx.report.aborted_creations += 1;
                failures += 1;
            }
            _ => {}
        }
    }

    if let Some(err) = &parsed.error {
        ctx.log.error(&format!("{layer}: malformed caravan file, {err}"));
        ctx.report.parse_errors += 1;
        failures += 1;
    }

    ctx.layers.finish(&dir);

    let status = if ctx.config.dry_run {
        LayerStatus::DryRun
    } else if failures > 0 {
        LayerStatus::Failed
    } else {
        LayerStatus::Installed
    };
    let message = (failures > 0).then(|| format!("{failures} directive(s) failed"));
    ctx.log.record_layer(layer, status, message.as_deref());

    if origin == InstallOrigin::Dependency {
        ctx.log.debug(&format!("Finished dependent layer: {layer}"));
    }
    Ok(LayerOutcome::Installed { failures })
}

fn execute(
    ctx: &mut RunContext,
    directive: &Directive,
    opts: InstallOpts,
) -> Result<DirectiveOutcome> {
    match &directive.kind {
        DirectiveKind::Depends => depend(ctx, directive, opts),
        DirectiveKind::Run if opts.run => Ok(run(ctx, directive)),
        DirectiveKind::Link if opts.link => Ok(link(ctx, directive)),
        DirectiveKind::Run | DirectiveKind::Link => {
            ctx.log.debug(&format!(
                "Not handling {} {} (disabled)",
                directive.kind, directive.argument
            ));
            Ok(DirectiveOutcome::Disabled)
        }
        DirectiveKind::Other(kind) => {
            ctx.log.warn(&format!("Directive '{kind}' not recognized."));
            Ok(DirectiveOutcome::Ignored)
        }
    }
}

fn depend(
    ctx: &mut RunContext,
    directive: &Directive,
    opts: InstallOpts,
) -> Result<DirectiveOutcome> {
    let dependency = match directive.single_arg() {
        Ok(dependency) => dependency,
        Err(e) => return Ok(DirectiveOutcome::Malformed(e.to_string())),
    };
    if ctx.is_installed(dependency) {
        ctx.log.debug(&format!("{dependency} already installed"));
        return Ok(DirectiveOutcome::Unchanged);
    }
    match install(ctx, dependency, opts, InstallOrigin::Dependency)? {
        LayerOutcome::NoDirectives => Ok(DirectiveOutcome::Skipped(format!(
            "no caravan file in {dependency}"
        ))),
        LayerOutcome::AlreadyInstalled => Ok(DirectiveOutcome::Unchanged),
        LayerOutcome::Installed { .. } => Ok(DirectiveOutcome::Applied),
    }
}

fn run(ctx: &RunContext, directive: &Directive) -> DirectiveOutcome {
    let script = match directive.single_arg() {
        Ok(script) => script,
        Err(e) => return DirectiveOutcome::Malformed(e.to_string()),
    };
    let path = paths::resolve(&ctx.config.layer_dir(&directive.layer), script);

    if ctx.config.dry_run {
        ctx.log.dry_run(&format!("Would run {}", path.display()));
        return DirectiveOutcome::Previewed;
    }

    match run_install_script(&path, ctx.executor.as_ref(), ctx.log.as_ref()) {
        Ok(ScriptRun::Succeeded) => DirectiveOutcome::Applied,
        Ok(ScriptRun::NotExecutable) => DirectiveOutcome::Skipped("not executable".to_string()),
        Err(e) => DirectiveOutcome::Failed(format!("{e:#}")),
    }
}

fn link(ctx: &mut RunContext, directive: &Directive) -> DirectiveOutcome {
    let (source, destination) = match directive.link_args() {
        Ok(args) => args,
        Err(e) => return DirectiveOutcome::Malformed(e.to_string()),
    };
    let source = paths::resolve(&ctx.config.layer_dir(&directive.layer), source);
    let target = paths::resolve(&ctx.config.root, destination);
    let executor = Arc::clone(&ctx.executor);
    let resource = SymlinkResource::new(source, target, executor.as_ref());

    let result = if ctx.config.dry_run {
        preview_link(ctx, &resource)
    } else {
        apply_link(ctx, &resource)
    };
    result.unwrap_or_else(|e| DirectiveOutcome::Failed(format!("{e:#}")))
}

fn apply_link(ctx: &mut RunContext, resource: &SymlinkResource<'_>) -> Result<DirectiveOutcome> {
    let prompter = Arc::clone(&ctx.prompter);
    let target = resource.target.display();

    let mut state = resource.current_state()?;
    if matches!(state, ResourceState::Invalid { .. }) {
        if !ConflictResolver::ensure_source(&resource.source, prompter.as_ref())? {
            ctx.log.warn(&format!(
                "Not creating {}, skipping link {target}",
                resource.source.display()
            ));
            return Ok(DirectiveOutcome::Aborted);
        }
        ctx.log.info(&format!("Created {}", resource.source.display()));
        state = resource.current_state()?;
    }

    match ctx
        .conflicts
        .resolve(&state, &resource.target, prompter.as_ref())?
    {
        ConflictAction::SkipOnce | ConflictAction::SkipAll => {
            if state == ResourceState::Correct {
                ctx.log.debug(&format!("{target} already linked"));
                return Ok(DirectiveOutcome::Unchanged);
            }
            ctx.log.info(&format!("Skipping {target}"));
            return Ok(DirectiveOutcome::Skipped(
                "kept existing destination".to_string(),
            ));
        }
        ConflictAction::RemoveOnce | ConflictAction::RemoveAll => {
            match mutate::remove_at(&resource.target)? {
                ResourceChange::Skipped { reason } => ctx.log.warn(&reason),
                _ => ctx.log.info(&format!("Removed {target}")),
            }
        }
        ConflictAction::BackupOnce | ConflictAction::BackupAll => {
            let backup = mutate::backup_at(&resource.target, &ctx.config.backup_dir)?;
            ctx.log.info(&format!("Backed up {target} to {}", backup.display()));
        }
        ConflictAction::OverwriteOnce => {}
    }

    ctx.log.info(&format!("Linking {}", resource.description()));
    if resource.apply()? == ResourceChange::Elevated {
        ctx.log.info(&format!("Linked {target} with sudo"));
    }
    Ok(DirectiveOutcome::Applied)
}

fn preview_link(ctx: &RunContext, resource: &SymlinkResource<'_>) -> Result<DirectiveOutcome> {
    let target = resource.target.display();
    let source = resource.source.display();
    match resource.current_state()? {
        ResourceState::Correct => {
            ctx.log.debug(&format!("{target} already linked"));
            return Ok(DirectiveOutcome::Unchanged);
        }
        ResourceState::Invalid { reason } => ctx.log.dry_run(&format!(
            "Would ask to create {source} ({reason}), then link {target}"
        )),
        ResourceState::Missing => ctx.log.dry_run(&format!("Would link {target} -> {source}")),
        ResourceState::Incorrect { current } => ctx.log.dry_run(&format!(
            "Would ask what to do with {target} ({current}), then link it to {source}"
        )),
    }
    Ok(DirectiveOutcome::Previewed)
}
