use persona_config::{ExecutionPolicy, PersonaConfig};
use persona_plugin::discovery;

use super::{PluginAction, blocking, execution_path, plugin_host};

pub(super) async fn cmd_plugin(
    config: PersonaConfig,
    action: PluginAction,
) -> persona_core::Result<()> {
    match action {
        PluginAction::List { json } => list(config, json).await,
        PluginAction::Info { id, via } => info(config, id, via).await,
        PluginAction::Call {
            id,
            export,
            input,
            via,
        } => {
            let exec = execution_path(&config, via);
            let output = blocking(move || {
                let host = plugin_host(&config)?;
                let descriptor = discovery::find_plugin(host.plugin_dir(), &id)?;
                let mut handle = host.load(&descriptor, exec)?;
                handle.call(&export, &input)
            })
            .await?;
            println!("{output}");
            Ok(())
        }
    }
}

async fn list(config: PersonaConfig, json: bool) -> persona_core::Result<()> {
    let root = config.plugins.plugin_dir.clone();
    let plugins = blocking(move || {
        let plugins = discovery::discover_plugins(&root)?;
        let manifests = plugins.iter().map(discovery::read_manifest).collect::<Vec<_>>();
        Ok(plugins.into_iter().zip(manifests).collect::<Vec<_>>())
    })
    .await?;

    if json {
        let descriptors: Vec<_> = plugins.iter().map(|(p, _)| p).collect();
        println!("{}", serde_json::to_string_pretty(&descriptors)?);
        return Ok(());
    }

    if plugins.is_empty() {
        println!(
            "No plugins installed in {}.",
            config.plugins.plugin_dir.display()
        );
        return Ok(());
    }

    for (p, manifest) in plugins {
        let summary = match manifest {
            Ok(Some(manifest)) => format!(
                " v{} — {}",
                manifest.plugin.version, manifest.plugin.description
            ),
            Ok(None) => String::new(),
            Err(e) => format!(" (invalid manifest: {e})"),
        };
        println!("  {}{}", p.id, summary);
    }
    Ok(())
}

async fn info(
    config: PersonaConfig,
    id: String,
    via: Option<ExecutionPolicy>,
) -> persona_core::Result<()> {
    let exec = execution_path(&config, via);
    let (descriptor, manifest, module, exports) = blocking(move || {
        let host = plugin_host(&config)?;
        let descriptor = discovery::find_plugin(host.plugin_dir(), &id)?;
        let manifest = discovery::read_manifest(&descriptor)?;
        let module = discovery::resolve_module(&descriptor, manifest.as_ref())?;
        // Loading also runs the contract check
        let exports = host
            .load(&descriptor, exec)
            .map(|handle| (handle.exports(), handle.memory_pages()));
        Ok((descriptor, manifest, module, exports))
    })
    .await?;

    println!("\x1b[1m{}\x1b[0m", descriptor.id);
    println!("  Directory: {}", descriptor.source_path.display());
    println!("  Module: {}", module.display());

    if let Some(manifest) = manifest {
        let meta = &manifest.plugin;
        match manifest.semver() {
            Some(version) => println!("  Version: {version}"),
            None => println!("  Version: {} (not semver)", meta.version),
        }
        if !meta.description.is_empty() {
            println!("  {}", meta.description);
        }
        if !meta.authors.is_empty() {
            println!("  Authors: {}", meta.authors.join(", "));
        }
        if let Some(ref checksum) = meta.checksum {
            println!("  Checksum: {}", short_checksum(checksum));
        }
    }

    match exports {
        Ok((exports, pages)) => {
            println!("  Memory: {} pages", pages);
            println!("\n  \x1b[1mEntry points ({exec}):\x1b[0m");
            for export in exports {
                println!("    {export}");
            }
        }
        Err(e) => println!("\n  ❌ {e}"),
    }
    Ok(())
}

/// First 16 characters of a manifest checksum.
fn short_checksum(checksum: &str) -> String {
    checksum.chars().take(16).collect()
}
