use std::path::PathBuf;

use persona_config::PersonaConfig;

pub(super) async fn cmd_serve(
    mut config: PersonaConfig,
    listen: Option<String>,
    plugin_dir: Option<PathBuf>,
) -> persona_core::Result<()> {
    if let Some(listen) = listen {
        config.gateway.listen = listen;
    }
    if let Some(dir) = plugin_dir {
        config.plugins.plugin_dir = dir;
    }

    println!("🔌 Persona gateway v{}", env!("CARGO_PKG_VERSION"));
    println!("   Listen: http://{}", config.gateway.listen);
    println!("   Plugins: {}", config.plugins.plugin_dir.display());
    if config.gateway.cors {
        println!("   CORS: permissive");
    }
    println!();

    if !config.plugins.plugin_dir.is_dir() {
        tracing::warn!(
            plugin_dir = %config.plugins.plugin_dir.display(),
            "plugin directory does not exist; /api/plugins will report an error"
        );
    }

    persona_gateway::start_server(config.gateway, config.plugins.plugin_dir).await
}
