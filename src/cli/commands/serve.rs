//! Upload server command.

use std::sync::Arc;

use console::style;

use super::build_pipeline;
use crate::config::Settings;

/// Start the upload server.
pub async fn cmd_serve(settings: &Settings, bind: &str) -> anyhow::Result<()> {
    let (host, port) = parse_bind_address(bind)?;
    let pipeline = Arc::new(build_pipeline(settings)?);

    println!(
        "{} Starting mailroom server at http://{}:{}",
        style("→").cyan(),
        host,
        port
    );
    println!("  Uploads are stored in {}", settings.upload_dir.display());
    println!("  Press Ctrl+C to stop");

    crate::server::serve(pipeline, settings.upload_dir.clone(), &host, port).await
}

/// Parse a bind address that can be:
/// - Just a port: "5000" -> 127.0.0.1:5000
/// - Just a host: "0.0.0.0" -> 0.0.0.0:5000
/// - Host and port: "0.0.0.0:5000" -> 0.0.0.0:5000
fn parse_bind_address(bind: &str) -> anyhow::Result<(String, u16)> {
    if let Ok(port) = bind.parse::<u16>() {
        return Ok(("127.0.0.1".to_string(), port));
    }

    if let Some((host, port_str)) = bind.rsplit_once(':') {
        if let Ok(port) = port_str.parse::<u16>() {
            return Ok((host.to_string(), port));
        }
        anyhow::bail!("Invalid port in bind address: {}", bind);
    }

    Ok((bind.to_string(), 5000))
}
