use console::style;

use crate::config::Settings;
use crate::llm::{LlmProvider, OllamaBackend};

/// Show the model configuration and list models installed in Ollama.
pub async fn cmd_llm_models(settings: &Settings) -> anyhow::Result<()> {
    let config = &settings.llm;

    println!("\n{}", style("LLM Configuration").bold());
    println!("{}", "-".repeat(40));
    println!("{:<20} {:?}", "Provider:", config.provider);
    println!("{:<20} {}", "Endpoint:", config.endpoint);
    println!("{:<20} {}", "Current Model:", config.model);
    match config.timeout_secs {
        Some(secs) => println!("{:<20} {}s", "Timeout:", secs),
        None => println!("{:<20} none", "Timeout:"),
    }

    if config.provider != LlmProvider::Ollama {
        println!(
            "\n{} Model listing is only supported for Ollama",
            style("!").yellow()
        );
        return Ok(());
    }

    let ollama = OllamaBackend::new(config.clone())?;
    if !ollama.is_available().await {
        println!(
            "\n{} LLM service not available at {}",
            style("!").yellow(),
            config.endpoint
        );
        println!("  Make sure Ollama is running: ollama serve");
        return Ok(());
    }

    println!("\n{}", style("Available Models").bold());
    println!("{}", "-".repeat(40));

    match ollama.list_models().await {
        Ok(models) if models.is_empty() => {
            println!("  No models installed");
            println!("  Install one with: ollama pull {}", config.model);
        }
        Ok(models) => {
            for model in models {
                let marker = if model == config.model {
                    style("*").green().to_string()
                } else {
                    " ".to_string()
                };
                println!("{} {}", marker, model);
            }
        }
        Err(e) => {
            println!("{} Failed to list models: {}", style("✗").red(), e);
        }
    }

    Ok(())
}
