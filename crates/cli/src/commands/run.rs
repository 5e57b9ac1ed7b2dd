//! `steward run`: execute a single task.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use steward_agent::{AgentResponse, AutonomousAgent, LoopSettings};
use steward_config::AppConfig;

pub async fn run(
    config: &AppConfig,
    query: &str,
    max_iterations: Option<u32>,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    if query.trim().is_empty() {
        return Err("The task must not be empty".into());
    }

    // Check for an API key early and give a clear error
    if !config.has_api_key() && config.default_provider != "ollama" {
        eprintln!();
        eprintln!("  ERROR: No API key configured!");
        eprintln!();
        eprintln!("  Set one of these environment variables:");
        eprintln!("    STEWARD_API_KEY   (generic)");
        eprintln!("    GEMINI_API_KEY    (Gemini, the default provider)");
        eprintln!("    OPENAI_API_KEY    (OpenAI-compatible providers)");
        eprintln!();
        eprintln!("  Or add it to your config file:");
        eprintln!("    {}", AppConfig::config_dir().join("config.toml").display());
        eprintln!();
        return Err("No API key found. See above for setup instructions.".into());
    }

    let agent = build_agent(config, max_iterations)?;

    // Ctrl+C stops the loop before its next phase
    let cancel = Arc::new(AtomicBool::new(false));
    let flag = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received, stopping after the current phase");
            flag.store(true, Ordering::SeqCst);
        }
    });

    let result = agent.execute_with_cancel(query, &cancel).await;

    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        eprint!("{}", render_steps(&result.intermediate_steps));
        println!("{}", result.final_response);
    }

    Ok(())
}

fn build_agent(
    config: &AppConfig,
    max_iterations: Option<u32>,
) -> Result<AutonomousAgent, Box<dyn std::error::Error>> {
    let providers = steward_providers::build_from_config(config);
    let provider = providers
        .default()
        .ok_or_else(|| format!("Provider '{}' is not configured", config.default_provider))?;
    let tools = Arc::new(steward_tools::default_registry(&config.tools)?);

    let mut settings = LoopSettings::from_config(&config.agent);
    if let Some(max) = max_iterations {
        if max == 0 {
            return Err("--max-iterations must be at least 1".into());
        }
        settings.max_iterations = max;
    }

    Ok(
        AutonomousAgent::new(provider, steward_providers::resolve_model(config), tools)
            .with_personas(Arc::new(config.persona_catalog()))
            .with_settings(settings),
    )
}

/// One block per trace entry, for a human reading stderr.
fn render_steps(steps: &[AgentResponse]) -> String {
    let mut out = String::new();
    for step in steps {
        out.push_str(&format!("── {} ──\n", step.agent_role));
        for line in step.content.lines() {
            out.push_str("  ");
            out.push_str(line);
            out.push('\n');
        }
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use steward_agent::AgentRole;

    #[test]
    fn steps_render_with_role_headers() {
        let steps = vec![
            AgentResponse::new(AgentRole::Planner, "Plan created: x", serde_json::Value::Null),
            AgentResponse::new(
                AgentRole::Summarizer,
                "Summary of execution:\n- Completed 1 iterations",
                serde_json::Value::Null,
            ),
        ];
        let rendered = render_steps(&steps);
        assert!(rendered.starts_with("── Task Planner ──\n  Plan created: x\n"));
        assert!(rendered.contains("── Task Summarizer ──\n  Summary of execution:\n  - Completed 1 iterations\n"));
    }

    #[test]
    fn max_iterations_override_applies() {
        let config = AppConfig {
            api_key: Some("test".into()),
            ..AppConfig::default()
        };
        let agent = build_agent(&config, Some(2)).unwrap();
        assert_eq!(agent.settings().max_iterations, 2);

        assert!(build_agent(&config, Some(0)).is_err());
    }
}
