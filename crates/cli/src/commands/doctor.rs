//! `docchat doctor` — Diagnose configuration and provider access.

use docchat_config::AppConfig;

pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    println!("🩺 DocChat Doctor — System Diagnostics");
    println!("======================================\n");

    let mut issues = 0;

    // Check config file
    let config_path = AppConfig::config_path();
    if config_path.exists() {
        println!("  ✅ Config file found: {}", config_path.display());
    } else {
        println!("  ⚠️  No config file — defaults in use (run `docchat onboard` to create one)");
    }

    let config = match AppConfig::load() {
        Ok(config) => {
            println!("  ✅ Config valid");
            config
        }
        Err(e) => {
            println!("  ❌ Config invalid: {e}");
            println!("\n  ⚠️  Fix the config before running further checks.");
            return Ok(());
        }
    };

    println!(
        "  ✅ Provider: {} / model {}",
        config.default_provider,
        config.effective_model()
    );
    println!(
        "  ✅ History ordering: {} (documents up to {} MiB)",
        config.history.ordering,
        config.documents.max_bytes / (1024 * 1024)
    );

    // Check API key
    if config.has_api_key() {
        println!("  ✅ API key configured");
    } else {
        println!("  ⚠️  No API key — set GOOGLE_API_KEY or add api_key to config.toml");
        issues += 1;
    }

    // Check provider reachability
    match docchat_providers::build_from_config(&config)
        .and_then(|router| router.default_client())
    {
        Ok(client) => match client.health_check().await {
            Ok(true) => {
                let models = client.list_models().await.unwrap_or_default();
                println!(
                    "  ✅ Provider '{}' reachable ({} models listed)",
                    client.name(),
                    models.len()
                );
                let model = config.effective_model();
                if !models.is_empty() && !models.iter().any(|m| m == model) {
                    println!("  ⚠️  Model '{model}' not in the provider's model list");
                    issues += 1;
                }
            }
            Ok(false) => {
                println!("  ❌ Provider '{}' rejected the request (check the API key)", client.name());
                issues += 1;
            }
            Err(e) => {
                println!("  ❌ Provider unreachable: {e}");
                issues += 1;
            }
        },
        Err(e) => {
            println!("  ❌ Provider not configured: {e}");
            issues += 1;
        }
    }

    // Summary
    println!();
    if issues == 0 {
        println!("  🎉 All checks passed!");
    } else {
        println!("  ⚠️  {issues} issue(s) found. See above for details.");
    }

    Ok(())
}
