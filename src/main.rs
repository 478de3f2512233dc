mod artifact;
mod classifier;
mod cli;
mod config;
mod error;
mod lifecycle;
mod server;
#[cfg(test)]
mod testing;

use artifact::{ArtifactManifest, ArtifactProvisioner, Provisioned};
use candle_core::Device;
use classifier::{Classifier, LabelSet};
use clap::Parser;
use cli::{Cli, Commands};
use config::Config;
use error::Result;

fn parse_device(device_str: &str) -> Result<Device> {
    match device_str {
        "cpu" => Ok(Device::Cpu),
        s if s.starts_with("cuda") => {
            let parts: Vec<&str> = s.split(':').collect();
            let ordinal = if parts.len() > 1 {
                parts[1].parse::<usize>().map_err(|_| {
                    error::Error::InvalidInput(format!("Invalid CUDA device: {}", s))
                })?
            } else {
                0
            };
            Device::new_cuda(ordinal).map_err(|e| {
                error::Error::ConfigError(format!("Failed to initialize CUDA device: {}", e))
            })
        }
        _ => Err(error::Error::InvalidInput(format!(
            "Unknown device: {}",
            device_str
        ))),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = Config::from_env()?;

    match cli.command {
        Commands::Pull { url } => {
            let url = url.unwrap_or_else(|| config.artifact_url.clone());
            let outcome = ArtifactProvisioner::new()
                .ensure(&url, &config.artifact_path)
                .await?;

            match outcome {
                Provisioned::Downloaded { bytes } => {
                    println!("✓ Downloaded model artifact ({} bytes)", bytes);
                }
                Provisioned::AlreadyPresent => {
                    println!("✓ Model artifact already present");
                }
            }
            println!("  Path: {:?}", config.artifact_path);
            if let Some(manifest) = ArtifactManifest::load(&config.artifact_path)? {
                println!("  Source: {}", manifest.url);
                println!("  Downloaded: {}", manifest.downloaded_at);
            }
        }

        Commands::Serve { device, port, host } => {
            let device = parse_device(&device)?;
            let device_name = format!("{:?}", device);

            let mut startup = lifecycle::Startup::new();
            let state = match startup.run(&config, device).await {
                Ok(state) => state,
                Err(e) => {
                    if e.is_fatal() {
                        tracing::error!("Refusing to serve, startup {}: {}", startup.phase(), e);
                    }
                    return Err(e);
                }
            };

            println!("🌿 Leafscan server starting...");
            println!("   Device: {}", device_name);
            println!("   Listening on: http://{}:{}", host, port);
            println!("   Analyze: http://{}:{}/analyze", host, port);
            println!("   Health: http://{}:{}/api/health", host, port);

            server::serve(&host, port, state).await?;
        }

        Commands::Run { image, top, device } => {
            let device = parse_device(&device)?;

            ArtifactProvisioner::new()
                .ensure(&config.artifact_url, &config.artifact_path)
                .await?;

            let model = Classifier::load(&config.artifact_path, LabelSet::plant_disease(), device)?;

            let bytes = std::fs::read(&image)?;
            let decoded = classifier::preprocess::decode(&bytes)?;

            tracing::info!("Classifying {:?}", image);
            let ranked = model.rank(&decoded, top.max(1))?;

            let output = serde_json::json!({
                "image": image,
                "result": ranked.first().map(|p| p.label.clone()),
                "input_side": model.input_side(),
                "top": ranked,
            });

            println!("{}", serde_json::to_string_pretty(&output)?);
        }

        Commands::Labels { name: Some(name) } => {
            let labels = LabelSet::plant_disease();
            if !labels.contains(&name) {
                return Err(error::Error::InvalidInput(format!("Unknown class: {}", name)));
            }
            println!("✓ {} is a known class", name);
        }

        Commands::Labels { name: None } => {
            let labels = LabelSet::plant_disease();
            println!("{} classes:\n", labels.len());
            for (i, label) in labels.iter().enumerate() {
                println!("  {:>2}  {}", i, label);
            }
        }
    }

    Ok(())
}
