use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "leafscan")]
#[command(version, about = "Plant disease classifier served over HTTP", long_about = None)]
pub struct Cli {
	#[command(subcommand)]
	pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
	/// Download the model artifact if it is not already on disk.
	///
	/// An existing file is reused as-is; delete it to fetch a new one.
	Pull {
		/// Artifact URL (defaults to the configured export URL)
		#[arg(long)]
		url: Option<String>,
	},

	/// Download (once) and load the model, then start the HTTP server.
	///
	/// An existing artifact file is reused as-is; delete it after changing
	/// LEAFSCAN_ARTIFACT_URL.
	Serve {
		/// Device to run on (e.g., "cpu" or "cuda:0")
		#[arg(long, default_value = "cpu")]
		device: String,

		/// Port to listen on
		#[arg(long, default_value = "5000")]
		port: u16,

		/// Host to bind to
		#[arg(long, default_value = "0.0.0.0")]
		host: String,
	},

	/// Classify a local image file
	Run {
		/// Path to the image
		image: PathBuf,

		/// Number of ranked classes to print
		#[arg(long, default_value = "3")]
		top: usize,

		/// Device to run on (e.g., "cpu" or "cuda:0")
		#[arg(long, default_value = "cpu")]
		device: String,
	},

	/// List the classes the model predicts, or check a single class name
	Labels {
		/// Class name to look up
		name: Option<String>,
	},
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn serve_defaults() {
		let cli = Cli::try_parse_from(["leafscan", "serve"]).unwrap();
		match cli.command {
			Commands::Serve { device, port, host } => {
				assert_eq!(device, "cpu");
				assert_eq!(port, 5000);
				assert_eq!(host, "0.0.0.0");
			}
			_ => panic!("expected serve"),
		}
	}

	#[test]
	fn labels_takes_optional_name() {
		let cli = Cli::try_parse_from(["leafscan", "labels", "Apple___healthy"]).unwrap();
		match cli.command {
			Commands::Labels { name } => assert_eq!(name.as_deref(), Some("Apple___healthy")),
			_ => panic!("expected labels"),
		}
	}

	#[test]
	fn run_takes_image_path() {
		let cli = Cli::try_parse_from(["leafscan", "run", "leaf.jpg", "--top", "5"]).unwrap();
		match cli.command {
			Commands::Run { image, top, .. } => {
				assert_eq!(image, PathBuf::from("leaf.jpg"));
				assert_eq!(top, 5);
			}
			_ => panic!("expected run"),
		}
	}
}
