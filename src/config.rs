use crate::pipeline::PipelineConfig;
use crate::server::ServerConfig;
use clap::{Args, Parser, Subcommand};
use num_cpus::get as get_cpu_count;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(version, about, long_about = None, args_conflicts_with_subcommands = true)]
pub struct CmdArgs {
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Used when no subcommand is given
    #[command(flatten)]
    pub serve: ServeArgs,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the HTTP detection service (default)
    Serve(ServeArgs),
    /// Paste a sprite over every nose found on an image
    Overlay(OverlayArgs),
}

#[derive(Args, Debug, Clone)]
pub struct ServeArgs {
    /// Address to bind
    #[arg(long, default_value = "127.0.0.1")]
    pub host: String,

    /// Port to listen on
    #[arg(short, long, default_value_t = 5001)]
    pub port: u16,

    /// Reject uploads larger than this. Unlimited if unset
    #[arg(long)]
    pub max_upload_bytes: Option<usize>,

    #[command(flatten)]
    pub model: ModelArgs,
}

#[derive(Args, Debug, Clone)]
pub struct OverlayArgs {
    /// Image to find noses on
    #[arg(short, long)]
    pub input: PathBuf,

    /// Sprite to paste over each nose, alpha is honored
    #[arg(long, value_name = "FILE")]
    pub overlay: PathBuf,

    /// Where to write the result
    #[arg(short, long)]
    pub output: PathBuf,

    /// Use a running service instead of loading the models locally
    #[arg(long, value_name = "URL")]
    pub server: Option<String>,

    #[command(flatten)]
    pub model: ModelArgs,
}

#[derive(Args, Debug, Clone)]
pub struct ModelArgs {
    /// Directory holding face_detection_short_range.onnx and face_landmark.onnx
    #[arg(long, default_value = "./models")]
    pub models_dir: PathBuf,

    /// Most faces considered per image
    #[arg(long, default_value_t = 30)]
    pub max_faces: usize,

    /// Threads per model session, capped at the CPU count
    #[arg(short, long)]
    pub max_threads: Option<usize>,

    #[arg(long, default_value_t = 0.5)]
    pub min_detection_confidence: f32,

    #[arg(long, default_value_t = 0.5)]
    pub min_presence_confidence: f32,
}

impl ServeArgs {
    pub fn server_config(&self) -> ServerConfig {
        ServerConfig {
            host: self.host.clone(),
            port: self.port,
            max_upload_bytes: self.max_upload_bytes,
        }
    }
}

impl ModelArgs {
    pub fn pipeline_config(&self) -> PipelineConfig {
        let total_threads = get_cpu_count();
        let threads = self.max_threads.unwrap_or(total_threads).min(total_threads);

        PipelineConfig {
            models_dir: self.models_dir.clone(),
            threads,
            max_faces: self.max_faces,
            min_detection_confidence: self.min_detection_confidence,
            min_presence_confidence: self.min_presence_confidence,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_is_well_formed() {
        CmdArgs::command().debug_assert();
    }

    #[test]
    fn bare_invocation_serves_with_defaults() {
        let args = CmdArgs::try_parse_from(["eymo-nose"]).unwrap();
        assert!(args.command.is_none());

        let server = args.serve.server_config();
        assert_eq!(server.host, "127.0.0.1");
        assert_eq!(server.port, 5001);
        assert_eq!(server.max_upload_bytes, None);

        let pipeline = args.serve.model.pipeline_config();
        assert_eq!(pipeline.max_faces, 30);
        assert_eq!(pipeline.models_dir, PathBuf::from("./models"));
        assert!(pipeline.threads >= 1);
    }

    #[test]
    fn serve_subcommand_flags() {
        let args = CmdArgs::try_parse_from([
            "eymo-nose",
            "serve",
            "--port",
            "8080",
            "--max-faces",
            "2",
            "--max-upload-bytes",
            "1024",
        ])
        .unwrap();
        let Some(Command::Serve(serve)) = args.command else {
            panic!("expected serve");
        };
        assert_eq!(serve.port, 8080);
        assert_eq!(serve.model.max_faces, 2);
        assert_eq!(serve.server_config().max_upload_bytes, Some(1024));
    }

    #[test]
    fn overlay_requires_paths() {
        assert!(CmdArgs::try_parse_from(["eymo-nose", "overlay", "-i", "in.jpg"]).is_err());

        let args = CmdArgs::try_parse_from([
            "eymo-nose",
            "overlay",
            "-i",
            "in.jpg",
            "--overlay",
            "nose.png",
            "-o",
            "out.png",
            "--server",
            "http://127.0.0.1:5001",
        ])
        .unwrap();
        let Some(Command::Overlay(overlay)) = args.command else {
            panic!("expected overlay");
        };
        assert_eq!(overlay.input, PathBuf::from("in.jpg"));
        assert_eq!(overlay.server.as_deref(), Some("http://127.0.0.1:5001"));
    }

    #[test]
    fn threads_capped_at_cpu_count() {
        let args = CmdArgs::try_parse_from(["eymo-nose", "--max-threads", "100000"]).unwrap();
        assert_eq!(args.serve.model.pipeline_config().threads, get_cpu_count());
    }
}
