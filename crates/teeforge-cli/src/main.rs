use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use serde_json::{json, Value};
use teeforge_contracts::config::StudioConfig;
use teeforge_contracts::events::{new_session_id, EventWriter};
use teeforge_contracts::prompts::DesignPrompt;
use teeforge_contracts::scene::{
    plan_texture, resolve_by_name, resolve_by_size, MeshResolution, SceneNodeData,
    TextureStrategy,
};
use teeforge_engine::{orchestrator_from_config, GltfScene, OrchestratorError, ProceduralTexture};

const VALIDATION_EXIT_CODE: i32 = 2;

#[derive(Debug, Parser)]
#[command(name = "teeforge", version, about = "T-shirt design generation pipelines")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Generate an image and a description for one prompt.
    Generate(GenerateArgs),
    /// Render the procedural texture without calling any service.
    Placeholder(PlaceholderArgs),
    /// Locate the garment mesh in a glTF asset or JSON scene.
    ResolveMesh(ResolveMeshArgs),
}

#[derive(Debug, Parser)]
struct GenerateArgs {
    #[arg(long)]
    prompt: String,
    #[arg(long)]
    out: PathBuf,
    #[arg(long)]
    events: Option<PathBuf>,
    #[arg(long)]
    config: Option<PathBuf>,
    #[arg(long)]
    seed: Option<u64>,
}

#[derive(Debug, Parser)]
struct PlaceholderArgs {
    #[arg(long)]
    prompt: String,
    #[arg(long)]
    out: PathBuf,
    #[arg(long)]
    seed: Option<u64>,
}

#[derive(Debug, Parser)]
struct ResolveMeshArgs {
    #[arg(long, conflicts_with = "scene_json", required_unless_present = "scene_json")]
    asset: Option<PathBuf>,
    #[arg(long)]
    scene_json: Option<PathBuf>,
    /// Comma-separated candidate mesh names, in priority order.
    #[arg(long, value_delimiter = ',')]
    names: Vec<String>,
    #[arg(long, value_enum, default_value_t = SearchStrategy::Name)]
    strategy: SearchStrategy,
    #[arg(long, value_enum, default_value_t = TextureMode::Overlay)]
    texture: TextureMode,
    #[arg(long)]
    config: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum SearchStrategy {
    Name,
    Size,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum TextureMode {
    Overlay,
    Material,
}

impl From<TextureMode> for TextureStrategy {
    fn from(mode: TextureMode) -> Self {
        match mode {
            TextureMode::Overlay => TextureStrategy::OverlayPlane,
            TextureMode::Material => TextureStrategy::MaterialSwap,
        }
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    match run() {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("teeforge error: {err:#}");
            std::process::exit(1);
        }
    }
}

fn run() -> Result<i32> {
    let cli = Cli::parse();
    match cli.command {
        Command::Generate(args) => {
            let config = StudioConfig::load(args.config.as_deref())?;
            run_generate(&args, &config)
        }
        Command::Placeholder(args) => run_placeholder(&args),
        Command::ResolveMesh(args) => {
            let config = StudioConfig::load(args.config.as_deref())?;
            let report = resolve_mesh_report(&args, &config)?;
            println!("{}", serde_json::to_string_pretty(&report)?);
            Ok(0)
        }
    }
}

fn run_generate(args: &GenerateArgs, config: &StudioConfig) -> Result<i32> {
    fs::create_dir_all(&args.out)
        .with_context(|| format!("failed creating output dir {}", args.out.display()))?;
    let events_path = args
        .events
        .clone()
        .unwrap_or_else(|| args.out.join("events.jsonl"));
    let events = EventWriter::new(&events_path, new_session_id());
    let procedural = match args.seed {
        Some(seed) => ProceduralTexture::with_seed(seed),
        None => ProceduralTexture::new(),
    };
    tracing::debug!(
        endpoints = ?config.endpoint_registry().list(),
        "image fallback chain configured"
    );
    let orchestrator = orchestrator_from_config(config, procedural, events.clone());

    let outcome = orchestrator.submit(&args.prompt);
    let state = orchestrator.state();
    write_json(&args.out.join("state.json"), &serde_json::to_value(&state)?)?;

    let report = match outcome {
        Ok(report) => report,
        Err(OrchestratorError::Validation(err)) => {
            eprintln!("{err}");
            return Ok(VALIDATION_EXIT_CODE);
        }
        Err(err) => return Err(err.into()),
    };

    let (_, bytes) = report.image.decode()?;
    let image_path = args
        .out
        .join(format!("design.{}", report.image.file_extension()));
    fs::write(&image_path, bytes)
        .with_context(|| format!("failed writing {}", image_path.display()))?;
    let description_path = args.out.join("description.txt");
    fs::write(&description_path, format!("{}\n", report.description))
        .with_context(|| format!("failed writing {}", description_path.display()))?;

    let summary = json!({
        "session_id": events.session_id(),
        "cycle": report.cycle,
        "image": image_path.display().to_string(),
        "mime_type": report.image.mime_type(),
        "description": report.description,
        "events": events_path.display().to_string(),
        "elapsed_ms": report.elapsed_ms,
    });
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(0)
}

fn run_placeholder(args: &PlaceholderArgs) -> Result<i32> {
    let prompt = match DesignPrompt::parse(&args.prompt) {
        Ok(prompt) => prompt,
        Err(err) => {
            eprintln!("{err}");
            return Ok(VALIDATION_EXIT_CODE);
        }
    };
    let texture = match args.seed {
        Some(seed) => ProceduralTexture::with_seed(seed),
        None => ProceduralTexture::new(),
    };
    let design = texture.design(prompt.as_str());
    fs::create_dir_all(&args.out)
        .with_context(|| format!("failed creating output dir {}", args.out.display()))?;
    let path = args.out.join("design.svg");
    fs::write(&path, &design.svg).with_context(|| format!("failed writing {}", path.display()))?;
    println!(
        "{}",
        serde_json::to_string_pretty(&json!({
            "style": design.style.name(),
            "image": path.display().to_string(),
        }))?
    );
    Ok(0)
}

fn resolve_mesh_report(args: &ResolveMeshArgs, config: &StudioConfig) -> Result<Value> {
    let root = match (&args.asset, &args.scene_json) {
        (Some(asset), _) => GltfScene::open(asset)?.into_root(),
        (None, Some(scene_json)) => load_scene_json(scene_json)?,
        (None, None) => bail!("either --asset or --scene-json is required"),
    };
    let names = if args.names.is_empty() {
        config.scene.candidate_names.clone()
    } else {
        args.names
            .iter()
            .map(|name| name.trim().to_string())
            .filter(|name| !name.is_empty())
            .collect()
    };

    let resolution = match args.strategy {
        SearchStrategy::Name => resolve_by_name(&root.flatten(), &names),
        SearchStrategy::Size => resolve_by_size(&root, config.scene.min_size),
    };
    let plan = plan_texture(&resolution, args.texture.into());
    let candidate = match &resolution {
        MeshResolution::Named { candidate, .. } => Some(candidate.clone()),
        _ => None,
    };
    Ok(json!({
        "method": resolution.method(),
        "found": resolution.is_found(),
        "mesh": resolution.node_name(),
        "candidate": candidate,
        "size": resolution.node().and_then(|node| node.size),
        "plan": plan,
    }))
}

fn load_scene_json(path: &Path) -> Result<SceneNodeData> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed reading scene {}", path.display()))?;
    let value: Value = serde_json::from_str(&raw)
        .with_context(|| format!("invalid scene JSON in {}", path.display()))?;
    if value.is_array() {
        let nodes: Vec<SceneNodeData> = serde_json::from_value(value)
            .with_context(|| format!("invalid scene nodes in {}", path.display()))?;
        return Ok(SceneNodeData::group("Scene", nodes));
    }
    serde_json::from_value(value).with_context(|| format!("invalid scene node in {}", path.display()))
}

fn write_json(path: &Path, value: &Value) -> Result<()> {
    let text = serde_json::to_string_pretty(value)?;
    fs::write(path, format!("{text}\n")).with_context(|| format!("failed writing {}", path.display()))
}
