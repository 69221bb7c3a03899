//! Cartridge command line
//!
//! ```text
//! cartridge render <tree.json> [--template index.html] [--config cartridge.config.json] [--out page.html]
//! ```

use std::path::PathBuf;
use std::process::ExitCode;

use cartridge_dom::config::CONFIG_FILE_NAME;
use cartridge_dom::{build_style_cache, render_page, CartridgeConfig, Template, TreeLoader};
use tracing_subscriber::EnvFilter;

const USAGE: &str = "Usage: cartridge <command>

Available Commands:
  render <tree.json>   Render a tree snapshot to HTML

Options:
  --template <file>    HTML template with <!--app-head--> and <!--app-html-->
  --config <file>      Configuration file (default: cartridge.config.json)
  --out <file>         Write the page to a file instead of stdout
";

#[derive(Debug, Default)]
struct RenderArgs {
    tree: PathBuf,
    template: Option<PathBuf>,
    config: Option<PathBuf>,
    out: Option<PathBuf>,
}

impl RenderArgs {
    fn parse(args: &[String]) -> Result<Self, String> {
        let mut parsed = RenderArgs::default();
        let mut tree = None;
        let mut iter = args.iter();

        while let Some(arg) = iter.next() {
            let mut value = |flag: &str| {
                iter.next()
                    .map(PathBuf::from)
                    .ok_or_else(|| format!("Missing value for {}", flag))
            };
            match arg.as_str() {
                "--template" => parsed.template = Some(value("--template")?),
                "--config" => parsed.config = Some(value("--config")?),
                "--out" => parsed.out = Some(value("--out")?),
                flag if flag.starts_with("--") => return Err(format!("Unknown option {}", flag)),
                path if tree.is_none() => tree = Some(PathBuf::from(path)),
                extra => return Err(format!("Unexpected argument {}", extra)),
            }
        }

        parsed.tree = tree.ok_or_else(|| "Missing tree snapshot path".to_string())?;
        Ok(parsed)
    }
}

async fn render(args: RenderArgs) -> Result<(), Box<dyn std::error::Error>> {
    let config_path = args
        .config
        .unwrap_or_else(|| PathBuf::from(CONFIG_FILE_NAME));
    let config = CartridgeConfig::load(&config_path)?;
    let cache = build_style_cache(&config)?;

    let snapshot: serde_json::Value =
        serde_json::from_str(&tokio::fs::read_to_string(&args.tree).await?)?;
    let mut loader = TreeLoader::new();
    loader.load(&snapshot)?;
    let arena = loader.into_arena();

    let template = match &args.template {
        Some(path) => Template::load(path).await?,
        None => Template::default(),
    };

    let output = render_page(&arena, cache, &config).await?;
    let page = template.apply(&output);

    match &args.out {
        Some(path) => {
            tokio::fs::write(path, page).await?;
            tracing::info!(path = ?path, "page written");
        }
        None => print!("{}", page),
    }
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();

    match args.first().map(String::as_str) {
        Some("render") => {
            let parsed = match RenderArgs::parse(&args[1..]) {
                Ok(parsed) => parsed,
                Err(message) => {
                    eprintln!("{}\n\n{}", message, USAGE);
                    return ExitCode::FAILURE;
                }
            };
            match render(parsed).await {
                Ok(()) => ExitCode::SUCCESS,
                Err(e) => {
                    tracing::error!("render failed: {}", e);
                    ExitCode::FAILURE
                }
            }
        }
        Some("--help") | Some("-h") | None => {
            print!("{}", USAGE);
            ExitCode::SUCCESS
        }
        Some(other) => {
            eprintln!("Unknown command '{}'. Please use cartridge --help to see the available commands.", other);
            ExitCode::FAILURE
        }
    }
}
