use anyhow::{bail, Context, Result as AnyhowResult};
use clap::Parser;
use jsdoc_deco::host::{EditorId, InProcessHost, SimulatedEditor, USE_SYNTAX_SERVER_SETTING};
use jsdoc_deco::services::tracing_setup;
use jsdoc_deco::{DecoConfig, DecorationOptions, Extension, VirtualTextSink};
use jsdoc_deco_core::lsp_types::{Position, Range};
use jsdoc_deco_core::LineIndex;
use jsdoc_deco_languages::Dialect;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Show the JSDoc of const object members next to each access
#[derive(Parser, Debug)]
#[command(name = "jsdoc-deco")]
#[command(about = "Inline JSDoc for property accesses on const object literals", long_about = None)]
#[command(version)]
struct Args {
    /// TypeScript file to decorate
    #[arg(value_name = "FILE", required_unless_present_any = ["dump_config", "dump_schema"])]
    file: Option<PathBuf>,

    /// Language id of the document (default: from the file extension)
    #[arg(long, value_name = "ID")]
    language_id: Option<String>,

    /// Visible line range, 1-based and inclusive (e.g. 10:40). May be given
    /// more than once; without it the whole file is visible.
    #[arg(long, value_name = "START:END", value_parser = parse_line_range)]
    visible: Vec<Range>,

    /// Path to configuration file
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Path to log file (default: system temp dir)
    #[arg(long, value_name = "PATH")]
    log_file: Option<PathBuf>,

    /// Keep the language service in syntax-only mode, as a workspace that
    /// forbids changing the setting would
    #[arg(long)]
    syntax_server: bool,

    /// Print decorations as JSON
    #[arg(long)]
    json: bool,

    /// Print the effective configuration as JSON and exit
    #[arg(long)]
    dump_config: bool,

    /// Print the configuration JSON schema and exit
    #[arg(long)]
    dump_schema: bool,
}

fn parse_line_range(value: &str) -> Result<Range, String> {
    let (start, end) = value
        .split_once(':')
        .ok_or_else(|| format!("expected START:END, got '{}'", value))?;
    let start: u32 = start
        .trim()
        .parse()
        .map_err(|_| format!("invalid start line '{}'", start))?;
    let end: u32 = end
        .trim()
        .parse()
        .map_err(|_| format!("invalid end line '{}'", end))?;
    if start == 0 || end < start {
        return Err(format!("invalid line range '{}'", value));
    }
    Ok(Range::new(Position::new(start - 1, 0), Position::new(end, 0)))
}

fn language_id_for(args: &Args, path: &Path) -> String {
    if let Some(id) = &args.language_id {
        return id.clone();
    }
    Dialect::from_path(path)
        .map(|dialect| dialect.language_id().to_string())
        .unwrap_or_else(|| "plaintext".to_string())
}

fn print_decorations(text: &str, decorations: &[DecorationOptions]) {
    let index = LineIndex::new(text);
    for decoration in decorations {
        let start = index.offset_at(decoration.range.start);
        let end = index.offset_at(decoration.range.end);
        let source = text.get(start..end).unwrap_or_default();
        println!(
            "{}:{}  {}  // {}",
            decoration.range.start.line + 1,
            decoration.range.start.character + 1,
            source,
            decoration.after.content_text
        );
    }
}

async fn run(args: Args, config: DecoConfig, path: PathBuf) -> AnyhowResult<()> {
    let text = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let file_name = std::fs::canonicalize(&path)
        .unwrap_or_else(|_| path.clone())
        .to_string_lossy()
        .into_owned();
    let language_id = language_id_for(&args, &path);
    tracing::info!("Decorating {} as {}", file_name, language_id);

    let host = Arc::new(InProcessHost::new());
    if args.syntax_server {
        host.lock_configuration(USE_SYNTAX_SERVER_SETTING);
    }
    let sink = Arc::new(VirtualTextSink::new());
    let editor = SimulatedEditor::open(EditorId(1), host.clone(), &file_name, &language_id, &text);
    if !args.visible.is_empty() {
        editor.set_visible_ranges(args.visible.clone());
    }

    let extension = Extension::activate(host.clone(), sink.clone(), config, Some(editor)).await;
    extension.controller().settled().await;

    let decorations = sink.decorations(EditorId(1));
    if args.json {
        println!("{}", serde_json::to_string_pretty(&decorations)?);
    } else {
        print_decorations(&text, &decorations);
    }
    for warning in host.warnings() {
        eprintln!("warning: {}", warning);
    }

    extension.deactivate();
    Ok(())
}

fn main() -> AnyhowResult<()> {
    let args = Args::parse();

    let log_file = args
        .log_file
        .clone()
        .unwrap_or_else(|| std::env::temp_dir().join("jsdoc-deco.log"));
    if tracing_setup::init_global(&log_file).is_none() {
        eprintln!("warning: could not open log file {}", log_file.display());
    }

    let config = DecoConfig::load(args.config.as_deref()).context("Failed to load configuration")?;

    if args.dump_schema {
        println!("{}", serde_json::to_string_pretty(&DecoConfig::json_schema())?);
        return Ok(());
    }
    if args.dump_config {
        println!("{}", serde_json::to_string_pretty(&config)?);
        return Ok(());
    }

    let Some(path) = args.file.clone() else {
        bail!("no file given");
    };

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to start the async runtime")?;
    runtime.block_on(run(args, config, path))
}
