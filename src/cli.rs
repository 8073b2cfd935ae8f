// ============================================================================
// AdStudio CLI: headless export and template management
// ============================================================================
//
// Usage examples:
//   AdStudio creative.json --export                      (PNG next to the JSON)
//   AdStudio creative.json --export -o final.png
//   AdStudio 'batch/*.json' --export --output-dir out/
//   AdStudio creative.json --template "Promo A" --export --write-back
//   AdStudio creative.json --save-template "Promo A"
//   AdStudio --list-templates
//   AdStudio --delete-template 5b0e...
//
// No window is opened in CLI mode.

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Instant;

use clap::Parser;

use crate::editor::EditorSession;
use crate::io::{export_png, load_creative, save_creative};
use crate::ops::fonts::FontBook;
use crate::settings::EditorSettings;
use crate::templates::{ApplyMode, TemplateStore};

// ============================================================================
// CLI argument definition (clap Derive)
// ============================================================================

/// AdStudio headless creative processor.
#[derive(Parser, Debug)]
#[command(
    name = "AdStudio",
    about = "Layer-based ad creative editor",
    long_about = "Edit generated ad creatives (JSON documents with a base image and\n\
                  text/button layers). Without flags the editor window opens.\n\n\
                  Example:\n  \
                  AdStudio creative.json --template \"Promo A\" --export\n  \
                  AdStudio 'batch/*.json' --export --output-dir out/"
)]
pub struct CliArgs {
    /// Creative JSON file(s). Glob patterns accepted (e.g. "ads/*.json").
    #[arg(value_name = "CREATIVE.json")]
    pub creatives: Vec<String>,

    /// Rasterize each creative to PNG.
    #[arg(long)]
    pub export: bool,

    /// Output PNG path. Only valid for a single creative.
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Output directory for exported PNGs (named creative-<id>.png).
    #[arg(long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Apply the named template before exporting or saving.
    #[arg(long, value_name = "NAME")]
    pub template: Option<String>,

    /// Add the template's layers on top instead of replacing the creative's layers.
    #[arg(long, requires = "template")]
    pub append: bool,

    /// Save each creative's layers as a template with this name.
    #[arg(long, value_name = "NAME")]
    pub save_template: Option<String>,

    /// Print the stored templates.
    #[arg(long)]
    pub list_templates: bool,

    /// Delete the template with this id.
    #[arg(long, value_name = "ID")]
    pub delete_template: Option<String>,

    /// Template store file (overrides the settings).
    #[arg(long, value_name = "FILE")]
    pub templates: Option<PathBuf>,

    /// Write the (possibly modified) layers back into each creative file.
    #[arg(long)]
    pub write_back: bool,

    /// Echo the log to stderr at debug level and print per-file timing.
    #[arg(short, long)]
    pub verbose: bool,
}

impl CliArgs {
    /// True when any headless flag was given. Otherwise `main()` opens the
    /// editor window (on the first creative, if one was named).
    pub fn is_headless(&self) -> bool {
        self.needs_creatives() || self.list_templates || self.delete_template.is_some()
    }

    /// True when creatives must be given for the requested work.
    fn needs_creatives(&self) -> bool {
        self.export || self.template.is_some() || self.save_template.is_some() || self.write_back
    }
}

// ============================================================================
// Public entry point
// ============================================================================

/// Run all CLI processing and return an OS exit code.
/// `0` = everything succeeded, `1` = anything failed.
pub fn run(args: CliArgs, settings: &EditorSettings) -> ExitCode {
    let store_path = args.templates.clone().unwrap_or_else(|| settings.template_store_path());
    let mut store = TemplateStore::open_file(&store_path);
    let mut any_failure = false;

    if let Some(id) = &args.delete_template {
        match store.delete(id) {
            Ok(true) => println!("Deleted template {}", id),
            Ok(false) => {
                eprintln!("error: no template with id '{}'", id);
                any_failure = true;
            }
            Err(e) => {
                eprintln!("error: {}", e);
                any_failure = true;
            }
        }
    }

    if args.list_templates {
        print_templates(&store);
    }

    let inputs = resolve_inputs(&args.creatives);
    if inputs.is_empty() {
        if args.needs_creatives() {
            eprintln!("error: no creative files matched the given pattern(s).");
            return ExitCode::FAILURE;
        }
        return if any_failure { ExitCode::FAILURE } else { ExitCode::SUCCESS };
    }

    if inputs.len() > 1 && args.output.is_some() {
        eprintln!(
            "error: {} creatives given but --output only accepts a single file path.\n\
             Use --output-dir to specify a destination directory for batch export.",
            inputs.len()
        );
        return ExitCode::FAILURE;
    }

    if let Some(dir) = &args.output_dir {
        if let Err(e) = std::fs::create_dir_all(dir) {
            eprintln!("error: could not create output directory '{}': {}", dir.display(), e);
            return ExitCode::FAILURE;
        }
    }

    let fonts = FontBook::from_settings(settings);
    let total = inputs.len();
    let multi = total > 1;

    for (idx, input) in inputs.iter().enumerate() {
        if multi || args.verbose {
            println!("[{}/{}] {}", idx + 1, total, input.display());
        }
        let started = Instant::now();
        match run_one(input, &args, settings, &mut store, &fonts) {
            Ok(Some(out)) => {
                if multi || args.verbose {
                    println!("  → {} ({:.0}ms)", out.display(), started.elapsed().as_secs_f64() * 1000.0);
                }
            }
            Ok(None) => {}
            Err(e) => {
                eprintln!("  error: {}", e);
                log::error!("{}: {}", input.display(), e);
                any_failure = true;
            }
        }
    }

    if any_failure { ExitCode::FAILURE } else { ExitCode::SUCCESS }
}

// ============================================================================
// Per-creative pipeline
// ============================================================================

/// Process one creative. Returns the exported PNG path, if any.
pub fn run_one(
    input: &Path,
    args: &CliArgs,
    settings: &EditorSettings,
    store: &mut TemplateStore,
    fonts: &FontBook,
) -> Result<Option<PathBuf>, String> {
    // -- Step 1: Load ----------------------------------------------------
    let mut creative = load_creative(input).map_err(|e| e.to_string())?;
    let mut session = EditorSession::open(&creative, settings.max_undo_steps);

    // -- Step 2: Template (optional) -------------------------------------
    if let Some(name) = &args.template {
        let template = store
            .find_by_name(name, Some(creative.aspect_ratio))
            .ok_or_else(|| format!("no template named '{}'", name))?
            .clone();
        if template.aspect_ratio != creative.aspect_ratio {
            log::warn!(
                "Template '{}' is {} but creative {} is {}",
                template.name,
                template.aspect_ratio,
                creative.id,
                creative.aspect_ratio
            );
        }
        let mode = if args.append { ApplyMode::Append } else { ApplyMode::Replace };
        session.apply_template(&template, mode);
    }

    if let Some(name) = &args.save_template {
        match session.save_as_template(store, name).map_err(|e| e.to_string())? {
            Some(t) => println!("  saved template '{}' ({})", t.name, t.id),
            None => return Err("template name must not be empty".to_string()),
        }
    }

    session.apply_to(&mut creative);

    // -- Step 3: Export --------------------------------------------------
    let base_dir = input.parent().map(Path::to_path_buf);
    let exported = if args.export {
        let out = build_output_path(
            input,
            &creative.export_file_name(),
            args.output.as_deref(),
            args.output_dir.as_deref().or(settings.export_directory.as_deref()),
        );
        export_png(&creative, base_dir.as_deref(), fonts, &out).map_err(|e| e.to_string())?;
        Some(out)
    } else {
        None
    };

    // -- Step 4: Write back ----------------------------------------------
    if args.write_back {
        save_creative(&creative, input).map_err(|e| e.to_string())?;
    }

    Ok(exported)
}

// ============================================================================
// Helpers
// ============================================================================

fn print_templates(store: &TemplateStore) {
    if store.is_empty() {
        println!("No templates stored.");
        return;
    }
    for t in store.templates() {
        println!("{}  {:<5} {:>2} layer(s)  {}", t.id, t.aspect_ratio.label(), t.layers.len(), t.name);
    }
}

/// Turn the positional arguments into creative files, in argument order and
/// without duplicates. A directory stands for the `*.json` files directly
/// inside it; anything that is not an existing path is treated as a glob.
fn resolve_inputs(patterns: &[String]) -> Vec<PathBuf> {
    let mut found: Vec<PathBuf> = Vec::new();

    for pattern in patterns {
        let literal = Path::new(pattern);
        if literal.is_dir() {
            let mut jsons: Vec<PathBuf> = std::fs::read_dir(literal)
                .map(|rd| rd.flatten().map(|e| e.path()).filter(|p| is_json(p)).collect())
                .unwrap_or_default();
            jsons.sort();
            if jsons.is_empty() {
                eprintln!("warning: no creatives in directory '{}'.", pattern);
            }
            for path in jsons {
                push_unique(&mut found, path);
            }
            continue;
        }
        if literal.exists() {
            push_unique(&mut found, literal.to_path_buf());
            continue;
        }

        let entries = match glob::glob(pattern) {
            Ok(entries) => entries,
            Err(e) => {
                eprintln!("warning: invalid glob '{}': {}", pattern, e);
                continue;
            }
        };
        let mut matched = 0;
        for path in entries.flatten().filter(|p| p.is_file()) {
            push_unique(&mut found, path);
            matched += 1;
        }
        if matched == 0 {
            eprintln!("warning: '{}' matched no creatives.", pattern);
        }
    }

    found
}

fn push_unique(found: &mut Vec<PathBuf>, path: PathBuf) {
    if !found.contains(&path) {
        found.push(path);
    }
}

fn is_json(path: &Path) -> bool {
    path.is_file() && path.extension().is_some_and(|ext| ext.eq_ignore_ascii_case("json"))
}

/// Compute where a creative's PNG goes.
///
/// Priority:
/// 1. `--output` (explicit path)
/// 2. `--output-dir` or the configured export directory
/// 3. Next to the creative file
fn build_output_path(input: &Path, file_name: &str, output: Option<&Path>, output_dir: Option<&Path>) -> PathBuf {
    if let Some(out) = output {
        return out.to_path_buf();
    }
    let dir = output_dir
        .map(Path::to_path_buf)
        .unwrap_or_else(|| input.parent().unwrap_or(Path::new(".")).to_path_buf());
    dir.join(file_name)
}
