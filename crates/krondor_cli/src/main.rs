use std::fs;
use std::path::{Path, PathBuf};
use std::process;

use clap::Parser;
use krondor_core::layout::{MAX_ZONE, MIN_ZONE};
use krondor_core::types::ZoneNumber;
use krondor_core::{GameData, ModelTable, ObjectCatalog, SaveLayout};
use krondor_render::{
    FieldSelection, TextRenderOptions, render_json_full, render_json_selected,
    render_models_json, render_models_text, render_selected_pairs, render_text,
};
use serde_json::{Map as JsonMap, Value as JsonValue};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(author, version, about)]
struct Cli {
    #[arg(value_name = "PATH")]
    path: PathBuf,
    #[arg(long)]
    name: bool,
    #[arg(long)]
    chapter: bool,
    #[arg(long)]
    location: bool,
    #[arg(long)]
    time: bool,
    #[arg(long)]
    gold: bool,
    #[arg(long)]
    party: bool,
    #[arg(long)]
    keys: bool,
    #[arg(long)]
    containers: bool,
    #[arg(long)]
    shops: bool,
    #[arg(long)]
    json: bool,
    /// Restrict container output to one zone (1-12).
    #[arg(long, value_name = "N", value_parser = parse_zone)]
    zone: Option<ZoneNumber>,
    /// TOML file overriding save offsets.
    #[arg(long, value_name = "FILE")]
    layout: Option<PathBuf>,
    /// TOML object catalog used to name items.
    #[arg(long, value_name = "FILE")]
    objects: Option<PathBuf>,
    /// Print an event flag (decimal or 0x hex).
    #[arg(long = "flag", value_name = "PTR", value_parser = parse_event_ptr)]
    flags: Vec<u16>,
    #[arg(long = "set-flag", value_name = "PTR", value_parser = parse_event_ptr)]
    set_flags: Vec<u16>,
    #[arg(long = "clear-flag", value_name = "PTR", value_parser = parse_event_ptr)]
    clear_flags: Vec<u16>,
    #[arg(long, value_name = "PATH")]
    output: Option<PathBuf>,
    /// Treat PATH as a model table and list its models.
    #[arg(long)]
    tbl: bool,
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    fn field_selection(&self) -> FieldSelection {
        FieldSelection {
            name: self.name,
            chapter: self.chapter,
            location: self.location,
            time: self.time,
            gold: self.gold,
            party: self.party,
            keys: self.keys,
            containers: self.containers,
            shops: self.shops,
        }
    }

    fn has_edits(&self) -> bool {
        !self.set_flags.is_empty() || !self.clear_flags.is_empty()
    }
}

fn init_logging(verbose: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(if verbose { "debug" } else { "warn" }));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let fields = cli.field_selection();
    let has_edits = cli.has_edits();

    if has_edits && cli.output.is_none() {
        eprintln!("--set-flag/--clear-flag require --output <PATH>");
        process::exit(2);
    }
    if !has_edits && cli.output.is_some() {
        eprintln!("--output requires at least one --set-flag or --clear-flag");
        process::exit(2);
    }
    if cli.tbl && (has_edits || !cli.flags.is_empty() || fields.is_any_selected()) {
        eprintln!("--tbl cannot be combined with save fields or flag options");
        process::exit(2);
    }

    let bytes = fs::read(&cli.path).unwrap_or_else(|e| {
        eprintln!("Error reading {}: {e}", cli.path.display());
        process::exit(1);
    });
    debug!(path = %cli.path.display(), len = bytes.len(), "read input");

    if cli.tbl {
        print_models(&cli, &bytes);
        return;
    }

    let layout = match &cli.layout {
        Some(path) => load_or_exit("layout", path, SaveLayout::load),
        None => SaveLayout::default(),
    };
    let catalog = match &cli.objects {
        Some(path) => load_or_exit("object catalog", path, ObjectCatalog::load),
        None => ObjectCatalog::anonymous(),
    };

    let mut game = GameData::from_bytes(bytes, layout, &catalog).unwrap_or_else(|e| {
        eprintln!("Error parsing save file: {}", cli.path.display());
        eprintln!("  {e} ({:?})", e.code());
        process::exit(1);
    });

    for &ptr in &cli.set_flags {
        game.set_event_flag_true(ptr).unwrap_or_else(|e| {
            eprintln!("Error setting flag 0x{ptr:x}: {e}");
            process::exit(1);
        });
    }
    for &ptr in &cli.clear_flags {
        game.set_event_flag_false(ptr).unwrap_or_else(|e| {
            eprintln!("Error clearing flag 0x{ptr:x}: {e}");
            process::exit(1);
        });
    }

    if let Some(out_path) = cli.output.as_ref().filter(|_| has_edits) {
        fs::write(out_path, game.as_bytes()).unwrap_or_else(|e| {
            eprintln!("Error writing {}: {e}", out_path.display());
            process::exit(1);
        });
        info!(path = %out_path.display(), "wrote edited save");
    }

    let flag_values: Vec<(u16, u8)> = cli
        .flags
        .iter()
        .map(|&ptr| {
            let value = game.read_event(ptr).unwrap_or_else(|e| {
                eprintln!("Error reading flag 0x{ptr:x}: {e}");
                process::exit(1);
            });
            (ptr, value)
        })
        .collect();

    if cli.json {
        let mut json = if fields.is_any_selected() || !flag_values.is_empty() {
            render_json_selected(&game, &fields, cli.zone)
        } else {
            render_json_full(&game)
        };
        if !flag_values.is_empty()
            && let JsonValue::Object(map) = &mut json
        {
            let mut flags = JsonMap::new();
            for (ptr, value) in &flag_values {
                flags.insert(format!("0x{ptr:x}"), JsonValue::from(*value));
            }
            map.insert("flags".to_string(), JsonValue::Object(flags));
        }
        let rendered = serde_json::to_string_pretty(&json).unwrap_or_else(|e| {
            eprintln!("Error rendering JSON output: {e}");
            process::exit(1);
        });
        println!("{rendered}");
        return;
    }

    for (ptr, value) in &flag_values {
        println!("flag[0x{ptr:x}]={value}");
    }
    if fields.is_any_selected() {
        for (key, value) in render_selected_pairs(&game, &fields, cli.zone) {
            println!("{key}={value}");
        }
        return;
    }
    if !flag_values.is_empty() {
        return;
    }

    if let Some(out_path) = &cli.output {
        println!("Wrote edited save to {}", out_path.display());
        return;
    }

    print!(
        "{}",
        render_text(
            &game,
            TextRenderOptions {
                verbose: cli.verbose,
                zone: cli.zone,
            },
        )
    );
}

fn print_models(cli: &Cli, bytes: &[u8]) {
    let table = ModelTable::parse(bytes).unwrap_or_else(|e| {
        eprintln!("Error parsing model table: {}", cli.path.display());
        eprintln!("  {e} ({:?})", e.code());
        process::exit(1);
    });

    if cli.json {
        let rendered =
            serde_json::to_string_pretty(&render_models_json(table.models())).unwrap_or_else(|e| {
                eprintln!("Error rendering JSON output: {e}");
                process::exit(1);
            });
        println!("{rendered}");
    } else {
        print!("{}", render_models_text(table.models()));
    }
}

fn load_or_exit<T, E: std::fmt::Display>(
    what: &str,
    path: &Path,
    load: impl FnOnce(&Path) -> Result<T, E>,
) -> T {
    load(path).unwrap_or_else(|e| {
        eprintln!("Error loading {what} {}: {e}", path.display());
        process::exit(1);
    })
}

fn parse_event_ptr(value: &str) -> Result<u16, String> {
    let parsed = match value
        .strip_prefix("0x")
        .or_else(|| value.strip_prefix("0X"))
    {
        Some(hex) => u16::from_str_radix(hex, 16),
        None => value.parse::<u16>(),
    };
    parsed.map_err(|e| format!("invalid event pointer '{value}': {e}"))
}

fn parse_zone(value: &str) -> Result<ZoneNumber, String> {
    let zone: u8 = value
        .parse()
        .map_err(|e| format!("invalid zone '{value}': {e}"))?;
    if !(MIN_ZONE..=MAX_ZONE).contains(&zone) {
        return Err(format!("zone must be in {MIN_ZONE}..={MAX_ZONE}, got {zone}"));
    }
    Ok(ZoneNumber(zone))
}
