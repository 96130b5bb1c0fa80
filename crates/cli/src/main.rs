#![deny(unsafe_code)]
//! CLI driver for the procedural starfield.
//!
//! Subcommands:
//! - `run`: scroll a field for N ticks, optionally morph its schema, write a PNG
//! - `presets`: print the available schema presets

mod error;

use clap::{Parser, Subcommand};
use error::CliError;
use serde_json::Value;
use starfield_core::{
    preset, FieldConfig, ParticleField, SchemaPatch, SchemaSnapshot, StarfieldError,
};
use std::path::PathBuf;
use std::process;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

/// Particles per square unit of viewport when `--density` is not given.
const DEFAULT_DENSITY_FRACTION: f64 = 0.0005;

#[derive(Parser)]
#[command(name = "starfield", about = "Procedural scrolling starfield")]
struct Cli {
    /// Output as JSON instead of human-readable text.
    #[arg(long, global = true)]
    json: bool,

    /// Log at debug level (otherwise RUST_LOG, default warn).
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Scroll a field and write the final viewport as a PNG.
    Run {
        /// Viewport width in world units (and output pixels).
        #[arg(short = 'W', long, default_value_t = 500.0)]
        width: f64,

        /// Viewport height in world units (and output pixels).
        #[arg(short = 'H', long, default_value_t = 500.0)]
        height: f64,

        /// Particle count. Defaults to 0.0005 per square unit of viewport.
        #[arg(short, long)]
        density: Option<usize>,

        /// PRNG seed for particle placement.
        #[arg(long, default_value_t = 42)]
        seed: u64,

        /// Number of centre moves to simulate.
        #[arg(short, long, default_value_t = 100)]
        ticks: usize,

        /// Centre movement per tick along x.
        #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
        dx: f64,

        /// Centre movement per tick along y.
        #[arg(long, default_value_t = -1.0, allow_negative_numbers = true)]
        dy: f64,

        /// Base schema preset.
        #[arg(short, long, default_value = "stars")]
        preset: String,

        /// JSON object of schema keys layered over the preset.
        #[arg(long)]
        schema: Option<String>,

        /// JSON object of schema keys to morph toward.
        #[arg(long)]
        morph: Option<String>,

        /// Tick at which `--morph` is applied. Defaults to halfway.
        #[arg(long)]
        morph_at: Option<usize>,

        /// Reads per morph.
        #[arg(long, default_value_t = starfield_core::DEFAULT_MORPH_DURATION)]
        morph_duration: u32,

        /// Output file path.
        #[arg(short, long, default_value = "starfield.png")]
        output: PathBuf,
    },
    /// List available schema presets.
    Presets,
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn parse_object(arg: &str, flag: &str) -> Result<Value, CliError> {
    let value: Value = serde_json::from_str(arg)
        .map_err(|e| CliError::argument(flag, format!("invalid JSON: {e}")))?;
    if !value.is_object() {
        return Err(CliError::argument(flag, "expected a JSON object"));
    }
    Ok(value)
}

/// `over`'s keys replace `base`'s.
fn layer(base: Value, over: Value) -> Value {
    match (base, over) {
        (Value::Object(mut base), Value::Object(over)) => {
            base.extend(over);
            Value::Object(base)
        }
        (base, _) => base,
    }
}

fn base_schema(preset_name: &str, overrides: Option<&str>) -> Result<SchemaPatch, CliError> {
    let preset = preset::from_name(preset_name)?;
    let Some(overrides) = overrides else {
        return Ok(preset);
    };
    let merged = layer(serde_json::to_value(&preset)?, parse_object(overrides, "--schema")?);
    SchemaPatch::from_json(&merged).map_err(|e| CliError::argument("--schema", e))
}

/// The `--morph` target, validated before any ticks run.
fn morph_patch(arg: &str) -> Result<SchemaPatch, CliError> {
    let invalid = |e: StarfieldError| CliError::argument("--morph", e);
    let patch = SchemaPatch::from_json(&parse_object(arg, "--morph")?).map_err(invalid)?;
    // value checks do not depend on the snapshot merged over
    SchemaSnapshot::default().merge(&patch).map_err(invalid)?;
    Ok(patch)
}

fn run(cli: Cli) -> Result<(), CliError> {
    match cli.command {
        Command::Presets => {
            let names = preset::list_names();
            if cli.json {
                let presets: serde_json::Map<String, Value> = names
                    .iter()
                    .map(|&name| -> Result<(String, Value), CliError> {
                        let patch = preset::from_name(name)?;
                        Ok((name.to_string(), serde_json::to_value(patch)?))
                    })
                    .collect::<Result<_, _>>()?;
                println!("{}", serde_json::to_string_pretty(&Value::Object(presets))?);
            } else {
                println!("Presets:");
                for name in names {
                    println!("  {name}");
                }
            }
        }
        Command::Run {
            width,
            height,
            density,
            seed,
            ticks,
            dx,
            dy,
            preset,
            schema,
            morph,
            morph_at,
            morph_duration,
            output,
        } => {
            let patch = base_schema(&preset, schema.as_deref())?;
            let morph = morph.as_deref().map(morph_patch).transpose()?;
            let morph_at = morph_at.unwrap_or(ticks / 2);

            let mut config = FieldConfig {
                width,
                height,
                seed,
                morph_duration,
                ..FieldConfig::default()
            };
            config = match density {
                Some(d) => FieldConfig { density: d, ..config },
                None => config.with_density_fraction(DEFAULT_DENSITY_FRACTION),
            };

            let mut field = ParticleField::new(&config, &patch)?;
            let mut wrapped = 0;
            for tick in 0..ticks {
                if tick == morph_at {
                    if let Some(target) = &morph {
                        field.set_schema(target)?;
                        info!(tick, "schema morph started");
                    }
                }
                let centre = field.centre();
                field.set_centre(centre.x + dx, centre.y + dy);
                wrapped += field.reconcile();
            }
            debug!(ticks, wrapped, "simulation finished");

            starfield_render::snapshot::write_png(&field, &output)?;

            let visible = field
                .particles()
                .iter()
                .filter(|p| p.attributes().visible)
                .count();
            let centre = field.centre();
            if cli.json {
                let schema = field.schema().borrow();
                let info = serde_json::json!({
                    "width": width,
                    "height": height,
                    "density": field.len(),
                    "seed": seed,
                    "ticks": ticks,
                    "centre": [centre.x, centre.y],
                    "wrapped": wrapped,
                    "visible": visible,
                    "tinted": field.supports_tint(),
                    "morphing": schema.is_morphing(),
                    "morph_remaining": schema.remaining(),
                    "schema": schema.snapshot_to_json(),
                    "output": output.display().to_string(),
                });
                println!("{}", serde_json::to_string_pretty(&info)?);
            } else {
                eprintln!(
                    "scrolled {} particles for {ticks} ticks to ({}, {}), {wrapped} wraps, {visible} visible -> {}",
                    field.len(),
                    centre.x,
                    centre.y,
                    output.display()
                );
            }
        }
    }

    Ok(())
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    let json_mode = cli.json;
    if let Err(e) = run(cli) {
        if json_mode {
            let j = serde_json::json!({"error": e.to_string(), "exit_code": e.exit_code()});
            eprintln!("{}", serde_json::to_string_pretty(&j).unwrap_or_default());
        } else {
            eprintln!("error: {e}");
        }
        process::exit(e.exit_code());
    }
}
