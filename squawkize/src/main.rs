use std::{
    io::Write,
    path::{Path, PathBuf},
    process::exit,
};

use clap::Parser;
use termcolor::{Color, ColorChoice, ColorSpec, StandardStream, WriteColor};

mod crunch;
mod export;
mod protracker;
mod song;
mod tones;

use export::{Output, TableNames, MAX_ORDERS, MAX_PATTERNS};
use song::Song;

/// Converts ProTracker modules into Squawk pattern tables.
#[derive(Debug, Parser)]
#[command(version, about)]
pub struct CliArgs {
    /// The `.mod` files to convert, in order.
    #[arg(required = true)]
    inputs: Vec<PathBuf>,
    /// Where to write the tables; standard output if omitted.
    #[arg(short, long = "output")]
    output_path: Option<PathBuf>,
    /// Name of the generated pattern array.
    #[arg(long, default_value = "pattern")]
    pattern_array: String,
    /// Name of the generated order array.
    #[arg(long, default_value = "order")]
    order_array: String,
    /// Name of the generated order count variable.
    #[arg(long, default_value = "order_count")]
    order_count: String,
    /// Refuse modules not tagged `M.K.`, instead of merely warning about them.
    #[arg(long)]
    strict: bool,
}

impl CliArgs {
    fn table_names(&self) -> TableNames {
        TableNames {
            pattern: self.pattern_array.clone(),
            order: self.order_array.clone(),
            order_count: self.order_count.clone(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
enum AppError {
    #[error("Failed to read \"{}\": {source}", .path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to parse \"{}\":\n{message}", .path.display())]
    Parse { path: PathBuf, message: String },
    #[error("\"{}\" is tagged {tag:?} rather than \"M.K.\" (drop `--strict` to convert it anyway)", .path.display())]
    UnexpectedTag { path: PathBuf, tag: String },
    #[error("Cannot write {0} modules' tables to a single output file")]
    AmbiguousOutput(usize),
    #[error("Failed to write output: {0}")]
    Write(#[from] std::io::Error),
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("squawkize=info"))
        .init();

    let args = CliArgs::parse();
    if let Err(err) = run(&args) {
        report(&err);
        exit(1);
    }
}

fn run(args: &CliArgs) -> Result<(), AppError> {
    if args.output_path.is_some() && args.inputs.len() > 1 {
        return Err(AppError::AmbiguousOutput(args.inputs.len()));
    }

    let names = args.table_names();
    let mut output = Output::new(args.output_path.as_deref())?;
    for input_path in &args.inputs {
        let data = std::fs::read(input_path).map_err(|source| AppError::Read {
            path: input_path.clone(),
            source,
        })?;
        let song = protracker::parse_song(&data).map_err(|err| {
            log::debug!("Failing read started at offset 0x{:x}", err.offset());
            AppError::Parse {
                path: input_path.clone(),
                message: err.to_string(),
            }
        })?;

        check_song(&song, input_path, args.strict)?;
        export::export(&mut output, &song, input_path, &names)?;
    }
    output.flush()?;
    Ok(())
}

/// Nothing here stops the conversion, except a bad tag in strict mode.
fn check_song(song: &Song, path: &Path, strict: bool) -> Result<(), AppError> {
    log::info!("Processing module: {}", song.title);
    log::info!("Pattern count: {}", song.patterns.len());
    log::info!("Order count: {}", song.order_list.len());
    for (i, sample) in song.samples.iter().enumerate() {
        if sample.length_words == 0 {
            continue;
        }
        log::debug!(
            "Sample #{}: {:?}, {} bytes, finetune {}, volume {}, loop {}+{} words",
            i + 1,
            sample.name,
            sample.data.len(),
            sample.finetune,
            sample.volume,
            sample.repeat_offset_words,
            sample.repeat_length_words,
        );
    }

    if song.format_tag != "M.K." {
        if strict {
            return Err(AppError::UnexpectedTag {
                path: path.to_owned(),
                tag: song.format_tag.to_string(),
            });
        }
        log::warn!(
            "Module is tagged {:?} rather than \"M.K.\", converting anyway",
            song.format_tag
        );
    }
    if song.patterns.len() > MAX_PATTERNS || song.order_list.len() > MAX_ORDERS {
        log::warn!(
            "The player supports at most {MAX_PATTERNS} patterns and {MAX_ORDERS} orders; this module has {} and {}",
            song.patterns.len(),
            song.order_list.len(),
        );
    }
    for unsupported in crunch::scan_unsupported(song) {
        log::warn!("{unsupported}");
    }
    Ok(())
}

fn report(err: &AppError) {
    let mut stderr = StandardStream::stderr(ColorChoice::Auto);
    // If stderr itself is broken, there's nowhere left to complain to.
    let _ = stderr.set_color(ColorSpec::new().set_fg(Some(Color::Red)).set_bold(true));
    let _ = write!(stderr, "error");
    let _ = stderr.reset();
    let _ = writeln!(stderr, ": {err}");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protracker::{parse_song, tests::ModuleBuilder};
    use clap::CommandFactory;

    #[test]
    fn cli_is_well_formed() {
        CliArgs::command().debug_assert();
    }

    #[test]
    fn cli_defaults() {
        let args = CliArgs::parse_from(["squawkize", "lompakko.mod"]);
        assert_eq!(args.inputs, [PathBuf::from("lompakko.mod")]);
        assert_eq!(args.output_path, None);
        assert!(!args.strict);
        assert_eq!(args.table_names(), TableNames::default());
    }

    #[test]
    fn cli_overrides() {
        let args = CliArgs::parse_from([
            "squawkize",
            "a.mod",
            "-o",
            "a.h",
            "--pattern-array",
            "a_pattern",
            "--order-array",
            "a_order",
            "--order-count",
            "a_order_count",
            "--strict",
        ]);
        assert_eq!(args.output_path, Some(PathBuf::from("a.h")));
        assert!(args.strict);
        assert_eq!(args.table_names().pattern, "a_pattern");
        assert_eq!(args.table_names().order, "a_order");
        assert_eq!(args.table_names().order_count, "a_order_count");
    }

    #[test]
    fn several_inputs_need_stdout() {
        let args = CliArgs::parse_from(["squawkize", "a.mod", "b.mod", "-o", "out.h"]);
        assert!(matches!(run(&args), Err(AppError::AmbiguousOutput(2))));
    }

    #[test]
    fn missing_input_is_reported() {
        let args = CliArgs::parse_from([
            "squawkize",
            "this/file/does/not/exist.mod",
            "-o",
            "/dev/null",
        ]);
        assert!(matches!(run(&args), Err(AppError::Read { .. })));
    }

    #[test]
    fn tag_is_only_enforced_when_strict() {
        let data = ModuleBuilder::new().tag(b"FLT4").build();
        let song = parse_song(&data).unwrap();
        let path = Path::new("flt4.mod");

        assert!(check_song(&song, path, false).is_ok());
        let err = check_song(&song, path, true).unwrap_err();
        assert!(matches!(&err, AppError::UnexpectedTag { tag, .. } if tag == "FLT4"));

        let data = ModuleBuilder::new().build();
        let song = parse_song(&data).unwrap();
        assert!(check_song(&song, path, true).is_ok());
    }
}
