use std::{
    fmt::Display,
    fs::File,
    io::{BufWriter, StdoutLock, Write},
    path::Path,
};

use chrono::prelude::*;
use clap::{crate_name, crate_version};

use crate::{
    crunch::{crunch, ChannelRole, SquawkCell},
    song::{Song, NB_CHANNELS, PATTERN_LENGTH},
};

/// Squawk's channel slots, in emission order, and which tracker channel feeds each.
/// Tracker channel 0 feeds the high-register voice, hence the octave shift.
pub const CHANNEL_ORDER: [(usize, ChannelRole); NB_CHANNELS] = [
    (3, ChannelRole::Plain),
    (2, ChannelRole::Plain),
    (0, ChannelRole::OctaveUp),
    (1, ChannelRole::Plain),
];

/// The player can't index past these.
pub const MAX_PATTERNS: usize = 64;
pub const MAX_ORDERS: usize = 64;

/// Identifiers of the generated C objects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableNames {
    pub pattern: String,
    pub order: String,
    pub order_count: String,
}

impl Default for TableNames {
    fn default() -> Self {
        Self {
            pattern: "pattern".into(),
            order: "order".into(),
            order_count: "order_count".into(),
        }
    }
}

/// Every pattern, in storage order (not play order), four cells per row.
pub fn squawk_cells<'song>(song: &'song Song<'song>) -> impl Iterator<Item = SquawkCell> + 'song {
    song.patterns.iter().flat_map(|pattern| {
        (0..PATTERN_LENGTH).flat_map(move |row| {
            CHANNEL_ORDER
                .iter()
                .map(move |&(channel, role)| crunch(&pattern[channel][row], role))
        })
    })
}

pub fn encode(song: &Song, names: &TableNames) -> String {
    Table { song, names }.to_string()
}

#[derive(Debug, Clone, Copy)]
struct Table<'a> {
    song: &'a Song<'a>,
    names: &'a TableNames,
}

impl Display for Table<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let Self { song, names } = self;

        writeln!(f, "static const pattern_t {}[] PROGMEM = {{", names.pattern)?;
        let mut nb_cells = 0;
        for (i, cell) in squawk_cells(song).enumerate() {
            match i % NB_CHANNELS {
                0 if i != 0 => f.write_str(",\n  ")?,
                0 => f.write_str("  ")?,
                _ => f.write_str(", ")?,
            }
            write!(f, "{cell}")?;
            nb_cells += 1;
        }
        if nb_cells != 0 {
            writeln!(f)?;
        }
        writeln!(f, "}};")?;

        write!(f, "static const uint8_t {}[] PROGMEM = {{", names.order)?;
        for (i, order) in song.order_list.iter().enumerate() {
            if i != 0 {
                f.write_str(", ")?;
            }
            write!(f, "{order}")?;
        }
        writeln!(f, "}};")?;
        writeln!(
            f,
            "static uint8_t {} = {};",
            names.order_count,
            song.order_list.len()
        )
    }
}

pub fn export(
    output: &mut impl Write,
    song: &Song,
    input_path: &Path,
    names: &TableNames,
) -> std::io::Result<()> {
    writeln!(
        output,
        "// Generated from {} on {}",
        input_path.display(),
        Utc::now().trunc_subsecs(0),
    )?;
    writeln!(output, "// Module: {}", song.title)?;
    writeln!(output, "// Format: {}", song.format_tag)?;
    writeln!(
        output,
        "// Generated with {} version {}",
        crate_name!(),
        crate_version!(),
    )?;
    writeln!(output)?;
    write!(output, "{}", Table { song, names })?;
    writeln!(output)
}

#[derive(Debug)]
pub enum Output {
    File(BufWriter<File>),
    Stdout(StdoutLock<'static>),
}

impl Output {
    pub fn new(path: Option<&Path>) -> std::io::Result<Self> {
        Ok(match path {
            Some(path) => Self::File(BufWriter::new(File::create(path)?)),
            None => Self::Stdout(std::io::stdout().lock()),
        })
    }
}

impl Write for Output {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        match self {
            Self::File(file) => file.write(buf),
            Self::Stdout(lock) => lock.write(buf),
        }
    }

    fn flush(&mut self) -> std::io::Result<()> {
        match self {
            Self::File(file) => file.flush(),
            Self::Stdout(lock) => lock.flush(),
        }
    }
}
