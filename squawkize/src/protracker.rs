//! This module is entirely concerned with deserialising ProTracker `.mod` files.
//! Only the 31-sample, 4-channel layout (`M.K.` and look-alikes) is understood.

use std::{borrow::Cow, fmt::Display};

use nom::{
    bytes::complete::take, error::context, multi::fill, number::complete::be_u16, Finish, IResult,
};

use crate::{
    song::{
        Cell, EffectCode, Pattern, Sample, SampleBank, Song, NB_CHANNELS, ORDER_TABLE_LEN,
        PATTERN_LENGTH,
    },
    tones::period_to_note,
};

type PResult<'input, O> = IResult<&'input [u8], O, InnerError<'input>>;

pub fn parse_song(input: &[u8]) -> Result<Song<'_>, ParseError<'_>> {
    match song(input).finish() {
        Ok((trailing, song)) => {
            if !trailing.is_empty() {
                log::debug!("Ignoring {} bytes after the last sample", trailing.len());
            }
            Ok(song)
        }
        Err(inner) => Err(ParseError { input, inner }),
    }
}

#[derive(Debug, Clone)]
pub struct ParseError<'input> {
    input: &'input [u8],
    inner: InnerError<'input>,
}

impl ParseError<'_> {
    /// How many bytes into the data the failing read started.
    pub fn offset(&self) -> usize {
        let InnerError(errors) = &self.inner;
        errors
            .first()
            .map_or(0, |(remaining, _)| self.input.len() - remaining.len())
    }

    pub fn is_truncated(&self) -> bool {
        let InnerError(errors) = &self.inner;
        errors
            .iter()
            .any(|(_, kind)| matches!(kind, InnerErrorKind::Truncated))
    }
}

impl Display for ParseError<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let InnerError(errors) = &self.inner;
        if self.is_truncated() {
            writeln!(f, "The module ended early!")?;
        } else {
            writeln!(f, "There was an error parsing the module!")?;
        }
        for (remaining, kind) in errors {
            writeln!(
                f,
                "\t(0x{:<5x} bytes into the data) {kind}",
                self.input.len() - remaining.len(),
            )?;
        }
        write!(f, "(The file is most likely cut short, or not a ProTracker module at all.)")
    }
}

fn song(input: &[u8]) -> PResult<Song<'_>> {
    fn inner(input: &[u8]) -> PResult<Song<'_>> {
        let (input, title) = fixed_string(input, 20)?;
        let (input, mut samples) = sample_bank(input)?;
        let (input, song_length) = byte(input)?;
        let (input, _restart_pos) = byte(input)?;
        let (input, order_table) = raw_bytes(input, ORDER_TABLE_LEN)?;
        let (input, format_tag) = fixed_string(input, 4)?;

        let order_list = order_table[..usize::from(song_length).min(ORDER_TABLE_LEN)].to_vec();
        // Every slot up to the highest referenced one is stored, used or not.
        let nb_patterns = order_list
            .iter()
            .max()
            .map_or(0, |&highest| usize::from(highest) + 1);
        log::debug!(
            "Song length {song_length}, {nb_patterns} patterns stored, format tag {format_tag:?}"
        );

        let mut input = input;
        let mut patterns = Vec::with_capacity(nb_patterns);
        for _ in 0..nb_patterns {
            let (remaining, pattern) = pattern(input)?;
            patterns.push(pattern);
            input = remaining;
        }

        let (input, ()) = sample_payloads(input, &mut samples)?;

        Ok((
            input,
            Song {
                title,
                samples,
                order_list,
                format_tag,
                patterns,
            },
        ))
    }
    context("parsing module from here", inner)(input)
}

// Samples.

fn sample_bank(input: &[u8]) -> PResult<SampleBank<'_>> {
    fn inner(input: &[u8]) -> PResult<SampleBank<'_>> {
        let mut bank = std::array::from_fn(|_| Default::default());
        let (input, ()) = fill(sample_header, &mut bank)(input)?;
        Ok((input, bank))
    }
    context("parsing sample headers from here", inner)(input)
}

fn sample_header(input: &[u8]) -> PResult<Sample<'_>> {
    fn inner(input: &[u8]) -> PResult<Sample<'_>> {
        let (input, name) = fixed_string(input, 22)?;
        let (input, length_words) = word(input)?;
        let (input, finetune) = byte(input)?;
        let (input, volume) = byte(input)?;
        let (input, repeat_offset_words) = word(input)?;
        let (input, repeat_length_words) = word(input)?;

        Ok((
            input,
            Sample {
                name,
                length_words,
                finetune: remap_finetune(finetune),
                volume,
                repeat_offset_words,
                repeat_length_words,
                // Payloads come after the pattern data.
                data: &[],
            },
        ))
    }
    context("parsing sample header from here", inner)(input)
}

pub fn remap_finetune(raw: u8) -> u8 {
    (raw ^ 0x0F).wrapping_add(1) & 0x0F
}

fn sample_payloads<'input>(
    mut input: &'input [u8],
    samples: &mut SampleBank<'input>,
) -> PResult<'input, ()> {
    for (i, sample) in samples.iter_mut().enumerate() {
        let (remaining, data) = context(
            "reading sample payload from here",
            take(sample.byte_len()),
        )(input)?;
        log::trace!("Sample #{}: {} bytes", i + 1, data.len());
        sample.data = data;
        input = remaining;
    }
    Ok((input, ()))
}

// Patterns.

fn pattern(input: &[u8]) -> PResult<Pattern> {
    fn inner(mut input: &[u8]) -> PResult<Pattern> {
        let mut pattern = [[Cell::default(); PATTERN_LENGTH]; NB_CHANNELS];
        // Records are row-major: record `i` is channel `i % 4`, row `i / 4`.
        for row in 0..PATTERN_LENGTH {
            for channel in pattern.iter_mut() {
                let (remaining, cell) = cell(input)?;
                channel[row] = cell;
                input = remaining;
            }
        }
        Ok((input, pattern))
    }
    context("parsing pattern from here", inner)(input)
}

fn cell(input: &[u8]) -> PResult<Cell> {
    let (input, raw) = context("parsing cell from here", take(4usize))(input)?;
    Ok((input, decode_cell([raw[0], raw[1], raw[2], raw[3]])))
}

/// Record layout: `ssss pppp  pppp pppp  ssss eeee  eeee eeee`
/// (sample number split across bytes 0 and 2, 12-bit period, 12-bit effect).
pub fn decode_cell([a, b, c, d]: [u8; 4]) -> Cell {
    let sample = (a & 0xF0) | c >> 4;
    let period = u16::from(a & 0x0F) << 8 | u16::from(b);
    let effect = u16::from(c & 0x0F) << 8 | u16::from(d);

    Cell {
        pitch: period_to_note(period),
        sample,
        effect: EffectCode::new(effect),
    }
}

// Elementary types.

fn byte(input: &[u8]) -> PResult<u8> {
    context("reading byte from here", nom::number::complete::u8)(input)
}

fn word(input: &[u8]) -> PResult<u16> {
    context("reading big-endian word from here", be_u16)(input)
}

fn raw_bytes(input: &[u8], len: usize) -> PResult<&[u8]> {
    context("reading raw bytes from here", take(len))(input)
}

/// Only NUL padding is stripped, and only at the end; spaces are kept verbatim.
fn fixed_string(input: &[u8], len: usize) -> PResult<Cow<'_, str>> {
    let (input, raw) = context("reading fixed-size string from here", take(len))(input)?;
    let end = raw.iter().rposition(|&byte| byte != 0).map_or(0, |i| i + 1);
    Ok((input, String::from_utf8_lossy(&raw[..end])))
}

// Error handling.

#[derive(Debug, Clone)]
struct InnerError<'input>(Vec<(&'input [u8], InnerErrorKind)>);

impl<'input> nom::error::ParseError<&'input [u8]> for InnerError<'input> {
    fn from_error_kind(input: &'input [u8], kind: nom::error::ErrorKind) -> Self {
        Self(vec![(input, kind.into())])
    }

    fn append(input: &'input [u8], kind: nom::error::ErrorKind, other: Self) -> Self {
        let Self(mut errors) = other;
        errors.push((input, kind.into()));
        Self(errors)
    }
}

impl<'input> nom::error::ContextError<&'input [u8]> for InnerError<'input> {
    fn add_context(input: &'input [u8], ctx: &'static str, mut other: Self) -> Self {
        other.0.push((input, InnerErrorKind::Context(ctx)));
        other
    }
}

#[derive(Debug, Clone)]
enum InnerErrorKind {
    Truncated,
    Context(&'static str),
    Nom(nom::error::ErrorKind),
}

impl From<nom::error::ErrorKind> for InnerErrorKind {
    fn from(kind: nom::error::ErrorKind) -> Self {
        match kind {
            nom::error::ErrorKind::Eof => Self::Truncated,
            kind => Self::Nom(kind),
        }
    }
}

impl Display for InnerErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Truncated => write!(f, "Data ended before this read could complete"),
            Self::Context(ctx) => f.write_str(ctx),
            Self::Nom(err) => write!(f, "Error in parser \"{}\"", err.description()),
        }
    }
}
