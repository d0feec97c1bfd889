use std::{borrow::Cow, fmt::Display};

/// Rows per pattern.
pub const PATTERN_LENGTH: usize = 64;
/// Channels per pattern; the `M.K.` family is strictly 4-channel.
pub const NB_CHANNELS: usize = 4;
/// Sample slots declared in every module header.
pub const NB_SAMPLES: usize = 31;
/// Size of the order table, whatever the declared song length.
pub const ORDER_TABLE_LEN: usize = 128;

#[derive(Debug, Clone)]
pub struct Song<'input> {
    pub title: Cow<'input, str>,
    pub samples: SampleBank<'input>,
    /// Already truncated to the declared song length.
    pub order_list: Vec<u8>,
    pub format_tag: Cow<'input, str>,
    /// One per index in `0..=max(order_list)`, whether the order list references it or not.
    pub patterns: Vec<Pattern>,
}

pub type SampleBank<'input> = [Sample<'input>; NB_SAMPLES];

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Sample<'input> {
    pub name: Cow<'input, str>,
    pub length_words: u16,
    pub finetune: u8,
    pub volume: u8,
    pub repeat_offset_words: u16,
    pub repeat_length_words: u16,
    pub data: &'input [u8],
}

impl Sample<'_> {
    pub fn byte_len(&self) -> usize {
        usize::from(self.length_words) * 2
    }
}

/// Indexed as `pattern[channel][row]`.
pub type Pattern = [Channel; NB_CHANNELS];

pub type Channel = [Cell; PATTERN_LENGTH];

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Cell {
    pub pitch: Pitch,
    /// 0 means "no sample".
    pub sample: u8,
    pub effect: EffectCode,
}

/// The raw 12-bit effect command, as the tracker displays it (three hex digits).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct EffectCode(u16);

impl EffectCode {
    pub const fn new(raw: u16) -> Self {
        Self(raw & 0x0FFF)
    }

    /// The command digit (first of the three).
    pub const fn command(self) -> u8 {
        (self.0 >> 8) as u8
    }

    /// The parameter byte (last two digits).
    pub const fn param(self) -> u8 {
        self.0 as u8
    }
}

impl Display for EffectCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:03X}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Pitch {
    #[default]
    Rest,
    Note(PitchClass, u8),
}

impl Pitch {
    pub const fn octave_up(self) -> Self {
        match self {
            Self::Rest => Self::Rest,
            Self::Note(class, octave) => Self::Note(class, octave + 1),
        }
    }
}

/// Prints the tracker notation, e.g. `C-2`, `F#1`, or `---` for a rest.
impl Display for Pitch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Rest => f.write_str("---"),
            Self::Note(class, octave) => write!(
                f,
                "{}{}{octave}",
                class.letter(),
                if class.is_sharp() { '#' } else { '-' },
            ),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PitchClass {
    C,
    CSharp,
    D,
    DSharp,
    E,
    F,
    FSharp,
    G,
    GSharp,
    A,
    ASharp,
    B,
}

impl PitchClass {
    pub const ALL: [Self; 12] = [
        Self::C,
        Self::CSharp,
        Self::D,
        Self::DSharp,
        Self::E,
        Self::F,
        Self::FSharp,
        Self::G,
        Self::GSharp,
        Self::A,
        Self::ASharp,
        Self::B,
    ];

    pub const fn letter(self) -> char {
        match self {
            Self::C | Self::CSharp => 'C',
            Self::D | Self::DSharp => 'D',
            Self::E => 'E',
            Self::F | Self::FSharp => 'F',
            Self::G | Self::GSharp => 'G',
            Self::A | Self::ASharp => 'A',
            Self::B => 'B',
        }
    }

    pub const fn is_sharp(self) -> bool {
        matches!(
            self,
            Self::CSharp | Self::DSharp | Self::FSharp | Self::GSharp | Self::ASharp
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pitch_notation() {
        assert_eq!(Pitch::Note(PitchClass::C, 2).to_string(), "C-2");
        assert_eq!(Pitch::Note(PitchClass::FSharp, 1).to_string(), "F#1");
        assert_eq!(Pitch::Rest.to_string(), "---");
    }

    #[test]
    fn octave_up_leaves_rests_alone() {
        assert_eq!(
            Pitch::Note(PitchClass::C, 2).octave_up(),
            Pitch::Note(PitchClass::C, 3)
        );
        assert_eq!(Pitch::Rest.octave_up(), Pitch::Rest);
    }

    #[test]
    fn effect_code_is_three_digits() {
        assert_eq!(EffectCode::new(0).to_string(), "000");
        assert_eq!(EffectCode::new(0xC40).to_string(), "C40");
        assert_eq!(EffectCode::new(0x0AB).to_string(), "0AB");
        assert_eq!(EffectCode::new(0xEA3).command(), 0xE);
        assert_eq!(EffectCode::new(0xEA3).param(), 0xA3);
    }
}
