//! Squawk's volume registers are 5 bits wide where ProTracker's are 6, so every effect carrying a
//! volume (or a volume delta) gets its parameter halved on the way out.

use std::fmt::Display;

use crate::song::{Cell, EffectCode, Pitch, Song, PATTERN_LENGTH};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelRole {
    Plain,
    /// Played one octave higher than written.
    OctaveUp,
}

/// A cell as the playback engine sees it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SquawkCell {
    pub pitch: Pitch,
    pub effect: EffectCode,
}

pub fn crunch(cell: &Cell, role: ChannelRole) -> SquawkCell {
    let pitch = match role {
        ChannelRole::Plain => cell.pitch,
        ChannelRole::OctaveUp => cell.pitch.octave_up(),
    };
    SquawkCell {
        pitch,
        effect: Effect::from(cell.effect).halve_volume().into(),
    }
}

/// Formats as a `pattern_t` initialiser, e.g. `{ CX2, 0x020 }`.
impl Display for SquawkCell {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{{ {}, 0x{} }}", Token(self.pitch), self.effect)
    }
}

/// The identifier the player's note constants use: `C_2` for `C-2`, `CX2` for `C#2`, `vvv` for rests.
#[derive(Debug, Clone, Copy)]
pub struct Token(pub Pitch);

impl Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.0 {
            Pitch::Rest => f.write_str("vvv"),
            Pitch::Note(class, octave) => write!(
                f,
                "{}{}{octave}",
                class.letter(),
                if class.is_sharp() { 'X' } else { '_' },
            ),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Effect {
    /// `5xy`, `6xy` and `Axy`.
    VolumeSlide { kind: SlideKind, up: u8, down: u8 },
    /// `EAx` and `EBx`.
    FineVolumeSlide { dir: SlideDirection, amount: u8 },
    /// `Cxx`.
    SetVolume(u8),
    Other(EffectCode),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlideKind {
    /// `5xy`: tone portamento continues alongside.
    TonePorta,
    /// `6xy`: vibrato continues alongside.
    Vibrato,
    /// `Axy`.
    Plain,
}

impl SlideKind {
    const fn command(self) -> u16 {
        match self {
            Self::TonePorta => 0x5,
            Self::Vibrato => 0x6,
            Self::Plain => 0xA,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlideDirection {
    Up,
    Down,
}

impl Effect {
    pub fn halve_volume(self) -> Self {
        match self {
            Self::VolumeSlide { kind, up, down } => Self::VolumeSlide {
                kind,
                up: up >> 1,
                down: down >> 1,
            },
            Self::FineVolumeSlide { dir, amount } => Self::FineVolumeSlide {
                dir,
                amount: amount >> 1,
            },
            Self::SetVolume(volume) => Self::SetVolume(volume >> 1),
            Self::Other(code) => Self::Other(code),
        }
    }
}

impl From<EffectCode> for Effect {
    fn from(code: EffectCode) -> Self {
        let param = code.param();
        let (hi, lo) = (param >> 4, param & 0x0F);
        let slide = |kind| Self::VolumeSlide { kind, up: hi, down: lo };

        match (code.command(), hi) {
            (0x5, _) => slide(SlideKind::TonePorta),
            (0x6, _) => slide(SlideKind::Vibrato),
            (0xA, _) => slide(SlideKind::Plain),
            (0xE, 0xA) => Self::FineVolumeSlide {
                dir: SlideDirection::Up,
                amount: lo,
            },
            (0xE, 0xB) => Self::FineVolumeSlide {
                dir: SlideDirection::Down,
                amount: lo,
            },
            (0xC, _) => Self::SetVolume(param),
            _ => Self::Other(code),
        }
    }
}

impl From<Effect> for EffectCode {
    fn from(effect: Effect) -> Self {
        match effect {
            Effect::VolumeSlide { kind, up, down } => {
                Self::new(kind.command() << 8 | u16::from(up) << 4 | u16::from(down))
            }
            Effect::FineVolumeSlide { dir, amount } => Self::new(
                match dir {
                    SlideDirection::Up => 0xEA0,
                    SlideDirection::Down => 0xEB0,
                } | u16::from(amount),
            ),
            Effect::SetVolume(volume) => Self::new(0xC00 | u16::from(volume)),
            Effect::Other(code) => code,
        }
    }
}

/// A cell whose effect the playback engine will not honour.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Unsupported {
    pub pattern: usize,
    pub row: usize,
    pub channel: usize,
    pub effect: EffectCode,
    pub reason: &'static str,
}

impl Display for Unsupported {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "[{:02X}][{:02X}][{:X}] {}: {}",
            self.pattern, self.row, self.channel, self.effect, self.reason
        )
    }
}

pub fn unsupported_reason(code: EffectCode) -> Option<&'static str> {
    match (code.command(), code.param()) {
        (0x8, _) => Some("Panning not supported"),
        (0x9, _) => Some("Sample offset not supported"),
        (0xF, speed) if speed > 0x20 => Some("Set tempo not supported"),
        (0xE, param) => match param >> 4 {
            0x5 => Some("Fine-tune is wonky by design"),
            0x6 => Some("Advanced looping not supported"),
            0x8 => Some("Panning not supported"),
            0xF => Some("Funk-it not supported"),
            _ => None,
        },
        _ => None,
    }
}

/// Lists every cell using an effect the engine ignores, in storage order.
pub fn scan_unsupported(song: &Song) -> Vec<Unsupported> {
    let mut found = Vec::new();
    for (pattern_idx, pattern) in song.patterns.iter().enumerate() {
        for row in 0..PATTERN_LENGTH {
            for (channel, cells) in pattern.iter().enumerate() {
                let effect = cells[row].effect;
                if let Some(reason) = unsupported_reason(effect) {
                    found.push(Unsupported {
                        pattern: pattern_idx,
                        row,
                        channel,
                        effect,
                        reason,
                    });
                }
            }
        }
    }
    found
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::song::PitchClass;

    fn reduce(raw: u16) -> String {
        EffectCode::from(Effect::from(EffectCode::new(raw)).halve_volume()).to_string()
    }

    fn cell(pitch: Pitch, effect: u16) -> Cell {
        Cell {
            pitch,
            sample: 1,
            effect: EffectCode::new(effect),
        }
    }

    #[test]
    fn volume_slides_halve_both_nibbles() {
        assert_eq!(reduce(0xA84), "A42");
        assert_eq!(reduce(0xAF0), "A70");
        assert_eq!(reduce(0xA01), "A00");
        assert_eq!(reduce(0x532), "511");
        assert_eq!(reduce(0x60F), "607");
    }

    #[test]
    fn fine_volume_slides_halve_the_amount_only() {
        assert_eq!(reduce(0xEA4), "EA2");
        assert_eq!(reduce(0xEBF), "EB7");
        assert_eq!(reduce(0xEB1), "EB0");
    }

    #[test]
    fn set_volume_halves_the_whole_byte() {
        assert_eq!(reduce(0xC40), "C20");
        assert_eq!(reduce(0xC3F), "C1F");
        assert_eq!(reduce(0xCFF), "C7F");
        assert_eq!(reduce(0xC01), "C00");
    }

    #[test]
    fn other_effects_pass_through() {
        for raw in [0x000, 0x037, 0x1FF, 0x20A, 0x304, 0x4AB, 0x7FF, 0xB10, 0xD32, 0xE9F, 0xECF, 0xF06]
        {
            assert_eq!(reduce(raw), EffectCode::new(raw).to_string());
        }
    }

    #[test]
    fn decoding_is_structural() {
        assert_eq!(
            Effect::from(EffectCode::new(0x5A3)),
            Effect::VolumeSlide {
                kind: SlideKind::TonePorta,
                up: 0xA,
                down: 0x3
            }
        );
        assert_eq!(
            Effect::from(EffectCode::new(0xEB5)),
            Effect::FineVolumeSlide {
                dir: SlideDirection::Down,
                amount: 5
            }
        );
        assert_eq!(Effect::from(EffectCode::new(0xC40)), Effect::SetVolume(0x40));
        assert_eq!(
            Effect::from(EffectCode::new(0xE12)),
            Effect::Other(EffectCode::new(0xE12))
        );
    }

    #[test]
    fn tokens() {
        assert_eq!(Token(Pitch::Note(PitchClass::C, 2)).to_string(), "C_2");
        assert_eq!(Token(Pitch::Note(PitchClass::CSharp, 2)).to_string(), "CX2");
        assert_eq!(Token(Pitch::Note(PitchClass::B, 4)).to_string(), "B_4");
        assert_eq!(Token(Pitch::Rest).to_string(), "vvv");
    }

    #[test]
    fn tokens_never_collide() {
        let mut seen = std::collections::HashSet::new();
        assert!(seen.insert(Token(Pitch::Rest).to_string()));
        for octave in 1..=4 {
            for class in PitchClass::ALL {
                assert!(seen.insert(Token(Pitch::Note(class, octave)).to_string()));
            }
        }
    }

    #[test]
    fn octave_shift_applies_to_notes_only() {
        let c2 = Pitch::Note(PitchClass::C, 2);
        assert_eq!(
            crunch(&cell(c2, 0), ChannelRole::OctaveUp).pitch,
            Pitch::Note(PitchClass::C, 3)
        );
        assert_eq!(crunch(&cell(c2, 0), ChannelRole::Plain).pitch, c2);
        assert_eq!(
            crunch(&cell(Pitch::Rest, 0), ChannelRole::OctaveUp).pitch,
            Pitch::Rest
        );
    }

    #[test]
    fn crunched_cells_format_as_initialisers() {
        let squawk = crunch(
            &cell(Pitch::Note(PitchClass::C, 2), 0xC40),
            ChannelRole::OctaveUp,
        );
        assert_eq!(squawk.to_string(), "{ C_3, 0xC20 }");
        let squawk = crunch(
            &cell(Pitch::Note(PitchClass::GSharp, 1), 0xA84),
            ChannelRole::Plain,
        );
        assert_eq!(squawk.to_string(), "{ GX1, 0xA42 }");
        let squawk = crunch(&Cell::default(), ChannelRole::Plain);
        assert_eq!(squawk.to_string(), "{ vvv, 0x000 }");
    }

    #[test]
    fn unsupported_effects() {
        assert_eq!(unsupported_reason(EffectCode::new(0x880)), Some("Panning not supported"));
        assert_eq!(unsupported_reason(EffectCode::new(0xE84)), Some("Panning not supported"));
        assert_eq!(unsupported_reason(EffectCode::new(0x910)), Some("Sample offset not supported"));
        assert_eq!(unsupported_reason(EffectCode::new(0xF7D)), Some("Set tempo not supported"));
        assert_eq!(unsupported_reason(EffectCode::new(0xF20)), None);
        assert_eq!(unsupported_reason(EffectCode::new(0xE52)), Some("Fine-tune is wonky by design"));
        assert_eq!(unsupported_reason(EffectCode::new(0xE63)), Some("Advanced looping not supported"));
        assert_eq!(unsupported_reason(EffectCode::new(0xEF1)), Some("Funk-it not supported"));
        assert_eq!(unsupported_reason(EffectCode::new(0xEA1)), None);
        assert_eq!(unsupported_reason(EffectCode::new(0xC40)), None);
    }
}
