//! The ProTracker period table, restricted to the three octaves the tracker can enter.

use std::{collections::HashMap, sync::OnceLock};

use crate::song::{Pitch, PitchClass};

/// Periods for octaves 1 to 3, in ascending pitch order.
const PERIODS: [u16; 36] = [
    856, 808, 762, 720, 678, 640, 604, 570, 538, 508, 480, 453, // Octave 1
    428, 404, 381, 360, 339, 320, 302, 285, 269, 254, 240, 226, // Octave 2
    214, 202, 190, 180, 170, 160, 151, 143, 135, 127, 120, 113, // Octave 3
];

#[derive(Debug)]
struct ToneTable {
    by_period: HashMap<u16, Pitch>,
    by_pitch: HashMap<Pitch, u16>,
}

fn table() -> &'static ToneTable {
    static TABLE: OnceLock<ToneTable> = OnceLock::new();

    TABLE.get_or_init(|| {
        let entries = PERIODS.iter().enumerate().map(|(i, &period)| {
            let octave = (i / PitchClass::ALL.len()) as u8 + 1;
            (period, Pitch::Note(PitchClass::ALL[i % PitchClass::ALL.len()], octave))
        });
        ToneTable {
            by_period: entries.clone().collect(),
            by_pitch: entries.map(|(period, pitch)| (pitch, period)).collect(),
        }
    })
}

/// Exact match only; anything off-table (including 0) is a rest.
pub fn period_to_note(period: u16) -> Pitch {
    table()
        .by_period
        .get(&period)
        .copied()
        .unwrap_or(Pitch::Rest)
}

#[cfg_attr(not(test), allow(dead_code))]
pub fn note_to_period(pitch: Pitch) -> Option<u16> {
    table().by_pitch.get(&pitch).copied()
}
