pub mod pitch;
pub mod voicing;

pub use pitch::{map_to_pitch, note_name, octave, PitchMapping};
pub use voicing::{voicing_for, Voicing};
