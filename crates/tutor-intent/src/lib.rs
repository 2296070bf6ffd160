//! Intent recognition for tutor commands.
//!
//! Maps a free-text utterance to an [`Intent`](tutor_core::Intent) using an
//! ordered table of regular expressions. First match wins.

pub mod recognizer;

pub use recognizer::IntentRecognizer;
