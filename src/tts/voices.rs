//! Language → voice table.
//!
//! Each entry is keyed by a canonical English language name, a native name
//! or an ISO-639-1 code.  Lookup is exact first, then case-insensitive, then
//! [`DEFAULT_VOICE`].

/// A narration voice at the speech provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VoiceConfig {
    pub voice_id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
}

const RACHEL: VoiceConfig = VoiceConfig {
    voice_id: "21m00Tcm4TlvDq8ikWAM",
    name: "Rachel",
    description: "American English, calm and clear",
};

const BELLA: VoiceConfig = VoiceConfig {
    voice_id: "EXAVITQu4vr4xnSDxMaL",
    name: "Bella",
    description: "Multilingual, expressive",
};

const ELLI: VoiceConfig = VoiceConfig {
    voice_id: "MF3mGyEYCl7XYWbV9V6O",
    name: "Elli",
    description: "Multilingual, young",
};

const ANTONI: VoiceConfig = VoiceConfig {
    voice_id: "ErXwobaYiN019PkySvjV",
    name: "Antoni",
    description: "Multilingual, well-rounded",
};

const DOROTHY: VoiceConfig = VoiceConfig {
    voice_id: "ThT5KcBeYPX3keUQqHPh",
    name: "Dorothy",
    description: "Multilingual, pleasant",
};

/// Voice used when no table entry matches.
pub const DEFAULT_VOICE: VoiceConfig = VoiceConfig {
    voice_id: "21m00Tcm4TlvDq8ikWAM",
    name: "Rachel",
    description: "Default multilingual voice",
};

pub static LANGUAGE_VOICES: &[(&str, VoiceConfig)] = &[
    ("English", RACHEL),
    ("en", RACHEL),
    ("Spanish", BELLA),
    ("Español", BELLA),
    ("es", BELLA),
    ("French", ELLI),
    ("Français", ELLI),
    ("fr", ELLI),
    ("German", ANTONI),
    ("Deutsch", ANTONI),
    ("de", ANTONI),
    ("Japanese", DOROTHY),
    ("ja", DOROTHY),
    ("Chinese", DOROTHY),
    ("Mandarin", DOROTHY),
    ("zh", DOROTHY),
    ("Portuguese", BELLA),
    ("pt", BELLA),
    ("Korean", DOROTHY),
    ("ko", DOROTHY),
    ("Persian", BELLA),
    ("Farsi", BELLA),
    ("fa", BELLA),
];

/// Pick the narration voice for `language`.
///
/// ```
/// use tutor_talk::tts::{voice_for_language, DEFAULT_VOICE};
///
/// assert_eq!(voice_for_language("Español").name, "Bella");
/// assert_eq!(voice_for_language("GERMAN").name, "Antoni");
/// assert_eq!(voice_for_language("Klingon"), DEFAULT_VOICE);
/// ```
pub fn voice_for_language(language: &str) -> VoiceConfig {
    if let Some((_, voice)) = LANGUAGE_VOICES.iter().find(|(key, _)| *key == language) {
        return *voice;
    }

    let wanted = language.trim().to_lowercase();
    LANGUAGE_VOICES
        .iter()
        .find(|(key, _)| key.to_lowercase() == wanted)
        .map(|(_, voice)| *voice)
        .unwrap_or(DEFAULT_VOICE)
}
