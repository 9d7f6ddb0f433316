//! Intent router (C9, spec.md §4.9).
//!
//! A pure, deterministic keyword classifier; never touches C8 and
//! never makes a network call. Case-insensitive substring matching
//! against a fixed keyword list, evaluated in the priority order
//! spec.md gives: pause/stop, resume/continue, volume up/louder,
//! volume down/quieter/lower, play `<query>`, lights off/on.

#[derive(Debug, Clone, PartialEq)]
pub enum Decision {
    None,
    SpotifyPlay(String),
    SpotifyPause,
    SpotifyResume,
    SpotifyVolumeDelta(i32),
    LightsOn,
    LightsOff,
}

const PAUSE_KEYWORDS: &[&str] = &["pause", "stop"];
const RESUME_KEYWORDS: &[&str] = &["resume", "continue"];
const VOLUME_UP_KEYWORDS: &[&str] = &["volume up", "louder"];
const VOLUME_DOWN_KEYWORDS: &[&str] = &["volume down", "quieter", "lower"];
const PLAY_KEYWORD: &str = "play";
const LIGHTS_OFF_KEYWORDS: &[&str] = &["lights off"];
const LIGHTS_ON_KEYWORDS: &[&str] = &["lights on"];

const VOLUME_STEP: i32 = 10;

/// Maps a transcript to a local action or `Decision::None` ("forward
/// to LLM"). Pure function: identical output for any case/leading-
/// whitespace variant of the same text (spec.md §8 round-trip law).
pub fn route(transcript: &str) -> Decision {
    let lower = transcript.trim().to_lowercase();

    if contains_any(&lower, PAUSE_KEYWORDS) {
        return Decision::SpotifyPause;
    }
    if contains_any(&lower, RESUME_KEYWORDS) {
        return Decision::SpotifyResume;
    }
    if contains_any(&lower, VOLUME_UP_KEYWORDS) {
        return Decision::SpotifyVolumeDelta(VOLUME_STEP);
    }
    if contains_any(&lower, VOLUME_DOWN_KEYWORDS) {
        return Decision::SpotifyVolumeDelta(-VOLUME_STEP);
    }
    if let Some(pos) = lower.find(PLAY_KEYWORD) {
        let query = lower[pos + PLAY_KEYWORD.len()..].trim();
        return Decision::SpotifyPlay(query.to_string());
    }
    if contains_any(&lower, LIGHTS_OFF_KEYWORDS) {
        return Decision::LightsOff;
    }
    if contains_any(&lower, LIGHTS_ON_KEYWORDS) {
        return Decision::LightsOn;
    }

    Decision::None
}

fn contains_any(haystack: &str, needles: &[&str]) -> bool {
    needles.iter().any(|n| haystack.contains(n))
}

/// Scrubs the configured wake word from a transcript (case-insensitive,
/// whole-word, any position) before routing, so "Hey Voice Core, play
/// jazz" and "play jazz" route identically (spec.md §4.5).
pub fn scrub_wake_word(transcript: &str, wake_word: &str) -> String {
    if wake_word.is_empty() {
        return transcript.trim().to_string();
    }
    let pattern = regex::escape(wake_word);
    let re = regex::Regex::new(&format!(r"(?i)\b{}\b", pattern)).expect("valid wake-word pattern");
    let scrubbed = re.replace_all(transcript, "");
    scrubbed.trim_matches(|c: char| c.is_whitespace() || c == ',').trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pause_beats_everything_else() {
        assert_eq!(route("please pause the music"), Decision::SpotifyPause);
    }

    #[test]
    fn play_extracts_trailing_query() {
        assert_eq!(route("play some jazz"), Decision::SpotifyPlay("some jazz".to_string()));
    }

    #[test]
    fn lights_off_is_recognized() {
        assert_eq!(route("turn the lights off"), Decision::LightsOff);
    }

    #[test]
    fn unmatched_transcript_forwards_to_llm() {
        assert_eq!(route("what is the weather"), Decision::None);
    }

    #[test]
    fn route_is_case_and_whitespace_insensitive() {
        let a = route("play jazz");
        let b = route("  PLAY JAZZ");
        let c = route("Play Jazz");
        assert_eq!(a, b);
        assert_eq!(b, c);
    }

    #[test]
    fn scrub_wake_word_removes_prefix() {
        let scrubbed = scrub_wake_word("Hey Voice Core, play jazz", "hey voice core");
        assert_eq!(scrubbed, "play jazz");
    }

    #[test]
    fn scrub_wake_word_leaves_unrelated_text_untouched() {
        let scrubbed = scrub_wake_word("play jazz", "hey voice core");
        assert_eq!(scrubbed, "play jazz");
    }
}
