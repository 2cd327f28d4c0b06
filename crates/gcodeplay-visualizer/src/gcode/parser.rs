//! G-Code word tokenizer
//!
//! Splits one instruction line into address words (`G1`, `X10.5`, `E0.02`).
//! Malformed numbers never abort: they read as zero and are reported back to
//! the caller. A letter with no argument (`G28 X Y`) is a flag word and reads
//! as zero without being reported.
//!
//! M-code lines may carry free text (`M117 Layer 2 of 10`, `M23 part.gco`);
//! that text is dropped before tokenizing.

use regex::Regex;
use std::borrow::Cow;
use std::sync::OnceLock;

/// One address word, e.g. `X10.5`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Word {
    pub letter: char,
    pub value: f64,
}

/// A tokenized instruction line
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedLine {
    /// Words in source order
    pub words: Vec<Word>,
    /// Tokens whose numeric argument could not be read
    pub malformed: Vec<String>,
    /// `:`-separated `E` argument, as used by mixing extruders (`E0.5:0.5`)
    pub mix: Option<Vec<f64>>,
}

impl ParsedLine {
    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    /// First value for `letter`
    pub fn get(&self, letter: char) -> Option<f64> {
        self.words
            .iter()
            .find(|w| w.letter == letter)
            .map(|w| w.value)
    }

    pub fn has(&self, letter: char) -> bool {
        self.words.iter().any(|w| w.letter == letter)
    }

    pub fn has_any(&self, letters: &[char]) -> bool {
        self.words.iter().any(|w| letters.contains(&w.letter))
    }

    /// Command numbers for `letter` (`G` or `M`) scaled by ten, so `G59.1` is `591`
    pub fn codes(&self, letter: char) -> impl Iterator<Item = u32> + '_ {
        self.words
            .iter()
            .filter(move |w| w.letter == letter)
            .map(|w| code10(w.value))
    }

    pub fn has_code(&self, letter: char, code: u32) -> bool {
        self.codes(letter).any(|c| c == code)
    }
}

/// Scale a command number by ten and round, e.g. `59.1 -> 591`
pub fn code10(value: f64) -> u32 {
    (value * 10.0).round().max(0.0) as u32
}

/// True when the line is a whole-line `;` comment
pub fn is_annotation(line: &str) -> bool {
    line.trim_start().starts_with(';')
}

/// M codes whose whole argument is free text (`M23`, `M28`, `M30`, `M32`,
/// `M117`, `M118`), scaled by ten
const TEXT_ARGUMENT_CODES: [u32; 6] = [230, 280, 300, 320, 1170, 1180];

/// Remove `;` trailing comments and `( ... )` inline comments
///
/// An unterminated `(` comments out the rest of the line.
pub fn strip_comments(line: &str) -> Cow<'_, str> {
    static COMMENT_REGEX: OnceLock<Regex> = OnceLock::new();
    let regex = COMMENT_REGEX
        .get_or_init(|| Regex::new(r"\([^)]*\)|\(.*|;.*").expect("invalid regex pattern"));
    regex.replace_all(line, "")
}

/// Uppercase the line and cut it before any checksum or free-text argument
fn command_text(code: &str) -> String {
    static M_HEAD_REGEX: OnceLock<Regex> = OnceLock::new();
    static TEXT_REGEX: OnceLock<Regex> = OnceLock::new();
    let head = M_HEAD_REGEX.get_or_init(|| {
        Regex::new(r"^\s*(?:N\s*\d+\s*)?M\s*(\d+(?:\.\d+)?)").expect("invalid regex pattern")
    });
    let text = TEXT_REGEX.get_or_init(|| Regex::new(r"[A-Z]{2}").expect("invalid regex pattern"));

    let mut upper = code.to_uppercase();
    if let Some(checksum) = upper.find('*') {
        upper.truncate(checksum);
    }

    let Some(caps) = head.captures(&upper) else {
        return upper;
    };
    let rest = caps.get(0).map_or(0, |m| m.end());
    let code = caps[1].parse::<f64>().map(code10).unwrap_or_default();
    let cut = if TEXT_ARGUMENT_CODES.contains(&code) {
        Some(rest)
    } else {
        // Two adjacent letters can only be a word of text
        text.find(&upper[rest..]).map(|m| rest + m.start())
    };
    if let Some(cut) = cut {
        upper.truncate(cut);
    }
    upper
}

/// Tokenize a comment-free instruction line
pub fn tokenize(code: &str) -> ParsedLine {
    static WORD_REGEX: OnceLock<Regex> = OnceLock::new();
    let regex = WORD_REGEX.get_or_init(|| Regex::new(r"([A-Z])([^A-Z]*)").expect("invalid regex pattern"));

    let compact: String = command_text(code)
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect();

    let mut parsed = ParsedLine::default();
    for caps in regex.captures_iter(&compact) {
        let letter = caps[1].chars().next().unwrap_or_default();
        let argument = &caps[2];

        let value = match argument.parse::<f64>() {
            Ok(v) if v.is_finite() => v,
            _ if argument.is_empty() => 0.0,
            _ if letter == 'E' && argument.contains(':') => {
                let parts: Vec<f64> = argument
                    .split(':')
                    .map(|p| p.parse::<f64>().unwrap_or(0.0))
                    .collect();
                let first = parts.first().copied().unwrap_or(0.0);
                parsed.mix = Some(parts);
                first
            }
            _ => {
                parsed.malformed.push(format!("{}{}", letter, argument));
                0.0
            }
        };
        parsed.words.push(Word { letter, value });
    }
    parsed
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokenize_basic_move() {
        let line = tokenize("G1 X10.5 Y-2 E.02 F1800");
        assert_eq!(line.words.len(), 5);
        assert!(line.has_code('G', 10));
        assert_eq!(line.get('X'), Some(10.5));
        assert_eq!(line.get('Y'), Some(-2.0));
        assert_eq!(line.get('E'), Some(0.02));
        assert_eq!(line.get('F'), Some(1800.0));
        assert!(line.malformed.is_empty());
    }

    #[test]
    fn test_tokenize_compact_and_lowercase() {
        let line = tokenize("g01x1y2");
        assert!(line.has_code('G', 10));
        assert_eq!(line.get('X'), Some(1.0));
        assert_eq!(line.get('Y'), Some(2.0));
    }

    #[test]
    fn test_tokenize_spaced_arguments() {
        let line = tokenize("G1 X 10 Y - 3");
        assert_eq!(line.get('X'), Some(10.0));
        assert_eq!(line.get('Y'), Some(-3.0));
    }

    #[test]
    fn test_malformed_number_defaults_to_zero() {
        let line = tokenize("G1 X1..2 Y3");
        assert_eq!(line.get('X'), Some(0.0));
        assert_eq!(line.get('Y'), Some(3.0));
        assert_eq!(line.malformed, vec!["X1..2".to_string()]);
    }

    #[test]
    fn test_flag_words() {
        let line = tokenize("G28 X Y");
        assert!(line.has_code('G', 280));
        assert!(line.has('X'));
        assert_eq!(line.get('Y'), Some(0.0));
        assert!(!line.has('Z'));
        assert!(line.malformed.is_empty());
    }

    #[test]
    fn test_message_text_is_dropped() {
        let line = tokenize("M117 Going to X10");
        assert_eq!(line.words, vec![Word { letter: 'M', value: 117.0 }]);
        assert!(line.malformed.is_empty());

        let line = tokenize("N7 M118 E1 X5");
        assert_eq!(line.get('N'), Some(7.0));
        assert!(line.has_code('M', 1180));
        assert!(!line.has('E'));
        assert!(!line.has('X'));

        let line = tokenize("M23 FILE1.GCO");
        assert_eq!(line.words.len(), 1);
    }

    #[test]
    fn test_m_code_arguments_before_text_are_kept() {
        let line = tokenize("M104 S200 T0");
        assert_eq!(line.get('S'), Some(200.0));
        assert_eq!(line.get('T'), Some(0.0));

        let line = tokenize("M862.3 P MK3S");
        assert!(line.has_code('M', 8623));
        assert!(line.has('P'));
        assert!(!line.has('K'));
        assert!(!line.has('S'));

        // M3 is not the M30 text command
        let line = tokenize("M3 S1000");
        assert_eq!(line.get('S'), Some(1000.0));
    }

    #[test]
    fn test_dotted_codes() {
        let line = tokenize("G59.1");
        assert_eq!(line.codes('G').collect::<Vec<_>>(), vec![591]);
        assert_eq!(code10(54.0), 540);
    }

    #[test]
    fn test_mixing_argument() {
        let line = tokenize("M567 P0 E0.25:0.75");
        assert!(line.has_code('M', 5670));
        assert_eq!(line.mix, Some(vec![0.25, 0.75]));
        assert!(line.malformed.is_empty());
    }

    #[test]
    fn test_checksum_and_line_number() {
        let line = tokenize("N12 G1 X5*71");
        assert_eq!(line.get('N'), Some(12.0));
        assert_eq!(line.get('X'), Some(5.0));
        assert!(line.malformed.is_empty());
    }

    #[test]
    fn test_strip_comments() {
        assert_eq!(strip_comments("G1 X10 ; move"), "G1 X10 ");
        assert_eq!(strip_comments("G1 (rapid) X10"), "G1  X10");
        assert_eq!(strip_comments("; whole line"), "");
        assert!(is_annotation("  ;TYPE:Perimeter"));
        assert!(!is_annotation("G1 X1 ;TYPE"));
        assert_eq!(strip_comments("G1 X5 (unterminated Y7"), "G1 X5 ");
        assert_eq!(strip_comments("G1 (a) X5 (b"), "G1  X5 ");
    }
}
