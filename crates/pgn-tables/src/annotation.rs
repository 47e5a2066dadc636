//! Clock and evaluation annotations embedded in move comments,
//! e.g. `{ [%clk 0:05:23] [%eval 1.25] }`.

use std::sync::LazyLock;

use regex::Regex;

use crate::game_data::Evaluation;

static CLOCK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[%clk\s*([0-9:.]+)\]").expect("valid clock pattern"));

static EVAL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[%eval\s*([#\-\d.]+)\]").expect("valid eval pattern"));

/// Annotations found in one comment.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Annotations {
    /// Raw clock text (`H:MM:SS`, `MM:SS` or seconds)
    pub clock: Option<String>,
    pub eval: Option<Evaluation>,
}

/// Extract the first `[%clk]` and `[%eval]` tags of a comment.
/// Malformed payloads yield `None` for that field.
pub fn parse_comment(comment: Option<&str>) -> Annotations {
    let Some(comment) = comment else {
        return Annotations::default();
    };

    let clock = CLOCK_RE
        .captures(comment)
        .map(|cap| cap[1].to_string());

    let eval = EVAL_RE
        .captures(comment)
        .and_then(|cap| parse_eval_payload(&cap[1]));

    Annotations { clock, eval }
}

/// `#N` is mate in N, anything else a centipawn number.
fn parse_eval_payload(payload: &str) -> Option<Evaluation> {
    match payload.strip_prefix('#') {
        Some(count) => count.parse().ok().map(Evaluation::Mate),
        None => payload
            .parse::<f64>()
            .ok()
            .filter(|cp| cp.is_finite())
            .map(Evaluation::Centipawns),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clock_and_eval() {
        let parsed = parse_comment(Some("[%clk 0:05:23][%eval 1.25]"));
        assert_eq!(parsed.clock.as_deref(), Some("0:05:23"));
        assert_eq!(parsed.eval, Some(Evaluation::Centipawns(1.25)));
    }

    #[test]
    fn test_mate_eval() {
        let parsed = parse_comment(Some("[%eval #-3]"));
        assert_eq!(parsed.clock, None);
        assert_eq!(parsed.eval, Some(Evaluation::Mate(-3)));
        assert_eq!(parsed.eval.map(|e| e.to_string()).as_deref(), Some("M-3"));

        let parsed = parse_comment(Some(" [%eval #4] "));
        assert_eq!(parsed.eval, Some(Evaluation::Mate(4)));
    }

    #[test]
    fn test_no_tags() {
        assert_eq!(parse_comment(Some("great move")), Annotations::default());
        assert_eq!(parse_comment(Some("")), Annotations::default());
        assert_eq!(parse_comment(None), Annotations::default());
    }

    #[test]
    fn test_malformed_payloads_degrade_to_none() {
        assert_eq!(parse_comment(Some("[%eval 1.2.3]")).eval, None);
        assert_eq!(parse_comment(Some("[%eval #]")).eval, None);
        assert_eq!(parse_comment(Some("[%eval --]")).eval, None);
        // payload outside the tag alphabet never matches
        assert_eq!(parse_comment(Some("[%eval #+2]")).eval, None);
    }

    #[test]
    fn test_first_tag_wins() {
        let parsed = parse_comment(Some("[%clk 1:00] [%clk 2:00] [%eval 0.3] [%eval 0.9]"));
        assert_eq!(parsed.clock.as_deref(), Some("1:00"));
        assert_eq!(parsed.eval, Some(Evaluation::Centipawns(0.3)));
    }

    #[test]
    fn test_bare_seconds_clock() {
        let parsed = parse_comment(Some("[%clk 23.4]"));
        assert_eq!(parsed.clock.as_deref(), Some("23.4"));
    }
}
