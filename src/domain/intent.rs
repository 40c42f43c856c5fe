use std::str::FromStr;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedIntent {
    pub kind: String,
    pub message: String,
}

impl ParsedIntent {
    pub fn is_complete(&self) -> bool {
        !self.kind.is_empty() && !self.message.is_empty()
    }
}

/// Extracts the `Intent:` and `Message:` lines from a classifier reply.
pub fn parse_intent(raw: &str) -> ParsedIntent {
    let mut parsed = ParsedIntent::default();
    for line in raw.split('\n') {
        if let Some(kind) = line.strip_prefix("Intent:") {
            parsed.kind = kind.trim().to_string();
        } else if let Some(message) = line.strip_prefix("Message:") {
            parsed.message = message.trim().to_string();
        }
    }
    parsed
}

/// A classifier reply ready to show: structured when both fields were found,
/// otherwise the raw text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntentReport {
    pub raw: String,
    pub parsed: Option<ParsedIntent>,
}

impl IntentReport {
    pub fn from_raw(raw: impl Into<String>) -> Self {
        let raw = raw.into();
        let parsed = Some(parse_intent(&raw)).filter(ParsedIntent::is_complete);
        Self { raw, parsed }
    }

    pub fn kind(&self) -> &str {
        self.parsed.as_ref().map_or("Intent", |p| p.kind.as_str())
    }

    pub fn message(&self) -> &str {
        self.parsed.as_ref().map_or(self.raw.as_str(), |p| p.message.as_str())
    }

    pub fn headline(&self) -> String {
        format!("{}: {}", self.kind(), self.message())
    }
}

/// What the user asked for after seeing a result. The host performs the copy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PresentChoice {
    None,
    CopyMessage,
    CopyFull,
}

impl FromStr for PresentChoice {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            "" | "none" | "n" => Ok(PresentChoice::None),
            "message" | "m" => Ok(PresentChoice::CopyMessage),
            "full" | "f" => Ok(PresentChoice::CopyFull),
            other => Err(format!("expected one of message, full, none; got '{other}'")),
        }
    }
}

impl PresentChoice {
    pub fn text_for(&self, report: &IntentReport) -> Option<String> {
        match self {
            PresentChoice::None => None,
            PresentChoice::CopyMessage => Some(report.message().to_string()),
            PresentChoice::CopyFull => Some(report.headline()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_two_line_reply() {
        let parsed = parse_intent("Intent: Bug Fix\nMessage: fix off-by-one");
        assert_eq!(
            parsed,
            ParsedIntent {
                kind: "Bug Fix".to_string(),
                message: "fix off-by-one".to_string(),
            }
        );
        assert_eq!(parse_intent("Intent: Bug Fix\nMessage: fix off-by-one"), parsed);
    }

    #[test]
    fn missing_prefixes_yield_empty_fields() {
        assert_eq!(parse_intent("Feature: add login"), ParsedIntent::default());
        assert_eq!(parse_intent("intent: lowercase\nmessage: ignored"), ParsedIntent::default());
    }

    #[test]
    fn report_falls_back_to_raw_text() {
        let report = IntentReport::from_raw("Feature: add login");
        assert_eq!(report.parsed, None);
        assert_eq!(report.headline(), "Intent: Feature: add login");

        let partial = IntentReport::from_raw("Intent: Refactor\n");
        assert_eq!(partial.parsed, None);
        assert_eq!(partial.message(), "Intent: Refactor\n");
    }

    #[test]
    fn choice_selects_copied_text() {
        let report = IntentReport::from_raw("Intent: Refactor\r\nMessage: extract helper");
        assert_eq!(report.kind(), "Refactor");
        assert_eq!(
            PresentChoice::CopyMessage.text_for(&report).as_deref(),
            Some("extract helper")
        );
        assert_eq!(
            PresentChoice::CopyFull.text_for(&report).as_deref(),
            Some("Refactor: extract helper")
        );
        assert_eq!(PresentChoice::None.text_for(&report), None);
    }

    #[test]
    fn choice_parses_through_from_str() {
        assert_eq!("FULL".parse(), Ok(PresentChoice::CopyFull));
        assert_eq!(" m ".parse(), Ok(PresentChoice::CopyMessage));
        assert_eq!("".parse(), Ok(PresentChoice::None));
        assert_eq!(
            "maybe".parse::<PresentChoice>(),
            Err("expected one of message, full, none; got 'maybe'".to_string())
        );
    }
}
