//! Text exposition parser (panic-free).
//!
//! Parsing rules:
//! - Never index the input: every read goes through `LineCursor`.
//! - Never `unwrap()` / `expect()` / `panic!()` in production paths.
//! - First error wins. The whole input is rejected and nothing is returned.

use std::collections::HashMap;

use thiserror::Error;
use tracing::trace;

use super::family::{MetricFamily, MetricKind, MetricSample};

/// What went wrong on a line.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseErrorKind {
    #[error("invalid metric name")]
    InvalidMetricName,
    #[error("invalid label name: {0:?}")]
    InvalidLabelName(String),
    #[error("label name __name__ is reserved")]
    ReservedLabelName,
    #[error("duplicate label: {0}")]
    DuplicateLabel(String),
    #[error("malformed label set")]
    MalformedLabels,
    #[error("unterminated label value")]
    UnterminatedLabelValue,
    #[error("invalid escape sequence: {0}")]
    InvalidEscape(String),
    #[error("missing sample value")]
    MissingValue,
    #[error("invalid sample value: {0:?}")]
    InvalidValue(String),
    #[error("invalid timestamp: {0:?}")]
    InvalidTimestamp(String),
    #[error("unexpected trailing data")]
    TrailingData,
    #[error("unknown metric type: {0:?}")]
    UnknownType(String),
    #[error("second HELP line for metric {0}")]
    DuplicateHelp(String),
    #[error("second TYPE line for metric {0}")]
    DuplicateType(String),
    #[error("TYPE line for metric {0} after its samples")]
    TypeAfterSamples(String),
    #[error("sample {sample} is missing label {label}")]
    MissingLabel { sample: String, label: &'static str },
}

impl ParseErrorKind {
    /// Stable code (used by test vectors and log fields).
    pub fn as_str(&self) -> &'static str {
        match self {
            ParseErrorKind::InvalidMetricName => "INVALID_METRIC_NAME",
            ParseErrorKind::InvalidLabelName(_) => "INVALID_LABEL_NAME",
            ParseErrorKind::ReservedLabelName => "RESERVED_LABEL_NAME",
            ParseErrorKind::DuplicateLabel(_) => "DUPLICATE_LABEL",
            ParseErrorKind::MalformedLabels => "MALFORMED_LABELS",
            ParseErrorKind::UnterminatedLabelValue => "UNTERMINATED_LABEL_VALUE",
            ParseErrorKind::InvalidEscape(_) => "INVALID_ESCAPE",
            ParseErrorKind::MissingValue => "MISSING_VALUE",
            ParseErrorKind::InvalidValue(_) => "INVALID_VALUE",
            ParseErrorKind::InvalidTimestamp(_) => "INVALID_TIMESTAMP",
            ParseErrorKind::TrailingData => "TRAILING_DATA",
            ParseErrorKind::UnknownType(_) => "UNKNOWN_TYPE",
            ParseErrorKind::DuplicateHelp(_) => "DUPLICATE_HELP",
            ParseErrorKind::DuplicateType(_) => "DUPLICATE_TYPE",
            ParseErrorKind::TypeAfterSamples(_) => "TYPE_AFTER_SAMPLES",
            ParseErrorKind::MissingLabel { .. } => "MISSING_LABEL",
        }
    }
}

/// Parse failure with its 1-based line number.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("line {line}: {kind}")]
pub struct ParseError {
    pub line: usize,
    pub kind: ParseErrorKind,
}

impl ParseError {
    pub fn new(line: usize, kind: ParseErrorKind) -> Self {
        Self { line, kind }
    }
}

/// Parse a whole exposition buffer into families, in first-appearance order.
///
/// Families that are declared (`# HELP` / `# TYPE`) but never receive a sample
/// are dropped.
pub fn parse_text(input: &str) -> Result<Vec<MetricFamily>, ParseError> {
    let mut parser = TextParser::default();
    for (idx, raw) in input.split('\n').enumerate() {
        let line = raw.strip_suffix('\r').unwrap_or(raw);
        parser.parse_line(LineCursor::new(line, idx + 1))?;
    }
    Ok(parser.finish())
}

struct FamilyState {
    family: MetricFamily,
    help_seen: bool,
    type_seen: bool,
}

impl FamilyState {
    fn new(name: &str) -> Self {
        Self {
            family: MetricFamily::new(name),
            help_seen: false,
            type_seen: false,
        }
    }
}

#[derive(Default)]
struct TextParser {
    families: HashMap<String, FamilyState>,
    order: Vec<String>,
}

impl TextParser {
    fn parse_line(&mut self, mut cur: LineCursor<'_>) -> Result<(), ParseError> {
        cur.skip_blanks();
        match cur.peek() {
            None => Ok(()),
            Some('#') => self.parse_comment(cur),
            Some(_) => self.parse_sample(cur),
        }
    }

    fn declare(&mut self, name: &str) -> &mut FamilyState {
        if !self.families.contains_key(name) {
            self.order.push(name.to_string());
        }
        self.families
            .entry(name.to_string())
            .or_insert_with(|| FamilyState::new(name))
    }

    /// Histogram and summary series carry suffixes; attach them to the
    /// declared base family when there is one.
    fn owning_family<'n>(&self, sample_name: &'n str) -> &'n str {
        if self.families.contains_key(sample_name) {
            return sample_name;
        }
        for suffix in ["_bucket", "_sum", "_count"] {
            let Some(base) = sample_name.strip_suffix(suffix) else { continue };
            let Some(state) = self.families.get(base) else { continue };
            match state.family.kind {
                MetricKind::Histogram => return base,
                MetricKind::Summary if suffix != "_bucket" => return base,
                _ => {}
            }
        }
        sample_name
    }

    fn parse_comment(&mut self, mut cur: LineCursor<'_>) -> Result<(), ParseError> {
        cur.eat('#');
        cur.skip_blanks();
        let keyword = cur.token();
        if keyword != "HELP" && keyword != "TYPE" {
            return Ok(());
        }
        cur.skip_blanks();
        if cur.is_empty() {
            // "# HELP" on its own is just a comment.
            return Ok(());
        }

        let name = cur.metric_name()?;
        if !cur.at_blank_or_end() {
            return Err(cur.error(ParseErrorKind::InvalidMetricName));
        }
        cur.skip_blanks();
        let line = cur.line;

        if keyword == "HELP" {
            let help = cur.help_text()?;
            let state = self.declare(name);
            if state.help_seen {
                return Err(ParseError::new(line, ParseErrorKind::DuplicateHelp(name.into())));
            }
            state.help_seen = true;
            state.family.help = help;
            return Ok(());
        }

        let token = cur.token();
        let kind = MetricKind::from_token(token)
            .ok_or_else(|| cur.error(ParseErrorKind::UnknownType(token.into())))?;
        cur.skip_blanks();
        if !cur.is_empty() {
            return Err(cur.error(ParseErrorKind::TrailingData));
        }

        let state = self.declare(name);
        if state.type_seen {
            return Err(ParseError::new(line, ParseErrorKind::DuplicateType(name.into())));
        }
        if !state.family.samples.is_empty() {
            return Err(ParseError::new(line, ParseErrorKind::TypeAfterSamples(name.into())));
        }
        state.type_seen = true;
        state.family.kind = kind;
        Ok(())
    }

    fn parse_sample(&mut self, mut cur: LineCursor<'_>) -> Result<(), ParseError> {
        let name = cur.metric_name()?;
        if !(cur.at_blank_or_end() || cur.peek() == Some('{')) {
            return Err(cur.error(ParseErrorKind::InvalidMetricName));
        }
        cur.skip_blanks();

        let labels = if cur.eat('{') { cur.labels()? } else { Vec::new() };
        cur.skip_blanks();

        let token = cur.token();
        if token.is_empty() {
            return Err(cur.error(ParseErrorKind::MissingValue));
        }
        let value: f64 = token
            .parse()
            .map_err(|_| cur.error(ParseErrorKind::InvalidValue(token.into())))?;
        cur.skip_blanks();

        let timestamp_ms = if cur.is_empty() {
            None
        } else {
            let token = cur.token();
            let ts: i64 = token
                .parse()
                .map_err(|_| cur.error(ParseErrorKind::InvalidTimestamp(token.into())))?;
            Some(ts)
        };
        cur.skip_blanks();
        if !cur.is_empty() {
            return Err(cur.error(ParseErrorKind::TrailingData));
        }

        let sample = MetricSample {
            name: name.to_string(),
            labels,
            value,
            timestamp_ms,
        };

        let owner = self.owning_family(name).to_string();
        let line = cur.line;
        let state = self.declare(&owner);
        let required = match state.family.kind {
            MetricKind::Histogram if name.ends_with("_bucket") && name != owner => Some("le"),
            MetricKind::Summary if name == owner => Some("quantile"),
            _ => None,
        };
        if let Some(label) = required {
            if sample.label(label).is_none() {
                return Err(ParseError::new(
                    line,
                    ParseErrorKind::MissingLabel { sample: name.into(), label },
                ));
            }
        }
        state.family.samples.push(sample);
        Ok(())
    }

    fn finish(self) -> Vec<MetricFamily> {
        let TextParser { mut families, order } = self;
        let mut out = Vec::with_capacity(order.len());
        for name in order {
            let Some(state) = families.remove(&name) else { continue };
            if state.family.samples.is_empty() {
                trace!(family = %name, "dropping family without samples");
                continue;
            }
            out.push(state.family);
        }
        out
    }
}

fn is_blank(c: char) -> bool {
    c == ' ' || c == '\t'
}

fn is_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == ':'
}

fn is_label_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

/// Forward-only cursor over one line.
struct LineCursor<'a> {
    rest: &'a str,
    line: usize,
}

impl<'a> LineCursor<'a> {
    fn new(rest: &'a str, line: usize) -> Self {
        Self { rest, line }
    }

    fn error(&self, kind: ParseErrorKind) -> ParseError {
        ParseError::new(self.line, kind)
    }

    fn is_empty(&self) -> bool {
        self.rest.is_empty()
    }

    fn peek(&self) -> Option<char> {
        self.rest.chars().next()
    }

    fn at_blank_or_end(&self) -> bool {
        self.peek().map_or(true, is_blank)
    }

    fn bump(&mut self) -> Option<char> {
        let mut chars = self.rest.chars();
        let c = chars.next()?;
        self.rest = chars.as_str();
        Some(c)
    }

    fn eat(&mut self, c: char) -> bool {
        match self.rest.strip_prefix(c) {
            Some(rest) => {
                self.rest = rest;
                true
            }
            None => false,
        }
    }

    fn skip_blanks(&mut self) {
        self.rest = self.rest.trim_start_matches(is_blank);
    }

    fn take_while(&mut self, pred: impl Fn(char) -> bool) -> &'a str {
        let end = self.rest.find(|c: char| !pred(c)).unwrap_or(self.rest.len());
        let (head, tail) = self.rest.split_at(end);
        self.rest = tail;
        head
    }

    /// Everything up to the next blank.
    fn token(&mut self) -> &'a str {
        self.take_while(|c| !is_blank(c))
    }

    fn metric_name(&mut self) -> Result<&'a str, ParseError> {
        let name = self.take_while(is_name_char);
        match name.chars().next() {
            Some(first) if !first.is_ascii_digit() => Ok(name),
            _ => Err(self.error(ParseErrorKind::InvalidMetricName)),
        }
    }

    /// Label block; the opening `{` is already consumed.
    fn labels(&mut self) -> Result<Vec<(String, String)>, ParseError> {
        let mut labels: Vec<(String, String)> = Vec::new();
        loop {
            self.skip_blanks();
            if self.eat('}') {
                return Ok(labels);
            }

            let name = self.take_while(is_label_char);
            match name.chars().next() {
                None => return Err(self.error(ParseErrorKind::MalformedLabels)),
                Some(first) if first.is_ascii_digit() => {
                    return Err(self.error(ParseErrorKind::InvalidLabelName(name.into())))
                }
                Some(_) => {}
            }
            if name == "__name__" {
                return Err(self.error(ParseErrorKind::ReservedLabelName));
            }

            self.skip_blanks();
            if !self.eat('=') {
                return Err(self.error(ParseErrorKind::MalformedLabels));
            }
            self.skip_blanks();
            if !self.eat('"') {
                return Err(self.error(ParseErrorKind::MalformedLabels));
            }
            let value = self.quoted_value()?;

            if labels.iter().any(|(k, _)| k == name) {
                return Err(self.error(ParseErrorKind::DuplicateLabel(name.into())));
            }
            labels.push((name.to_string(), value));

            self.skip_blanks();
            if self.eat(',') {
                continue;
            }
            if self.eat('}') {
                return Ok(labels);
            }
            return Err(self.error(ParseErrorKind::MalformedLabels));
        }
    }

    /// Label value; the opening quote is already consumed.
    fn quoted_value(&mut self) -> Result<String, ParseError> {
        let mut out = String::new();
        loop {
            match self.bump() {
                None => return Err(self.error(ParseErrorKind::UnterminatedLabelValue)),
                Some('"') => return Ok(out),
                Some('\\') => match self.bump() {
                    Some('\\') => out.push('\\'),
                    Some('"') => out.push('"'),
                    Some('n') => out.push('\n'),
                    Some(other) => {
                        return Err(self.error(ParseErrorKind::InvalidEscape(format!("\\{other}"))))
                    }
                    None => return Err(self.error(ParseErrorKind::UnterminatedLabelValue)),
                },
                Some(c) => out.push(c),
            }
        }
    }

    /// Rest of a HELP line, unescaping `\\` and `\n`.
    fn help_text(&mut self) -> Result<String, ParseError> {
        let mut out = String::with_capacity(self.rest.len());
        while let Some(c) = self.bump() {
            if c != '\\' {
                out.push(c);
                continue;
            }
            match self.bump() {
                Some('\\') => out.push('\\'),
                Some('n') => out.push('\n'),
                Some(other) => {
                    return Err(self.error(ParseErrorKind::InvalidEscape(format!("\\{other}"))))
                }
                None => return Err(self.error(ParseErrorKind::InvalidEscape("\\".into()))),
            }
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::expect_used)]

    use super::*;

    #[test]
    fn untyped_sample_without_declarations() {
        let families = parse_text("test_untyped 123.45\n").unwrap();
        assert_eq!(families.len(), 1);
        assert_eq!(families[0].name, "test_untyped");
        assert_eq!(families[0].kind, MetricKind::Untyped);
        assert_eq!(families[0].help, "");
        assert_eq!(families[0].samples[0].value, 123.45);
    }

    #[test]
    fn indented_type_header_is_honoured() {
        let text = "\n\t# TYPE test_gauge gauge\n\ttest_gauge 123.45\n";
        let families = parse_text(text).unwrap();
        assert_eq!(families.len(), 1);
        assert_eq!(families[0].kind, MetricKind::Gauge);
        assert_eq!(families[0].samples[0].value, 123.45);
    }

    #[test]
    fn help_is_unescaped() {
        let text = "# HELP jobs Jobs in\\nflight \\\\ total\njobs 3\n";
        let families = parse_text(text).unwrap();
        assert_eq!(families[0].help, "Jobs in\nflight \\ total");
    }

    #[test]
    fn labels_and_timestamp() {
        let text = "http_requests{method=\"post\",code=\"200\",} 1027 1395066363000\n";
        let families = parse_text(text).unwrap();
        let sample = &families[0].samples[0];
        assert_eq!(sample.label("method"), Some("post"));
        assert_eq!(sample.label("code"), Some("200"));
        assert_eq!(sample.timestamp_ms, Some(1_395_066_363_000));
    }

    #[test]
    fn label_value_escapes() {
        let text = "msg{path=\"C:\\\\dir\",quote=\"say \\\"hi\\\"\"} 1\n";
        let families = parse_text(text).unwrap();
        let sample = &families[0].samples[0];
        assert_eq!(sample.label("path"), Some("C:\\dir"));
        assert_eq!(sample.label("quote"), Some("say \"hi\""));
    }

    #[test]
    fn special_float_values() {
        let text = "a +Inf\nb -Inf\nc NaN\nd 1e3\n";
        let families = parse_text(text).unwrap();
        assert_eq!(families[0].samples[0].value, f64::INFINITY);
        assert_eq!(families[1].samples[0].value, f64::NEG_INFINITY);
        assert!(families[2].samples[0].value.is_nan());
        assert_eq!(families[3].samples[0].value, 1000.0);
    }

    #[test]
    fn multiple_samples_stay_in_one_family_in_order() {
        let text = "# TYPE temp gauge\ntemp{room=\"a\"} 20\ntemp{room=\"b\"} 22.5\n";
        let families = parse_text(text).unwrap();
        assert_eq!(families.len(), 1);
        let values: Vec<f64> = families[0].samples.iter().map(|s| s.value).collect();
        assert_eq!(values, vec![20.0, 22.5]);
    }

    #[test]
    fn families_keep_first_appearance_order() {
        let text = "# HELP zeta last\nalpha 1\nzeta 2\n";
        let names: Vec<String> = parse_text(text).unwrap().into_iter().map(|f| f.name).collect();
        assert_eq!(names, vec!["zeta", "alpha"]);
    }

    #[test]
    fn declared_family_without_samples_is_dropped() {
        let text = "# TYPE lonely counter\n# HELP lonely Nobody home.\nother 1\n";
        let families = parse_text(text).unwrap();
        assert_eq!(families.len(), 1);
        assert_eq!(families[0].name, "other");
    }

    #[test]
    fn histogram_series_attach_to_base_family() {
        let text = "\
# TYPE latency histogram
latency_bucket{le=\"0.1\"} 3
latency_bucket{le=\"+Inf\"} 5
latency_sum 0.42
latency_count 5
";
        let families = parse_text(text).unwrap();
        assert_eq!(families.len(), 1);
        assert_eq!(families[0].kind, MetricKind::Histogram);
        assert_eq!(families[0].samples.len(), 4);
        assert_eq!(families[0].samples[2].name, "latency_sum");
    }

    #[test]
    fn histogram_bucket_requires_le() {
        let text = "# TYPE latency histogram\nlatency_bucket 3\n";
        let err = parse_text(text).unwrap_err();
        assert_eq!(err.line, 2);
        assert_eq!(err.kind.as_str(), "MISSING_LABEL");
    }

    #[test]
    fn suffix_without_declared_base_opens_its_own_family() {
        let families = parse_text("queue_count 7\n").unwrap();
        assert_eq!(families[0].name, "queue_count");
        assert_eq!(families[0].kind, MetricKind::Untyped);
    }

    #[test]
    fn invalid_value_fails_whole_input() {
        let err = parse_text("good 1\ntest_gauge not_a_number\n").unwrap_err();
        assert_eq!(err.line, 2);
        assert_eq!(err.kind, ParseErrorKind::InvalidValue("not_a_number".into()));
    }

    #[test]
    fn type_after_samples_is_rejected() {
        let err = parse_text("jobs 1\n# TYPE jobs gauge\n").unwrap_err();
        assert_eq!(err.kind, ParseErrorKind::TypeAfterSamples("jobs".into()));
    }

    #[test]
    fn plain_comments_are_ignored() {
        let text = "# just a note\n#HELP\n# TYPE\nvalue 1\n";
        assert_eq!(parse_text(text).unwrap().len(), 1);
    }

    #[test]
    fn crlf_line_endings() {
        let families = parse_text("# TYPE a gauge\r\na 1\r\n").unwrap();
        assert_eq!(families[0].kind, MetricKind::Gauge);
        assert_eq!(families[0].samples[0].value, 1.0);
    }

    #[test]
    fn empty_input_yields_no_families() {
        assert!(parse_text("").unwrap().is_empty());
        assert!(parse_text("\n\n   \n").unwrap().is_empty());
    }
}
