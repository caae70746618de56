use serde::{Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;

use crate::error::ParsingError;

/// File-local instance identifier, written `#123` in STEP files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct InstanceId(pub u64);

impl fmt::Display for InstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl Serialize for InstanceId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// A single decoded STEP parameter.
///
/// References are kept as ids and resolved by table lookup, so forward
/// references need no special handling.
#[derive(Debug, Clone, PartialEq)]
pub enum Parameter {
    Null,
    Derived,
    String(String),
    Integer(i64),
    Real(f64),
    Boolean(bool),
    Reference(InstanceId),
    /// Bare keyword token such as `.STANDARD.`, kept verbatim.
    Enumeration(String),
    /// Typed value such as `IFCLABEL('2HR')`.
    Typed {
        type_name: String,
        value: Box<Parameter>,
    },
    List(Vec<Parameter>),
}

impl Parameter {
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Parameter::String(s) => Some(s),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_reference(&self) -> Option<InstanceId> {
        match self {
            Parameter::Reference(id) => Some(*id),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_list(&self) -> Option<&[Parameter]> {
        match self {
            Parameter::List(items) => Some(items),
            _ => None,
        }
    }

    /// Numeric value of an integer, real or typed number.
    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Parameter::Real(f) => Some(*f),
            Parameter::Integer(i) => Some(*i as f64),
            Parameter::Typed { value, .. } => value.as_f64(),
            _ => None,
        }
    }

    /// Ids of every reference directly inside a list parameter.
    #[must_use]
    pub fn references(&self) -> Vec<InstanceId> {
        self.as_list()
            .map(|items| items.iter().filter_map(Parameter::as_reference).collect())
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RawInstance {
    pub id: InstanceId,
    pub type_name: String,
    pub parameters: Vec<Parameter>,
}

impl RawInstance {
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&Parameter> {
        self.parameters.get(index)
    }

    #[must_use]
    pub fn string_at(&self, index: usize) -> Option<&str> {
        self.get(index).and_then(Parameter::as_str)
    }

    #[must_use]
    pub fn reference_at(&self, index: usize) -> Option<InstanceId> {
        self.get(index).and_then(Parameter::as_reference)
    }

    #[must_use]
    pub fn real_at(&self, index: usize) -> Option<f64> {
        self.get(index).and_then(Parameter::as_f64)
    }

    /// First non-empty string at positions 2 and 3, where IFC keeps `Name`.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        (2..4)
            .filter_map(|i| self.string_at(i))
            .find(|s| !s.is_empty())
    }
}

/// Id-keyed lookup table of every decoded instance in a file.
#[derive(Debug, Default)]
pub struct InstanceTable {
    instances: BTreeMap<InstanceId, RawInstance>,
}

impl InstanceTable {
    /// Inserts an instance, replacing any earlier definition of the same id.
    pub fn insert(&mut self, instance: RawInstance) -> Option<RawInstance> {
        self.instances.insert(instance.id, instance)
    }

    #[must_use]
    pub fn get(&self, id: InstanceId) -> Option<&RawInstance> {
        self.instances.get(&id)
    }

    /// All instances in ascending id order.
    pub fn iter(&self) -> impl Iterator<Item = &RawInstance> {
        self.instances.values()
    }

    /// Instances with exactly this entity type, in ascending id order.
    pub fn of_type<'a>(&'a self, type_name: &'a str) -> impl Iterator<Item = &'a RawInstance> {
        self.iter().filter(move |e| e.type_name == type_name)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.instances.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }
}

/// HEADER and DATA lines of a STEP file.
#[derive(Debug, Default)]
pub struct Sections<'a> {
    pub header: Vec<&'a str>,
    /// DATA lines with their 1-based line numbers.
    pub data: Vec<(usize, &'a str)>,
}

#[derive(Clone, Copy, PartialEq)]
enum Section {
    Outside,
    Header,
    Data,
}

/// Partitions file content into header and data lines by section markers.
#[must_use]
pub fn split_sections(content: &str) -> Sections<'_> {
    let mut sections = Sections::default();
    let mut current = Section::Outside;

    for (index, raw) in content.lines().enumerate() {
        let line = raw.trim();

        if line == "HEADER;" {
            current = Section::Header;
            continue;
        }
        if line == "DATA;" || (line.starts_with("DATA(") && line.ends_with(';')) {
            current = Section::Data;
            continue;
        }
        if line == "ENDSEC;" {
            current = Section::Outside;
            continue;
        }
        if line.starts_with("END-ISO-10303-21") {
            break;
        }

        match current {
            Section::Header => sections.header.push(line),
            Section::Data if !line.is_empty() && !is_comment(line) => {
                sections.data.push((index + 1, line));
            }
            _ => {}
        }
    }

    sections
}

fn is_comment(line: &str) -> bool {
    line.starts_with("/*") && line.ends_with("*/")
}

/// Decodes every DATA line into an instance table.
///
/// Lines that fail to decode are reported and skipped. A later definition of
/// an id replaces the earlier one.
#[must_use]
pub fn decode_instances(lines: &[(usize, &str)]) -> (InstanceTable, Vec<ParsingError>) {
    let mut table = InstanceTable::default();
    let mut errors = Vec::new();

    for &(line_number, line) in lines {
        match decode_instance(line) {
            Ok(instance) => {
                if let Some(previous) = table.insert(instance) {
                    tracing::warn!(id = %previous.id, line = line_number, "instance redefined");
                }
            }
            Err(cause) => {
                tracing::warn!(line = line_number, %cause, "skipping malformed instance");
                errors.push(ParsingError::InstanceParsingFailed {
                    line: line_number,
                    text: line.to_string(),
                    cause: Box::new(cause),
                });
            }
        }
    }

    (table, errors)
}

/// Decodes one `#<id>=<TYPE>(<params>);` line.
///
/// The trailing `;` is optional.
pub fn decode_instance(line: &str) -> Result<RawInstance, ParsingError> {
    let line = line.trim();

    let rest = line
        .strip_prefix('#')
        .ok_or_else(|| ParsingError::invalid_format("line does not start with '#'"))?;

    let digits_end = rest
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(rest.len());
    if digits_end == 0 {
        return Err(ParsingError::invalid_format("missing instance id"));
    }
    let token = &rest[..digits_end];
    let id: u64 = token
        .parse()
        .map_err(|_| ParsingError::InvalidInstanceId {
            token: token.to_string(),
        })?;

    let rest = rest[digits_end..]
        .trim_start()
        .strip_prefix('=')
        .ok_or_else(|| ParsingError::invalid_format("missing '=' after instance id"))?;

    let open = rest.find('(');
    let type_token = match open {
        Some(pos) => rest[..pos].trim(),
        None => rest.trim().trim_end_matches(';').trim(),
    };
    if !is_entity_type(type_token) {
        return Err(ParsingError::MissingEntityType);
    }

    let open = open.ok_or_else(|| ParsingError::invalid_format("missing parameter list"))?;
    let close = rest
        .rfind(')')
        .filter(|&close| close > open)
        .ok_or_else(|| ParsingError::invalid_format("unbalanced parentheses"))?;

    Ok(RawInstance {
        id: InstanceId(id),
        type_name: type_token.to_string(),
        parameters: parse_parameters(&rest[open + 1..close]),
    })
}

fn is_entity_type(token: &str) -> bool {
    token.len() > 3
        && token.starts_with("IFC")
        && token
            .bytes()
            .all(|b| b.is_ascii_uppercase() || b.is_ascii_digit() || b == b'_')
}

/// Deepest list or typed-value nesting decoded. Anything below is kept as
/// raw text in a [`Parameter::Enumeration`].
pub const MAX_NESTING: usize = 256;

/// Splits a comma-separated parameter string into typed parameters.
///
/// Commas inside quoted strings or nested lists do not split.
#[must_use]
pub fn parse_parameters(s: &str) -> Vec<Parameter> {
    parse_nested(s, 0)
}

fn parse_nested(s: &str, depth: usize) -> Vec<Parameter> {
    let mut values = Vec::new();
    let mut start = 0;
    let mut in_string = false;
    let mut paren_depth: i32 = 0;

    for (i, ch) in s.char_indices() {
        match ch {
            '\'' => in_string = !in_string,
            '(' if !in_string => paren_depth += 1,
            ')' if !in_string => paren_depth -= 1,
            ',' if !in_string && paren_depth == 0 => {
                values.push(parse_single_value(&s[start..i], depth));
                start = i + 1;
            }
            _ => {}
        }
    }

    let last = &s[start..];
    if !last.trim().is_empty() {
        values.push(parse_single_value(last, depth));
    }

    values
}

fn too_deep(s: &str, depth: usize) -> Option<Parameter> {
    if depth < MAX_NESTING {
        return None;
    }
    tracing::warn!(depth, len = s.len(), "parameter nesting too deep, keeping raw text");
    Some(Parameter::Enumeration(s.to_string()))
}

fn parse_single_value(s: &str, depth: usize) -> Parameter {
    let s = s.trim();

    if s == "$" {
        return Parameter::Null;
    }
    if s == "*" {
        return Parameter::Derived;
    }
    if s.len() >= 2 && s.starts_with('\'') && s.ends_with('\'') {
        return Parameter::String(decode_step_string(&s[1..s.len() - 1]));
    }
    if let Some(stripped) = s.strip_prefix('#') {
        if let Ok(id) = stripped.parse::<u64>() {
            return Parameter::Reference(InstanceId(id));
        }
    }
    if let Ok(i) = s.parse::<i64>() {
        return Parameter::Integer(i);
    }
    if is_real_literal(s) {
        if let Ok(f) = s.parse::<f64>() {
            return Parameter::Real(f);
        }
    }
    match s {
        ".T." => return Parameter::Boolean(true),
        ".F." => return Parameter::Boolean(false),
        _ => {}
    }
    if s.starts_with('(') && s.ends_with(')') {
        if let Some(raw) = too_deep(s, depth) {
            return raw;
        }
        return Parameter::List(parse_nested(&s[1..s.len() - 1], depth + 1));
    }
    if let Some(paren_pos) = s.find('(') {
        let type_name = &s[..paren_pos];
        if s.ends_with(')') && is_keyword(type_name) {
            if let Some(raw) = too_deep(s, depth) {
                return raw;
            }
            let mut inner = parse_nested(&s[paren_pos + 1..s.len() - 1], depth + 1);
            let value = if inner.len() == 1 {
                inner.remove(0)
            } else {
                Parameter::List(inner)
            };
            return Parameter::Typed {
                type_name: type_name.to_string(),
                value: Box::new(value),
            };
        }
    }

    Parameter::Enumeration(s.to_string())
}

// Keeps tokens like `inf` or `NaN` out of the float parser.
fn is_real_literal(s: &str) -> bool {
    s.bytes().any(|b| b.is_ascii_digit())
        && s
            .bytes()
            .all(|b| b.is_ascii_digit() || matches!(b, b'+' | b'-' | b'.' | b'E' | b'e'))
}

fn is_keyword(s: &str) -> bool {
    !s.is_empty()
        && s.bytes()
            .all(|b| b.is_ascii_uppercase() || b.is_ascii_digit() || b == b'_')
}

/// Decodes the body of a STEP string literal.
///
/// Handles `''`, `\\`, `\X2\...\X0\` (UTF-16 code units), `\X\hh`
/// (ISO 8859-1) and `\S\c` (upper half of ISO 8859-1). Unknown escapes
/// are kept as written.
#[must_use]
pub fn decode_step_string(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut rest = s;

    while let Some(pos) = rest.find(['\\', '\'']) {
        out.push_str(&rest[..pos]);
        let tail = &rest[pos..];

        rest = if let Some(after) = tail.strip_prefix("''") {
            out.push('\'');
            after
        } else if let Some(after) = tail.strip_prefix("\\\\") {
            out.push('\\');
            after
        } else if let Some(after) = tail.strip_prefix("\\X2\\") {
            decode_utf16_run(after, &mut out)
        } else if let Some(after) = tail.strip_prefix("\\X\\") {
            decode_latin1(after, &mut out)
        } else if let Some(after) = tail.strip_prefix("\\S\\") {
            let mut chars = after.chars();
            if let Some(shifted) = chars.next().and_then(|c| char::from_u32(u32::from(c) + 0x80)) {
                out.push(shifted);
            }
            chars.as_str()
        } else {
            // lone quote or backslash, both one byte
            out.push_str(&tail[..1]);
            &tail[1..]
        };
    }

    out.push_str(rest);
    out
}

/// Hex run of 4-digit UTF-16 units up to the `\X0\` terminator.
fn decode_utf16_run<'a>(after: &'a str, out: &mut String) -> &'a str {
    let end = after.find('\\').unwrap_or(after.len());
    let (hex, tail) = after.split_at(end);

    let units = hex
        .as_bytes()
        .chunks_exact(4)
        .filter_map(|unit| std::str::from_utf8(unit).ok())
        .filter_map(|unit| u16::from_str_radix(unit, 16).ok());
    out.extend(char::decode_utf16(units).map(|c| c.unwrap_or(char::REPLACEMENT_CHARACTER)));

    tail.strip_prefix("\\X0\\").unwrap_or(tail)
}

fn decode_latin1<'a>(after: &'a str, out: &mut String) -> &'a str {
    match after.get(..2).and_then(|hex| u8::from_str_radix(hex, 16).ok()) {
        Some(byte) => {
            out.push(char::from(byte));
            &after[2..]
        }
        None => after,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn splits_on_top_level_commas_only() {
        let values = parse_parameters("'a,b',(1,2,3),#5,$,.T.");
        assert_eq!(
            values,
            vec![
                Parameter::String("a,b".into()),
                Parameter::List(vec![
                    Parameter::Integer(1),
                    Parameter::Integer(2),
                    Parameter::Integer(3),
                ]),
                Parameter::Reference(InstanceId(5)),
                Parameter::Null,
                Parameter::Boolean(true),
            ]
        );
    }

    #[test]
    fn decodes_wall_line() {
        let instance =
            decode_instance("#10=IFCWALL('2eF8xyz',#5,'Wall-001',$,$,#20,#30,$,.STANDARD.);")
                .unwrap();

        assert_eq!(instance.id, InstanceId(10));
        assert_eq!(instance.id.to_string(), "#10");
        assert_eq!(instance.type_name, "IFCWALL");
        assert_eq!(
            instance.parameters,
            vec![
                Parameter::String("2eF8xyz".into()),
                Parameter::Reference(InstanceId(5)),
                Parameter::String("Wall-001".into()),
                Parameter::Null,
                Parameter::Null,
                Parameter::Reference(InstanceId(20)),
                Parameter::Reference(InstanceId(30)),
                Parameter::Null,
                Parameter::Enumeration(".STANDARD.".into()),
            ]
        );
    }

    #[test]
    fn terminator_is_optional() {
        let instance = decode_instance("#7 = IFCCARTESIANPOINT((1.,2.5,-3.E-1))").unwrap();
        assert_eq!(instance.type_name, "IFCCARTESIANPOINT");
        assert_eq!(
            instance.parameters,
            vec![Parameter::List(vec![
                Parameter::Real(1.0),
                Parameter::Real(2.5),
                Parameter::Real(-0.3),
            ])]
        );
    }

    #[test]
    fn type_names_keep_digits() {
        let instance = decode_instance("#3=IFCAXIS2PLACEMENT3D(#1,$,$);").unwrap();
        assert_eq!(instance.type_name, "IFCAXIS2PLACEMENT3D");
    }

    #[test]
    fn reports_each_decoding_failure_kind() {
        assert!(matches!(
            decode_instance("IFCWALL('x');"),
            Err(ParsingError::InvalidInstanceFormat { .. })
        ));
        assert!(matches!(
            decode_instance("#=IFCWALL('x');"),
            Err(ParsingError::InvalidInstanceFormat { .. })
        ));
        assert_eq!(
            decode_instance("#123456789012345678901234=IFCWALL('x');"),
            Err(ParsingError::InvalidInstanceId {
                token: "123456789012345678901234".into()
            })
        );
        assert_eq!(
            decode_instance("#4=wall('x');"),
            Err(ParsingError::MissingEntityType)
        );
        assert!(matches!(
            decode_instance("#4=IFCWALL;"),
            Err(ParsingError::InvalidInstanceFormat { .. })
        ));
        assert!(matches!(
            decode_instance("#4=IFCWALL('x';"),
            Err(ParsingError::InvalidInstanceFormat { .. })
        ));
    }

    #[test]
    fn quotes_hide_parentheses_inside_nested_lists() {
        let values = parse_parameters("('a)b','c'),2");
        assert_eq!(
            values,
            vec![
                Parameter::List(vec![
                    Parameter::String("a)b".into()),
                    Parameter::String("c".into()),
                ]),
                Parameter::Integer(2),
            ]
        );
    }

    #[test]
    fn typed_values_wrap_their_inner_value() {
        let values = parse_parameters("IFCLABEL('2HR'),IFCBOOLEAN(.F.),*,.U.");
        assert_eq!(
            values,
            vec![
                Parameter::Typed {
                    type_name: "IFCLABEL".into(),
                    value: Box::new(Parameter::String("2HR".into())),
                },
                Parameter::Typed {
                    type_name: "IFCBOOLEAN".into(),
                    value: Box::new(Parameter::Boolean(false)),
                },
                Parameter::Derived,
                Parameter::Enumeration(".U.".into()),
            ]
        );
    }

    #[test]
    fn unknown_tokens_degrade_to_enumerations() {
        assert_eq!(
            parse_parameters("inf,#abc"),
            vec![
                Parameter::Enumeration("inf".into()),
                Parameter::Enumeration("#abc".into()),
            ]
        );
        assert!(parse_parameters("").is_empty());
        assert_eq!(parse_parameters("()"), vec![Parameter::List(Vec::new())]);
    }

    #[test]
    fn decodes_string_escapes() {
        assert_eq!(decode_step_string("it''s"), "it's");
        assert_eq!(decode_step_string("\\X2\\00E9\\X0\\t\\X2\\00E9\\X0\\"), "été");
        assert_eq!(decode_step_string("\\X\\E9"), "é");
        assert_eq!(decode_step_string("a\\\\b"), "a\\b");
        assert_eq!(decode_step_string("\\S\\i"), "é");
        // surrogate pair
        assert_eq!(decode_step_string("\\X2\\D83DDE00\\X0\\!"), "\u{1F600}!");
        assert_eq!(decode_step_string("a\\b"), "a\\b");
    }

    #[test]
    fn splits_sections_and_skips_comments() {
        let content = "ISO-10303-21;\nHEADER;\nFILE_SCHEMA(('IFC4'));\nENDSEC;\nDATA;\n\n/* note */\n#1=IFCPROJECT('g',$,'P',$,$,$,$,$,$);\nENDSEC;\nEND-ISO-10303-21;\n#2=IFCWALL();\n";
        let sections = split_sections(content);

        assert_eq!(sections.header, vec!["FILE_SCHEMA(('IFC4'));"]);
        assert_eq!(
            sections.data,
            vec![(8, "#1=IFCPROJECT('g',$,'P',$,$,$,$,$,$);")]
        );
    }

    #[test]
    fn later_definitions_win() {
        let lines = [(1, "#1=IFCWALL('a');"), (2, "#1=IFCSLAB('b');")];
        let (table, errors) = decode_instances(&lines);

        assert!(errors.is_empty());
        assert_eq!(table.len(), 1);
        assert_eq!(table.get(InstanceId(1)).unwrap().type_name, "IFCSLAB");
    }

    #[test]
    fn malformed_lines_become_wrapped_errors() {
        let lines = [(3, "garbage"), (4, "#2=IFCWALL('a');")];
        let (table, errors) = decode_instances(&lines);

        assert_eq!(table.len(), 1);
        assert_eq!(
            errors,
            vec![ParsingError::InstanceParsingFailed {
                line: 3,
                text: "garbage".into(),
                cause: Box::new(ParsingError::invalid_format("line does not start with '#'")),
            }]
        );
    }

    #[test]
    fn pathological_nesting_is_cut_off_instead_of_recursing() {
        let levels = 100_000;
        let line = format!(
            "#2=IFCWALL('w',$,'W',{}{},$);",
            "(".repeat(levels),
            ")".repeat(levels)
        );
        let instance = decode_instance(&line).unwrap();
        assert_eq!(instance.parameters.len(), 5);
        assert_eq!(instance.parameters[4], Parameter::Null);

        let mut lists = 0;
        let mut current = &instance.parameters[3];
        while let Parameter::List(items) = current {
            lists += 1;
            current = &items[0];
        }
        assert_eq!(lists, MAX_NESTING);
        match current {
            Parameter::Enumeration(raw) => assert!(raw.starts_with("((")),
            other => panic!("expected raw text, got {other:?}"),
        }
    }
}
