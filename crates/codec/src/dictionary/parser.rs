use std::{
    fs, io,
    path::{Path, PathBuf},
    str::SplitWhitespace,
    sync::Arc,
};

use super::{Dictionary, DictionaryEntry, Vendor};
use crate::value::AttributeKind;

/// `$INCLUDE` nesting bound; cycles surface as a depth error carrying
/// the full include trace instead of a stack overflow.
const MAX_INCLUDE_DEPTH: usize = 16;

/// The dictionary set compiled into the crate, used as the fallback
/// directory when a relative path cannot be opened on disk.
static EMBEDDED: &[(&str, &str)] = &[
    ("dictionary", include_str!("../../dictionaries/dictionary")),
    ("dictionary.rfc2865", include_str!("../../dictionaries/dictionary.rfc2865")),
    ("dictionary.rfc2866", include_str!("../../dictionaries/dictionary.rfc2866")),
    ("dictionary.rfc2869", include_str!("../../dictionaries/dictionary.rfc2869")),
    ("dictionary.cisco", include_str!("../../dictionaries/dictionary.cisco")),
    ("dictionary.microsoft", include_str!("../../dictionaries/dictionary.microsoft")),
];

#[derive(Debug)]
pub enum ParseErrorKind {
    Io(io::Error),
    NotFound(String),
    IncludeDepth,
    MissingArgument(&'static str),
    NotNumeric(String),
    AttributeOutOfRange(u32),
    UnknownAttribute(String),
    UnknownVendor(String),
    DuplicateVendor(u32),
    InvalidVendorFormat(String),
    NotEnumerable(String),
    UnbalancedVendorScope,
}

/// A dictionary load failure, with the location of every enclosing
/// `$INCLUDE` frame (innermost first).
#[derive(Debug)]
pub struct ParseError {
    pub kind: ParseErrorKind,
    pub trace: Vec<(String, usize)>,
}

impl std::error::Error for ParseError {}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "dictionary parse error: {:?}", self.kind)?;

        for (index, (file, line)) in self.trace.iter().enumerate() {
            if index == 0 {
                write!(f, " at {}:{}", file, line)?;
            } else {
                write!(f, ", included from {}:{}", file, line)?;
            }
        }

        Ok(())
    }
}

enum Source {
    File(PathBuf),
    Embedded(usize),
}

impl Source {
    fn display(&self) -> String {
        match self {
            Self::File(path) => path.display().to_string(),
            Self::Embedded(index) => EMBEDDED[*index].0.to_string(),
        }
    }
}

fn embedded(name: &str) -> Result<(Source, &'static str), ParseErrorKind> {
    EMBEDDED
        .iter()
        .position(|(it, _)| *it == name)
        .map(|index| (Source::Embedded(index), EMBEDDED[index].1))
        .ok_or_else(|| ParseErrorKind::NotFound(name.to_string()))
}

pub(super) fn load(dictionary: &Dictionary, path: &Path) -> Result<(), ParseError> {
    let located = if path.is_absolute() {
        fs::read_to_string(path)
            .map(|content| (Source::File(path.to_path_buf()), content))
            .map_err(ParseErrorKind::Io)
    } else {
        match fs::read_to_string(path) {
            Ok(content) => Ok((Source::File(path.to_path_buf()), content)),
            Err(_) => embedded(&path.to_string_lossy()).map(|(source, content)| (source, content.to_string())),
        }
    };

    match located {
        Ok((source, content)) => parse_source(dictionary, &source, &content, &mut Vec::new(), 0),
        Err(kind) => Err(ParseError {
            kind,
            trace: vec![(path.display().to_string(), 0)],
        }),
    }
}

fn parse_source(
    dictionary: &Dictionary,
    source: &Source,
    content: &str,
    scope: &mut Vec<Arc<Vendor>>,
    depth: usize,
) -> Result<(), ParseError> {
    for (number, line) in content.lines().enumerate() {
        let line = line.split('#').next().unwrap_or("").trim();
        if line.is_empty() {
            continue;
        }

        let mut tokens = line.split_whitespace();
        let Some(directive) = tokens.next() else {
            continue;
        };

        let located = |kind| ParseError {
            kind,
            trace: vec![(source.display(), number + 1)],
        };

        if directive == "$INCLUDE" {
            let target = tokens.next().ok_or_else(|| located(ParseErrorKind::MissingArgument("path")))?;
            if depth >= MAX_INCLUDE_DEPTH {
                return Err(located(ParseErrorKind::IncludeDepth));
            }

            if let Err(mut error) = include(dictionary, source, target, scope, depth + 1) {
                error.trace.push((source.display(), number + 1));
                return Err(error);
            }

            continue;
        }

        let result = match directive {
            "ATTRIBUTE" => parse_attribute(dictionary, scope, &mut tokens),
            "VALUE" => parse_value(dictionary, &mut tokens),
            "VENDOR" => parse_vendor(dictionary, &mut tokens),
            "BEGIN-VENDOR" => {
                let name = tokens.next().ok_or(ParseErrorKind::MissingArgument("vendor"));
                name.and_then(|name| {
                    dictionary
                        .find_vendor(name)
                        .map(|vendor| scope.push(vendor))
                        .ok_or_else(|| ParseErrorKind::UnknownVendor(name.to_string()))
                })
            }
            "END-VENDOR" => scope
                .pop()
                .map(|_| ())
                .ok_or(ParseErrorKind::UnbalancedVendorScope),
            // unknown directives are skipped so that newer dictionary
            // files still load
            _ => Ok(()),
        };

        if let Err(kind) = result {
            return Err(located(kind));
        }
    }

    Ok(())
}

fn include(
    dictionary: &Dictionary,
    from: &Source,
    target: &str,
    scope: &mut Vec<Arc<Vendor>>,
    depth: usize,
) -> Result<(), ParseError> {
    let located = match from {
        Source::Embedded(_) => embedded(target).map(|(source, content)| (source, content.to_string())),
        Source::File(path) => {
            let target_path = if Path::new(target).is_absolute() {
                PathBuf::from(target)
            } else {
                path.parent().unwrap_or(Path::new(".")).join(target)
            };

            fs::read_to_string(&target_path)
                .map(|content| (Source::File(target_path), content))
                .map_err(ParseErrorKind::Io)
        }
    };

    match located {
        Ok((source, content)) => parse_source(dictionary, &source, &content, scope, depth),
        Err(kind) => Err(ParseError { kind, trace: Vec::new() }),
    }
}

fn parse_attribute(
    dictionary: &Dictionary,
    scope: &[Arc<Vendor>],
    tokens: &mut SplitWhitespace<'_>,
) -> Result<(), ParseErrorKind> {
    let name = tokens.next().ok_or(ParseErrorKind::MissingArgument("name"))?;
    let id = parse_number(tokens.next().ok_or(ParseErrorKind::MissingArgument("id"))?)?;
    let kind = AttributeKind::from_tag(tokens.next().ok_or(ParseErrorKind::MissingArgument("type"))?);

    let mut encrypt = None;
    if let Some(flags) = tokens.next() {
        for flag in flags.split(',') {
            if let Some(value) = flag.strip_prefix("encrypt=") {
                encrypt = Some(parse_number(value)? as u8);
            }
        }
    }

    let entry = match scope.last() {
        Some(vendor) => {
            DictionaryEntry::vendor_specific(name.to_string(), vendor.clone(), id, kind, encrypt)
        }
        None => {
            if id == 0 || id > 255 {
                return Err(ParseErrorKind::AttributeOutOfRange(id));
            }

            DictionaryEntry::standard(name.to_string(), id as u8, kind, encrypt)
        }
    };

    dictionary.register_attribute(entry);
    Ok(())
}

fn parse_value(dictionary: &Dictionary, tokens: &mut SplitWhitespace<'_>) -> Result<(), ParseErrorKind> {
    let attribute = tokens.next().ok_or(ParseErrorKind::MissingArgument("attribute"))?;
    let name = tokens.next().ok_or(ParseErrorKind::MissingArgument("name"))?;
    let number = parse_number(tokens.next().ok_or(ParseErrorKind::MissingArgument("value"))?)?;

    let entry = dictionary
        .get(attribute)
        .map_err(|_| ParseErrorKind::UnknownAttribute(attribute.to_string()))?;

    match entry.real_kind() {
        AttributeKind::Byte | AttributeKind::Short | AttributeKind::Integer | AttributeKind::Date => {}
        _ => return Err(ParseErrorKind::NotEnumerable(attribute.to_string())),
    }

    entry.insert_value(name.to_string(), number);
    Ok(())
}

fn parse_vendor(dictionary: &Dictionary, tokens: &mut SplitWhitespace<'_>) -> Result<(), ParseErrorKind> {
    let name = tokens.next().ok_or(ParseErrorKind::MissingArgument("name"))?;
    let id = parse_number(tokens.next().ok_or(ParseErrorKind::MissingArgument("id"))?)?;

    let mut vendor = Vendor {
        name: name.to_string(),
        id,
        type_size: 1,
        length_size: 1,
    };

    if let Some(extra) = tokens.next()
        && let Some(format) = extra.strip_prefix("format=")
    {
        let mut fields = format.split(',');
        let type_size = fields.next().ok_or_else(|| ParseErrorKind::InvalidVendorFormat(extra.to_string()))?;
        let length_size = fields.next().ok_or_else(|| ParseErrorKind::InvalidVendorFormat(extra.to_string()))?;

        vendor.type_size = parse_number(type_size)? as usize;
        vendor.length_size = parse_number(length_size)? as usize;

        if !matches!(vendor.type_size, 1 | 2 | 4) || vendor.length_size > 2 {
            return Err(ParseErrorKind::InvalidVendorFormat(extra.to_string()));
        }
    }

    dictionary
        .register_vendor(vendor)
        .map(|_| ())
        .ok_or(ParseErrorKind::DuplicateVendor(id))
}

fn parse_number(token: &str) -> Result<u32, ParseErrorKind> {
    let parsed = match token.strip_prefix("0x").or_else(|| token.strip_prefix("0X")) {
        Some(hex) => u32::from_str_radix(hex, 16),
        None => token.parse(),
    };

    parsed.map_err(|_| ParseErrorKind::NotNumeric(token.to_string()))
}

#[cfg(test)]
mod tests {
    use std::{fs, sync::Arc};

    use super::super::Dictionary;
    use super::ParseErrorKind;
    use crate::value::AttributeKind;

    fn load_text(dictionary: &Dictionary, text: &str) -> Result<(), super::ParseError> {
        let path = std::env::temp_dir().join(format!(
            "radius-dictionary-test-{}-{:p}",
            std::process::id(),
            &text
        ));

        fs::write(&path, text).unwrap();
        let result = dictionary.load(&path);
        let _ = fs::remove_file(&path);
        result
    }

    #[test]
    fn test_attribute_and_value_directives() {
        let dictionary = Dictionary::new();
        load_text(
            &dictionary,
            "# comment only\n\
             ATTRIBUTE Test-Name 240 string\n\
             ATTRIBUTE Test-Counter 241 integer # trailing comment\n\
             VALUE Test-Counter Spinning 1\n\
             VALUE Test-Counter Stopped 0x10\n",
        )
        .unwrap();

        let entry = dictionary.get("test-name").unwrap();
        assert_eq!(entry.id(), 240);
        assert_eq!(entry.real_kind(), AttributeKind::String);

        let counter = dictionary.get(241u32).unwrap();
        assert_eq!(counter.value_name(1).as_deref(), Some("Spinning"));
        assert_eq!(counter.value_name(16).as_deref(), Some("Stopped"));
        assert_eq!(counter.value_number("spinning"), Some(1));
    }

    #[test]
    fn test_vendor_scope() {
        let dictionary = Dictionary::new();
        load_text(
            &dictionary,
            "VENDOR Example 32473 format=2,1\n\
             BEGIN-VENDOR Example\n\
             ATTRIBUTE Example-Tier 300 integer\n\
             END-VENDOR Example\n",
        )
        .unwrap();

        let vendor = dictionary.find_vendor("Example").unwrap();
        assert_eq!((vendor.type_size, vendor.length_size), (2, 1));

        let entry = dictionary.vsa(32473, 300);
        assert_eq!(entry.name(), "Example-Tier");
        assert!(Arc::ptr_eq(&entry, &dictionary.get("Example-Tier").unwrap()));
    }

    #[test]
    fn test_rejects_bad_directives() {
        let dictionary = Dictionary::new();

        assert!(matches!(
            load_text(&dictionary, "ATTRIBUTE Broken 0 string\n").unwrap_err().kind,
            ParseErrorKind::AttributeOutOfRange(0)
        ));

        assert!(matches!(
            load_text(&dictionary, "ATTRIBUTE Broken 999 string\n").unwrap_err().kind,
            ParseErrorKind::AttributeOutOfRange(999)
        ));

        assert!(matches!(
            load_text(&dictionary, "VALUE No-Such-Attribute Stopped 1\n").unwrap_err().kind,
            ParseErrorKind::UnknownAttribute(_)
        ));

        assert!(matches!(
            load_text(
                &dictionary,
                "ATTRIBUTE Test-Text 240 string\nVALUE Test-Text Stopped 1\n"
            )
            .unwrap_err()
            .kind,
            ParseErrorKind::NotEnumerable(_)
        ));

        assert!(matches!(
            load_text(&dictionary, "ATTRIBUTE Test-Int 241 integer\nVALUE Test-Int Broken x\n")
                .unwrap_err()
                .kind,
            ParseErrorKind::NotNumeric(_)
        ));

        assert!(matches!(
            load_text(&dictionary, "BEGIN-VENDOR Nobody\n").unwrap_err().kind,
            ParseErrorKind::UnknownVendor(_)
        ));

        assert!(matches!(
            load_text(&dictionary, "END-VENDOR\n").unwrap_err().kind,
            ParseErrorKind::UnbalancedVendorScope
        ));

        assert!(matches!(
            load_text(&dictionary, "VENDOR Dup 1000\nVENDOR Dup2 1000\n").unwrap_err().kind,
            ParseErrorKind::DuplicateVendor(1000)
        ));

        assert!(matches!(
            load_text(&dictionary, "VENDOR Odd 1001 format=3,1\n").unwrap_err().kind,
            ParseErrorKind::InvalidVendorFormat(_)
        ));
    }

    #[test]
    fn test_unknown_directives_skipped() {
        let dictionary = Dictionary::new();
        load_text(
            &dictionary,
            "PROTOCOL RADIUS radius\n\
             FLAGS internal\n\
             ATTRIBUTE Test-Kept 240 string\n",
        )
        .unwrap();

        assert!(dictionary.get("Test-Kept").is_ok());
    }

    #[test]
    fn test_include_trace_and_missing_target() {
        let dictionary = Dictionary::new();
        let error = load_text(&dictionary, "$INCLUDE does-not-exist-anywhere\n").unwrap_err();

        assert!(matches!(error.kind, ParseErrorKind::Io(_)));
        assert_eq!(error.trace.len(), 1);
        assert_eq!(error.trace[0].1, 1);
    }

    #[test]
    fn test_embedded_fallback() {
        let dictionary = Dictionary::new();
        dictionary.load("dictionary.cisco").unwrap();

        assert_eq!(dictionary.find_vendor("Cisco").unwrap().id, 9);
    }
}
