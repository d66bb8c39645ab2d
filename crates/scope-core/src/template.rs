//! Missing-field tolerant template interpolation
//!
//! Templates are literal text with `{field}` replacement fields. A field may
//! carry a conversion (`{field!r}`) and a format spec (`{field:>8}`), and the
//! spec may itself contain fields (`{field:{width}}`).
//!
//! A field whose name the source does not know is written back as markup, so
//! `"{present}-{absent}"` renders to `"P-{absent}"` when only `present` is
//! defined. Nesting, through specs or through fields whose values are
//! themselves templates, is bounded by [`MAX_RECURSION_DEPTH`].

use std::collections::BTreeMap;

use crate::value::Scalar;
use crate::{Error, Result};

/// Deepest nesting of specs and templated fields before rendering fails.
pub const MAX_RECURSION_DEPTH: usize = 8;

/// A source of replacement field values.
pub trait Fields {
    /// Look up `name`, resolving it at nesting `depth`.
    ///
    /// `Ok(None)` means the field is unknown or unset and will be passed
    /// through as markup.
    fn field(&self, name: &str, depth: usize) -> Result<Option<Scalar>>;
}

impl Fields for BTreeMap<String, Scalar> {
    fn field(&self, name: &str, _depth: usize) -> Result<Option<Scalar>> {
        Ok(self.get(name).cloned())
    }
}

/// Render `template` against `fields`.
///
/// # Example
///
/// ```
/// use std::collections::BTreeMap;
/// use scope_core::{Scalar, template};
///
/// let mut fields = BTreeMap::new();
/// fields.insert("present".to_string(), Scalar::from("P"));
/// assert_eq!(template::render("{present}-{absent}", &fields).unwrap(), "P-{absent}");
/// ```
pub fn render(template: &str, fields: &dyn Fields) -> Result<String> {
    render_at(template, fields, 0)
}

pub(crate) fn render_at(template: &str, fields: &dyn Fields, depth: usize) -> Result<String> {
    if depth > MAX_RECURSION_DEPTH {
        return Err(Error::RecursionLimit {
            limit: MAX_RECURSION_DEPTH,
        });
    }

    let mut out = String::with_capacity(template.len());
    for piece in parse(template)? {
        match piece {
            Piece::Literal(text) => out.push_str(text),
            Piece::Field(field) => {
                let value = if field.name.is_empty() {
                    None
                } else {
                    fields.field(field.name, depth + 1)?
                };
                match value {
                    Some(value) => {
                        let spec = render_at(field.spec, fields, depth + 1)?;
                        let value = convert(value, field.conversion);
                        out.push_str(&format_scalar(&value, &spec, template)?);
                    }
                    None => field.write_markup(&mut out),
                }
            }
        }
    }
    Ok(out)
}

#[derive(Debug, PartialEq)]
enum Piece<'a> {
    Literal(&'a str),
    Field(FieldRef<'a>),
}

#[derive(Debug, PartialEq)]
struct FieldRef<'a> {
    name: &'a str,
    conversion: Option<char>,
    spec: &'a str,
}

impl FieldRef<'_> {
    fn write_markup(&self, out: &mut String) {
        out.push('{');
        out.push_str(self.name);
        if let Some(conversion) = self.conversion {
            out.push('!');
            out.push(conversion);
        }
        if !self.spec.is_empty() {
            out.push(':');
            out.push_str(self.spec);
        }
        out.push('}');
    }
}

fn parse(template: &str) -> Result<Vec<Piece<'_>>> {
    let bytes = template.as_bytes();
    let mut pieces = Vec::new();
    let mut start = 0;
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'{' if bytes.get(i + 1) == Some(&b'{') => {
                pieces.push(Piece::Literal(&template[start..=i]));
                i += 2;
                start = i;
            }
            b'}' if bytes.get(i + 1) == Some(&b'}') => {
                pieces.push(Piece::Literal(&template[start..=i]));
                i += 2;
                start = i;
            }
            b'}' => {
                return Err(Error::invalid_template(template, "single '}' encountered"));
            }
            b'{' => {
                if start < i {
                    pieces.push(Piece::Literal(&template[start..i]));
                }
                let close = matching_brace(bytes, i).ok_or_else(|| {
                    Error::invalid_template(template, "expected '}' before end of string")
                })?;
                pieces.push(Piece::Field(parse_field(template, &template[i + 1..close])?));
                i = close + 1;
                start = i;
            }
            _ => i += 1,
        }
    }
    if start < bytes.len() {
        pieces.push(Piece::Literal(&template[start..]));
    }
    Ok(pieces)
}

fn matching_brace(bytes: &[u8], open: usize) -> Option<usize> {
    let mut level = 0usize;
    for (offset, b) in bytes[open..].iter().enumerate() {
        match b {
            b'{' => level += 1,
            b'}' => {
                level -= 1;
                if level == 0 {
                    return Some(open + offset);
                }
            }
            _ => {}
        }
    }
    None
}

fn parse_field<'a>(template: &str, body: &'a str) -> Result<FieldRef<'a>> {
    let name_end = body.find(['!', ':']).unwrap_or(body.len());
    let name = &body[..name_end];
    if name.contains(['{', '}']) {
        return Err(Error::invalid_template(template, "unexpected '{' in field name"));
    }
    let rest = &body[name_end..];

    let (conversion, rest) = match rest.strip_prefix('!') {
        Some(after) => {
            let mut chars = after.chars();
            let conversion = chars.next().ok_or_else(|| {
                Error::invalid_template(template, "end of field after '!'")
            })?;
            if !matches!(conversion, 's' | 'r' | 'a') {
                return Err(Error::invalid_template(
                    template,
                    format!("unknown conversion specifier {conversion}"),
                ));
            }
            let after = chars.as_str();
            if !after.is_empty() && !after.starts_with(':') {
                return Err(Error::invalid_template(
                    template,
                    "expected ':' after conversion specifier",
                ));
            }
            (Some(conversion), after)
        }
        None => (None, rest),
    };
    let spec = rest.strip_prefix(':').unwrap_or(rest);

    Ok(FieldRef {
        name,
        conversion,
        spec,
    })
}

fn convert(value: Scalar, conversion: Option<char>) -> Scalar {
    match (conversion, value) {
        (None, value) => value,
        (Some('s'), value) => Scalar::Text(value.to_string()),
        (Some(c), Scalar::Text(s)) => Scalar::Text(quote(&s, c == 'a')),
        (Some(_), other) => Scalar::Text(other.to_string()),
    }
}

/// Quote text for `!r`, or for `!a` with non-ASCII escaped as well.
///
/// Single quotes are used unless the text holds a single quote and no
/// double quote.
fn quote(s: &str, ascii_only: bool) -> String {
    let delimiter = if s.contains('\'') && !s.contains('"') { '"' } else { '\'' };
    let mut out = String::with_capacity(s.len() + 2);
    out.push(delimiter);
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c == delimiter => {
                out.push('\\');
                out.push(c);
            }
            c if c.is_control() || (ascii_only && !c.is_ascii()) => {
                let code = u32::from(c);
                if code <= 0xff {
                    out.push_str(&format!("\\x{code:02x}"));
                } else if code <= 0xffff {
                    out.push_str(&format!("\\u{code:04x}"));
                } else {
                    out.push_str(&format!("\\U{code:08x}"));
                }
            }
            c => out.push(c),
        }
    }
    out.push(delimiter);
    out
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Align {
    Left,
    Right,
    Center,
    AfterSign,
}

#[derive(Debug, Default)]
struct FormatSpec {
    fill: Option<char>,
    align: Option<Align>,
    sign: Option<char>,
    zero: bool,
    width: usize,
    precision: Option<usize>,
    ty: Option<char>,
}

fn align_of(c: char) -> Option<Align> {
    match c {
        '<' => Some(Align::Left),
        '>' => Some(Align::Right),
        '^' => Some(Align::Center),
        '=' => Some(Align::AfterSign),
        _ => None,
    }
}

impl FormatSpec {
    fn parse(spec: &str, template: &str) -> Result<Self> {
        let chars: Vec<char> = spec.chars().collect();
        let mut parsed = FormatSpec::default();
        let mut i = 0;

        if chars.len() >= 2 && align_of(chars[1]).is_some() {
            parsed.fill = Some(chars[0]);
            parsed.align = align_of(chars[1]);
            i = 2;
        } else if let Some(align) = chars.first().copied().and_then(align_of) {
            parsed.align = Some(align);
            i = 1;
        }
        if let Some(&c @ ('+' | '-' | ' ')) = chars.get(i) {
            parsed.sign = Some(c);
            i += 1;
        }
        if chars.get(i) == Some(&'0') {
            parsed.zero = true;
            i += 1;
        }
        let width_start = i;
        while chars.get(i).is_some_and(|c| c.is_ascii_digit()) {
            i += 1;
        }
        if i > width_start {
            parsed.width = digits(&chars[width_start..i], template)?;
        }
        if chars.get(i) == Some(&'.') {
            i += 1;
            let precision_start = i;
            while chars.get(i).is_some_and(|c| c.is_ascii_digit()) {
                i += 1;
            }
            if i == precision_start {
                return Err(Error::invalid_template(template, "format specifier missing precision"));
            }
            parsed.precision = Some(digits(&chars[precision_start..i], template)?);
        }
        if let Some(&c) = chars.get(i) {
            parsed.ty = Some(c);
            i += 1;
        }
        if i < chars.len() {
            return Err(Error::invalid_template(
                template,
                format!("invalid format specifier '{spec}'"),
            ));
        }
        Ok(parsed)
    }
}

fn digits(chars: &[char], template: &str) -> Result<usize> {
    chars
        .iter()
        .collect::<String>()
        .parse()
        .map_err(|_| Error::invalid_template(template, "format width too large"))
}

fn format_scalar(value: &Scalar, spec: &str, template: &str) -> Result<String> {
    if spec.is_empty() {
        return Ok(value.to_string());
    }
    let spec = FormatSpec::parse(spec, template)?;
    let unknown = |ty: char, what: &str| {
        Error::invalid_template(template, format!("unknown format code '{ty}' for {what}"))
    };

    let (sign, body, numeric) = match value {
        Scalar::Text(s) => {
            if let Some(ty) = spec.ty.filter(|t| *t != 's') {
                return Err(unknown(ty, "text"));
            }
            if spec.sign.is_some() {
                return Err(Error::invalid_template(template, "sign not allowed for text"));
            }
            let body = match spec.precision {
                Some(p) => s.chars().take(p).collect(),
                None => s.clone(),
            };
            (String::new(), body, false)
        }
        Scalar::Boolean(b) => match spec.ty {
            None | Some('s') => (String::new(), b.to_string(), false),
            Some('d') => (String::new(), u8::from(*b).to_string(), true),
            Some(ty) => return Err(unknown(ty, "boolean")),
        },
        Scalar::Integer(i) => {
            let magnitude = i.unsigned_abs();
            let body = match spec.ty {
                None | Some('d') => magnitude.to_string(),
                Some('x') => format!("{magnitude:x}"),
                Some('X') => format!("{magnitude:X}"),
                Some('o') => format!("{magnitude:o}"),
                Some('b') => format!("{magnitude:b}"),
                Some(ty @ ('f' | 'e' | '%')) => float_body((*i as f64).abs(), ty, spec.precision),
                Some(ty) => return Err(unknown(ty, "integer")),
            };
            (sign_prefix(*i < 0, spec.sign), body, true)
        }
        Scalar::Float(f) => {
            let body = match spec.ty {
                None => match spec.precision {
                    Some(p) => format!("{:.*}", p, f.abs()),
                    None => format!("{:?}", f.abs()),
                },
                Some(ty @ ('f' | 'e' | '%')) => float_body(f.abs(), ty, spec.precision),
                Some(ty) => return Err(unknown(ty, "float")),
            };
            (sign_prefix(f.is_sign_negative() && *f != 0.0, spec.sign), body, true)
        }
    };

    Ok(pad(sign, body, numeric, &spec))
}

fn sign_prefix(negative: bool, sign: Option<char>) -> String {
    match (negative, sign) {
        (true, _) => "-".to_string(),
        (false, Some('+')) => "+".to_string(),
        (false, Some(' ')) => " ".to_string(),
        _ => String::new(),
    }
}

fn float_body(f: f64, ty: char, precision: Option<usize>) -> String {
    let precision = precision.unwrap_or(6);
    match ty {
        'e' => {
            let formatted = format!("{:.*e}", precision, f);
            match formatted.split_once('e') {
                Some((mantissa, exp)) => {
                    let (exp_sign, digits) = match exp.strip_prefix('-') {
                        Some(d) => ('-', d),
                        None => ('+', exp),
                    };
                    format!("{mantissa}e{exp_sign}{digits:0>2}")
                }
                None => formatted,
            }
        }
        '%' => format!("{:.*}%", precision, f * 100.0),
        _ => format!("{:.*}", precision, f),
    }
}

fn pad(sign: String, body: String, numeric: bool, spec: &FormatSpec) -> String {
    let len = sign.chars().count() + body.chars().count();
    if len >= spec.width {
        return sign + &body;
    }
    let (fill, align) = match (spec.fill, spec.align) {
        (Some(fill), Some(align)) => (fill, align),
        (None, Some(align)) => (if spec.zero { '0' } else { ' ' }, align),
        (_, None) if spec.zero && numeric => ('0', Align::AfterSign),
        (_, None) if numeric => (' ', Align::Right),
        (_, None) => (' ', Align::Left),
    };
    let gap = spec.width - len;
    let filler = |n: usize| std::iter::repeat_n(fill, n).collect::<String>();

    match align {
        Align::Left => format!("{sign}{body}{}", filler(gap)),
        Align::Right => format!("{}{sign}{body}", filler(gap)),
        Align::Center => format!("{}{sign}{body}{}", filler(gap / 2), filler(gap - gap / 2)),
        Align::AfterSign => format!("{sign}{}{body}", filler(gap)),
    }
}
