//! printf-style formatting for the `log.*` primitives.
//!
//! Supported verbs: `%s %v %q %d %i %f %F %e %E %g %G %x %X %o %b %c %t %%`
//! with flags `- + space 0 #`, a width and a precision. Problems never
//! abort formatting; they are rendered inline and listed in
//! [`Formatted::problems`]:
//!
//! ```text
//! %!d(MISSING)          no argument left for the verb
//! %!d(string=abc)       argument of the wrong type
//! %!(EXTRA number=3)    arguments beyond the template's verbs
//! %!(BADWIDTH)          width above MAX_FIELD, formatted without it
//! %!(BADPREC)           precision above MAX_FIELD, formatted without it
//! ```
//!
//! `%q` quotes strings the way Lua's `string.format("%q")` does.

use std::iter::Peekable;
use std::str::Chars;

/// Largest width or precision a directive may request.
pub const MAX_FIELD: usize = 10_000;

/// A script value prepared for formatting.
#[derive(Debug, Clone, PartialEq)]
pub enum FormatArg {
    Nil,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    /// Tables, functions and the like, already run through `tostring`.
    Other {
        type_name: &'static str,
        text: String,
    },
}

impl FormatArg {
    /// Lua type name.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Nil => "nil",
            Self::Bool(_) => "boolean",
            Self::Int(_) | Self::Float(_) => "number",
            Self::Str(_) => "string",
            Self::Other { type_name, .. } => type_name,
        }
    }

    /// The `tostring` form.
    pub fn display(&self) -> String {
        match self {
            Self::Nil => "nil".to_string(),
            Self::Bool(b) => b.to_string(),
            Self::Int(i) => i.to_string(),
            Self::Float(f) => lua_float(*f),
            Self::Str(s) => s.clone(),
            Self::Other { text, .. } => text.clone(),
        }
    }

    fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(i) => Some(*i),
            Self::Float(f) if f.is_finite() && f.fract() == 0.0 => Some(*f as i64),
            _ => None,
        }
    }

    fn as_float(&self) -> Option<f64> {
        match self {
            Self::Int(i) => Some(*i as f64),
            Self::Float(f) => Some(*f),
            _ => None,
        }
    }
}

/// Formatting output.
#[derive(Debug, Clone, PartialEq)]
pub struct Formatted {
    pub text: String,
    /// One entry per mismatch between template and arguments.
    pub problems: Vec<String>,
}

#[derive(Debug, Default)]
struct Directive {
    minus: bool,
    plus: bool,
    space: bool,
    zero: bool,
    sharp: bool,
    width: Option<usize>,
    precision: Option<usize>,
    verb: char,
}

/// Format `template` with `args`.
pub fn sprintf(template: &str, args: &[FormatArg]) -> Formatted {
    let mut text = String::with_capacity(template.len());
    let mut problems = Vec::new();
    let mut next = 0;
    let mut chars = template.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '%' {
            text.push(c);
            continue;
        }

        let mut directive = Directive::default();
        while let Some(&flag) = chars.peek() {
            match flag {
                '-' => directive.minus = true,
                '+' => directive.plus = true,
                ' ' => directive.space = true,
                '0' => directive.zero = true,
                '#' => directive.sharp = true,
                _ => break,
            }
            chars.next();
        }
        match read_number(&mut chars) {
            Some(width) if width > MAX_FIELD => {
                text.push_str("%!(BADWIDTH)");
                problems.push(format!("width {width} exceeds {MAX_FIELD}"));
            }
            width => directive.width = width,
        }
        if chars.peek() == Some(&'.') {
            chars.next();
            match read_number(&mut chars).unwrap_or(0) {
                precision if precision > MAX_FIELD => {
                    text.push_str("%!(BADPREC)");
                    problems.push(format!("precision {precision} exceeds {MAX_FIELD}"));
                }
                precision => directive.precision = Some(precision),
            }
        }

        let Some(verb) = chars.next() else {
            text.push_str("%!(NOVERB)");
            problems.push("template ends inside a directive".to_string());
            break;
        };
        if verb == '%' {
            text.push('%');
            continue;
        }
        directive.verb = verb;

        let Some(arg) = args.get(next) else {
            text.push_str(&format!("%!{verb}(MISSING)"));
            problems.push(format!("missing argument for %{verb}"));
            continue;
        };
        next += 1;

        match render(&directive, arg) {
            Some(rendered) => text.push_str(&pad(&directive, rendered)),
            None => {
                text.push_str(&format!("%!{verb}({}={})", arg.type_name(), arg.display()));
                problems.push(format!("%{verb} cannot format a {}", arg.type_name()));
            }
        }
    }

    if next < args.len() {
        let extra: Vec<String> = args[next..]
            .iter()
            .map(|a| format!("{}={}", a.type_name(), a.display()))
            .collect();
        text.push_str(&format!("%!(EXTRA {})", extra.join(", ")));
        problems.push(format!(
            "{} argument(s) beyond the template's directives",
            args.len() - next
        ));
    }

    Formatted { text, problems }
}

fn read_number(chars: &mut Peekable<Chars<'_>>) -> Option<usize> {
    let mut value: Option<usize> = None;
    while let Some(digit) = chars.peek().and_then(|c| c.to_digit(10)) {
        value = Some(value.unwrap_or(0).saturating_mul(10).saturating_add(digit as usize));
        chars.next();
    }
    value
}

fn render(d: &Directive, arg: &FormatArg) -> Option<String> {
    match d.verb {
        's' | 'v' => {
            let s = arg.display();
            Some(match d.precision {
                Some(p) => s.chars().take(p).collect(),
                None => s,
            })
        }
        'q' => Some(match arg {
            FormatArg::Str(s) | FormatArg::Other { text: s, .. } => lua_quote(s),
            other => other.display(),
        }),
        't' => match arg {
            FormatArg::Bool(b) => Some(b.to_string()),
            _ => None,
        },
        'd' | 'i' => arg.as_int().map(|i| signed(d, i.to_string(), i >= 0)),
        'x' | 'X' | 'o' | 'b' => arg.as_int().map(|i| radix(d, i)),
        'c' => arg
            .as_int()
            .and_then(|i| u32::try_from(i).ok())
            .and_then(char::from_u32)
            .map(String::from),
        'f' | 'F' => arg.as_float().map(|f| {
            let body = format!("{:.*}", d.precision.unwrap_or(6), f);
            signed(d, body, f >= 0.0)
        }),
        'e' | 'E' => arg.as_float().map(|f| {
            let body = exponent(f, d.precision.unwrap_or(6), d.verb == 'E');
            signed(d, body, f >= 0.0)
        }),
        'g' | 'G' => arg.as_float().map(|f| {
            let body = general(f, d.precision.unwrap_or(6), d.verb == 'G');
            signed(d, body, f >= 0.0)
        }),
        _ => None,
    }
}

/// Lua `%q` quoting: quote, backslash and newline are backslash-escaped;
/// other control bytes become decimal escapes.
fn lua_quote(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    let mut chars = s.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '"' | '\\' | '\n' => {
                out.push('\\');
                out.push(c);
            }
            c if c.is_ascii_control() => {
                // A following digit would extend a short escape.
                if chars.peek().is_some_and(char::is_ascii_digit) {
                    out.push_str(&format!("\\{:03}", c as u32));
                } else {
                    out.push_str(&format!("\\{}", c as u32));
                }
            }
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

fn signed(d: &Directive, body: String, non_negative: bool) -> String {
    if non_negative && d.plus {
        format!("+{body}")
    } else if non_negative && d.space {
        format!(" {body}")
    } else {
        body
    }
}

fn radix(d: &Directive, i: i64) -> String {
    let n = i.unsigned_abs();
    let (digits, prefix) = match d.verb {
        'x' => (format!("{n:x}"), "0x"),
        'X' => (format!("{n:X}"), "0X"),
        'o' => (format!("{n:o}"), "0"),
        _ => (format!("{n:b}"), "0b"),
    };
    let sign = if i < 0 { "-" } else { "" };
    let prefix = if d.sharp { prefix } else { "" };
    format!("{sign}{prefix}{digits}")
}

fn pad(d: &Directive, text: String) -> String {
    let len = text.chars().count();
    let Some(width) = d.width.filter(|&w| w > len) else {
        return text;
    };
    let fill = width - len;
    if d.minus {
        return format!("{text}{}", " ".repeat(fill));
    }
    let numeric = matches!(
        d.verb,
        'd' | 'i' | 'f' | 'F' | 'e' | 'E' | 'g' | 'G' | 'x' | 'X' | 'o' | 'b'
    );
    if d.zero && numeric {
        let sign_len = usize::from(text.starts_with(['-', '+', ' ']));
        let (sign, digits) = text.split_at(sign_len);
        return format!("{sign}{}{digits}", "0".repeat(fill));
    }
    format!("{}{text}", " ".repeat(fill))
}

fn non_finite(f: f64) -> String {
    if f.is_nan() {
        "nan".to_string()
    } else if f > 0.0 {
        "inf".to_string()
    } else {
        "-inf".to_string()
    }
}

/// `%e`: mantissa with `precision` decimals, exponent with sign and at
/// least two digits.
fn exponent(f: f64, precision: usize, upper: bool) -> String {
    if !f.is_finite() {
        return non_finite(f);
    }
    let sci = format!("{:.*e}", precision, f);
    let (mantissa, exp) = sci.split_once('e').unwrap_or((sci.as_str(), "0"));
    let exp: i32 = exp.parse().unwrap_or(0);
    join_exponent(mantissa, exp, upper)
}

/// `%g`: shortest of `%e` and `%f` at `precision` significant digits,
/// trailing zeros removed.
fn general(f: f64, precision: usize, upper: bool) -> String {
    if !f.is_finite() {
        return non_finite(f);
    }
    if f == 0.0 {
        return "0".to_string();
    }
    let p = precision.max(1);
    let sci = format!("{:.*e}", p - 1, f);
    let (mantissa, exp) = sci.split_once('e').unwrap_or((sci.as_str(), "0"));
    let exp: i32 = exp.parse().unwrap_or(0);
    if exp < -4 || exp >= p as i32 {
        join_exponent(trim_zeros(mantissa), exp, upper)
    } else {
        let decimals = (p as i32 - 1 - exp).max(0) as usize;
        trim_zeros(&format!("{:.*}", decimals, f)).to_string()
    }
}

fn join_exponent(mantissa: &str, exp: i32, upper: bool) -> String {
    let e = if upper { 'E' } else { 'e' };
    let sign = if exp < 0 { '-' } else { '+' };
    format!("{mantissa}{e}{sign}{:02}", exp.unsigned_abs())
}

fn trim_zeros(s: &str) -> &str {
    if s.contains('.') {
        s.trim_end_matches('0').trim_end_matches('.')
    } else {
        s
    }
}

/// Lua 5.4 `tostring` of a float: `%.14g`, with `.0` kept on integral
/// values.
pub fn lua_float(f: f64) -> String {
    let s = general(f, 14, false);
    if s.bytes().all(|b| b.is_ascii_digit() || b == b'-') {
        format!("{s}.0")
    } else {
        s
    }
}
