//! Helper functions callable from templates.

use cruet::Inflector;

use crate::value::Value;

/// Built-in template functions.
///
/// The first argument is the subject: in `{{ .name | snake }}` the piped value,
/// in `{{ snake .name }}` the first operand.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Func {
    Upper,
    Lower,
    Title,
    Trim,
    Snake,
    Kebab,
    Camel,
    Pascal,
    Replace,
    Eq,
    Ne,
    Not,
}

impl Func {
    pub fn from_name(name: &str) -> Option<Self> {
        let func = match name {
            "upper" => Func::Upper,
            "lower" => Func::Lower,
            "title" => Func::Title,
            "trim" => Func::Trim,
            "snake" => Func::Snake,
            "kebab" => Func::Kebab,
            "camel" => Func::Camel,
            "pascal" => Func::Pascal,
            "replace" => Func::Replace,
            "eq" => Func::Eq,
            "ne" => Func::Ne,
            "not" => Func::Not,
            _ => return None,
        };
        Some(func)
    }

    pub fn name(self) -> &'static str {
        match self {
            Func::Upper => "upper",
            Func::Lower => "lower",
            Func::Title => "title",
            Func::Trim => "trim",
            Func::Snake => "snake",
            Func::Kebab => "kebab",
            Func::Camel => "camel",
            Func::Pascal => "pascal",
            Func::Replace => "replace",
            Func::Eq => "eq",
            Func::Ne => "ne",
            Func::Not => "not",
        }
    }

    /// Number of arguments including the subject.
    pub fn arity(self) -> usize {
        match self {
            Func::Replace => 3,
            Func::Eq | Func::Ne => 2,
            _ => 1,
        }
    }

    /// Applies the function. Arity is checked at parse time.
    pub fn call(self, args: &[Value]) -> Value {
        let text = |i: usize| args.get(i).map(Value::to_string).unwrap_or_default();
        match self {
            Func::Upper => Value::String(text(0).to_uppercase()),
            Func::Lower => Value::String(text(0).to_lowercase()),
            Func::Title => Value::String(text(0).to_title_case()),
            Func::Trim => Value::String(text(0).trim().to_string()),
            Func::Snake => Value::String(to_snake_case(&text(0))),
            Func::Kebab => Value::String(to_kebab_case(&text(0))),
            Func::Camel => Value::String(to_camel_case(&text(0))),
            Func::Pascal => Value::String(to_pascal_case(&text(0))),
            Func::Replace => Value::String(text(0).replace(&text(1), &text(2))),
            Func::Eq => Value::Bool(args.first() == args.get(1)),
            Func::Ne => Value::Bool(args.first() != args.get(1)),
            Func::Not => Value::Bool(!args.first().is_some_and(Value::is_truthy)),
        }
    }
}

/// Lowercase words joined by `_`.
///
/// Spaces and hyphens become underscores and an underscore is inserted before
/// a capital that is followed by a lowercase letter, so `HTTPServer` becomes
/// `http_server`.
pub fn to_snake_case(s: &str) -> String {
    let chars: Vec<char> = s.trim().chars().collect();
    let mut out = String::with_capacity(chars.len() + 4);
    for (i, &c) in chars.iter().enumerate() {
        if c == ' ' || c == '-' {
            out.push('_');
            continue;
        }
        let next_is_lower = chars.get(i + 1).is_some_and(|n| n.is_lowercase());
        if i > 0 && c.is_uppercase() && next_is_lower {
            out.push('_');
        }
        out.extend(c.to_lowercase());
    }

    let mut collapsed = String::with_capacity(out.len());
    for c in out.chars() {
        if c == '_' && collapsed.ends_with('_') {
            continue;
        }
        collapsed.push(c);
    }
    collapsed.trim_matches('_').to_string()
}

pub fn to_kebab_case(s: &str) -> String {
    to_snake_case(s).replace('_', "-")
}

pub fn to_camel_case(s: &str) -> String {
    let normalized = s.trim().replace(['-', '_'], " ");
    let mut out = String::with_capacity(normalized.len());
    for (i, word) in normalized.split_whitespace().enumerate() {
        let word = word.to_lowercase();
        if i == 0 {
            out.push_str(&word);
        } else {
            out.push_str(&capitalize(&word));
        }
    }
    out
}

pub fn to_pascal_case(s: &str) -> String {
    capitalize(&to_camel_case(s))
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
