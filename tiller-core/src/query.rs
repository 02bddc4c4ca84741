use crate::{MapperError, Result, SqlWriter, SqliteWriter, Value, is_ref_char};
use std::{
    borrow::Cow,
    collections::{BTreeMap, BTreeSet, HashMap},
    mem,
};

/// Structural substitution for a `@name` placeholder.
///
/// Text is inserted verbatim (and may itself carry `{var}` placeholders of the enclosing
/// template), a nested [`Query`] is rendered on its own and inserted as an opaque block, a list is
/// joined with the separator of the enclosing template.
#[derive(Debug, Clone, PartialEq)]
pub enum Raw {
    Text(String),
    Query(Box<Query>),
    List(Vec<Raw>),
}

impl From<&str> for Raw {
    fn from(value: &str) -> Self {
        Raw::Text(value.into())
    }
}

impl From<String> for Raw {
    fn from(value: String) -> Self {
        Raw::Text(value)
    }
}

impl From<&String> for Raw {
    fn from(value: &String) -> Self {
        Raw::Text(value.clone())
    }
}

impl From<Query> for Raw {
    fn from(value: Query) -> Self {
        Raw::Query(Box::new(value))
    }
}

impl<T: Into<Raw>> From<Vec<T>> for Raw {
    fn from(value: Vec<T>) -> Self {
        Raw::List(value.into_iter().map(Into::into).collect())
    }
}

impl Raw {
    fn map_nested(&mut self, mapping: &HashMap<String, String>) {
        match self {
            Raw::Text(..) => {}
            Raw::Query(query) => {
                query.map(mapping);
            }
            Raw::List(items) => items.iter_mut().for_each(|v| v.map_nested(mapping)),
        }
    }

    fn rename(&mut self, mapping: &HashMap<String, String>) {
        match self {
            Raw::Text(name) => {
                if let Some(column) = mapping.get(name.as_str()) {
                    name.clone_from(column);
                }
            }
            Raw::Query(..) => {}
            Raw::List(items) => items.iter_mut().for_each(|v| v.rename(mapping)),
        }
    }
}

#[derive(Debug)]
enum Segment {
    /// Template text, still subject to `{var}` substitution.
    Open(String),
    /// Output of a nested fragment.
    Sealed(String),
}

fn push_open(segments: &mut Vec<Segment>, text: &str) {
    if text.is_empty() {
        return;
    }
    if let Some(Segment::Open(last)) = segments.last_mut() {
        last.push_str(text);
    } else {
        segments.push(Segment::Open(text.into()));
    }
}

/// SQL template with two kinds of placeholders.
///
/// - `@name` is replaced by the raw registered under `name`, or by nothing when no raw is set
///   (the whitespace following the placeholder is dropped with it, so optional clauses vanish).
/// - `{name}` is replaced by the escaped variable registered under `name`. Every placeholder
///   needs a variable and every variable needs a placeholder.
///
/// ```rust
/// use tiller_core::Query;
/// let sql = Query::new("SELECT * FROM @table WHERE @column = {value} @limit")
///     .raw("table", "users")
///     .name("column", "lastName")
///     .var("value", "O'Neil")
///     .render()
///     .unwrap();
/// assert_eq!(sql, "SELECT * FROM users WHERE lastName = 'O''Neil'");
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    template: Cow<'static, str>,
    vars: BTreeMap<String, Value>,
    raws: BTreeMap<String, Raw>,
    names: BTreeSet<String>,
    separator: Cow<'static, str>,
    wrap: bool,
}

impl Default for Query {
    fn default() -> Self {
        Self::new("")
    }
}

impl Query {
    pub fn new(template: impl Into<Cow<'static, str>>) -> Self {
        Self {
            template: template.into(),
            vars: Default::default(),
            raws: Default::default(),
            names: Default::default(),
            separator: Cow::Borrowed(", "),
            wrap: true,
        }
    }

    pub fn with<V, R>(template: impl Into<Cow<'static, str>>, vars: V, raws: R) -> Self
    where
        V: IntoIterator<Item = (String, Value)>,
        R: IntoIterator<Item = (String, Raw)>,
    {
        let mut query = Self::new(template);
        query.vars.extend(vars);
        query.raws.extend(raws);
        query
    }

    pub fn template(&self) -> &str {
        &self.template
    }

    pub fn var(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set_var(name, value);
        self
    }

    pub fn raw(mut self, name: impl Into<String>, value: impl Into<Raw>) -> Self {
        self.set_raw(name, value);
        self
    }

    /// Same as [`Query::raw`], additionally marking the raw as a field name that [`Query::map`]
    /// translates into a column name.
    pub fn name(mut self, name: impl Into<String>, value: impl Into<Raw>) -> Self {
        let name = name.into();
        self.names.insert(name.clone());
        self.set_raw(name, value);
        self
    }

    /// Separator used to join list raws, and whether the joined list is parenthesized.
    pub fn bind(mut self, separator: impl Into<Cow<'static, str>>, wrap: bool) -> Self {
        self.separator = separator.into();
        self.wrap = wrap;
        self
    }

    pub fn set_var(&mut self, name: impl Into<String>, value: impl Into<Value>) -> &mut Self {
        self.vars.insert(name.into(), value.into());
        self
    }

    pub fn set_raw(&mut self, name: impl Into<String>, value: impl Into<Raw>) -> &mut Self {
        self.raws.insert(name.into(), value.into());
        self
    }

    pub fn unset_raw(&mut self, name: &str) -> &mut Self {
        self.raws.remove(name);
        self.names.remove(name);
        self
    }

    pub fn get_raw(&self, name: &str) -> Option<&Raw> {
        self.raws.get(name)
    }

    /// Translates every raw marked with [`Query::name`] through `mapping` (field name to column
    /// name), recursing into nested fragments. Names missing from `mapping` are kept as they are.
    pub fn map(&mut self, mapping: &HashMap<String, String>) -> &mut Self {
        for raw in self.raws.values_mut() {
            raw.map_nested(mapping);
        }
        for name in mem::take(&mut self.names) {
            if let Some(raw) = self.raws.get_mut(&name) {
                raw.rename(mapping);
            }
        }
        self
    }

    pub fn render(&self) -> Result<String> {
        self.render_with(&SqliteWriter)
    }

    pub fn render_with(&self, writer: &dyn SqlWriter) -> Result<String> {
        let mut segments = Vec::new();
        self.expand_raws(writer, &mut segments)?;
        let used = segments
            .iter()
            .filter_map(|v| match v {
                Segment::Open(text) => Some(text.as_str()),
                Segment::Sealed(..) => None,
            })
            .flat_map(placeholders)
            .map(|(_, name)| name)
            .collect::<BTreeSet<_>>();
        let unused = self
            .vars
            .keys()
            .filter(|v| !used.contains(v.as_str()))
            .cloned()
            .collect::<Vec<_>>();
        if !unused.is_empty() {
            return Err(MapperError::UnusedVariable { names: unused }.into());
        }
        let mut out = String::with_capacity(self.template.len() * 2);
        for segment in segments {
            match segment {
                Segment::Sealed(text) => out.push_str(&text),
                Segment::Open(text) => self.write_vars(writer, &mut out, &text)?,
            }
        }
        Ok(out.trim().to_string())
    }

    fn expand_raws(&self, writer: &dyn SqlWriter, segments: &mut Vec<Segment>) -> Result<()> {
        let template = self.template.as_ref();
        let mut position = 0;
        let mut cursor = 0;
        while let Some(found) = template[cursor..].find('@') {
            let at = cursor + found;
            let name_end = template[at + 1..]
                .find(|c: char| !is_ref_char(c))
                .map_or(template.len(), |v| at + 1 + v);
            if name_end == at + 1 {
                cursor = at + 1;
                continue;
            }
            let name = &template[at + 1..name_end];
            let space_end = template[name_end..]
                .find(|c: char| !c.is_whitespace())
                .map_or(template.len(), |v| name_end + v);
            push_open(segments, &template[position..at]);
            if let Some(raw) = self.raws.get(name) {
                self.expand_raw(writer, raw, segments)?;
                push_open(segments, &template[name_end..space_end]);
            }
            position = space_end;
            cursor = space_end;
        }
        push_open(segments, &template[position..]);
        Ok(())
    }

    fn expand_raw(
        &self,
        writer: &dyn SqlWriter,
        raw: &Raw,
        segments: &mut Vec<Segment>,
    ) -> Result<()> {
        match raw {
            Raw::Text(text) => push_open(segments, text),
            Raw::Query(query) => segments.push(Segment::Sealed(query.render_with(writer)?)),
            Raw::List(items) => {
                if self.wrap {
                    push_open(segments, "(");
                }
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        push_open(segments, &self.separator);
                    }
                    self.expand_raw(writer, item, segments)?;
                }
                if self.wrap {
                    push_open(segments, ")");
                }
            }
        }
        Ok(())
    }

    fn write_vars(&self, writer: &dyn SqlWriter, out: &mut String, text: &str) -> Result<()> {
        let mut position = 0;
        for ((start, end), name) in placeholders(text) {
            let Some(value) = self.vars.get(name) else {
                return Err(MapperError::MissingVariable { name: name.into() }.into());
            };
            out.push_str(&text[position..start]);
            writer.write_value(out, value)?;
            position = end;
        }
        out.push_str(&text[position..]);
        Ok(())
    }
}

/// Finds the `{name}` placeholders of a text, returning their byte span and trimmed name.
fn placeholders(text: &str) -> impl Iterator<Item = ((usize, usize), &str)> {
    let mut cursor = 0;
    std::iter::from_fn(move || {
        while let Some(found) = text[cursor..].find('{') {
            let start = cursor + found;
            cursor = start + 1;
            let Some(length) = text[start + 1..].find('}') else {
                return None;
            };
            let end = start + 1 + length + 1;
            let name = text[start + 1..end - 1].trim();
            if !name.is_empty() && name.chars().all(is_ref_char) {
                cursor = end;
                return Some(((start, end), name));
            }
        }
        None
    })
}
