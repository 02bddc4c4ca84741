use crate::{MapperError, Result, Value, separated_by};

macro_rules! write_integer {
    ($out:ident, $value:expr) => {{
        let mut buffer = itoa::Buffer::new();
        $out.push_str(buffer.format($value));
    }};
}

/// Dialect hooks used to turn values into SQL literals.
///
/// The default methods produce SQLite literals, which is what the remote endpoint speaks.
pub trait SqlWriter {
    fn write_value(&self, out: &mut String, value: &Value) -> Result<()> {
        match value {
            Value::Null => self.write_value_none(out),
            Value::Boolean(v) => self.write_value_bool(out, *v),
            Value::Integer(v) => write_integer!(out, *v),
            Value::Float(v) => self.write_value_float(out, *v)?,
            Value::Text(v) => self.write_value_string(out, v),
            Value::List(v) => {
                out.push('(');
                let mut result = Ok(());
                separated_by(
                    out,
                    v,
                    |out, v| {
                        if result.is_ok() {
                            result = self.write_value(out, v);
                        }
                    },
                    ",",
                );
                result?;
                out.push(')');
            }
            v => {
                return Err(MapperError::UnsupportedValueType { kind: v.kind() }.into());
            }
        };
        Ok(())
    }

    fn write_value_none(&self, out: &mut String) {
        out.push_str("NULL")
    }

    fn write_value_bool(&self, out: &mut String, value: bool) {
        out.push_str(["FALSE", "TRUE"][value as usize])
    }

    fn write_value_float(&self, out: &mut String, value: f64) -> Result<()> {
        if !value.is_finite() {
            return Err(MapperError::UnsupportedValueType {
                kind: "non-finite float",
            }
            .into());
        }
        let mut buffer = ryu::Buffer::new();
        out.push_str(buffer.format_finite(value));
        Ok(())
    }

    fn write_value_string(&self, out: &mut String, value: &str) {
        out.push('\'');
        let mut position = 0;
        for (i, c) in value.char_indices() {
            if c == '\'' {
                out.push_str(&value[position..i]);
                out.push_str("''");
                position = i + 1;
            }
        }
        out.push_str(&value[position..]);
        out.push('\'');
    }
}

#[derive(Default, Debug, Clone, Copy)]
pub struct SqliteWriter;

impl SqlWriter for SqliteWriter {}

/// Escapes a value into a SQLite literal.
pub fn escape(value: &Value) -> Result<String> {
    let mut out = String::with_capacity(16);
    SqliteWriter.write_value(&mut out, value)?;
    Ok(out)
}
