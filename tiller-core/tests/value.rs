#[cfg(test)]
mod tests {
    use serde_json::json;
    use tiller_core::{AsValue, MapperError, RawRecord, Record, Value, WireValue, codec};
    use time::macros::{date, datetime, time};

    #[test]
    fn wire_values() {
        let decode = |kind: &str, value: serde_json::Value| {
            WireValue::new(kind, value)
                .decode("column")
                .expect("Could not decode")
        };
        assert_eq!(decode("null", json!(null)), Value::Null);
        assert_eq!(decode("integer", json!("9007199254740993")), Value::Integer(9007199254740993));
        assert_eq!(decode("integer", json!(-4)), Value::Integer(-4));
        assert_eq!(decode("INTEGER", json!(null)), Value::Null);
        assert_eq!(decode("float", json!(1.25)), Value::Float(1.25));
        assert_eq!(decode("double", json!("2.5")), Value::Float(2.5));
        assert_eq!(decode("real", json!(3)), Value::Float(3.0));
        assert_eq!(decode("boolean", json!(true)), Value::Boolean(true));
        assert_eq!(decode("boolean", json!(0)), Value::Boolean(false));
        assert_eq!(decode("text", json!("hello")), Value::Text("hello".into()));
        assert_eq!(decode("string", json!("")), Value::Text("".into()));
        assert_eq!(decode("blob", json!("AAEC")), Value::Text("AAEC".into()));

        let error = WireValue::new("integer", json!("twelve"))
            .decode("age")
            .expect_err("Not an integer");
        assert!(matches!(
            error.downcast_ref::<MapperError>(),
            Some(MapperError::InvalidValue { target, .. }) if target == "age"
        ));
        let error = WireValue::new("geometry", json!("POINT(0 0)"))
            .decode("location")
            .expect_err("Unknown type");
        assert_eq!(
            error.downcast_ref::<MapperError>(),
            Some(&MapperError::UnknownWireType {
                tag: "geometry".into(),
                column: "location".into()
            })
        );
    }

    #[test]
    fn as_value() {
        assert_eq!(42u8.as_value(), Value::Integer(42));
        assert_eq!(i32::try_from_value(Value::Integer(-7)).unwrap(), -7);
        assert!(u8::try_from_value(Value::Integer(300)).is_err());
        assert!(i64::try_from_value(Value::Text("1".into())).is_err());
        assert!(bool::try_from_value(Value::Integer(2)).unwrap());
        assert_eq!(f64::try_from_value(Value::Integer(2)).unwrap(), 2.0);
        assert_eq!(Option::<i64>::try_from_value(Value::Null).unwrap(), None);
        assert_eq!(Some("x".to_string()).as_value(), Value::Text("x".into()));
        assert_eq!(
            vec![1i64, 2].as_value(),
            Value::List(vec![Value::Integer(1), Value::Integer(2)])
        );
        assert_eq!(
            Vec::<String>::try_from_value(Value::List(vec!["a".into()])).unwrap(),
            ["a"]
        );
        assert_eq!(Value::from("text"), Value::Text("text".into()));
    }

    #[test]
    fn temporal_codecs() {
        assert_eq!(
            (codec::DATE.decode)("2024-02-29".into()).unwrap(),
            Value::Date(date!(2024 - 02 - 29))
        );
        assert_eq!(
            (codec::DATE.decode)("2024-02-29 10:00:00".into()).unwrap(),
            Value::Date(date!(2024 - 02 - 29))
        );
        assert_eq!((codec::DATE.decode)("".into()).unwrap(), Value::Null);
        assert_eq!((codec::DATE.decode)(Value::Null).unwrap(), Value::Null);
        assert!((codec::DATE.decode)("29/02/2024".into()).is_err());
        assert_eq!(
            (codec::DATE.encode)(Value::Date(date!(1999 - 12 - 31))).unwrap(),
            Value::Text("1999-12-31".into())
        );
        assert_eq!(
            (codec::TIME.decode)("07:05:09".into()).unwrap(),
            Value::Time(time!(7:05:09))
        );
        assert_eq!(
            (codec::TIME.encode)(Value::Time(time!(23:59:01))).unwrap(),
            Value::Text("23:59:01".into())
        );
        assert_eq!(
            (codec::TIMESTAMP.decode)("2020-01-02T03:04:05.678Z".into()).unwrap(),
            Value::Timestamp(datetime!(2020-01-02 03:04:05))
        );
        assert_eq!(
            (codec::TIMESTAMP.encode)(Value::Timestamp(datetime!(2020-01-02 03:04:05))).unwrap(),
            Value::Text("2020-01-02 03:04:05".into())
        );
        assert!((codec::TIMESTAMP.encode)(Value::Integer(1)).is_err());
    }

    #[test]
    fn json_codecs() {
        assert_eq!(
            (codec::ARRAY.decode)(r#"[1,"two",null,[3]]"#.into()).unwrap(),
            Value::List(vec![
                Value::Integer(1),
                Value::Text("two".into()),
                Value::Null,
                Value::List(vec![Value::Integer(3)]),
            ])
        );
        assert_eq!(
            (codec::ARRAY.decode)(Value::Null).unwrap(),
            Value::List(Vec::new())
        );
        assert!((codec::ARRAY.decode)(r#"{"a":1}"#.into()).is_err());
        assert_eq!(
            (codec::ARRAY.encode)(Value::List(vec![1.into(), "b".into()])).unwrap(),
            Value::Text(r#"[1,"b"]"#.into())
        );
        assert_eq!(
            (codec::ARRAY.encode)(Value::List(Vec::new())).unwrap(),
            Value::Null
        );
        assert_eq!(
            (codec::OBJECT.decode)(r#"{"theme":"dark"}"#.into()).unwrap(),
            Value::Json(json!({"theme": "dark"}))
        );
        assert_eq!(
            (codec::OBJECT.encode)(Value::Json(json!({"theme": "dark"}))).unwrap(),
            Value::Text(r#"{"theme":"dark"}"#.into())
        );
    }

    #[test]
    fn raw_records() {
        let record = RawRecord::from_row(
            &["id".to_string(), "email".to_string()],
            &[WireValue::integer(5), WireValue::null()],
        )
        .expect("Could not decode");
        assert_eq!(record.len(), 2);
        assert_eq!(record.field_names(), ["id", "email"]);
        assert_eq!(record.get("id"), Some(Value::Integer(5)));
        assert_eq!(record.get("email"), Some(Value::Null));
        assert_eq!(record.get("missing"), None);
        assert_eq!(record.get_as::<i64>("id").unwrap(), 5);
        assert_eq!(record.get_as::<Option<String>>("email").unwrap(), None);
        assert!(record.get_as::<i64>("missing").is_err());

        let mut record = record;
        record.set("email", "a@b.c".into()).unwrap();
        record.set("extra", true.into()).unwrap();
        assert_eq!(record.field_names(), ["id", "email", "extra"]);
        assert_eq!(record.get("email"), Some("a@b.c".into()));
    }
}
