#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use tiller_core::{
        Entity, IdentityMap, MapperError, Order, Passive, Record, Value, WireValue, codec, entity,
        map_fields, shared,
    };
    use time::{Date, macros::date};

    entity! {
        #[derive(Debug)]
        pub struct Person {
            pub id: i64,
            pub first_name: String,
            pub last_name: String,
            pub age: Option<i32>,
            pub active: bool,
            pub born: Option<Date> = codec::DATE,
            pub tags: Vec<String> = codec::ARRAY,
        }
        table = "people",
        identity = [id],
        order = [last_name => Asc, first_name => Desc],
        computed = [full_name => Person::full_name],
    }

    impl Person {
        fn full_name(&self) -> String {
            format!(
                "{} {}",
                self.first_name.get().map_or("", String::as_str),
                self.last_name.get().map_or("", String::as_str),
            )
        }
    }

    entity! {
        pub struct Membership {
            pub user_id: i64,
            pub group_id: i64,
            pub role: Option<String>,
        }
        table = "memberships",
        identity = [user_id, group_id],
    }

    entity! {
        struct Tag {
            name: String,
            uses: i64,
        }
        table = "tags",
        identity = [name],
        computed = [popular => |tag: &Tag| tag.uses.get().is_some_and(|v| *v > 10)]
    }

    fn stored_row() -> Vec<(&'static str, WireValue)> {
        vec![
            ("id", WireValue::integer(1)),
            ("first_name", WireValue::text("John")),
            ("last_name", WireValue::text("Wick")),
            ("age", WireValue::null()),
            ("active", WireValue::new("integer", 1)),
            ("born", WireValue::text("1964-09-02")),
            ("tags", WireValue::text(r#"["dogs","pencils"]"#)),
        ]
    }

    fn loaded(row: &[(&'static str, WireValue)]) -> Person {
        let mut person = Person::blank();
        person
            .initialize(row.iter().map(|(k, v)| (*k, v)), true)
            .expect("Could not initialize");
        person
    }

    #[test]
    fn schema() {
        let schema = Person::schema();
        assert_eq!(schema.name, "Person");
        assert_eq!(schema.table, "people");
        assert_eq!(
            schema.field_names().collect::<Vec<_>>(),
            ["id", "first_name", "last_name", "age", "active", "born", "tags"]
        );
        assert_eq!(schema.identity, ["id"]);
        assert_eq!(
            schema.order,
            [("last_name", Order::Asc), ("first_name", Order::Desc)]
        );
        assert_eq!(schema.codec("born"), Some(&codec::DATE));
        assert_eq!(schema.codec("first_name"), None);
        assert!(schema.is_identity("id"));
        assert!(!schema.is_identity("age"));
        assert_eq!(Membership::schema().identity, ["user_id", "group_id"]);
        assert!(Membership::schema().order.is_empty());
    }

    #[test]
    fn declaration_options() {
        let schema = Tag::schema();
        assert_eq!(schema.table, "tags");
        assert_eq!(schema.identity, ["name"]);
        assert!(schema.order.is_empty());
        assert_eq!(schema.computed, ["popular"]);
        let mut tag = Tag::blank();
        tag.set("uses", 42.into()).unwrap();
        assert_eq!(tag.computed("popular"), Some(Value::Boolean(true)));
        assert_eq!(Person::schema().computed, ["full_name"]);
    }

    #[test]
    fn initialize_from_storage() {
        let person = loaded(&stored_row());
        assert_eq!(person.id, Passive::Set(1));
        assert_eq!(person.first_name.get().map(String::as_str), Some("John"));
        assert_eq!(person.age, Passive::Set(None));
        assert_eq!(person.active, Passive::Set(true));
        assert_eq!(person.born, Passive::Set(Some(date!(1964 - 09 - 02))));
        assert_eq!(
            person.tags,
            Passive::Set(vec!["dogs".to_string(), "pencils".to_string()])
        );
        assert!(person.diff().expect("Could not diff").is_empty());
        assert_eq!(person.computed("full_name"), Some("John Wick".into()));
        assert_eq!(person.computed("nickname"), None);
    }

    #[test]
    fn initialize_skips_undeclared() {
        let mut row = stored_row();
        row.push(("nickname", WireValue::text("Baba Yaga")));
        let person = loaded(&row);
        assert_eq!(person.get("nickname"), None);
        assert_eq!(person.dump(None).len(), 7);
    }

    #[test]
    fn initialize_unknown_wire_type() {
        let mut person = Person::blank();
        let wire = WireValue::new("vector", "[1,2]");
        let error = person
            .initialize([("first_name", &wire)], true)
            .expect_err("Should reject the wire type");
        assert_eq!(
            error.downcast_ref::<MapperError>(),
            Some(&MapperError::UnknownWireType {
                tag: "vector".into(),
                column: "first_name".into(),
            })
        );
    }

    #[test]
    fn diff_and_reset() {
        let mut person = loaded(&stored_row());
        person.age = Some(52).into();
        person.first_name = "Jonathan".to_string().into();
        person.born = Some(date!(1964 - 09 - 02)).into();
        assert_eq!(
            person.diff().expect("Could not diff"),
            [
                ("first_name", Value::Text("Jonathan".into())),
                ("age", Value::Integer(52)),
            ]
        );
        let changes = person.reset().expect("Could not reset");
        assert_eq!(changes.len(), 2);
        assert!(person.diff().expect("Could not diff").is_empty());
        assert_eq!(
            person.dump(Some(&["first_name", "age"][..])),
            [
                ("first_name", Value::Text("Jonathan".into())),
                ("age", Value::Integer(52)),
            ]
        );
    }

    #[test]
    fn codec_encoded_diff() {
        let mut person = loaded(&stored_row());
        person.born = Some(date!(1970 - 01 - 31)).into();
        person.tags = Vec::<String>::new().into();
        assert_eq!(
            person.diff().expect("Could not diff"),
            [
                ("born", Value::Text("1970-01-31".into())),
                ("tags", Value::Null),
            ]
        );
    }

    #[test]
    fn fresh_entity() {
        let mut person = Person::blank();
        assert!(person.diff().unwrap().is_empty());
        assert!(person.dump(None).is_empty());
        person.set("first_name", "Helen".into()).unwrap();
        person.set("age", Value::Null).unwrap();
        assert_eq!(
            person.diff().unwrap(),
            [
                ("first_name", Value::Text("Helen".into())),
                ("age", Value::Null),
            ]
        );
        person.set("id", 7.into()).unwrap();
        assert_eq!(person.identity_hash(), None, "Not stored yet");
    }

    #[test]
    fn assignment_errors() {
        let mut person = Person::blank();
        let error = person
            .set("nickname", "Baba Yaga".into())
            .expect_err("Should not be declared");
        assert_eq!(
            error.downcast_ref::<MapperError>(),
            Some(&MapperError::UnknownField {
                entity: "Person".into(),
                field: "nickname".into(),
            })
        );
        let error = person
            .set("age", "old".into())
            .expect_err("Should not convert");
        assert!(matches!(
            error.downcast_ref::<MapperError>(),
            Some(MapperError::InvalidValue { .. })
        ));
        assert!(person.set("id", Value::Null).is_err());
    }

    #[test]
    fn identity_hash() {
        let first = loaded(&stored_row());
        let second = loaded(&stored_row());
        let mut row = stored_row();
        row[0].1 = WireValue::integer(2);
        let third = loaded(&row);
        assert!(first.identity_hash().is_some());
        assert_eq!(first.identity_hash(), second.identity_hash());
        assert_ne!(first.identity_hash(), third.identity_hash());

        let mut membership = Membership::blank();
        let user = WireValue::integer(1);
        membership.initialize([("user_id", &user)], true).unwrap();
        assert_eq!(membership.identity_hash(), None, "Partial identity");
        let group = WireValue::null();
        membership.initialize([("group_id", &group)], true).unwrap_err();
        let group = WireValue::integer(3);
        membership.initialize([("group_id", &group)], true).unwrap();
        assert!(membership.identity_hash().is_some());
    }

    #[test]
    fn mapping() {
        let mapping = map_fields(
            Person::schema(),
            &["id", "FirstName", "last_name", "AGE", "active"],
        )
        .expect("Should map");
        assert_eq!(mapping.len(), 5);
        assert_eq!(mapping.field("FirstName"), Some("first_name"));
        assert_eq!(mapping.field("AGE"), Some("age"));
        assert_eq!(mapping.column("first_name"), Some("FirstName"));
        assert_eq!(mapping.column("born"), None);
        assert_eq!(
            mapping.fields_to_columns().get("last_name").map(String::as_str),
            Some("last_name")
        );

        let error = map_fields(Person::schema(), &["id", "nickname", "shoe_size"])
            .expect_err("Should not map");
        assert_eq!(
            error.downcast_ref::<MapperError>(),
            Some(&MapperError::SchemaMismatch {
                entity: "Person",
                table: "people",
                columns: vec!["nickname".into(), "shoe_size".into()],
            })
        );
    }

    #[test]
    fn identity_map() {
        let mut identities = IdentityMap::new();
        let first = identities.register(shared(loaded(&stored_row())));
        let second = identities.register(shared(loaded(&stored_row())));
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(identities.len(), 1);

        let fresh = shared(Person::blank());
        let registered = identities.register(fresh.clone());
        assert!(Arc::ptr_eq(&fresh, &registered));
        assert_eq!(identities.len(), 1, "No identity, not registered");

        let old_hash = first.read().identity_hash();
        {
            let mut person = first.write();
            person.id = 10.into();
            person.reset().unwrap();
        }
        identities.rehash(&first, old_hash.clone());
        let hash = first.read().identity_hash().unwrap();
        assert!(identities.get::<Person>(old_hash.as_deref().unwrap()).is_none());
        assert!(Arc::ptr_eq(&identities.get::<Person>(&hash).unwrap(), &first));

        identities.forget(&first);
        assert!(identities.get::<Person>(&hash).is_none());

        let kept = identities.register(shared(loaded(&stored_row())));
        assert_eq!(identities.len(), 1);
        drop(kept);
        drop((first, second));
        identities.prune();
        assert!(identities.is_empty());
    }

    #[test]
    fn dead_slots_are_swept() {
        let mut identities = IdentityMap::new();
        for id in 0..1000 {
            let mut row = stored_row();
            row[0].1 = WireValue::integer(id);
            identities.register(shared(loaded(&row)));
        }
        assert!(identities.is_empty());
        assert!(identities.slots() <= 64, "{} slots left", identities.slots());

        let kept = (0..200)
            .map(|id| {
                let mut row = stored_row();
                row[0].1 = WireValue::integer(id);
                identities.register(shared(loaded(&row)))
            })
            .collect::<Vec<_>>();
        assert_eq!(identities.len(), 200);
        assert!(identities.slots() < 2 * 200 + 64);
        drop(kept);
    }
}
