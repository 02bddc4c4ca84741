use crate::{Group, User};
use std::sync::{Arc, LazyLock};
use tiller::{
    Database, Entity, Link, Order, Transport, Value,
    expr::{gte, like},
};
use time::macros::date;
use tokio::sync::Mutex;

static MUTEX: LazyLock<Mutex<()>> = LazyLock::new(|| Mutex::new(()));

const SETUP: [&str; 7] = [
    "DROP TABLE IF EXISTS memberships",
    "DROP TABLE IF EXISTS groups",
    "DROP TABLE IF EXISTS users",
    "CREATE TABLE users (id INTEGER PRIMARY KEY AUTOINCREMENT, parent INTEGER, firstName TEXT NOT NULL, lastName TEXT NOT NULL, email TEXT, age INTEGER, died TEXT)",
    "CREATE TABLE groups (id INTEGER PRIMARY KEY, name TEXT NOT NULL)",
    "CREATE TABLE memberships (user_id INTEGER NOT NULL, group_id INTEGER NOT NULL, role TEXT, PRIMARY KEY (user_id, group_id))",
    "INSERT INTO groups (id, name) VALUES (1, 'High Table'), (2, 'Continental')",
];

/// Full entity lifecycle against a live endpoint.
pub async fn users<T: Transport>(db: &mut Database<T>) {
    let _lock = MUTEX.lock().await;

    // Setup
    for sql in SETUP {
        db.execute_sql(sql)
            .await
            .expect("Could not reach the endpoint")
            .check()
            .expect("Setup statement failed");
    }
    db.forget_mapping::<User>();
    db.forget_mapping::<Group>();

    let (john, helen) = {
        let mut users = db
            .repository::<User>()
            .await
            .expect("Could not create the users repository");

        // Insert
        let john = users
            .create([
                ("first_name", "John".into()),
                ("last_name", "Wick".into()),
                ("age", 55.into()),
            ])
            .expect("Could not create John");
        users.insert(&john).await.expect("Could not insert John");
        let john_id = *john.read().id.get().expect("The id should be generated");
        assert!(john.read().diff().unwrap().is_empty());

        // Lookup returns the live instance
        let found = users
            .find(john_id)
            .await
            .expect("Could not find John")
            .expect("John should exist");
        assert!(Arc::ptr_eq(&found, &john));

        // Update
        {
            let mut john = john.write();
            john.email = Some("john@continental.com".to_string()).into();
            john.died = Some(date!(2023 - 03 - 24)).into();
        }
        let result = users.update(&john).await.expect("Could not update John");
        assert_eq!(result.affected_rows(), Some(1));
        assert!(john.read().diff().unwrap().is_empty());
        let result = users.update(&john).await.expect("Empty update");
        assert_eq!(result.sql(), "", "Nothing should be sent");

        let helen = users
            .create([
                ("first_name", "Helen".into()),
                ("last_name", "Wick".into()),
                ("parent", john_id.into()),
            ])
            .expect("Could not create Helen");
        users.insert(&helen).await.expect("Could not insert Helen");

        // Pagination
        let page = users
            .find_by(
                &[("last_name", "Wick".into())],
                &[("first_name", Order::Asc)],
                Some(1),
                Some(2),
            )
            .await
            .expect("Could not paginate");
        assert_eq!(page.len(), 1);
        assert!(Arc::ptr_eq(page.get(0).unwrap(), &john));

        let mut total = 0;
        let older = users
            .select(
                |query| {
                    query
                        .r#where([gte("age", 50), like("last_name", "W%")])
                        .limit(Some(10));
                },
                Some(&mut total),
            )
            .await
            .expect("Could not select");
        assert_eq!(older.len(), 1);
        assert_eq!(total, 1);

        let everyone = users.find_all(&[]).await.expect("Could not list");
        assert_eq!(
            everyone
                .iter()
                .map(|v| v.read().computed("full_name"))
                .collect::<Vec<_>>(),
            [
                Some(Value::from("Helen Wick")),
                Some(Value::from("John Wick"))
            ]
        );
        (john, helen)
    };

    // Associations
    let children = db
        .has_many::<User, User>(&john, &Link::new([("id", "parent")]), false)
        .await
        .expect("Could not resolve the children");
    assert_eq!(children.len(), 1);
    assert!(Arc::ptr_eq(children.get(0).unwrap(), &helen));
    let parent = db
        .has_one::<User, User>(&helen, &Link::new([("parent", "id")]), false)
        .await
        .expect("Could not resolve the parent")
        .expect("Helen should have a parent");
    assert!(Arc::ptr_eq(&parent, &john));

    let john_id = *john.read().id.get().unwrap();
    db.execute_sql(format!(
        "INSERT INTO memberships (user_id, group_id) VALUES ({john_id}, 1)"
    ))
    .await
    .expect("Could not reach the endpoint")
    .check()
    .expect("Could not insert the membership");
    let groups = db
        .has_many::<User, Group>(
            &john,
            &Link::new([("id", "user_id"), ("group_id", "id")]).through("memberships"),
            false,
        )
        .await
        .expect("Could not resolve the groups");
    assert_eq!(groups.len(), 1);
    assert_eq!(
        groups.get(0).unwrap().read().name.get().map(String::as_str),
        Some("High Table")
    );

    // Delete
    let mut users = db
        .repository::<User>()
        .await
        .expect("Could not create the users repository");
    let helen_id = *helen.read().id.get().unwrap();
    users.delete(&helen).await.expect("Could not delete Helen");
    assert!(
        users
            .find(helen_id)
            .await
            .expect("Could not look for Helen")
            .is_none()
    );
}
