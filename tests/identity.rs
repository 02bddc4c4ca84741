#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use tiller::{Database, Entity, Value};
    use tiller_tests::{ScriptedTransport, USER_COLUMNS, User, init_logs, user_row};

    fn database() -> (ScriptedTransport, Database<ScriptedTransport>) {
        let transport = ScriptedTransport::new();
        transport.table("users", USER_COLUMNS);
        (transport.clone(), Database::new(transport))
    }

    #[tokio::test]
    async fn same_row_same_instance() {
        init_logs();
        let (transport, mut db) = database();
        let mut users = db.repository::<User>().await.unwrap();
        transport
            .reply_rows(
                USER_COLUMNS,
                [user_row(1, None, "John", "Wick", None, Some(55), None)],
            )
            .reply_rows(
                USER_COLUMNS,
                [
                    user_row(2, Some(1), "Helen", "Wick", None, None, None),
                    user_row(1, None, "John", "Wick", None, Some(55), None),
                ],
            );
        let john = users.find(1).await.unwrap().unwrap();

        // Unsaved changes of the live instance survive later queries
        john.write().age = Some(60).into();
        let everyone = users.find_all(&[]).await.unwrap();
        assert_eq!(everyone.len(), 2);
        assert!(Arc::ptr_eq(everyone.get(1).unwrap(), &john));
        assert_eq!(john.read().age.get(), Some(&Some(60)));
        assert_eq!(
            john.read().diff().unwrap(),
            [("age", Value::Integer(60))]
        );
        assert_eq!(users.database().identities().len(), 2);
    }

    #[tokio::test]
    async fn dropped_instances_are_reloaded() {
        init_logs();
        let (transport, mut db) = database();
        let mut users = db.repository::<User>().await.unwrap();
        let row = || user_row(3, None, "Winston", "Scott", None, None, None);
        transport.reply_rows(USER_COLUMNS, [row()]).reply_rows(USER_COLUMNS, [row()]);

        let first = users.find(3).await.unwrap().unwrap();
        first.write().first_name = "Changed".to_string().into();
        drop(first);
        assert!(users.database().identities().is_empty());

        let second = users.find(3).await.unwrap().unwrap();
        assert_eq!(
            second.read().first_name.get().map(String::as_str),
            Some("Winston")
        );
        users.database().identities_mut().prune();
        assert_eq!(users.database().identities().len(), 1);
    }

    #[tokio::test]
    async fn identity_change_rehashes() {
        init_logs();
        let (transport, mut db) = database();
        let mut users = db.repository::<User>().await.unwrap();
        transport.reply_rows(
            USER_COLUMNS,
            [user_row(1, None, "John", "Wick", None, None, None)],
        );
        let john = users.find(1).await.unwrap().unwrap();
        let old_hash = john.read().identity_hash().unwrap();
        transport.take_statements();

        john.write().id = 9.into();
        // The stored identity is still the old one until the update succeeds
        assert_eq!(john.read().identity_hash().as_ref(), Some(&old_hash));
        transport.reply_affected(1, None);
        users.update(&john).await.expect("Could not update");
        assert_eq!(
            transport.take_statements(),
            ["UPDATE users SET id = 9 WHERE id = 1"]
        );
        let new_hash = john.read().identity_hash().unwrap();
        assert_ne!(new_hash, old_hash);
        let identities = users.database().identities();
        assert!(identities.get::<User>(&old_hash).is_none());
        assert!(Arc::ptr_eq(
            &identities.get::<User>(&new_hash).unwrap(),
            &john
        ));
    }

    #[tokio::test]
    async fn fresh_entities_are_not_registered() {
        init_logs();
        let (_, mut db) = database();
        let users = db.repository::<User>().await.unwrap();
        let ghost = users.create([("first_name", Value::from("Ghost"))]).unwrap();
        assert!(ghost.read().identity_hash().is_none());
        let mut identities = tiller::IdentityMap::new();
        let registered = identities.register(ghost.clone());
        assert!(Arc::ptr_eq(&registered, &ghost));
        assert!(identities.is_empty());
    }
}
